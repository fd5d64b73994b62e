//! Configuration resolution for isolator
//!
//! All configuration comes from environment variables, read once at startup
//! and immutable for the process lifetime. Missing tokens degrade the
//! affected component (auth rejects everything, notification becomes a no-op)
//! rather than preventing startup.

use anyhow::{Context, Result};
use base64::Engine;
use std::path::PathBuf;
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 10000;
const DEFAULT_DROPBOX_FOLDER: &str = "/Isolator";

/// Process-wide configuration, safe for concurrent reads.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port (`PORT`)
    pub port: u16,
    /// Shared secret for bearer + HMAC auth (`PROCESSOR_TOKEN`); empty means
    /// every request is rejected
    pub processor_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`); empty disables notification
    pub slack_bot_token: String,
    /// Dropbox access token (`DROPBOX_TOKEN`)
    pub dropbox_token: String,
    /// Remote namespace prefix (`DROPBOX_FOLDER`), trailing slashes trimmed
    pub dropbox_folder: String,
    /// Cookies file materialized from `YTDLP_COOKIES_B64`, if supplied
    pub cookies_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT is not a valid port number: {}", raw))?,
            Err(_) => DEFAULT_PORT,
        };

        let processor_token = std::env::var("PROCESSOR_TOKEN").unwrap_or_default();
        if processor_token.is_empty() {
            warn!("PROCESSOR_TOKEN not set; all intake requests will be rejected");
        }

        let slack_bot_token = std::env::var("SLACK_BOT_TOKEN").unwrap_or_default();
        if slack_bot_token.is_empty() {
            warn!("SLACK_BOT_TOKEN not set; notifications disabled");
        }

        let dropbox_token = std::env::var("DROPBOX_TOKEN").unwrap_or_default();
        if dropbox_token.is_empty() {
            warn!("DROPBOX_TOKEN not set; uploads will fail");
        }

        let dropbox_folder = std::env::var("DROPBOX_FOLDER")
            .unwrap_or_else(|_| DEFAULT_DROPBOX_FOLDER.to_string())
            .trim_end_matches('/')
            .to_string();

        let cookies_file = match std::env::var("YTDLP_COOKIES_B64") {
            Ok(blob) if !blob.is_empty() => Some(materialize_cookies(&blob)?),
            _ => None,
        };

        info!(port, folder = %dropbox_folder, "Configuration loaded");

        Ok(Self {
            port,
            processor_token,
            slack_bot_token,
            dropbox_token,
            dropbox_folder,
            cookies_file,
        })
    }
}

/// Decode the base64 cookie blob into a temp file, once, at startup.
/// Every download attempt passes this file to the external tool.
fn materialize_cookies(blob: &str) -> Result<PathBuf> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(blob.trim())
        .context("YTDLP_COOKIES_B64 is not valid base64")?;

    let path = std::env::temp_dir().join(format!("isolator-cookies-{}.txt", std::process::id()));
    std::fs::write(&path, bytes)
        .with_context(|| format!("failed to write cookies file {}", path.display()))?;

    info!(path = %path.display(), "Session cookies materialized");
    Ok(path)
}
