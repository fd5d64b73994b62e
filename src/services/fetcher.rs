//! Remote audio retrieval via yt-dlp
//!
//! One primary attempt with bounded retries, plus a single pattern-matched
//! fallback: when the tool's diagnostics look like an anti-automation
//! challenge, retry once with an alternate extractor client identity. Any
//! other failure propagates unmodified.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

/// Whole-operation retry count passed to the tool.
const DOWNLOAD_RETRIES: u32 = 3;
/// Per-fragment retry count.
const FRAGMENT_RETRIES: u32 = 3;
/// Seconds slept between requests to reduce rate limiting.
const SLEEP_REQUESTS_SECS: u32 = 1;
/// Alternate client identity used for the bot-challenge fallback.
const FALLBACK_EXTRACTOR_ARGS: &str = "youtube:player_client=android";

/// Fetch stage errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Could not start the external tool at all
    #[error("failed to launch yt-dlp: {0}")]
    Launch(#[from] std::io::Error),

    /// Tool exited non-zero; carries its diagnostic output
    #[error("yt-dlp failed: {0}")]
    ToolFailed(String),

    /// Tool reported success but the output file is missing
    #[error("download reported success but {0} does not exist")]
    MissingOutput(PathBuf),
}

/// Closed classification of a failed download's diagnostic text.
///
/// Keeps the brittle string matching against the external tool's output in
/// one place; only `BotChallenge` triggers the fallback attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailureKind {
    BotChallenge,
    Other,
}

/// Phrases the content source emits when it suspects automation.
const BOT_CHALLENGE_SIGNATURES: &[&str] = &[
    "confirm you're not a bot",
    "confirm you are not a bot",
    "sign in to confirm",
    "consent.youtube.com",
    "confirm your age",
];

pub fn classify_failure(diagnostics: &str) -> FetchFailureKind {
    let lower = diagnostics.to_lowercase();
    if BOT_CHALLENGE_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
        FetchFailureKind::BotChallenge
    } else {
        FetchFailureKind::Other
    }
}

/// yt-dlp wrapper producing one m4a file per remote URL.
#[derive(Debug, Clone, Default)]
pub struct YtDlpFetcher {
    cookies_file: Option<PathBuf>,
    program_override: Option<PathBuf>,
}

impl YtDlpFetcher {
    pub fn new(cookies_file: Option<PathBuf>) -> Self {
        Self {
            cookies_file,
            program_override: None,
        }
    }

    /// Substitute the downloader executable. Used by tests to stand in a
    /// stub for `python3 -m yt_dlp`.
    pub fn with_program(mut self, program: PathBuf) -> Self {
        self.program_override = Some(program);
        self
    }

    fn base_command(&self) -> Command {
        match &self.program_override {
            Some(program) => Command::new(program),
            None => {
                let mut cmd = Command::new("python3");
                cmd.arg("-m").arg("yt_dlp");
                cmd
            }
        }
    }

    /// Download the best available audio track for `url` into `dest`.
    ///
    /// At most two tool invocations: the primary attempt, and one fallback
    /// when the primary's diagnostics match a bot-challenge signature.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf, FetchError> {
        info!(url, dest = %dest.display(), "Download starting");

        match self.attempt(url, dest, None).await {
            Ok(path) => Ok(path),
            Err(FetchError::ToolFailed(diag))
                if classify_failure(&diag) == FetchFailureKind::BotChallenge =>
            {
                warn!(url, "Bot challenge detected; retrying with alternate client identity");
                self.attempt(url, dest, Some(FALLBACK_EXTRACTOR_ARGS)).await
            }
            Err(e) => Err(e),
        }
    }

    async fn attempt(
        &self,
        url: &str,
        dest: &Path,
        extractor_args: Option<&str>,
    ) -> Result<PathBuf, FetchError> {
        let mut cmd = self.base_command();
        cmd.arg("-f")
            .arg("bestaudio/best")
            .arg("-x")
            .arg("--audio-format")
            .arg("m4a")
            .arg("--retries")
            .arg(DOWNLOAD_RETRIES.to_string())
            .arg("--fragment-retries")
            .arg(FRAGMENT_RETRIES.to_string())
            .arg("--sleep-requests")
            .arg(SLEEP_REQUESTS_SECS.to_string())
            .arg("-o")
            .arg(dest);

        if let Some(args) = extractor_args {
            cmd.arg("--extractor-args").arg(args);
        }
        if let Some(cookies) = &self.cookies_file {
            cmd.arg("--cookies").arg(cookies);
        }

        cmd.arg(url).stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let diag = if stderr.trim().is_empty() { stdout } else { stderr };
            warn!(url, %diag, "yt-dlp exited non-zero");
            return Err(FetchError::ToolFailed(diag.trim().to_string()));
        }

        if !dest.exists() {
            return Err(FetchError::MissingOutput(dest.to_path_buf()));
        }

        info!(url, dest = %dest.display(), "Download complete");
        Ok(dest.to_path_buf())
    }
}
