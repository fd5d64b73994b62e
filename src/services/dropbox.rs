//! Dropbox storage publisher
//!
//! Per artifact: upload local bytes in overwrite mode (idempotent), then
//! resolve a public direct-download link. Link resolution is a two-step
//! idempotent protocol (create, and on "already exists" list the existing
//! links) because re-running a job overwrites the prior run's artifact at
//! the same path.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const API_BASE_URL: &str = "https://api.dropboxapi.com";
const CONTENT_BASE_URL: &str = "https://content.dropboxapi.com";

/// Generous timeout: stem WAVs run to tens of megabytes.
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Fallback base name when a title sanitizes to nothing.
const DEFAULT_BASE_NAME: &str = "split";

/// Publish stage errors
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("token not configured")]
    MissingToken,

    #[error("failed to read {path}: {source}")]
    ReadLocal {
        path: String,
        source: std::io::Error,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("upload rejected: {0}")]
    UploadFailed(String),

    #[error("link resolution failed: {0}")]
    LinkFailed(String),

    #[error("no existing link found for {0}")]
    NoExistingLink(String),
}

#[derive(Debug, Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'a str,
    autorename: bool,
    mute: bool,
    strict_conflict: bool,
}

#[derive(Debug, Deserialize)]
struct SharedLinkResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<ApiErrorDetail>,
    #[serde(default)]
    error_summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = ".tag")]
    tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListLinksResponse {
    #[serde(default)]
    links: Vec<SharedLinkResponse>,
}

/// Dropbox HTTP client. Base URLs are overridable so tests can point it at a
/// local mock server.
#[derive(Debug, Clone)]
pub struct DropboxClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
    content_base: String,
}

impl DropboxClient {
    pub fn new(token: String) -> Result<Self, PublishError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| PublishError::Network(e.to_string()))?;

        Ok(Self {
            http,
            token,
            api_base: API_BASE_URL.to_string(),
            content_base: CONTENT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_urls(mut self, api_base: String, content_base: String) -> Self {
        self.api_base = api_base;
        self.content_base = content_base;
        self
    }

    /// Upload `local` to `remote_path`, replacing any prior object there.
    pub async fn upload(&self, local: &Path, remote_path: &str) -> Result<(), PublishError> {
        if self.token.is_empty() {
            return Err(PublishError::MissingToken);
        }

        let bytes = tokio::fs::read(local)
            .await
            .map_err(|source| PublishError::ReadLocal {
                path: local.display().to_string(),
                source,
            })?;

        let arg = UploadArg {
            path: remote_path,
            mode: "overwrite",
            autorename: false,
            mute: true,
            strict_conflict: false,
        };
        let arg_json =
            serde_json::to_string(&arg).map_err(|e| PublishError::UploadFailed(e.to_string()))?;

        debug!(remote_path, bytes = bytes.len(), "Uploading artifact");

        let response = self
            .http
            .post(format!("{}/2/files/upload", self.content_base))
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", arg_json)
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::UploadFailed(body));
        }

        info!(remote_path, "Upload complete");
        Ok(())
    }

    /// Resolve a public direct-download link for `remote_path`.
    ///
    /// Creation failing with `shared_link_already_exists` is the expected
    /// overwrite race and falls back to listing; any other error is fatal.
    pub async fn direct_link(&self, remote_path: &str) -> Result<String, PublishError> {
        if self.token.is_empty() {
            return Err(PublishError::MissingToken);
        }

        let create = self
            .http
            .post(format!(
                "{}/2/sharing/create_shared_link_with_settings",
                self.api_base
            ))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "path": remote_path,
                "settings": { "requested_visibility": "public" }
            }))
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if create.status().is_success() {
            let link: SharedLinkResponse = create
                .json()
                .await
                .map_err(|e| PublishError::LinkFailed(e.to_string()))?;
            return Ok(to_direct_download(&link.url));
        }

        let body = create.text().await.unwrap_or_default();
        let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or(ApiErrorBody {
            error: None,
            error_summary: None,
        });
        let already_exists = parsed
            .error
            .and_then(|e| e.tag)
            .map(|tag| tag == "shared_link_already_exists")
            .unwrap_or(false);

        if !already_exists {
            return Err(PublishError::LinkFailed(
                parsed.error_summary.unwrap_or(body),
            ));
        }

        debug!(remote_path, "Shared link exists; listing");

        let list = self
            .http
            .post(format!("{}/2/sharing/list_shared_links", self.api_base))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "path": remote_path,
                "direct_only": true
            }))
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if !list.status().is_success() {
            let body = list.text().await.unwrap_or_default();
            return Err(PublishError::LinkFailed(body));
        }

        let links: ListLinksResponse = list
            .json()
            .await
            .map_err(|e| PublishError::LinkFailed(e.to_string()))?;

        links
            .links
            .first()
            .map(|l| to_direct_download(&l.url))
            .ok_or_else(|| PublishError::NoExistingLink(remote_path.to_string()))
    }
}

/// Rewrite a browser-preview share URL into its direct-download form.
pub fn to_direct_download(url: &str) -> String {
    url.replace("?dl=0", "?dl=1")
}

/// Replace illegal filesystem characters with a single space, collapse
/// whitespace, trim; empty results fall back to a fixed default.
pub fn sanitize_title(title: &str) -> String {
    let mut cleaned = String::with_capacity(title.len());
    let mut last_was_space = true;
    for c in title.chars() {
        let mapped = match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => ' ',
            c if c.is_whitespace() => ' ',
            c => c,
        };
        if mapped == ' ' {
            if !last_was_space {
                cleaned.push(' ');
            }
            last_was_space = true;
        } else {
            cleaned.push(mapped);
            last_was_space = false;
        }
    }
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        DEFAULT_BASE_NAME.to_string()
    } else {
        cleaned
    }
}

/// Sortable UTC timestamp with `:` and `.` flattened for path safety,
/// e.g. `2026-08-30T12-00-00-000Z`.
pub fn artifact_stamp() -> String {
    Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

/// Compose a collision-resistant remote file name for one stem.
pub fn remote_file_name(title: Option<&str>, stamp: &str, suffix: &str) -> String {
    let base = sanitize_title(title.unwrap_or(""));
    format!("{}_{}_{}.wav", base, stamp, suffix)
}
