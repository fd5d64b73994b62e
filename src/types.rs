//! Wire types and pipeline data model

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Body of `POST /`, the webhook intake request.
///
/// `url` is required for processing to proceed; everything else is optional.
/// `channel` and `thread_ts` only enable notification when both are present.
#[derive(Debug, Clone, Deserialize)]
pub struct IntakeRequest {
    pub mode: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub thread_ts: Option<String>,
}

/// Fast-ack response body, echoing what was received.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub ok: bool,
    pub intake: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Which of the two separated tracks an artifact is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StemKind {
    Vocals,
    Instrumental,
}

impl StemKind {
    /// Fixed role suffix used in remote artifact names.
    pub fn suffix(&self) -> &'static str {
        match self {
            StemKind::Vocals => "vocals",
            StemKind::Instrumental => "instrumental",
        }
    }
}

/// One separated track: produced locally by the separator, then placed
/// remotely by the publisher. Exactly two per completed job.
#[derive(Debug, Clone)]
pub struct StemArtifact {
    pub kind: StemKind,
    pub local_path: PathBuf,
    pub remote_name: String,
    pub direct_link: String,
}

/// Slack destination for terminal notifications.
///
/// Exists only when the intake carried both `channel` and `thread_ts`;
/// a request with neither (or only one) runs in silent mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyTarget {
    pub channel: String,
    pub thread_ts: String,
}

impl NotifyTarget {
    pub fn from_parts(channel: Option<String>, thread_ts: Option<String>) -> Option<Self> {
        match (channel, thread_ts) {
            (Some(channel), Some(thread_ts)) if !channel.is_empty() && !thread_ts.is_empty() => {
                Some(Self { channel, thread_ts })
            }
            _ => None,
        }
    }
}

/// Everything one pipeline run needs, derived from a single intake request.
///
/// Ephemeral, never persisted. The `job_id` namespaces every local path the
/// job touches, so concurrent jobs cannot interleave on the filesystem.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub notify: Option<NotifyTarget>,
}

impl JobContext {
    pub fn new(url: String, title: Option<String>, notify: Option<NotifyTarget>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            url,
            title,
            notify,
        }
    }
}
