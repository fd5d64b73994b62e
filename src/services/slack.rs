//! Slack notification client
//!
//! Terminal status messages posted into the thread that triggered the job.
//! Strictly best-effort at the pipeline boundary: the notifier trait impl
//! returns its error for logging, and the controller swallows it.

use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::types::{NotifyTarget, StemArtifact};

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Notification errors. Always swallowed (logged) by the pipeline.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("token not configured")]
    MissingToken,

    #[error("network error: {0}")]
    Network(String),

    #[error("slack rejected message: {0}")]
    Rejected(String),
}

/// Terminal pipeline outcome, rendered into a fixed message template.
#[derive(Debug, Clone)]
pub enum Notification {
    /// Both artifacts published; links are direct-download form.
    Success {
        vocals: StemArtifact,
        instrumental: StemArtifact,
    },
    /// A stage failed; carries a human-readable summary.
    Failure { summary: String },
}

impl Notification {
    /// Render the fixed template: plain text plus Block Kit sections.
    pub fn render(&self) -> (String, Option<Value>) {
        match self {
            Notification::Success {
                vocals,
                instrumental,
            } => {
                let blocks = json!([
                    {
                        "type": "section",
                        "text": {
                            "type": "mrkdwn",
                            "text": "*✅ Stems ready* (vocals / instrumental)"
                        }
                    },
                    {
                        "type": "section",
                        "fields": [
                            {
                                "type": "mrkdwn",
                                "text": format!("*Vocals:*\n<{}|Download>", vocals.direct_link)
                            },
                            {
                                "type": "mrkdwn",
                                "text": format!("*Instrumental:*\n<{}|Download>", instrumental.direct_link)
                            }
                        ]
                    }
                ]);
                ("✅ Stems ready.".to_string(), Some(blocks))
            }
            Notification::Failure { summary } => {
                (format!("❌ Processing failed: {}", summary), None)
            }
        }
    }
}

/// Slack Web API client.
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    post_url: String,
}

impl SlackClient {
    pub fn new(token: String) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        Ok(Self {
            http,
            token,
            post_url: POST_MESSAGE_URL.to_string(),
        })
    }

    pub fn with_post_url(mut self, url: String) -> Self {
        self.post_url = url;
        self
    }

    /// Post a message into the target thread.
    pub async fn post(
        &self,
        target: &NotifyTarget,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        if self.token.is_empty() {
            return Err(NotifyError::MissingToken);
        }

        let (text, blocks) = notification.render();
        let mut payload = json!({
            "channel": target.channel,
            "thread_ts": target.thread_ts,
            "text": text,
        });
        if let Some(blocks) = blocks {
            payload["blocks"] = blocks;
        }

        debug!(channel = %target.channel, thread_ts = %target.thread_ts, "Posting notification");

        let response = self
            .http
            .post(&self.post_url)
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json; charset=utf-8")
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(body));
        }

        Ok(())
    }
}
