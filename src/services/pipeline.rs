//! Pipeline controller
//!
//! Drives one job through fetch → separate → publish(×2) → notify, entirely
//! after the HTTP ack has been returned. Stage failures are caught exactly
//! once here and become a single failure notification; nothing after the ack
//! can reach the HTTP caller or crash the process.
//!
//! Stages sit behind traits so the sequencing and failure handling are
//! testable without the external tools.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::services::dropbox::{
    artifact_stamp, remote_file_name, DropboxClient, PublishError,
};
use crate::services::fetcher::{FetchError, YtDlpFetcher};
use crate::services::separator::{DemucsSeparator, SeparatedStems, SeparationError};
use crate::services::slack::{Notification, NotifyError, SlackClient};
use crate::types::{JobContext, NotifyTarget, StemArtifact, StemKind};

/// Retrieves one remote URL into a local audio file.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf, FetchError>;
}

/// Splits one local audio file into vocal and instrumental tracks.
#[async_trait]
pub trait StemSeparator: Send + Sync {
    async fn separate(
        &self,
        input: &Path,
        out_root: &Path,
    ) -> Result<SeparatedStems, SeparationError>;
}

/// Places one local file remotely and returns its direct-download link.
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    async fn publish(&self, local: &Path, remote_name: &str) -> Result<String, PublishError>;
}

/// Posts a terminal status message. Callers treat failures as log-only.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        target: &NotifyTarget,
        notification: &Notification,
    ) -> Result<(), NotifyError>;
}

#[async_trait]
impl SourceFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf, FetchError> {
        YtDlpFetcher::fetch(self, url, dest).await
    }
}

#[async_trait]
impl StemSeparator for DemucsSeparator {
    async fn separate(
        &self,
        input: &Path,
        out_root: &Path,
    ) -> Result<SeparatedStems, SeparationError> {
        DemucsSeparator::separate(self, input, out_root).await
    }
}

/// Dropbox-backed publisher: prefixes the configured namespace folder onto
/// each artifact name.
pub struct DropboxPublisher {
    client: DropboxClient,
    folder: String,
}

impl DropboxPublisher {
    pub fn new(client: DropboxClient, folder: String) -> Self {
        Self { client, folder }
    }
}

#[async_trait]
impl ArtifactPublisher for DropboxPublisher {
    async fn publish(&self, local: &Path, remote_name: &str) -> Result<String, PublishError> {
        let remote_path = format!("{}/{}", self.folder, remote_name);
        self.client.upload(local, &remote_path).await?;
        self.client.direct_link(&remote_path).await
    }
}

/// Slack-backed notifier.
pub struct SlackNotifier {
    client: SlackClient,
}

impl SlackNotifier {
    pub fn new(client: SlackClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(
        &self,
        target: &NotifyTarget,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        self.client.post(target, notification).await
    }
}

/// Sequences the stages for every accepted job.
pub struct Pipeline {
    fetcher: Arc<dyn SourceFetcher>,
    separator: Arc<dyn StemSeparator>,
    publisher: Arc<dyn ArtifactPublisher>,
    notifier: Arc<dyn Notifier>,
    scratch_root: PathBuf,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        separator: Arc<dyn StemSeparator>,
        publisher: Arc<dyn ArtifactPublisher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            fetcher,
            separator,
            publisher,
            notifier,
            scratch_root: std::env::temp_dir(),
        }
    }

    pub fn with_scratch_root(mut self, root: PathBuf) -> Self {
        self.scratch_root = root;
        self
    }

    /// Run one job to a terminal state. Never returns an error: every
    /// failure ends in (at most) a failure notification and a cleaned-up
    /// scratch directory.
    pub async fn run(&self, job: JobContext) {
        let scratch = self.scratch_root.join(format!("isolator-{}", job.job_id));
        info!(job_id = %job.job_id, url = %job.url, scratch = %scratch.display(), "Pipeline starting");

        let outcome = self.run_stages(&job, &scratch).await;

        if scratch.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
                warn!(job_id = %job.job_id, error = %e, "Scratch cleanup failed");
            }
        }

        match outcome {
            Ok((vocals, instrumental)) => {
                info!(
                    job_id = %job.job_id,
                    vocals = %vocals.direct_link,
                    instrumental = %instrumental.direct_link,
                    "Pipeline complete"
                );
                self.best_effort_notify(
                    &job,
                    &Notification::Success {
                        vocals,
                        instrumental,
                    },
                )
                .await;
            }
            Err(e) => {
                error!(job_id = %job.job_id, error = %e, "Pipeline failed");
                self.best_effort_notify(
                    &job,
                    &Notification::Failure {
                        summary: e.to_string(),
                    },
                )
                .await;
            }
        }
    }

    async fn run_stages(
        &self,
        job: &JobContext,
        scratch: &Path,
    ) -> Result<(StemArtifact, StemArtifact), PipelineError> {
        tokio::fs::create_dir_all(scratch).await?;

        let source = scratch.join("source.m4a");
        let audio = self.fetcher.fetch(&job.url, &source).await?;

        let out_root = scratch.join("out");
        let stems = self.separator.separate(&audio, &out_root).await?;

        let stamp = artifact_stamp();
        let vocals = self
            .publish_one(job, StemKind::Vocals, stems.vocals, &stamp)
            .await?;
        let instrumental = self
            .publish_one(job, StemKind::Instrumental, stems.instrumental, &stamp)
            .await?;

        Ok((vocals, instrumental))
    }

    async fn publish_one(
        &self,
        job: &JobContext,
        kind: StemKind,
        local_path: PathBuf,
        stamp: &str,
    ) -> Result<StemArtifact, PipelineError> {
        let remote_name = remote_file_name(job.title.as_deref(), stamp, kind.suffix());
        let direct_link = self.publisher.publish(&local_path, &remote_name).await?;
        Ok(StemArtifact {
            kind,
            local_path,
            remote_name,
            direct_link,
        })
    }

    /// Fire-and-forget: a notifier failure is logged and otherwise invisible
    /// to the pipeline outcome.
    async fn best_effort_notify(&self, job: &JobContext, notification: &Notification) {
        let Some(target) = &job.notify else {
            return;
        };
        if let Err(e) = self.notifier.notify(target, notification).await {
            warn!(job_id = %job.job_id, error = %e, "Notification failed (ignored)");
        }
    }
}
