//! Shared mock stages for pipeline and API tests

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use isolator::services::dropbox::PublishError;
use isolator::services::fetcher::FetchError;
use isolator::services::pipeline::{
    ArtifactPublisher, Notifier, Pipeline, SourceFetcher, StemSeparator,
};
use isolator::services::separator::{SeparatedStems, SeparationError};
use isolator::services::slack::{Notification, NotifyError};
use isolator::types::NotifyTarget;

#[derive(Default)]
pub struct MockFetcher {
    pub calls: AtomicUsize,
    pub fail: bool,
}

#[async_trait]
impl SourceFetcher for MockFetcher {
    async fn fetch(&self, _url: &str, dest: &Path) -> Result<PathBuf, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FetchError::ToolFailed("simulated download failure".into()));
        }
        Ok(dest.to_path_buf())
    }
}

#[derive(Default)]
pub struct MockSeparator {
    pub calls: AtomicUsize,
    pub fail: bool,
}

#[async_trait]
impl StemSeparator for MockSeparator {
    async fn separate(
        &self,
        _input: &Path,
        out_root: &Path,
    ) -> Result<SeparatedStems, SeparationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SeparationError::ToolFailed("simulated tool crash".into()));
        }
        Ok(SeparatedStems {
            vocals: out_root.join("vocals.wav"),
            instrumental: out_root.join("no_vocals.wav"),
        })
    }
}

#[derive(Default)]
pub struct MockPublisher {
    pub calls: AtomicUsize,
    pub published_names: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl ArtifactPublisher for MockPublisher {
    async fn publish(&self, _local: &Path, remote_name: &str) -> Result<String, PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PublishError::UploadFailed("simulated upload failure".into()));
        }
        self.published_names
            .lock()
            .unwrap()
            .push(remote_name.to_string());
        Ok(format!("https://dropbox.example/s/{}?dl=1", remote_name))
    }
}

pub struct MockNotifier {
    pub calls: AtomicUsize,
    pub received: Mutex<Vec<(NotifyTarget, Notification)>>,
    pub fail: bool,
    tx: Mutex<Option<mpsc::UnboundedSender<()>>>,
}

impl MockNotifier {
    pub fn new(fail: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = Arc::new(Self {
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
            fail,
            tx: Mutex::new(Some(tx)),
        });
        (notifier, rx)
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(
        &self,
        target: &NotifyTarget,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received
            .lock()
            .unwrap()
            .push((target.clone(), notification.clone()));
        if let Some(tx) = self.tx.lock().unwrap().as_ref() {
            let _ = tx.send(());
        }
        if self.fail {
            return Err(NotifyError::Rejected("simulated slack outage".into()));
        }
        Ok(())
    }
}

/// Everything a test needs to drive the pipeline and inspect what happened.
pub struct Harness {
    pub fetcher: Arc<MockFetcher>,
    pub separator: Arc<MockSeparator>,
    pub publisher: Arc<MockPublisher>,
    pub notifier: Arc<MockNotifier>,
    pub notified: mpsc::UnboundedReceiver<()>,
    pub pipeline: Pipeline,
    pub scratch: tempfile::TempDir,
}

pub struct HarnessOptions {
    pub fetch_fails: bool,
    pub separation_fails: bool,
    pub publish_fails: bool,
    pub notify_fails: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            fetch_fails: false,
            separation_fails: false,
            publish_fails: false,
            notify_fails: false,
        }
    }
}

pub fn harness(options: HarnessOptions) -> Harness {
    let fetcher = Arc::new(MockFetcher {
        calls: AtomicUsize::new(0),
        fail: options.fetch_fails,
    });
    let separator = Arc::new(MockSeparator {
        calls: AtomicUsize::new(0),
        fail: options.separation_fails,
    });
    let publisher = Arc::new(MockPublisher {
        calls: AtomicUsize::new(0),
        published_names: Mutex::new(Vec::new()),
        fail: options.publish_fails,
    });
    let (notifier, notified) = MockNotifier::new(options.notify_fails);

    let scratch = tempfile::tempdir().expect("create scratch root");
    let pipeline = Pipeline::new(
        fetcher.clone(),
        separator.clone(),
        publisher.clone(),
        notifier.clone(),
    )
    .with_scratch_root(scratch.path().to_path_buf());

    Harness {
        fetcher,
        separator,
        publisher,
        notifier,
        notified,
        pipeline,
        scratch,
    }
}
