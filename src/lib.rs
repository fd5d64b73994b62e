//! isolator - webhook-triggered stem-separation relay
//!
//! Receives an authenticated webhook naming a remote audio source, acks
//! immediately, then asynchronously downloads the audio, separates it into
//! vocal/instrumental stems, uploads both to Dropbox, and reports the
//! outcome to a Slack thread.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use std::sync::Arc;

use crate::config::Config;
use crate::services::dropbox::DropboxClient;
use crate::services::fetcher::YtDlpFetcher;
use crate::services::pipeline::{DropboxPublisher, Pipeline, SlackNotifier};
use crate::services::separator::DemucsSeparator;
use crate::services::slack::SlackClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Read-only process configuration
    pub config: Arc<Config>,
    /// Stage sequencer driving each accepted job
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(config: Config, pipeline: Pipeline) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Wire the real external-tool and external-API stages.
pub fn production_state(config: Config) -> anyhow::Result<AppState> {
    let fetcher = YtDlpFetcher::new(config.cookies_file.clone());
    let separator = DemucsSeparator::default();
    let publisher = DropboxPublisher::new(
        DropboxClient::new(config.dropbox_token.clone())?,
        config.dropbox_folder.clone(),
    );
    let notifier = SlackNotifier::new(SlackClient::new(config.slack_bot_token.clone())?);

    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        Arc::new(separator),
        Arc::new(publisher),
        Arc::new(notifier),
    );

    Ok(AppState::new(config, pipeline))
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::intake_routes())
        .merge(api::health_routes())
        .with_state(state)
}
