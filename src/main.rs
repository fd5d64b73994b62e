//! isolator - webhook-triggered stem-separation relay service

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use isolator::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting isolator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let port = config.port;

    let state = isolator::production_state(config)?;
    let app = isolator::build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on http://0.0.0.0:{}", port);
    info!("Health check: http://0.0.0.0:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
