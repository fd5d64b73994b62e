//! Webhook intake endpoint
//!
//! Authenticates against the raw body bytes, acks immediately, then spawns
//! the pipeline continuation. No stage result ever flows back into the HTTP
//! response; post-ack outcomes surface only through the notifier.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use tracing::{info, warn};

use crate::auth;
use crate::error::{ApiError, ApiResult};
use crate::types::{AckResponse, IntakeRequest, JobContext, NotifyTarget};
use crate::AppState;

/// POST /
///
/// Raw `Bytes` body: the HMAC path must see the exact bytes on the wire, not
/// a re-serialization.
pub async fn intake(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<AckResponse>> {
    if !auth::authorize(&headers, &body, &state.config.processor_token) {
        warn!("Rejected unauthenticated intake request");
        return Err(ApiError::Unauthorized);
    }

    let request: IntakeRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid intake body: {}", e)))?;

    info!(
        mode = request.mode.as_deref().unwrap_or("-"),
        url = request.url.as_deref().unwrap_or("-"),
        title = request.title.as_deref().unwrap_or("-"),
        "Intake accepted"
    );

    let ack = AckResponse {
        ok: true,
        intake: true,
        mode: request.mode.clone(),
        url: request.url.clone(),
        title: request.title.clone(),
    };

    // Missing url: ack and stop. Silent no-op, no notification.
    let Some(url) = request.url.filter(|u| !u.is_empty()) else {
        return Ok(Json(ack));
    };

    let notify = NotifyTarget::from_parts(request.channel, request.thread_ts);
    let job = JobContext::new(url, request.title, notify);
    let pipeline = state.pipeline.clone();
    let job_id = job.job_id;
    tokio::spawn(async move {
        info!(job_id = %job_id, "Background pipeline task started");
        pipeline.run(job).await;
    });

    Ok(Json(ack))
}

pub fn intake_routes() -> Router<AppState> {
    Router::new().route("/", post(intake))
}
