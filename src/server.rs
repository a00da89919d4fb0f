//! HTTP intake: a single endpoint that appends requests to the queue.
//!
//! The server shares nothing with the worker except the queue file, so
//! both can run as separate processes against the same directory.

use crate::queue::{Request, RequestQueue};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
    queue_file: Arc<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct EnqueueBody {
    title: String,
    description: String,
}

#[derive(Debug, Serialize)]
struct EnqueueResponse {
    queued: usize,
}

pub fn router(queue_file: PathBuf) -> Router {
    Router::new()
        .route("/request", post(enqueue_request))
        .with_state(AppState {
            queue_file: Arc::new(queue_file),
        })
}

async fn enqueue_request(
    State(state): State<AppState>,
    Json(body): Json<EnqueueBody>,
) -> Result<(StatusCode, Json<EnqueueResponse>), (StatusCode, String)> {
    if body.title.trim().is_empty() || body.description.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "title and description must be non-empty".to_string(),
        ));
    }

    let queue = RequestQueue::new(&state.queue_file);
    queue
        .enqueue(Request::new(body.title.trim(), body.description.trim()))
        .map_err(|err| {
            error!(%err, "Failed to enqueue request");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        })?;

    let queued = queue.len().unwrap_or(0);
    info!(queued, "Request accepted");
    Ok((StatusCode::ACCEPTED, Json(EnqueueResponse { queued })))
}

/// Bind and serve until the process exits.
pub async fn serve(port: u16, queue_file: PathBuf) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    info!(port, queue = %queue_file.display(), "Intake server listening");
    axum::serve(listener, router(queue_file))
        .await
        .context("Intake server failed")?;
    Ok(())
}
