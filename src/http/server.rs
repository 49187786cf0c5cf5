//! Queue API router and HTTP server
//!
//! Endpoints: `GET /queue` (status), `POST /queue/join`, `DELETE /queue`
//! (leave), plus `/health` and `/metrics` for monitoring.

use crate::clients::identity::IdentityClient;
use crate::error::{MatchingError, Result};
use crate::http::auth::AuthedUser;
use crate::matching::MatchEngine;
use crate::metrics::MetricsCollector;
use crate::queue::store::QueueStore;
use crate::service::health::HealthCheck;
use crate::types::{JoinOutcome, QueueStatus, RawMatchRequest};
use crate::utils::generate_request_id;
use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Shared state for the queue API
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<MatchEngine>,
    pub identity: Arc<dyn IdentityClient>,
    pub store: Arc<dyn QueueStore>,
    pub metrics: Arc<MetricsCollector>,
    pub service_name: String,
}

/// Build the `{status, message, data}` envelope every queue response uses
pub fn envelope(status: StatusCode, message: &str, data: Option<Value>) -> Response {
    (
        status,
        Json(json!({
            "status": status.as_u16(),
            "message": message,
            "data": data,
        })),
    )
        .into_response()
}

/// Map an engine failure onto the envelope, passing downstream statuses
/// through verbatim
fn error_response(error: anyhow::Error) -> Response {
    match error.downcast_ref::<MatchingError>() {
        Some(matching) => {
            let status = StatusCode::from_u16(matching.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            envelope(status, &matching.to_string(), None)
        }
        None => {
            warn!("Unhandled internal error: {:#}", error);
            envelope(StatusCode::INTERNAL_SERVER_ERROR, "Server Error", None)
        }
    }
}

/// Merge raw preferences from the query string and an optional JSON body.
/// Body fields win; the query fills whatever the body leaves out.
fn merge_raw(pairs: &[(String, String)], body: Option<&Value>) -> RawMatchRequest {
    let mut raw = body.map(RawMatchRequest::from_value).unwrap_or_default();

    let mut query_categories: Vec<String> = Vec::new();
    for (key, value) in pairs {
        match key.as_str() {
            "complexity" if raw.complexity.is_none() => {
                raw.complexity = Some(value.clone());
            }
            "language" if raw.language.is_none() => {
                raw.language = Some(value.clone());
            }
            "categories" | "categories[]" => query_categories.push(value.clone()),
            _ => {}
        }
    }
    if raw.categories.is_none() && !query_categories.is_empty() {
        raw.categories = Some(query_categories);
    }

    raw
}

/// Create the axum router with all endpoints
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/queue", get(status_handler).delete(leave_handler))
        .route("/queue/join", axum::routing::post(join_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn status_handler(State(state): State<ApiState>, user: AuthedUser) -> Response {
    match state.engine.status(&user.user_id, &user.session_token).await {
        Ok(QueueStatus::Queued(entry)) => {
            let data = serde_json::to_value(&entry).ok();
            envelope(StatusCode::OK, "In Queue!", data)
        }
        Ok(QueueStatus::Roomed(room)) => {
            envelope(StatusCode::SEE_OTHER, "In room!", Some(room))
        }
        Ok(QueueStatus::NotQueued {
            complexities,
            categories,
            languages,
        }) => envelope(
            StatusCode::NOT_FOUND,
            "Not in room or queue",
            Some(json!({
                "complexity": complexities,
                "categories": categories,
                "language": languages,
            })),
        ),
        Err(e) => error_response(e),
    }
}

async fn join_handler(
    State(state): State<ApiState>,
    Query(pairs): Query<Vec<(String, String)>>,
    user: AuthedUser,
    body: Option<Json<Value>>,
) -> Response {
    let request_id = generate_request_id();
    debug!(
        "Join request {} from user {} ({} query params)",
        request_id,
        user.user_id,
        pairs.len()
    );

    let raw = merge_raw(&pairs, body.as_deref());

    match state.engine.join(&user.user_id, &user.session_token, raw).await {
        Ok(JoinOutcome::Queued(entry)) => envelope(
            StatusCode::OK,
            "Joined Queue!",
            Some(json!({
                "complexity": entry.complexity,
                "categories": entry.categories,
                "language": entry.language,
                "expireAt": entry.expires_at,
            })),
        ),
        Ok(JoinOutcome::RoomCreated(room)) => {
            let data = serde_json::to_value(&room).ok();
            envelope(StatusCode::OK, "Room Created", data)
        }
        Ok(JoinOutcome::AlreadyQueued(entry)) => {
            let data = serde_json::to_value(&entry).ok();
            envelope(StatusCode::CONFLICT, "In Queue!", data)
        }
        Ok(JoinOutcome::AlreadyRoomed(room)) => {
            envelope(StatusCode::SEE_OTHER, "In room!", Some(room))
        }
        Err(e) => error_response(e),
    }
}

async fn leave_handler(State(state): State<ApiState>, user: AuthedUser) -> Response {
    match state.engine.leave(&user.user_id).await {
        Ok(_) => envelope(
            StatusCode::OK,
            "Received command to remove user from queue",
            None,
        ),
        Err(e) => error_response(e),
    }
}

async fn health_handler(State(state): State<ApiState>) -> Response {
    let health = HealthCheck::check(&state.store, &state.metrics, &state.service_name).await;
    let status = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health)).into_response()
}

async fn metrics_handler(State(state): State<ApiState>) -> Response {
    match state.metrics.gather() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            warn!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// HTTP server wrapping the router with graceful shutdown
pub struct HttpServer {
    host: String,
    port: u16,
    state: ApiState,
    shutdown_tx: broadcast::Sender<()>,
}

impl HttpServer {
    pub fn new(host: String, port: u16, state: ApiState) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            host,
            port,
            state,
            shutdown_tx,
        }
    }

    /// Bind and serve until `stop` is called
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .context("Invalid bind address")?;

        let app = create_router(self.state.clone());
        let listener = TcpListener::bind(addr).await?;

        info!("Queue API listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server shutdown signal received");
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Signal the server to stop accepting requests and drain
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
