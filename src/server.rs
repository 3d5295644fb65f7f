use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, info, info_span};

use crate::{
    dispatch::{Dispatcher, Outcome},
    notify::Notify,
};

/// GitHub caps webhook deliveries at 25 MB.
pub const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

pub struct AppState<N> {
    pub dispatcher: Dispatcher<N>,
}

/// Body returned for every webhook delivery; the HTTP status is always 200.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Outcome> for WebhookResponse {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => Self {
                status: "success",
                reason: None,
                error: None,
            },
            Outcome::Ignored(reason) => Self {
                status: "ignored",
                reason: Some(reason.to_string()),
                error: None,
            },
            Outcome::Error(err) => Self {
                status: "error",
                reason: None,
                error: Some(err.to_string()),
            },
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn handle_webhook<N: Notify>(
    State(state): State<Arc<AppState<N>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookResponse> {
    let event_type = header(&headers, "x-github-event").unwrap_or("unknown");
    let delivery = header(&headers, "x-github-delivery").unwrap_or("-");

    info!("Received {} event", event_type);

    let outcome = state
        .dispatcher
        .handle(event_type, &body)
        .instrument(info_span!("delivery", id = delivery, event = event_type))
        .await;

    Json(outcome.into())
}

async fn health_check<N: Notify>(State(state): State<Arc<AppState<N>>>) -> Json<serde_json::Value> {
    let snapshot = state.dispatcher.config().current();
    Json(serde_json::json!({
        "status": "healthy",
        "service": "hookrelay",
        "version": env!("CARGO_PKG_VERSION"),
        "config_loaded_at": snapshot.loaded_at.to_rfc3339(),
        "groups": snapshot.config.destinations.groups.len(),
    }))
}

async fn service_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "GitHub to chat webhook relay",
        "endpoints": {
            "webhook": "/webhook",
            "webhook_github": "/webhook/github",
            "health": "/health",
            "info": "/"
        },
        "supported_events": [
            "push",
            "pull_request"
        ]
    }))
}

pub fn router<N: Notify>(state: Arc<AppState<N>>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check::<N>))
        .route("/webhook", post(handle_webhook::<N>))
        .route("/webhook/github", post(handle_webhook::<N>))
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
