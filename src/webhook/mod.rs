//! Webhook ingress.
//!
//! One `POST /` route accepts GitHub deliveries; `GET /` is a health
//! probe. Signature verification runs against the raw body before
//! anything is parsed. Every policy outcome answers 200 with an
//! `{"action": ...}` body; non-200 responses are reserved for
//! transport problems so GitHub's redelivery only fires when a retry
//! could actually help.

pub mod event;
pub mod signature;

use crate::bot::MergeBot;
use crate::error::Error;
use crate::types::{EventKind, Outcome};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use signature::{SignatureRejection, WebhookSecret};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Shared router state
#[derive(Clone)]
pub struct AppState {
    /// The decision pipeline
    pub bot: Arc<MergeBot>,
    /// Webhook signing secret
    pub secret: Arc<WebhookSecret>,
}

/// Build the router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health).post(deliver))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Why a delivery was turned away before (or while) processing
enum Rejection {
    ContentType,
    Signature(SignatureRejection),
    UnknownEvent(String),
    Payload(String),
    Internal(Error),
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::ContentType => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "expected application/json".to_string(),
            ),
            Self::Signature(SignatureRejection::MissingHeader) => (
                StatusCode::UNAUTHORIZED,
                SignatureRejection::MissingHeader.to_string(),
            ),
            Self::Signature(rejection) => (StatusCode::FORBIDDEN, rejection.to_string()),
            Self::UnknownEvent(name) => {
                (StatusCode::NOT_FOUND, format!("unknown event {name}"))
            }
            Self::Payload(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(e) => {
                error!(error = %e, "delivery processing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn outcome_response(outcome: Outcome) -> Response {
    (StatusCode::OK, Json(json!({ "action": outcome.as_action() }))).into_response()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        // parameters after ';' are tolerated
        .is_some_and(|v| v.split(';').next().unwrap_or("").trim() == "application/json")
}

async fn deliver(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Rejection> {
    if !is_json(&headers) {
        return Err(Rejection::ContentType);
    }

    let signature = headers
        .get("X-Hub-Signature")
        .and_then(|v| v.to_str().ok());
    state
        .secret
        .verify(&body, signature)
        .map_err(Rejection::Signature)?;

    let event_name = headers
        .get("X-Github-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let event = match event_name {
        "issue_comment" => event::parse_issue_comment(&body),
        "pull_request_review" => event::parse_review(&body),
        "pull_request_review_comment" => event::parse_review_comment(&body),
        "check_run" => event::parse_check_run(&body),
        other => return Err(Rejection::UnknownEvent(other.to_string())),
    }
    .map_err(|e| Rejection::Payload(e.to_string()))?;

    debug!(event = event_name, repo = %event.repo_name, "delivery accepted");

    let outcome = match event.kind {
        EventKind::CheckRun => state.bot.handle_check_run(&event).await,
        _ => state.bot.handle_comment(&event).await,
    }
    .map_err(Rejection::Internal)?;

    info!(event = event_name, outcome = %outcome, "delivery handled");
    Ok(outcome_response(outcome))
}
