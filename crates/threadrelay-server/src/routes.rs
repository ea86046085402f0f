use std::any::Any;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::relay::{Relay, RelayError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

/// `POST /sendMessage` body.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// Error body returned with HTTP 500.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            thread_id: self.thread_id().map(str::to_string),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Build the application router.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/sendMessage", post(send_message))
        .route("/health", get(health))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// `POST /sendMessage`: relay one chat message and return the reply.
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected sendMessage body");
            return RelayError::Internal(rejection.body_text()).into_response();
        }
    };

    info!(
        message_len = request.message.len(),
        thread_id = ?request.thread_id,
        "Received message"
    );

    match state
        .relay
        .handle(&request.message, request.thread_id.as_deref())
        .await
    {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            error!(error = %e, thread_id = ?e.thread_id(), "sendMessage failed");
            e.into_response()
        }
    }
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

/// Turn a handler panic into the same JSON error shape as other failures.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("handler panicked");
    error!(detail, "Handler panicked");
    RelayError::Internal(detail.to_string()).into_response()
}
