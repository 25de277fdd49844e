//! Message Relay Service
//!
//! HTTP front for a [`MessageStore`]:
//!
//! | Route | Body | Reply |
//! |---|---|---|
//! | `POST /v1/msg` | [`PutRequest`] | `200`, or `409` if the address is taken |
//! | `POST /v1/msg/take` | [`TakeRequest`] | [`TakeResponse`], or `404` until the message arrives |
//! | `GET /health` | | service status |

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use msg_relay::wire::{ErrorResponse, PutRequest, TakeRequest, TakeResponse};
use msg_relay::{MessageStore, RelayError};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Application state
pub struct AppState {
    pub store: MessageStore,
}

impl AppState {
    pub fn new(store: MessageStore) -> Arc<Self> {
        Arc::new(Self { store })
    }
}

/// All relay routes over shared state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/msg", post(put_message))
        .route("/v1/msg/take", post(take_message))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the relay on an already bound listener
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

/// Sweep expired messages every `period` until the task is dropped
pub fn spawn_cleanup(store: MessageStore, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let removed = store.cleanup();
            if removed > 0 {
                info!(removed, remaining = store.len(), "Expired messages removed");
            }
        }
    })
}

fn error(status: StatusCode, e: impl ToString) -> Response {
    let body = ErrorResponse {
        error: e.to_string(),
    };
    (status, Json(body)).into_response()
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "msg-relay-svc",
        "version": env!("CARGO_PKG_VERSION"),
        "messages": state.store.len(),
    }))
}

async fn put_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PutRequest>,
) -> Response {
    let payload = match req.payload() {
        Ok(p) => p,
        Err(e) => return error(StatusCode::BAD_REQUEST, e),
    };
    let size = payload.len();

    match state.store.put(req.id.clone(), payload) {
        Ok(()) => {
            debug!(id = %req.id, size, "Message stored");
            StatusCode::OK.into_response()
        }
        Err(e @ RelayError::Duplicate(_)) => {
            warn!(id = %req.id, "Duplicate message rejected");
            error(StatusCode::CONFLICT, e)
        }
        Err(e) => error(StatusCode::BAD_REQUEST, e),
    }
}

async fn take_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TakeRequest>,
) -> Response {
    match state.store.take(&req.id) {
        Ok(payload) => {
            debug!(id = %req.id, size = payload.len(), "Message taken");
            Json(TakeResponse::new(&payload)).into_response()
        }
        Err(e) => error(StatusCode::NOT_FOUND, e),
    }
}
