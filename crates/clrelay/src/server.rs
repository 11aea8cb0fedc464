use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clrelay_relay::{handle, RelayState};
use serde_json::Value;
use tokio::net::TcpListener;

pub const HEALTH_PATH: &str = "/health";
pub const FETCH_PATH: &str = "/fetch/v1.0.0";

/// Routes served by the relay. `/health` answers before schemas load.
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(FETCH_PATH, post(fetch))
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<RelayState>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> &'static str {
    "ok"
}

// Raw bytes so malformed JSON gets the relay's own error body.
async fn fetch(State(state): State<Arc<RelayState>>, body: Bytes) -> (StatusCode, Json<Value>) {
    let reply = handle(&state, &body).await;
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(reply.body))
}
