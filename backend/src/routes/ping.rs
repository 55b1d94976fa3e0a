use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
struct PingResponse {
    ping: &'static str,
    environment: String,
    testing: bool,
}

/// GET /ping - liveness check, no auth.
async fn ping(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    Json(PingResponse {
        ping: "pong!",
        environment: state.config.environment.clone(),
        testing: state.config.testing,
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/ping", get(ping)).with_state(state)
}
