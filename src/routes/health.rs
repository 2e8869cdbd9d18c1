use axum::extract::State;
use axum::{
    Json, Router,
    routing::get,
};
use http::StatusCode;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    info!("GET /health - Health check");
    match state.storage.store() {
        Ok(store) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "backend": store.backend_name() })),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "storage": state.storage.state().to_string(),
                })),
            )
        }
    }
}
