use crate::payments::types::NormalizedCallback;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use super::AppState;

/// POST /api/callback
///
/// Always answers 200, malformed input included: a non-2xx here would make
/// the provider retry indefinitely. Malformed bodies are still persisted
/// verbatim for manual inspection.
pub async fn handle_callback(State(state): State<AppState>, body: String) -> impl IntoResponse {
    info!(bytes = body.len(), "received payment callback");

    let normalized = match serde_json::from_str::<JsonValue>(&body) {
        Ok(payload) => state.factory.for_callback(&payload).normalize_callback(&payload),
        Err(e) => {
            warn!(error = %e, "callback body is not valid JSON");
            NormalizedCallback::unrecognized(JsonValue::String(body))
        }
    };

    state.engine.handle_callback(normalized).await;

    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}
