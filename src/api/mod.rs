pub mod callbacks;
pub mod payments;
pub mod status;

use crate::config::RelayConfig;
use crate::health::{HealthChecker, HealthStatus};
use crate::payments::factory::ProviderFactory;
use crate::services::reconciliation::ReconciliationEngine;
use crate::services::status::StatusService;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconciliationEngine>,
    pub status: Arc<StatusService>,
    pub factory: Arc<ProviderFactory>,
    pub config: Arc<RelayConfig>,
    pub health: HealthChecker,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/pay", post(payments::initiate_payment))
        .route("/api/callback", post(callbacks::handle_callback))
        .route("/api/status/{reference}", get(status::get_status))
        .with_state(state)
}

/// Service descriptor listing the available routes.
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "mpesa-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "routes": {
            "POST /api/pay": "initiate an STK push and wait for its outcome",
            "POST /api/callback": "provider webhook endpoint",
            "GET /api/status/{reference}": "poll the outcome of a payment",
            "GET /health": "liveness probe",
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.health.check_health().await)
}
