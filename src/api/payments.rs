use crate::middleware::error::{get_request_id_from_headers, json_error_response, ErrorResponse};
use crate::payments::factory::route_for_reference;
use crate::payments::reference;
use crate::payments::types::{validate_amount, RelayStatus, StkPushRequest};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub phone: String,
    pub amount: serde_json::Number,
    pub reference: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PayResponse {
    pub status: RelayStatus,
    pub message: String,
    pub external_reference: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_transaction_id: Option<String>,
}

/// POST /api/pay
///
/// Synchronous relay: the connection is held open until the provider's
/// callback or the reconciliation timeout resolves it. The response this
/// handler returns is produced by a different, later inbound request (the
/// webhook) or by the engine's timer.
pub async fn initiate_payment(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(payload): Json<PayRequest>,
) -> Result<(StatusCode, Json<PayResponse>), (StatusCode, Json<ErrorResponse>)> {
    let request_id = get_request_id_from_headers(&headers);

    if payload.reference.trim().is_empty() {
        return Err(json_error_response(
            StatusCode::BAD_REQUEST,
            "reference is required",
            request_id,
        ));
    }
    if payload.phone.trim().is_empty() {
        return Err(json_error_response(
            StatusCode::BAD_REQUEST,
            "phone is required",
            request_id,
        ));
    }
    let amount = payload.amount.to_string();
    if let Err(e) = validate_amount(&amount, "amount") {
        return Err(json_error_response(
            StatusCode::BAD_REQUEST,
            e.user_message(),
            request_id,
        ));
    }

    let gateway = route_for_reference(&payload.reference);
    let provider = state.factory.get(gateway);
    let request = StkPushRequest {
        phone: payload.phone.clone(),
        amount,
        external_reference: reference::generate(&payload.reference),
        caller_reference: payload.reference.clone(),
        callback_url: state.config.callback_url(),
        user_id: payload.user_id.clone(),
    };

    info!(
        external_reference = %request.external_reference,
        gateway = %gateway,
        "initiating STK push"
    );

    // Register before the outbound call so a fast callback always finds
    // the pending entry.
    let receiver = state.engine.register(&request, gateway).map_err(|e| {
        json_error_response(
            StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            e.user_message(),
            request_id.clone(),
        )
    })?;

    let initiation = match provider.initiate_stk_push(&request).await {
        Ok(response) => response,
        Err(e) => {
            state.engine.abandon(&request.external_reference);
            error!(
                external_reference = %request.external_reference,
                error = %e,
                "STK push initiation failed"
            );
            return Err(json_error_response(
                StatusCode::from_u16(e.http_status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.user_message(),
                request_id,
            ));
        }
    };

    // Hold the connection; the reconciliation engine guarantees the
    // receiver completes with callback outcome or timeout.
    let outcome = match receiver.await {
        Ok(outcome) => outcome,
        Err(_) => {
            // Only reachable if the pending entry was dropped without
            // resolution, which the engine does not do.
            error!(
                external_reference = %request.external_reference,
                "pending request dropped without resolution"
            );
            return Err(json_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "payment state lost; check status endpoint",
                request_id,
            ));
        }
    };

    let code = match outcome.status {
        RelayStatus::Success => StatusCode::OK,
        RelayStatus::Failed => StatusCode::PAYMENT_REQUIRED,
        RelayStatus::Timeout => StatusCode::GATEWAY_TIMEOUT,
    };
    Ok((
        code,
        Json(PayResponse {
            status: outcome.status,
            message: outcome.message,
            external_reference: request.external_reference,
            provider: gateway.to_string(),
            provider_reference: initiation.provider_reference,
            provider_transaction_id: outcome.provider_transaction_id,
        }),
    ))
}
