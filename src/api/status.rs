use crate::middleware::error::{get_request_id_from_headers, json_error_response, ErrorResponse};
use crate::services::status::StatusPayload;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::AppState;

/// GET /api/status/{reference}
///
/// Read-only polling endpoint; 202 while the outcome is not yet terminal.
pub async fn get_status(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    headers: axum::http::HeaderMap,
) -> Result<(StatusCode, Json<StatusPayload>), (StatusCode, Json<ErrorResponse>)> {
    let request_id = get_request_id_from_headers(&headers);

    let payload = state.status.get_status(&reference).await.map_err(|e| {
        json_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.user_message(),
            request_id,
        )
    })?;

    let code = if payload.is_terminal() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((code, Json(payload)))
}
