use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use crate::api::AppState;

/// `200` for a secure or empty ledger, `409` when compromised.
pub async fn run_audit(State(state): State<AppState>) -> Response {
    match state.auditor.audit().await {
        Ok(report) => {
            let status = if report.is_compromised() {
                StatusCode::CONFLICT
            } else {
                StatusCode::OK
            };
            (status, Json(report)).into_response()
        }
        Err(e) => {
            error!("Audit failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "ERROR",
                    "error": e.error_code(),
                    "message": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
