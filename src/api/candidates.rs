use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde_json::Value;

use crate::api::AppState;
use crate::database::models::Candidate;
use crate::error::LedgerError;
use crate::voting::NewCandidate;

pub async fn list_candidates(
    State(state): State<AppState>,
) -> Result<Json<Vec<Candidate>>, LedgerError> {
    Ok(Json(state.candidates.list().await?))
}

pub async fn create_candidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Result<Json<NewCandidate>, JsonRejection>,
) -> Result<(StatusCode, Json<Candidate>), LedgerError> {
    let identity = state.identity.authenticate_headers(&headers).await?;
    let Json(request) = request?;
    let candidate = state.candidates.create(&identity, &request).await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

pub async fn delete_candidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(candidate_id): Path<i64>,
) -> Result<Json<Value>, LedgerError> {
    let identity = state.identity.authenticate_headers(&headers).await?;
    state.candidates.delete(&identity, candidate_id).await?;
    Ok(Json(serde_json::json!({ "deleted": candidate_id })))
}
