use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::AppState;
use crate::error::LedgerError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub candidate_id: Option<i64>,
    /// Informational; the ledger records the stored candidate name.
    pub candidate_name: Option<String>,
}

pub async fn submit_vote(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<Value>, LedgerError> {
    let identity = state.identity.authenticate_headers(&headers).await?;
    let Json(request) = request?;

    let candidate_id = request
        .candidate_id
        .ok_or_else(|| LedgerError::InvalidRequest("candidateId is required".to_string()))?;

    info!("Vote submission from {} for candidate {}", identity.user_id, candidate_id);
    let receipt = state.coordinator.submit_vote(&identity, candidate_id).await?;

    if let Some(name) = request.candidate_name.as_deref() {
        if name != receipt.candidate_name {
            debug!(
                "Request named candidate {} as {:?}, recorded {:?}",
                candidate_id, name, receipt.candidate_name
            );
        }
    }

    Ok(Json(serde_json::json!({
        "message": "Vote recorded on the ledger",
        "blockHash": receipt.block_hash,
        "blockIndex": receipt.block_index,
    })))
}

pub async fn vote_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, LedgerError> {
    let identity = state.identity.authenticate_headers(&headers).await?;
    let vote = state.coordinator.vote_status(&identity).await?;

    Ok(Json(serde_json::json!({
        "userId": identity.user_id,
        "role": identity.role,
        "hasVoted": vote.is_some(),
        "candidateId": vote.map(|v| v.candidate_id),
    })))
}
