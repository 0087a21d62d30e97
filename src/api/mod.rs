//! HTTP API
//!
//! Caller identity always comes from the bearer session token, never from a
//! request body.

pub mod audit;
pub mod candidates;
pub mod vote;

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::audit::Auditor;
use crate::config::AppConfig;
use crate::database::Database;
use crate::identity::IdentityProvider;
use crate::ledger::Ledger;
use crate::voting::{CandidateRegistry, VoteCoordinator};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub identity: IdentityProvider,
    pub coordinator: VoteCoordinator,
    pub candidates: CandidateRegistry,
    pub auditor: Auditor,
}

impl AppState {
    pub fn new(config: AppConfig, database: Database) -> Self {
        let ledger = Ledger::new(database.clone(), config.election_id.clone());

        Self {
            identity: IdentityProvider::new(database.clone(), &config.auth),
            coordinator: VoteCoordinator::new(database.clone(), ledger),
            candidates: CandidateRegistry::new(database.clone()),
            auditor: Auditor::new(database),
            config: Arc::new(config),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        self.coordinator.ledger()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status_endpoint))
        .route("/vote", post(vote::submit_vote))
        .route("/vote/status", get(vote::vote_status))
        .route("/audit", get(audit::run_audit))
        .route("/candidates", get(candidates::list_candidates).post(candidates::create_candidate))
        .route("/candidates/:id", delete(candidates::delete_candidate))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "vote-ledger",
        "timestamp": chrono::Utc::now()
    }))
}

async fn status_endpoint(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut status = serde_json::json!({
        "status": "healthy",
        "service": "vote-ledger",
        "timestamp": chrono::Utc::now(),
        "election_id": state.config.election_id,
    });

    match (state.ledger().height().await, state.ledger().latest().await) {
        (Ok(height), Ok(tail)) => {
            status["ledger"] = serde_json::json!({
                "status": "initialized",
                "height": height,
                "last_block_hash": tail.hash,
            });
        }
        (Ok(_), Err(_)) => {
            status["ledger"] = serde_json::json!({ "status": "empty" });
        }
        _ => {
            status["ledger"] = serde_json::json!({ "status": "error" });
        }
    }

    Json(status)
}
