//! Vote Transaction Coordinator
//!
//! Validates a vote against the business rules, then appends the block,
//! inserts the vote row and increments the tally inside one store
//! transaction opened by the ledger's append lock.

use serde::Serialize;
use tracing::{info, warn};

use crate::database::models::VoteRecord;
use crate::database::queries::Queries;
use crate::database::Database;
use crate::error::LedgerError;
use crate::identity::Identity;
use crate::ledger::{Ledger, VotePayload};

/// Returned to the caller once a vote is committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub block_hash: String,
    pub block_index: u64,
    pub candidate_id: i64,
    pub candidate_name: String,
}

#[derive(Clone, Debug)]
pub struct VoteCoordinator {
    database: Database,
    ledger: Ledger,
}

impl VoteCoordinator {
    pub fn new(database: Database, ledger: Ledger) -> Self {
        Self { database, ledger }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Record one vote for `identity`.
    ///
    /// A retryable store failure re-runs the whole submission once. The
    /// re-run repeats every check, so a lost uniqueness race comes back as
    /// `AlreadyVoted`.
    pub async fn submit_vote(
        &self,
        identity: &Identity,
        candidate_id: i64,
    ) -> Result<VoteReceipt, LedgerError> {
        match self.try_submit(identity, candidate_id).await {
            Err(e) if e.is_retryable() => {
                warn!(
                    user_id = %identity.user_id,
                    "Vote submission failed ({}), retrying once",
                    e
                );
                self.try_submit(identity, candidate_id).await
            }
            result => result,
        }
    }

    async fn try_submit(
        &self,
        identity: &Identity,
        candidate_id: i64,
    ) -> Result<VoteReceipt, LedgerError> {
        if identity.is_admin() {
            warn!(user_id = %identity.user_id, "Administrator attempted to vote");
            return Err(LedgerError::Forbidden(
                "administrators may not cast votes".to_string(),
            ));
        }

        // Fast path only. The UNIQUE(user_id) constraint is the authoritative guard.
        if self.database.find_vote_by_user(&identity.user_id).await?.is_some() {
            return Err(LedgerError::AlreadyVoted(identity.user_id.clone()));
        }

        let candidate = self
            .database
            .get_candidate(candidate_id)
            .await?
            .ok_or(LedgerError::UnknownCandidate(candidate_id))?;

        let payload = VotePayload::new(identity.user_id.clone(), candidate.id, candidate.name.clone());

        let mut tx = self.database.begin().await?;
        self.ledger.lock(&mut tx).await?;

        let block = Ledger::append_locked(&mut tx, &payload).await?;
        Queries::insert_vote(&mut *tx, &identity.user_id, candidate.id).await?;
        if !Queries::increment_tally(&mut *tx, candidate.id).await? {
            return Err(LedgerError::UnknownCandidate(candidate.id));
        }

        tx.commit().await?;

        info!(
            user_id = %identity.user_id,
            candidate_id = candidate.id,
            block_index = block.index,
            "Vote recorded in block {}",
            block.hash
        );

        Ok(VoteReceipt {
            block_hash: block.hash,
            block_index: block.index,
            candidate_id: candidate.id,
            candidate_name: candidate.name,
        })
    }

    /// The caller's recorded vote, if any.
    pub async fn vote_status(
        &self,
        identity: &Identity,
    ) -> Result<Option<VoteRecord>, LedgerError> {
        Ok(self.database.find_vote_by_user(&identity.user_id).await?)
    }
}
