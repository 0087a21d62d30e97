//! Candidate Registry
//!
//! Candidate administration. Deleting a candidate never removes vote rows:
//! a candidate with recorded votes cannot be deleted at all.

use serde::Deserialize;
use tracing::{info, warn};

use crate::database::models::Candidate;
use crate::database::queries::Queries;
use crate::database::Database;
use crate::error::LedgerError;
use crate::identity::Identity;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCandidate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct CandidateRegistry {
    database: Database,
}

impl CandidateRegistry {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub async fn list(&self) -> Result<Vec<Candidate>, LedgerError> {
        Ok(self.database.list_candidates().await?)
    }

    pub async fn create(
        &self,
        identity: &Identity,
        candidate: &NewCandidate,
    ) -> Result<Candidate, LedgerError> {
        identity.require_admin()?;

        let name = candidate.name.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidRequest(
                "candidate name must not be empty".to_string(),
            ));
        }

        let id = self
            .database
            .create_candidate(name, candidate.description.trim(), candidate.image_url.as_deref())
            .await?;

        self.database
            .get_candidate(id)
            .await?
            .ok_or(LedgerError::UnknownCandidate(id))
    }

    /// Delete a candidate that has no recorded votes.
    pub async fn delete(&self, identity: &Identity, candidate_id: i64) -> Result<(), LedgerError> {
        identity.require_admin()?;

        let mut tx = self.database.begin().await?;

        let votes = Queries::count_votes_for_candidate(&mut *tx, candidate_id).await?;
        if votes > 0 {
            warn!(
                "Refusing to delete candidate {} with {} recorded votes",
                candidate_id, votes
            );
            return Err(LedgerError::CandidateHasVotes(candidate_id));
        }

        if Queries::delete_candidate(&mut *tx, candidate_id).await? == 0 {
            return Err(LedgerError::UnknownCandidate(candidate_id));
        }

        tx.commit().await?;
        info!("Deleted candidate {} (by {})", candidate_id, identity.user_id);
        Ok(())
    }
}
