//! Store-backed Ledger
//!
//! The chain lives in the `blocks` table; the tail is always read from the
//! store, never cached in process. Every append runs inside a transaction
//! that first updates the election's `ledger_heads` row, which takes the
//! store's write lock and serializes "read latest, compute next, persist".

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::database::models::BlockRow;
use crate::database::queries::Queries;
use crate::database::Database;
use crate::error::LedgerError;
use crate::ledger::block::{Block, VotePayload};
use crate::ledger::verify::{verify_chain, ValidationResult};

#[derive(Clone, Debug)]
pub struct Ledger {
    database: Database,
    election_id: String,
}

impl Ledger {
    pub fn new(database: Database, election_id: impl Into<String>) -> Self {
        Self {
            database,
            election_id: election_id.into(),
        }
    }

    pub fn election_id(&self) -> &str {
        &self.election_id
    }

    /// Create the genesis block unless one exists. Returns the genesis block.
    pub async fn initialize(&self) -> Result<Block, LedgerError> {
        let mut tx = self.database.begin().await?;

        Queries::ensure_ledger_head(&mut *tx, &self.election_id).await?;
        Queries::lock_ledger_head(&mut *tx, &self.election_id).await?;

        if let Some(genesis) = Queries::first_block(&mut *tx).await? {
            tx.rollback().await?;
            debug!("Ledger {} already initialized", self.election_id);
            return Block::try_from(genesis);
        }

        let genesis = Block::genesis(Utc::now().timestamp_millis())?;
        Queries::insert_block(&mut *tx, &BlockRow::from_block(&genesis)?).await?;
        tx.commit().await?;

        info!("Created genesis block {} for election {}", genesis.hash, self.election_id);
        Ok(genesis)
    }

    /// Tail block of the chain.
    pub async fn latest(&self) -> Result<Block, LedgerError> {
        Queries::latest_block(self.database.pool())
            .await?
            .ok_or(LedgerError::EmptyLedger)
            .and_then(Block::try_from)
    }

    /// All blocks ordered by index.
    pub async fn blocks(&self) -> Result<Vec<Block>, LedgerError> {
        Queries::list_blocks(self.database.pool())
            .await?
            .into_iter()
            .map(Block::try_from)
            .collect()
    }

    pub async fn height(&self) -> Result<u64, LedgerError> {
        let count = Queries::count_blocks(self.database.pool()).await?;
        Ok(count.max(0) as u64)
    }

    /// Append a block in its own transaction.
    pub async fn append(&self, payload: &VotePayload) -> Result<Block, LedgerError> {
        let mut tx = self.database.begin().await?;
        self.lock(&mut tx).await?;
        let block = Self::append_locked(&mut tx, payload).await?;
        tx.commit().await?;
        Ok(block)
    }

    /// Take the append lock on a caller-owned transaction.
    ///
    /// Must be the first write in the transaction. Fails with `EmptyLedger`
    /// when `initialize` was never called for this election.
    pub async fn lock(&self, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
        if Queries::lock_ledger_head(&mut *conn, &self.election_id).await? {
            Ok(())
        } else {
            Err(LedgerError::EmptyLedger)
        }
    }

    /// Build and insert the next block. The caller must hold the append lock.
    pub async fn append_locked(
        conn: &mut SqliteConnection,
        payload: &VotePayload,
    ) -> Result<Block, LedgerError> {
        let latest = Queries::latest_block(&mut *conn)
            .await?
            .ok_or(LedgerError::EmptyLedger)
            .and_then(Block::try_from)?;

        let block = Block::new(
            latest.index + 1,
            Utc::now().timestamp_millis(),
            payload,
            latest.hash,
        )?;
        Queries::insert_block(&mut *conn, &BlockRow::from_block(&block)?).await?;

        debug!("Appended block {}", block.summary());
        Ok(block)
    }

    /// Recompute hashes and linkage over the stored chain.
    pub async fn verify(&self) -> Result<ValidationResult, LedgerError> {
        let blocks = self.blocks().await?;
        Ok(verify_chain(&blocks))
    }
}
