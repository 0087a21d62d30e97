//! Ledger Auditor
//!
//! Verifies the hash chain and reconciles the ledger against the relational
//! vote table. Audits only read; they never modify either store.

pub mod reconcile;
pub mod report;

pub use reconcile::reconcile;
pub use report::{AuditEntry, AuditReport, AuditStatus, FindingKind, Severity};

use std::collections::HashSet;
use tracing::{info, warn};

use crate::database::queries::Queries;
use crate::database::Database;
use crate::error::LedgerError;
use crate::ledger::{verify_chain, Block, ChainViolation};

#[derive(Clone, Debug)]
pub struct Auditor {
    database: Database,
}

impl Auditor {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Run a full audit.
    ///
    /// Blocks and vote rows are read inside one read transaction, so a vote
    /// committing concurrently is observed either entirely or not at all.
    /// Block rows are read as text; a row that no longer decodes is reported
    /// as tampering and left out of the hash walk.
    pub async fn audit(&self) -> Result<AuditReport, LedgerError> {
        let mut tx = self.database.begin().await?;
        let rows = Queries::list_raw_blocks(&mut *tx).await?;
        let votes = Queries::list_votes(&mut *tx).await?;
        tx.rollback().await?;

        if rows.is_empty() {
            info!("Audit skipped: ledger is empty");
            return Ok(AuditReport::empty());
        }
        let rows_verified = rows.len();

        let mut blocks: Vec<Block> = Vec::new();
        let mut vote_blocks: Vec<Block> = Vec::new();
        let mut entries: Vec<AuditEntry> = Vec::new();
        // Readable blocks whose link points at the unreadable row just before them.
        let mut bridged: HashSet<u64> = HashSet::new();
        let mut unreadable_hash: Option<Option<String>> = None;
        let mut last_block_hash = String::new();

        for (row, raw) in rows.into_iter().enumerate() {
            match raw.decode() {
                Ok(block) => {
                    if let Some(stored_hash) = unreadable_hash.take() {
                        if stored_hash.as_deref() == Some(block.previous_hash.as_str()) {
                            bridged.insert(block.index);
                        }
                    }
                    last_block_hash = block.hash.clone();
                    vote_blocks.push(block.clone());
                    blocks.push(block);
                }
                Err(unreadable) => {
                    entries.push(AuditEntry::unreadable_block(&unreadable, row));
                    if let Some(index) = unreadable.index {
                        // Still reconciled, so its vote row is not reported as orphaned.
                        vote_blocks.push(Block {
                            index,
                            timestamp: 0,
                            payload: unreadable.payload.clone(),
                            previous_hash: String::new(),
                            hash: String::new(),
                            nonce: 0,
                        });
                    }
                    if let Some(hash) = &unreadable.stored_hash {
                        last_block_hash = hash.clone();
                    }
                    unreadable_hash = Some(unreadable.stored_hash);
                }
            }
        }

        let validation = verify_chain(&blocks);
        entries.extend(
            validation
                .violations
                .iter()
                .filter(|violation| {
                    !matches!(violation, ChainViolation::BrokenLink { index, .. } if bridged.contains(index))
                })
                .map(AuditEntry::from),
        );
        entries.extend(reconcile(&vote_blocks, &votes));

        let votes_reconciled = vote_blocks.iter().filter(|block| !block.is_genesis()).count();
        let report = AuditReport::from_findings(entries, rows_verified, votes_reconciled, last_block_hash);

        if report.is_compromised() {
            warn!(
                "Audit found {} integrity violations across {} blocks",
                report.report.len(),
                rows_verified
            );
        } else {
            info!("Audit passed: {} blocks verified", rows_verified);
        }

        Ok(report)
    }
}
