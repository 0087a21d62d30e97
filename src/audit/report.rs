//! Audit Report
//!
//! Structured findings produced by an audit run. Findings are data, never
//! errors: an audit that completes always yields a report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::database::models::UnreadableBlock;
use crate::ledger::ChainViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
    /// Stored hash differs from the recomputed hash.
    DataTampering,
    /// `previous_hash` does not match the preceding block.
    BrokenChain,
    /// Ledger vote with no relational vote row.
    MissingData,
    /// Ledger vote and relational vote disagree on the candidate.
    InconsistentData,
    /// Relational vote row with no ledger block.
    OrphanVote,
    /// Vote block whose payload has no voter identity.
    MalformedPayload,
}

impl FindingKind {
    pub fn severity(&self) -> Severity {
        match self {
            FindingKind::DataTampering | FindingKind::BrokenChain => Severity::Critical,
            FindingKind::InconsistentData
            | FindingKind::OrphanVote
            | FindingKind::MalformedPayload => Severity::High,
            FindingKind::MissingData => Severity::Warning,
        }
    }
}

/// One detected violation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub severity: Severity,
    pub kind: FindingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_index: Option<u64>,
    pub message: String,
    pub details: Value,
}

impl AuditEntry {
    pub fn new(kind: FindingKind, block_index: Option<u64>, message: impl Into<String>, details: Value) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            block_index,
            message: message.into(),
            details,
        }
    }
}

impl AuditEntry {
    /// A stored block row whose columns no longer decode, found at `row` in
    /// index order.
    pub fn unreadable_block(block: &UnreadableBlock, row: usize) -> Self {
        AuditEntry::new(
            FindingKind::DataTampering,
            block.index,
            "Block row holds values of the wrong type and cannot be verified",
            json!({
                "row": row,
                "stored_block_index": block.stored_block_index,
                "stored_hash": block.stored_hash,
                "unreadable_fields": block.fields,
            }),
        )
    }
}

impl From<&ChainViolation> for AuditEntry {
    fn from(violation: &ChainViolation) -> Self {
        match violation {
            ChainViolation::Tampered {
                index,
                stored_hash,
                recomputed_hash,
            } => AuditEntry::new(
                FindingKind::DataTampering,
                Some(*index),
                "Block contents were modified: stored hash does not match recomputed hash",
                json!({
                    "stored_hash": stored_hash,
                    "recomputed_hash": recomputed_hash,
                }),
            ),
            ChainViolation::BrokenLink {
                index,
                previous_hash,
                expected_previous_hash,
            } => AuditEntry::new(
                FindingKind::BrokenChain,
                Some(*index),
                "Chain is broken: previous hash does not point at the preceding block",
                json!({
                    "stored_previous_hash": previous_hash,
                    "actual_previous_block_hash": expected_previous_hash,
                }),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    /// No blocks at all; nothing to audit.
    Empty,
    Secure,
    Compromised,
}

/// Result of one audit run
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub status: AuditStatus,
    pub message: String,
    pub audited_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_blocks_verified: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes_reconciled: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_block_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_errors: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub report: Vec<AuditEntry>,
}

impl AuditReport {
    pub fn empty() -> Self {
        Self {
            status: AuditStatus::Empty,
            message: "Ledger is empty: nothing to audit".to_string(),
            audited_at: Utc::now(),
            total_blocks_verified: None,
            votes_reconciled: None,
            last_block_hash: None,
            total_errors: None,
            report: Vec::new(),
        }
    }

    /// Build the final report; the status is `COMPROMISED` iff `entries` is non-empty.
    pub fn from_findings(
        entries: Vec<AuditEntry>,
        blocks_verified: usize,
        votes_reconciled: usize,
        last_block_hash: String,
    ) -> Self {
        if entries.is_empty() {
            let message = if votes_reconciled == 0 {
                "Ledger is intact; no votes recorded beyond genesis".to_string()
            } else {
                "All blocks are valid, the chain is linked and consistent with the vote records"
                    .to_string()
            };

            return Self {
                status: AuditStatus::Secure,
                message,
                audited_at: Utc::now(),
                total_blocks_verified: Some(blocks_verified),
                votes_reconciled: Some(votes_reconciled),
                last_block_hash: Some(last_block_hash),
                total_errors: None,
                report: Vec::new(),
            };
        }

        Self {
            status: AuditStatus::Compromised,
            message: "Integrity violations detected".to_string(),
            audited_at: Utc::now(),
            total_blocks_verified: None,
            votes_reconciled: None,
            last_block_hash: None,
            total_errors: Some(entries.len()),
            report: entries,
        }
    }

    pub fn is_compromised(&self) -> bool {
        self.status == AuditStatus::Compromised
    }

    pub fn entries_of(&self, kind: FindingKind) -> Vec<&AuditEntry> {
        self.report.iter().filter(|entry| entry.kind == kind).collect()
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.report.iter().map(|entry| entry.severity).max()
    }
}
