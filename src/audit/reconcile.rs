//! Ledger / vote-table reconciliation
//!
//! Cross-checks every vote block against the relational vote rows, and every
//! vote row against the ledger.
//!
//! Candidate ids are compared in normalized text form: surrounding
//! whitespace is ignored and integral values compare equal regardless of
//! whether they were stored as numbers or strings (`1`, `"1"`, `1.0`).
//! Anything that is not an integral value compares by its exact text.

use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::audit::report::{AuditEntry, FindingKind};
use crate::database::models::VoteSnapshot;
use crate::ledger::Block;

/// Findings from reconciling `blocks` (index-ordered) against `votes`.
pub fn reconcile(blocks: &[Block], votes: &[VoteSnapshot]) -> Vec<AuditEntry> {
    let votes_by_user: HashMap<&str, &VoteSnapshot> =
        votes.iter().map(|vote| (vote.user_id.as_str(), vote)).collect();
    let mut voters_on_ledger: HashSet<&str> = HashSet::new();
    let mut entries = Vec::new();

    for block in blocks.iter().filter(|block| !block.is_genesis()) {
        let Some(voter_id) = block.voter_id() else {
            entries.push(AuditEntry::new(
                FindingKind::MalformedPayload,
                Some(block.index),
                "Vote block payload has no voter identity",
                json!({ "payload": block.payload }),
            ));
            continue;
        };
        voters_on_ledger.insert(voter_id);

        let ledger_choice = normalize_candidate_value(block.payload.get("candidate_id"));

        match votes_by_user.get(voter_id) {
            None => entries.push(AuditEntry::new(
                FindingKind::MissingData,
                Some(block.index),
                "Vote is recorded on the ledger but missing from the vote table",
                json!({ "voter_id": voter_id }),
            )),
            Some(vote) => {
                let database_choice = normalize_candidate_text(&vote.candidate_id);
                if database_choice != ledger_choice {
                    entries.push(AuditEntry::new(
                        FindingKind::InconsistentData,
                        Some(block.index),
                        "Vote table choice differs from the ledger",
                        json!({
                            "voter_id": voter_id,
                            "blockchain_choice": ledger_choice,
                            "database_choice": database_choice,
                        }),
                    ));
                } else {
                    debug!("Block {} matches vote of {}", block.index, voter_id);
                }
            }
        }
    }

    for vote in votes {
        if !voters_on_ledger.contains(vote.user_id.as_str()) {
            entries.push(AuditEntry::new(
                FindingKind::OrphanVote,
                None,
                "Vote table row has no corresponding ledger block",
                json!({
                    "voter_id": vote.user_id,
                    "database_choice": normalize_candidate_text(&vote.candidate_id),
                }),
            ));
        }
    }

    entries
}

/// Normalized text form of a candidate id held in a block payload.
pub fn normalize_candidate_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.is_finite() && f.fract() == 0.0 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(Value::String(s)) => normalize_candidate_text(s),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Normalized text form of a candidate id read from the vote table.
pub fn normalize_candidate_text(text: &str) -> String {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return i.to_string();
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => format!("{}", f as i64),
        _ => trimmed.to_string(),
    }
}
