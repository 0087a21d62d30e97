//! Chain Verification
//!
//! Recomputes block hashes and checks hash linkage over an ordered slice of
//! blocks. Every violation is collected, not only the first.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ledger::block::{Block, GENESIS_PREVIOUS_HASH};

/// A single integrity violation found while walking the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum ChainViolation {
    /// Stored hash does not match the hash recomputed from the block's fields.
    Tampered {
        index: u64,
        stored_hash: String,
        recomputed_hash: String,
    },
    /// `previous_hash` does not point at the preceding block's stored hash.
    BrokenLink {
        index: u64,
        previous_hash: String,
        expected_previous_hash: String,
    },
}

impl ChainViolation {
    pub fn index(&self) -> u64 {
        match self {
            Self::Tampered { index, .. } | Self::BrokenLink { index, .. } => *index,
        }
    }
}

/// Verification outcome with detailed information
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub blocks_checked: usize,
    pub violations: Vec<ChainViolation>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn first_violation(&self) -> Option<&ChainViolation> {
        self.violations.first()
    }

    pub fn tampered_indices(&self) -> Vec<u64> {
        self.violations
            .iter()
            .filter(|v| matches!(v, ChainViolation::Tampered { .. }))
            .map(ChainViolation::index)
            .collect()
    }

    pub fn broken_link_indices(&self) -> Vec<u64> {
        self.violations
            .iter()
            .filter(|v| matches!(v, ChainViolation::BrokenLink { .. }))
            .map(ChainViolation::index)
            .collect()
    }

    pub fn summary(&self) -> String {
        if self.is_valid() {
            format!("Ledger is valid ({} blocks)", self.blocks_checked)
        } else {
            format!(
                "Ledger is invalid ({} blocks, {} violations, first at block {})",
                self.blocks_checked,
                self.violations.len(),
                self.first_violation().map(ChainViolation::index).unwrap_or_default()
            )
        }
    }
}

/// Verify hashes and linkage of an index-ordered chain.
///
/// The genesis block is checked for a correct hash and for the `"0"`
/// previous-hash marker; every later block is checked against its
/// predecessor's stored hash.
pub fn verify_chain(blocks: &[Block]) -> ValidationResult {
    let mut violations = Vec::new();

    for (position, block) in blocks.iter().enumerate() {
        let recomputed_hash = block.recompute_hash();
        if recomputed_hash != block.hash {
            warn!("Hash mismatch at block {}", block.index);
            violations.push(ChainViolation::Tampered {
                index: block.index,
                stored_hash: block.hash.clone(),
                recomputed_hash,
            });
        }

        let expected_previous_hash = match position {
            0 => GENESIS_PREVIOUS_HASH,
            _ => blocks[position - 1].hash.as_str(),
        };
        if block.previous_hash != expected_previous_hash {
            warn!("Hash chain broken at block {}", block.index);
            violations.push(ChainViolation::BrokenLink {
                index: block.index,
                previous_hash: block.previous_hash.clone(),
                expected_previous_hash: expected_previous_hash.to_string(),
            });
        }

        debug!("Checked block {}", block.summary());
    }

    let result = ValidationResult {
        blocks_checked: blocks.len(),
        violations,
    };
    info!("{}", result.summary());
    result
}
