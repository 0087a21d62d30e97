//! Ledger Block
//!
//! An immutable, self-hashing record of one vote event. The hash covers the
//! index, the previous block's hash, the timestamp, the canonical payload and
//! the nonce.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::LedgerError;

/// `previous_hash` carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Voter id used in the genesis sentinel payload.
pub const SYSTEM_VOTER_ID: &str = "system";

/// Candidate name used in the genesis sentinel payload.
pub const GENESIS_CANDIDATE_NAME: &str = "GENESIS_BLOCK";

/// Payload of a vote block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePayload {
    pub voter_id: String,
    pub candidate_id: i64,
    pub candidate_name: String,
}

impl VotePayload {
    pub fn new(voter_id: impl Into<String>, candidate_id: i64, candidate_name: impl Into<String>) -> Self {
        Self {
            voter_id: voter_id.into(),
            candidate_id,
            candidate_name: candidate_name.into(),
        }
    }

    /// Sentinel payload marking a block as system-created.
    pub fn genesis() -> Self {
        Self::new(SYSTEM_VOTER_ID, 0, GENESIS_CANDIDATE_NAME)
    }
}

/// One hash-linked ledger block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub payload: Value,
    pub previous_hash: String,
    pub hash: String,
    pub nonce: u64,
}

impl Block {
    /// Build a block and compute its hash eagerly.
    pub fn new(
        index: u64,
        timestamp: i64,
        payload: &VotePayload,
        previous_hash: String,
    ) -> Result<Self, LedgerError> {
        let payload = serde_json::to_value(payload)?;
        let nonce = 0;
        let hash = Self::compute_hash(index, &previous_hash, timestamp, &payload, nonce);

        Ok(Self {
            index,
            timestamp,
            payload,
            previous_hash,
            hash,
            nonce,
        })
    }

    /// Genesis block for a fresh ledger.
    pub fn genesis(timestamp: i64) -> Result<Self, LedgerError> {
        Self::new(
            0,
            timestamp,
            &VotePayload::genesis(),
            GENESIS_PREVIOUS_HASH.to_string(),
        )
    }

    /// Canonical string representation fed to the hash function
    pub fn canonical_string(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        payload: &Value,
        nonce: u64,
    ) -> String {
        format!(
            "index:{}|previous_hash:{}|timestamp:{}|payload:{}|nonce:{}",
            index,
            previous_hash,
            timestamp,
            canonical_json(payload),
            nonce
        )
    }

    /// SHA-256 over the canonical string, lowercase hex.
    pub fn compute_hash(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        payload: &Value,
        nonce: u64,
    ) -> String {
        let canonical = Self::canonical_string(index, previous_hash, timestamp, payload, nonce);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Recompute the hash from the stored fields.
    pub fn recompute_hash(&self) -> String {
        Self::compute_hash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.payload,
            self.nonce,
        )
    }

    pub fn verify_hash(&self) -> bool {
        self.hash == self.recompute_hash()
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Voter id recorded in the payload, if the payload has one.
    pub fn voter_id(&self) -> Option<&str> {
        self.payload.get("voter_id").and_then(Value::as_str)
    }

    pub fn summary(&self) -> String {
        format!(
            "#{} {} (prev {})",
            self.index,
            short_hash(&self.hash),
            short_hash(&self.previous_hash)
        )
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

/// Serialize a JSON value with object keys sorted at every depth and no
/// insignificant whitespace.
///
/// Equal values always produce identical bytes regardless of the key order
/// they were built or stored with.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
