use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::LedgerError;
use crate::ledger::block::{canonical_json, Block};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub vote_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VoteRecord {
    pub user_id: String,
    pub candidate_id: i64,
}

/// A vote row as read for reconciliation.
///
/// `candidate_id` is the store's textual rendering of the column, so rows
/// written with a different representation still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VoteSnapshot {
    pub user_id: String,
    pub candidate_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: String,
    pub role: String,
}

/// Persisted form of a ledger block
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BlockRow {
    pub block_index: i64,
    pub timestamp: i64,
    pub payload: String,
    pub previous_hash: String,
    pub hash: String,
    pub nonce: i64,
}

impl BlockRow {
    pub fn from_block(block: &Block) -> Result<Self, LedgerError> {
        Ok(Self {
            block_index: to_column(block.index, "block_index")?,
            timestamp: block.timestamp,
            payload: canonical_json(&block.payload),
            previous_hash: block.previous_hash.clone(),
            hash: block.hash.clone(),
            nonce: to_column(block.nonce, "nonce")?,
        })
    }
}

impl TryFrom<BlockRow> for Block {
    type Error = LedgerError;

    fn try_from(row: BlockRow) -> Result<Self, Self::Error> {
        let payload = decode_payload(&row.block_index.to_string(), row.payload);

        Ok(Block {
            index: from_column(row.block_index, "block_index")?,
            timestamp: row.timestamp,
            payload,
            previous_hash: row.previous_hash,
            hash: row.hash,
            nonce: from_column(row.nonce, "nonce")?,
        })
    }
}

/// A block row read with every column rendered as text.
///
/// Used by the auditor, which must report a row whose columns no longer hold
/// values of the expected type instead of failing to load it.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct RawBlockRow {
    pub block_index: Option<String>,
    pub timestamp: Option<String>,
    pub payload: Option<String>,
    pub previous_hash: Option<String>,
    pub hash: Option<String>,
    pub nonce: Option<String>,
}

/// A stored block row that does not decode into a [`Block`].
#[derive(Debug, Clone, PartialEq)]
pub struct UnreadableBlock {
    /// Index, when the stored index is still a valid one.
    pub index: Option<u64>,
    pub stored_block_index: Option<String>,
    pub stored_hash: Option<String>,
    pub payload: Value,
    /// Columns whose stored value could not be read.
    pub fields: Vec<&'static str>,
}

impl RawBlockRow {
    pub fn decode(self) -> Result<Block, UnreadableBlock> {
        let mut fields = Vec::new();

        let index = parse_column::<u64>(self.block_index.as_deref(), "block_index", &mut fields);
        let timestamp = parse_column::<i64>(self.timestamp.as_deref(), "timestamp", &mut fields);
        let nonce = parse_column::<u64>(self.nonce.as_deref(), "nonce", &mut fields);
        if self.previous_hash.is_none() {
            fields.push("previous_hash");
        }
        if self.hash.is_none() {
            fields.push("hash");
        }

        let label = self.block_index.clone().unwrap_or_default();
        let payload = match self.payload {
            Some(text) => decode_payload(&label, text),
            None => {
                fields.push("payload");
                Value::Null
            }
        };

        match (index, timestamp, nonce, self.previous_hash, self.hash.clone()) {
            (Some(index), Some(timestamp), Some(nonce), Some(previous_hash), Some(hash)) => {
                Ok(Block {
                    index,
                    timestamp,
                    payload,
                    previous_hash,
                    hash,
                    nonce,
                })
            }
            _ => {
                warn!("Block row {} has unreadable columns: {:?}", label, fields);
                Err(UnreadableBlock {
                    index,
                    stored_block_index: self.block_index,
                    stored_hash: self.hash,
                    payload,
                    fields,
                })
            }
        }
    }
}

fn parse_column<T: std::str::FromStr>(
    value: Option<&str>,
    column: &'static str,
    fields: &mut Vec<&'static str>,
) -> Option<T> {
    let parsed = value.and_then(|v| v.parse::<T>().ok());
    if parsed.is_none() {
        fields.push(column);
    }
    parsed
}

/// Unparsable payload text is kept verbatim so verification flags it.
fn decode_payload(block_index: &str, text: String) -> Value {
    match serde_json::from_str::<Value>(&text) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Block {} has a non-JSON payload: {}", block_index, e);
            Value::String(text)
        }
    }
}

fn to_column(value: u64, column: &str) -> Result<i64, LedgerError> {
    i64::try_from(value)
        .map_err(|_| LedgerError::DatabaseError(format!("{} {} out of range", column, value)))
}

fn from_column(value: i64, column: &str) -> Result<u64, LedgerError> {
    u64::try_from(value)
        .map_err(|_| LedgerError::DatabaseError(format!("negative {} {}", column, value)))
}
