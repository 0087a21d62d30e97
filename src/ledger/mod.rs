//! Vote Ledger
//!
//! Append-only chain of hash-linked vote blocks, persisted as rows in the
//! relational store.

pub mod block;
pub mod chain;
pub mod verify;

pub use block::{canonical_json, Block, VotePayload, GENESIS_PREVIOUS_HASH};
pub use chain::Ledger;
pub use verify::{verify_chain, ChainViolation, ValidationResult};
