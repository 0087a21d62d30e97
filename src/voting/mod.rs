//! Voting
//!
//! Vote submission and candidate administration against the ledger and the
//! relational store.

pub mod candidates;
pub mod coordinator;

pub use candidates::{CandidateRegistry, NewCandidate};
pub use coordinator::{VoteCoordinator, VoteReceipt};
