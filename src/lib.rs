pub mod api;
pub mod audit;
pub mod config;
pub mod database;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod voting;

pub use error::LedgerError;
