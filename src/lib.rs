//! Sportsbook Ledger Library
//!
//! Deterministic settlement of on-chain sports wagering opcodes: mapping
//! table, event registry, bet ledger, settlement engine and payout audit log.

pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod oracle;
pub mod repositories;
pub mod services;
pub mod state_manager;
pub mod store;

// Re-export commonly used types
pub use config::{AppConfig, ChainParams};
pub use error::{ErrorCode, LedgerError, LedgerResult};
pub use oracle::{OracleAuthorizer, OracleRegistry};
pub use services::BlockProcessor;
pub use state_manager::StateManager;
pub use store::ChainState;
