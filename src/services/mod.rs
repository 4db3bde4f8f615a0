pub mod audit;
pub mod betting_service;
pub mod event_service;
pub mod processor;
pub mod query;
pub mod reconciliation;
pub mod settlement;

pub use audit::AuditTrailService;
pub use betting_service::BettingService;
pub use event_service::EventService;
pub use processor::{Applied, AppliedOpcode, BlockProcessor, BlockReport, Rejection};
pub use query::{BetView, EventView, PayoutInfo, PayoutLine, QueryService};
pub use reconciliation::{reconcile, ReconciliationIssue, ReconciliationReport};
pub use settlement::{RuleSet, SettledBet, SettlementBatch, SettlementService};
