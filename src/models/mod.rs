//! Domain models for the settlement ledger.
//!
//! Plain data types shared by the codec, repositories and services. None of
//! them hold references to each other: bets and payouts point at events and
//! bets by id.

pub mod bet;
pub mod event;
pub mod mapping;
pub mod opcode;
pub mod payout;
pub mod tx;
pub mod version;

// Re-export all models for convenient access
pub use bet::{Bet, BetResultType, BetSettlement, Market, Outcome};
pub use event::{
    Event, EventResult, EventStatus, LineUpdate, Moneyline, NewEvent, ResultType, SpreadLine,
    Tagged, TotalLine,
};
pub use mapping::{MappingEntry, MappingType};
pub use opcode::{Opcode, OpcodeKind};
pub use payout::{PayoutEntry, PayoutType};
pub use tx::{Block, Envelope, Transaction, TxContext, TxHash, TxOutput, TxRef};
pub use version::{ProtocolVersion, VersionResolver, VersionSchedule};
