use super::tx::TxRef;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payout kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutType {
    Win,
    Refund,
    Push,
}

impl PayoutType {
    /// Label used by the payout info query
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutType::Win => "Betting Payout",
            PayoutType::Refund => "Betting Refund",
            PayoutType::Push => "Betting Push",
        }
    }
}

/// Immutable link between a settled bet and the amount it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutEntry {
    pub payout_type: PayoutType,
    pub bet_ref: TxRef,
    pub bettor: String,
    pub event_id: u32,
    pub amount: Decimal,
    pub settlement_height: u64,
}
