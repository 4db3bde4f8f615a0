use super::tx::TxRef;
use super::version::ProtocolVersion;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market side a bet backs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    HomeWin,
    AwayWin,
    Draw,
    SpreadHome,
    SpreadAway,
    TotalOver,
    TotalUnder,
}

/// Market an outcome belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Moneyline,
    Spread,
    Total,
}

impl Outcome {
    pub fn code(&self) -> u8 {
        match self {
            Outcome::HomeWin => 1,
            Outcome::AwayWin => 2,
            Outcome::Draw => 3,
            Outcome::SpreadHome => 4,
            Outcome::SpreadAway => 5,
            Outcome::TotalOver => 6,
            Outcome::TotalUnder => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Outcome::HomeWin),
            2 => Some(Outcome::AwayWin),
            3 => Some(Outcome::Draw),
            4 => Some(Outcome::SpreadHome),
            5 => Some(Outcome::SpreadAway),
            6 => Some(Outcome::TotalOver),
            7 => Some(Outcome::TotalUnder),
            _ => None,
        }
    }

    pub fn market(&self) -> Market {
        match self {
            Outcome::HomeWin | Outcome::AwayWin | Outcome::Draw => Market::Moneyline,
            Outcome::SpreadHome | Outcome::SpreadAway => Market::Spread,
            Outcome::TotalOver | Outcome::TotalUnder => Market::Total,
        }
    }
}

/// Confirmed bet. Never mutated; settlement state lives in the ledger beside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub bettor: String,
    pub event_id: u32,
    pub outcome: Outcome,
    pub stake: Decimal,
    pub placement_height: u64,
    pub placement_version: ProtocolVersion,
    pub tx_ref: TxRef,
}

/// How a bet was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetResultType {
    Win,
    Lose,
    Push,
    Refund,
    /// Legacy spread/total rule: half credited as winnings, half refunded
    CompatSplit,
}

impl BetResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetResultType::Win => "win",
            BetResultType::Lose => "lose",
            BetResultType::Push => "push",
            BetResultType::Refund => "refund",
            BetResultType::CompatSplit => "compat_split",
        }
    }
}

/// Settlement record kept next to an immutable bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetSettlement {
    pub result: BetResultType,
    pub settlement_height: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_codes_and_markets() {
        for code in 1..=7u8 {
            let outcome = Outcome::from_code(code).unwrap();
            assert_eq!(outcome.code(), code);
        }
        assert!(Outcome::from_code(0).is_none());
        assert!(Outcome::from_code(8).is_none());
        assert_eq!(Outcome::Draw.market(), Market::Moneyline);
        assert_eq!(Outcome::SpreadAway.market(), Market::Spread);
        assert_eq!(Outcome::TotalUnder.market(), Market::Total);
    }
}
