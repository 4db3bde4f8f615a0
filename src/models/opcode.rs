use super::bet::Outcome;
use super::event::{Moneyline, NewEvent, ResultType, SpreadLine, TotalLine};
use super::mapping::MappingType;
use serde::{Deserialize, Serialize};

/// The closed set of state-mutating instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "opcode", rename_all = "snake_case")]
pub enum Opcode {
    Mapping {
        category: MappingType,
        id: u32,
        name: String,
    },
    Event(NewEvent),
    Bet {
        event_id: u32,
        outcome: Outcome,
    },
    Result {
        event_id: u32,
        result_type: ResultType,
        home_score: u32,
        away_score: u32,
    },
    UpdateOdds {
        event_id: u32,
        moneyline: Moneyline,
    },
    SpreadLine {
        event_id: u32,
        spread: SpreadLine,
    },
    TotalLine {
        event_id: u32,
        total: TotalLine,
    },
}

/// Opcode discriminant, used for authorization checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpcodeKind {
    Mapping,
    Event,
    Bet,
    Result,
    UpdateOdds,
    SpreadLine,
    TotalLine,
}

impl Opcode {
    pub fn kind(&self) -> OpcodeKind {
        match self {
            Opcode::Mapping { .. } => OpcodeKind::Mapping,
            Opcode::Event(_) => OpcodeKind::Event,
            Opcode::Bet { .. } => OpcodeKind::Bet,
            Opcode::Result { .. } => OpcodeKind::Result,
            Opcode::UpdateOdds { .. } => OpcodeKind::UpdateOdds,
            Opcode::SpreadLine { .. } => OpcodeKind::SpreadLine,
            Opcode::TotalLine { .. } => OpcodeKind::TotalLine,
        }
    }

    /// Event the opcode refers to, if any
    pub fn event_id(&self) -> Option<u32> {
        match self {
            Opcode::Mapping { .. } => None,
            Opcode::Event(fields) => Some(fields.event_id),
            Opcode::Bet { event_id, .. }
            | Opcode::Result { event_id, .. }
            | Opcode::UpdateOdds { event_id, .. }
            | Opcode::SpreadLine { event_id, .. }
            | Opcode::TotalLine { event_id, .. } => Some(*event_id),
        }
    }
}

impl OpcodeKind {
    /// Oracle opcodes need an authorized sender; bets come from anyone
    pub fn requires_oracle(&self) -> bool {
        !matches!(self, OpcodeKind::Bet)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OpcodeKind::Mapping => "mapping",
            OpcodeKind::Event => "event",
            OpcodeKind::Bet => "bet",
            OpcodeKind::Result => "result",
            OpcodeKind::UpdateOdds => "update_odds",
            OpcodeKind::SpreadLine => "spread_line",
            OpcodeKind::TotalLine => "total_line",
        }
    }
}
