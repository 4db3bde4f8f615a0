use super::version::ProtocolVersion;
use serde::{Deserialize, Serialize};

/// Event lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Open,
    Locked,
    Graded,
    Voided,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Open => "open",
            EventStatus::Locked => "locked",
            EventStatus::Graded => "graded",
            EventStatus::Voided => "voided",
        }
    }

    /// Graded and voided events accept no further mutation
    pub fn is_final(&self) -> bool {
        matches!(self, EventStatus::Graded | EventStatus::Voided)
    }
}

/// How the oracle graded an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    /// Grade every market from the final score
    Standard,
    /// Event cancelled; every bet is refunded
    EventRefund,
    MoneylineRefund,
    SpreadsRefund,
    TotalsRefund,
}

impl ResultType {
    pub fn code(&self) -> u8 {
        match self {
            ResultType::Standard => 0x01,
            ResultType::EventRefund => 0x02,
            ResultType::MoneylineRefund => 0x03,
            ResultType::SpreadsRefund => 0x04,
            ResultType::TotalsRefund => 0x05,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(ResultType::Standard),
            0x02 => Some(ResultType::EventRefund),
            0x03 => Some(ResultType::MoneylineRefund),
            0x04 => Some(ResultType::SpreadsRefund),
            0x05 => Some(ResultType::TotalsRefund),
            _ => None,
        }
    }

    /// Status the event moves to when this result is posted
    pub fn final_status(&self) -> EventStatus {
        match self {
            ResultType::EventRefund => EventStatus::Voided,
            _ => EventStatus::Graded,
        }
    }
}

/// Moneyline odds scaled by the odds divisor (10000 = 1.0000)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Moneyline {
    pub home_odds: u32,
    pub away_odds: u32,
    pub draw_odds: u32,
}

/// Handicap line in hundredths of a point, applied to the home side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadLine {
    pub line: i32,
    pub home_odds: u32,
    pub away_odds: u32,
}

/// Combined-score threshold in hundredths of a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalLine {
    pub line: u32,
    pub over_odds: u32,
    pub under_odds: u32,
}

/// Version tag stamped on every odds or line mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tagged<T> {
    #[serde(flatten)]
    pub value: T,
    pub height: u64,
    pub version: ProtocolVersion,
}

impl<T> Tagged<T> {
    pub fn new(value: T, height: u64, version: ProtocolVersion) -> Self {
        Self {
            value,
            height,
            version,
        }
    }
}

/// Final score snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResult {
    pub home_score: u32,
    pub away_score: u32,
    pub result_type: ResultType,
    pub height: u64,
}

impl EventResult {
    /// Home score minus away score
    pub fn margin(&self) -> i64 {
        i64::from(self.home_score) - i64::from(self.away_score)
    }

    pub fn total_points(&self) -> u64 {
        u64::from(self.home_score) + u64::from(self.away_score)
    }
}

/// Fields carried by an Event opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_id: u32,
    pub start_time: u64,
    pub sport_id: u32,
    pub tournament_id: u32,
    pub round_id: u32,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub moneyline: Moneyline,
}

/// Line mutation kinds accepted by the event registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineUpdate {
    Moneyline(Moneyline),
    Spread(SpreadLine),
    Total(TotalLine),
}

/// Event record, mutated in place by later opcodes with the same id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: u32,
    pub start_time: u64,
    pub sport_id: u32,
    pub tournament_id: u32,
    pub round_id: u32,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub moneyline: Tagged<Moneyline>,
    pub spread: Option<Tagged<SpreadLine>>,
    pub total: Option<Tagged<TotalLine>>,
    pub status: EventStatus,
    pub result: Option<EventResult>,
    pub created_height: u64,
}

impl Event {
    /// Create an open event from its opcode fields
    pub fn new(fields: NewEvent, height: u64, version: ProtocolVersion) -> Self {
        Self {
            event_id: fields.event_id,
            start_time: fields.start_time,
            sport_id: fields.sport_id,
            tournament_id: fields.tournament_id,
            round_id: fields.round_id,
            home_team_id: fields.home_team_id,
            away_team_id: fields.away_team_id,
            moneyline: Tagged::new(fields.moneyline, height, version),
            spread: None,
            total: None,
            status: EventStatus::Open,
            result: None,
            created_height: height,
        }
    }

    /// Check if event accepts bets
    pub fn is_open(&self) -> bool {
        self.status == EventStatus::Open
    }

    /// Check if event has been graded or voided
    pub fn is_settled(&self) -> bool {
        self.status.is_final()
    }
}
