use crate::codec::CodecError;
use crate::models::{EventStatus, MappingType, OpcodeKind, Outcome, TxRef};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Stable numeric code attached to every ledger error.
///
/// Submission layers and wallets match on these rather than on message text,
/// so existing values must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u16)]
pub enum ErrorCode {
    MalformedOpcode = 1,
    UnauthorizedSender = 2,
    DuplicateMapping = 3,
    DuplicateEvent = 4,
    UnknownMapping = 5,
    UnknownEvent = 6,
    EventNotOpen = 7,
    EventAlreadyGraded = 8,
    InvalidOutcomeForEvent = 9,
    InvalidStake = 10,
    DuplicateBet = 11,
    SettlementInconsistency = 100,
    Config = 200,
    Audit = 201,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MalformedOpcode => "malformed_opcode",
            ErrorCode::UnauthorizedSender => "unauthorized_sender",
            ErrorCode::DuplicateMapping => "duplicate_mapping",
            ErrorCode::DuplicateEvent => "duplicate_event",
            ErrorCode::UnknownMapping => "unknown_mapping",
            ErrorCode::UnknownEvent => "unknown_event",
            ErrorCode::EventNotOpen => "event_not_open",
            ErrorCode::EventAlreadyGraded => "event_already_graded",
            ErrorCode::InvalidOutcomeForEvent => "invalid_outcome_for_event",
            ErrorCode::InvalidStake => "invalid_stake",
            ErrorCode::DuplicateBet => "duplicate_bet",
            ErrorCode::SettlementInconsistency => "settlement_inconsistency",
            ErrorCode::Config => "config",
            ErrorCode::Audit => "audit",
        }
    }
}

/// Ledger error taxonomy
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Payload could not be decoded; the transaction's opcode effect is dropped
    #[error("Malformed opcode: {0}")]
    MalformedOpcode(#[from] CodecError),

    #[error("Unauthorized sender {address} for {kind:?} opcode")]
    UnauthorizedSender { address: String, kind: OpcodeKind },

    #[error("Duplicate mapping: {category:?} {detail}")]
    DuplicateMapping { category: MappingType, detail: String },

    #[error("Duplicate event: {0}")]
    DuplicateEvent(u32),

    #[error("Unknown mapping: {category:?} {detail}")]
    UnknownMapping { category: MappingType, detail: String },

    #[error("Unknown event: {0}")]
    UnknownEvent(u32),

    #[error("Event {event_id} is not open for betting (status: {status:?})")]
    EventNotOpen { event_id: u32, status: EventStatus },

    #[error("Event {event_id} already graded (status: {status:?})")]
    EventAlreadyGraded { event_id: u32, status: EventStatus },

    #[error("Outcome {outcome:?} is not offered on event {event_id}")]
    InvalidOutcomeForEvent { event_id: u32, outcome: Outcome },

    #[error("Invalid stake: {0}")]
    InvalidStake(Decimal),

    #[error("Duplicate bet: {0}")]
    DuplicateBet(TxRef),

    /// Fatal: nodes would diverge if the block were accepted
    #[error("Settlement inconsistency: {0}")]
    SettlementInconsistency(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audit trail error: {0}")]
    Audit(String),
}

/// Result type alias for ledger errors
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::MalformedOpcode(_) => ErrorCode::MalformedOpcode,
            LedgerError::UnauthorizedSender { .. } => ErrorCode::UnauthorizedSender,
            LedgerError::DuplicateMapping { .. } => ErrorCode::DuplicateMapping,
            LedgerError::DuplicateEvent(_) => ErrorCode::DuplicateEvent,
            LedgerError::UnknownMapping { .. } => ErrorCode::UnknownMapping,
            LedgerError::UnknownEvent(_) => ErrorCode::UnknownEvent,
            LedgerError::EventNotOpen { .. } => ErrorCode::EventNotOpen,
            LedgerError::EventAlreadyGraded { .. } => ErrorCode::EventAlreadyGraded,
            LedgerError::InvalidOutcomeForEvent { .. } => ErrorCode::InvalidOutcomeForEvent,
            LedgerError::InvalidStake(_) => ErrorCode::InvalidStake,
            LedgerError::DuplicateBet(_) => ErrorCode::DuplicateBet,
            LedgerError::SettlementInconsistency(_) => ErrorCode::SettlementInconsistency,
            LedgerError::Config(_) => ErrorCode::Config,
            LedgerError::Audit(_) => ErrorCode::Audit,
        }
    }

    /// Check if the error must halt block acceptance
    pub fn is_fatal(&self) -> bool {
        matches!(self, LedgerError::SettlementInconsistency(_))
    }

    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::UnknownEvent(_) | LedgerError::UnknownMapping { .. }
        )
    }
}

/// Convenience constructor for settlement failures
pub fn inconsistency(detail: impl Into<String>) -> LedgerError {
    LedgerError::SettlementInconsistency(detail.into())
}
