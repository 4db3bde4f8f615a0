//! Opcode wire format
//!
//! Every payload carries a fixed prefix followed by a tag-specific body.
//! All integers are little-endian; strings are a `u16` length plus UTF-8.
//!
//! ```text
//! Offset  Size  Field
//! 0       3     prefix "BTX"
//! 3       1     protocol (0x01)
//! 4       1     tag
//! 5       ..    body
//!
//! Tag   Opcode       Body
//! 0x01  Mapping      category u8, id u32, name str
//! 0x02  Event        event_id u32, start_time u64, sport u32, tournament u32,
//!                    round u32, home u32, away u32, home/away/draw odds u32
//! 0x03  Bet          event_id u32, outcome u8
//! 0x04  Result       event_id u32, result_type u8, home_score u32, away_score u32
//! 0x05  UpdateOdds   event_id u32, home/away/draw odds u32
//! 0x09  SpreadLine   event_id u32, line i32, home/away odds u32
//! 0x0a  TotalLine    event_id u32, line u32, over/under odds u32
//! ```

use crate::models::{
    MappingType, Moneyline, NewEvent, Opcode, Outcome, ResultType, SpreadLine, TotalLine,
};
use thiserror::Error;

/// Payload prefix
pub const OPCODE_PREFIX: [u8; 3] = *b"BTX";

/// Current wire protocol
pub const OPCODE_PROTOCOL: u8 = 0x01;

/// Prefix, protocol and tag
pub const HEADER_SIZE: usize = 5;

/// Mapping names longer than this are rejected
pub const MAX_NAME_LEN: usize = 255;

pub const TAG_MAPPING: u8 = 0x01;
pub const TAG_EVENT: u8 = 0x02;
pub const TAG_BET: u8 = 0x03;
pub const TAG_RESULT: u8 = 0x04;
pub const TAG_UPDATE_ODDS: u8 = 0x05;
pub const TAG_SPREAD_LINE: u8 = 0x09;
pub const TAG_TOTAL_LINE: u8 = 0x0a;

/// Errors during opcode encoding and decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid prefix: {0:02x?}")]
    InvalidPrefix(Vec<u8>),

    #[error("unsupported protocol: {0:#04x} (expected 0x01)")]
    UnsupportedProtocol(u8),

    #[error("unknown opcode tag: {0:#04x}")]
    UnknownTag(u8),

    #[error("payload truncated")]
    Truncated,

    #[error("{0} trailing bytes after opcode body")]
    TrailingBytes(usize),

    #[error("invalid {field}: {value}")]
    InvalidField { field: &'static str, value: u32 },

    #[error("mapping name is not valid UTF-8")]
    InvalidUtf8,

    #[error("mapping name too long: {0} bytes")]
    NameTooLong(usize),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Encode an opcode into its payload bytes.
///
/// Fails instead of writing a payload that would not decode back to `opcode`.
pub fn encode(opcode: &Opcode) -> CodecResult<Vec<u8>> {
    let mut w = Writer::with_header(tag_of(opcode));

    match opcode {
        Opcode::Mapping { category, id, name } => {
            w.u8(category.code());
            w.u32(*id);
            w.str(name)?;
        }
        Opcode::Event(fields) => {
            w.u32(fields.event_id);
            w.u64(fields.start_time);
            w.u32(fields.sport_id);
            w.u32(fields.tournament_id);
            w.u32(fields.round_id);
            w.u32(fields.home_team_id);
            w.u32(fields.away_team_id);
            w.moneyline(&fields.moneyline);
        }
        Opcode::Bet { event_id, outcome } => {
            w.u32(*event_id);
            w.u8(outcome.code());
        }
        Opcode::Result {
            event_id,
            result_type,
            home_score,
            away_score,
        } => {
            w.u32(*event_id);
            w.u8(result_type.code());
            w.u32(*home_score);
            w.u32(*away_score);
        }
        Opcode::UpdateOdds {
            event_id,
            moneyline,
        } => {
            w.u32(*event_id);
            w.moneyline(moneyline);
        }
        Opcode::SpreadLine { event_id, spread } => {
            w.u32(*event_id);
            w.i32(spread.line);
            w.u32(spread.home_odds);
            w.u32(spread.away_odds);
        }
        Opcode::TotalLine { event_id, total } => {
            w.u32(*event_id);
            w.u32(total.line);
            w.u32(total.over_odds);
            w.u32(total.under_odds);
        }
    }

    Ok(w.finish())
}

/// Decode payload bytes. Unknown tags are rejected, never skipped.
pub fn decode(payload: &[u8]) -> CodecResult<Opcode> {
    if payload.len() < HEADER_SIZE {
        return Err(CodecError::Truncated);
    }
    if payload[..3] != OPCODE_PREFIX {
        return Err(CodecError::InvalidPrefix(payload[..3].to_vec()));
    }
    if payload[3] != OPCODE_PROTOCOL {
        return Err(CodecError::UnsupportedProtocol(payload[3]));
    }

    let tag = payload[4];
    let mut r = Reader::new(&payload[HEADER_SIZE..]);

    let opcode = match tag {
        TAG_MAPPING => {
            let code = r.u8()?;
            let category = MappingType::from_code(code).ok_or(CodecError::InvalidField {
                field: "mapping category",
                value: u32::from(code),
            })?;
            let id = r.u32()?;
            let name = r.str()?;
            Opcode::Mapping { category, id, name }
        }
        TAG_EVENT => Opcode::Event(NewEvent {
            event_id: r.u32()?,
            start_time: r.u64()?,
            sport_id: r.u32()?,
            tournament_id: r.u32()?,
            round_id: r.u32()?,
            home_team_id: r.u32()?,
            away_team_id: r.u32()?,
            moneyline: r.moneyline()?,
        }),
        TAG_BET => {
            let event_id = r.u32()?;
            let code = r.u8()?;
            let outcome = Outcome::from_code(code).ok_or(CodecError::InvalidField {
                field: "outcome",
                value: u32::from(code),
            })?;
            Opcode::Bet { event_id, outcome }
        }
        TAG_RESULT => {
            let event_id = r.u32()?;
            let code = r.u8()?;
            let result_type = ResultType::from_code(code).ok_or(CodecError::InvalidField {
                field: "result type",
                value: u32::from(code),
            })?;
            Opcode::Result {
                event_id,
                result_type,
                home_score: r.u32()?,
                away_score: r.u32()?,
            }
        }
        TAG_UPDATE_ODDS => Opcode::UpdateOdds {
            event_id: r.u32()?,
            moneyline: r.moneyline()?,
        },
        TAG_SPREAD_LINE => Opcode::SpreadLine {
            event_id: r.u32()?,
            spread: SpreadLine {
                line: r.i32()?,
                home_odds: r.u32()?,
                away_odds: r.u32()?,
            },
        },
        TAG_TOTAL_LINE => Opcode::TotalLine {
            event_id: r.u32()?,
            total: TotalLine {
                line: r.u32()?,
                over_odds: r.u32()?,
                under_odds: r.u32()?,
            },
        },
        other => return Err(CodecError::UnknownTag(other)),
    };

    r.finish()?;
    Ok(opcode)
}

fn tag_of(opcode: &Opcode) -> u8 {
    match opcode {
        Opcode::Mapping { .. } => TAG_MAPPING,
        Opcode::Event(_) => TAG_EVENT,
        Opcode::Bet { .. } => TAG_BET,
        Opcode::Result { .. } => TAG_RESULT,
        Opcode::UpdateOdds { .. } => TAG_UPDATE_ODDS,
        Opcode::SpreadLine { .. } => TAG_SPREAD_LINE,
        Opcode::TotalLine { .. } => TAG_TOTAL_LINE,
    }
}

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn with_header(tag: u8) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&OPCODE_PREFIX);
        buf.push(OPCODE_PROTOCOL);
        buf.push(tag);
        Self { buf }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn str(&mut self, s: &str) -> CodecResult<()> {
        if s.len() > MAX_NAME_LEN {
            return Err(CodecError::NameTooLong(s.len()));
        }
        self.buf.extend_from_slice(&(s.len() as u16).to_le_bytes());
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    fn moneyline(&mut self, m: &Moneyline) {
        self.u32(m.home_odds);
        self.u32(m.away_odds);
        self.u32(m.draw_odds);
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let end = self.pos.checked_add(N).ok_or(CodecError::Truncated)?;
        let slice = self.buf.get(self.pos..end).ok_or(CodecError::Truncated)?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn u8(&mut self) -> CodecResult<u8> {
        Ok(self.take::<1>()?[0])
    }

    fn u16(&mut self) -> CodecResult<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn i32(&mut self) -> CodecResult<i32> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn u64(&mut self) -> CodecResult<u64> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn str(&mut self) -> CodecResult<String> {
        let len = usize::from(self.u16()?);
        if len > MAX_NAME_LEN {
            return Err(CodecError::NameTooLong(len));
        }
        let end = self.pos.checked_add(len).ok_or(CodecError::Truncated)?;
        let bytes = self.buf.get(self.pos..end).ok_or(CodecError::Truncated)?;
        self.pos = end;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    fn moneyline(&mut self) -> CodecResult<Moneyline> {
        Ok(Moneyline {
            home_odds: self.u32()?,
            away_odds: self.u32()?,
            draw_odds: self.u32()?,
        })
    }

    fn finish(self) -> CodecResult<()> {
        let remaining = self.buf.len() - self.pos;
        if remaining > 0 {
            return Err(CodecError::TrailingBytes(remaining));
        }
        Ok(())
    }
}
