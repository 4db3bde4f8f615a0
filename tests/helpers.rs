#![allow(dead_code)]

use rust_decimal::Decimal;
use sportsbook_ledger::codec;
use sportsbook_ledger::config::ChainParams;
use sportsbook_ledger::models::*;
use sportsbook_ledger::services::BlockReport;
use sportsbook_ledger::{BlockProcessor, ChainState, LedgerResult, OracleRegistry};
use std::sync::Arc;

pub const ORACLE: &str = "oracle-1";
pub const GENESIS_TIME: u64 = 1_700_000_000;
pub const BLOCK_SPACING: u64 = 60;
/// Far enough in the future that events never lock during a test
pub const FAR_START: u64 = 1_800_000_000;

/// Deterministic transaction hash for the `index`-th transaction of a block
pub fn tx_hash(height: u64, index: u64) -> TxHash {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&height.to_be_bytes());
    bytes[8..16].copy_from_slice(&index.to_be_bytes());
    TxHash(bytes)
}

pub fn block_time(height: u64) -> u64 {
    GENESIS_TIME + height * BLOCK_SPACING
}

/// Builds one block of opcode-carrying transactions
pub struct BlockBuilder {
    height: u64,
    time: u64,
    transactions: Vec<Transaction>,
}

impl BlockBuilder {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            time: block_time(height),
            transactions: Vec::new(),
        }
    }

    pub fn at_time(mut self, time: u64) -> Self {
        self.time = time;
        self
    }

    /// Add a transaction from `sender` whose output 0 carries `payload`
    pub fn raw(mut self, sender: &str, value: Decimal, payload: Vec<u8>) -> Self {
        let hash = tx_hash(self.height, self.transactions.len() as u64);
        self.transactions.push(Transaction {
            hash,
            sender: sender.to_string(),
            outputs: vec![TxOutput::with_payload(value, payload)],
        });
        self
    }

    pub fn oracle(self, opcode: Opcode) -> Self {
        self.raw(ORACLE, Decimal::ZERO, codec::encode(&opcode).unwrap())
    }

    pub fn send(self, sender: &str, opcode: Opcode) -> Self {
        self.raw(sender, Decimal::ZERO, codec::encode(&opcode).unwrap())
    }

    pub fn bet(self, bettor: &str, event_id: u32, outcome: Outcome, stake: i64) -> Self {
        let payload = codec::encode(&Opcode::Bet { event_id, outcome }).unwrap();
        self.raw(bettor, Decimal::new(stake, 0), payload)
    }

    /// Reference of the bet carried by the `index`-th transaction
    pub fn tx_ref(&self, index: usize) -> TxRef {
        TxRef::new(self.height, tx_hash(self.height, index as u64), 0)
    }

    /// Reference of the most recently added transaction
    pub fn last_ref(&self) -> TxRef {
        self.tx_ref(self.transactions.len() - 1)
    }

    pub fn build(self) -> Block {
        Block {
            height: self.height,
            time: self.time,
            transactions: self.transactions,
        }
    }
}

/// A processor plus the state and block history it produced
pub struct TestChain {
    pub processor: BlockProcessor,
    pub state: ChainState,
    pub blocks: Vec<Block>,
    pub reports: Vec<BlockReport>,
    start_height: u64,
}

impl TestChain {
    /// Chain with the given version schedule, e.g. `"0:2,300:3"`
    pub fn new(schedule: &str, start_height: u64) -> Self {
        let params = ChainParams {
            versions: VersionSchedule::parse(schedule).expect("valid schedule"),
            ..ChainParams::default()
        };
        Self::with_params(params, start_height)
    }

    pub fn with_params(params: ChainParams, start_height: u64) -> Self {
        let oracles = Arc::new(OracleRegistry::with_addresses([ORACLE]));
        Self {
            processor: BlockProcessor::new(params, oracles),
            state: ChainState::new(),
            blocks: Vec::new(),
            reports: Vec::new(),
            start_height,
        }
    }

    pub fn next_height(&self) -> u64 {
        self.state
            .tip_height
            .map_or(self.start_height, |tip| tip + 1)
    }

    pub fn next_block(&self) -> BlockBuilder {
        BlockBuilder::new(self.next_height())
    }

    pub fn try_connect(&mut self, block: Block) -> LedgerResult<BlockReport> {
        let report = self.processor.connect_block(&mut self.state, &block)?;
        self.blocks.push(block);
        self.reports.push(report.clone());
        Ok(report)
    }

    pub fn connect(&mut self, builder: BlockBuilder) -> BlockReport {
        self.try_connect(builder.build())
            .expect("block should connect")
    }

    /// Connect empty blocks until the tip reaches `height`
    pub fn advance_to(&mut self, height: u64) {
        while self.next_height() <= height {
            let block = self.next_block();
            self.connect(block);
        }
    }
}

pub fn mapping(category: MappingType, id: u32, name: &str) -> Opcode {
    Opcode::Mapping {
        category,
        id,
        name: name.to_string(),
    }
}

pub fn event(event_id: u32, moneyline: Moneyline) -> Opcode {
    event_starting(event_id, FAR_START, moneyline)
}

pub fn event_starting(event_id: u32, start_time: u64, moneyline: Moneyline) -> Opcode {
    Opcode::Event(NewEvent {
        event_id,
        start_time,
        sport_id: 1,
        tournament_id: 1,
        round_id: 1,
        home_team_id: 5,
        away_team_id: 6,
        moneyline,
    })
}

pub fn moneyline(home_odds: u32, away_odds: u32, draw_odds: u32) -> Moneyline {
    Moneyline {
        home_odds,
        away_odds,
        draw_odds,
    }
}

pub fn spread_line(event_id: u32, line: i32) -> Opcode {
    Opcode::SpreadLine {
        event_id,
        spread: SpreadLine {
            line,
            home_odds: 19000,
            away_odds: 19000,
        },
    }
}

pub fn total_line(event_id: u32, line: u32) -> Opcode {
    Opcode::TotalLine {
        event_id,
        total: TotalLine {
            line,
            over_odds: 19000,
            under_odds: 19000,
        },
    }
}

pub fn result(event_id: u32, home_score: u32, away_score: u32) -> Opcode {
    result_of(event_id, ResultType::Standard, home_score, away_score)
}

pub fn result_of(event_id: u32, result_type: ResultType, home_score: u32, away_score: u32) -> Opcode {
    Opcode::Result {
        event_id,
        result_type,
        home_score,
        away_score,
    }
}

pub fn sum_of(entries: &[&PayoutEntry], payout_type: PayoutType) -> Decimal {
    entries
        .iter()
        .filter(|e| e.payout_type == payout_type)
        .map(|e| e.amount)
        .sum()
}
