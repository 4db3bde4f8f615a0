use crate::codec;
use crate::config::ChainParams;
use crate::error::{inconsistency, ErrorCode, LedgerError, LedgerResult};
use crate::models::{
    Bet, Block, Envelope, EventStatus, LineUpdate, Opcode, OpcodeKind, Outcome, TxContext, TxRef,
    VersionResolver,
};
use crate::oracle::OracleAuthorizer;
use crate::services::betting_service::BettingService;
use crate::services::event_service::EventService;
use crate::services::settlement::{SettlementBatch, SettlementService};
use crate::store::ChainState;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// State change produced by one accepted opcode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Applied {
    MappingRegistered,
    EventCreated { event_id: u32 },
    LineUpdated { event_id: u32 },
    ResultPosted { event_id: u32, status: EventStatus },
    BetPlaced(Bet),
}

/// Opcode accepted within a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedOpcode {
    pub tx_ref: TxRef,
    pub sender: String,
    pub kind: OpcodeKind,
    pub effect: Applied,
}

/// Opcode dropped within a block. The carrying transaction itself stays valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub tx_ref: TxRef,
    pub sender: String,
    pub code: ErrorCode,
    pub message: String,
}

/// Summary of a connected block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockReport {
    pub height: u64,
    pub locked_events: Vec<u32>,
    pub applied: Vec<AppliedOpcode>,
    pub rejected: Vec<Rejection>,
    pub settlements: Vec<SettlementBatch>,
}

impl BlockReport {
    pub fn payout_count(&self) -> usize {
        self.settlements.iter().map(|s| s.payout_count()).sum()
    }
}

/// Drives decoded opcodes through the services in chain order
pub struct BlockProcessor {
    params: Arc<ChainParams>,
    oracles: Arc<dyn OracleAuthorizer>,
    event_service: EventService,
    betting_service: BettingService,
    settlement_service: SettlementService,
}

impl BlockProcessor {
    /// Create a processor that resolves versions from the configured schedule
    pub fn new(params: ChainParams, oracles: Arc<dyn OracleAuthorizer>) -> Self {
        let versions: Arc<dyn VersionResolver> = Arc::new(params.versions.clone());
        Self::with_resolver(params, oracles, versions)
    }

    pub fn with_resolver(
        params: ChainParams,
        oracles: Arc<dyn OracleAuthorizer>,
        versions: Arc<dyn VersionResolver>,
    ) -> Self {
        let params = Arc::new(params);
        Self {
            event_service: EventService::new(versions.clone()),
            betting_service: BettingService::new(params.clone(), versions.clone()),
            settlement_service: SettlementService::new(params.clone(), versions),
            params,
            oracles,
        }
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Apply one decoded opcode. Results are recorded but not settled here;
    /// `connect_block` settles once the whole block has been applied.
    pub fn apply_opcode(
        &self,
        state: &mut ChainState,
        opcode: &Opcode,
        ctx: &TxContext,
    ) -> LedgerResult<Applied> {
        let kind = opcode.kind();
        if kind.requires_oracle() && !self.oracles.is_authorized(&ctx.sender, kind) {
            return Err(LedgerError::UnauthorizedSender {
                address: ctx.sender.clone(),
                kind,
            });
        }

        match opcode {
            Opcode::Mapping { category, id, name } => {
                self.event_service
                    .register_mapping(state, *category, *id, name)?;
                Ok(Applied::MappingRegistered)
            }
            Opcode::Event(fields) => {
                self.event_service.create_event(state, *fields, ctx.height)?;
                Ok(Applied::EventCreated {
                    event_id: fields.event_id,
                })
            }
            Opcode::Bet { event_id, outcome } => {
                let bet = self.place_bet(state, *event_id, *outcome, ctx.value, ctx)?;
                Ok(Applied::BetPlaced(bet))
            }
            Opcode::Result {
                event_id,
                result_type,
                home_score,
                away_score,
            } => {
                let status = self.event_service.post_result(
                    state,
                    *event_id,
                    *home_score,
                    *away_score,
                    *result_type,
                    ctx.height,
                )?;
                Ok(Applied::ResultPosted {
                    event_id: *event_id,
                    status,
                })
            }
            Opcode::UpdateOdds {
                event_id,
                moneyline,
            } => self.update_line(state, *event_id, LineUpdate::Moneyline(*moneyline), ctx),
            Opcode::SpreadLine { event_id, spread } => {
                self.update_line(state, *event_id, LineUpdate::Spread(*spread), ctx)
            }
            Opcode::TotalLine { event_id, total } => {
                self.update_line(state, *event_id, LineUpdate::Total(*total), ctx)
            }
        }
    }

    /// Decode and apply a raw payload
    pub fn apply_envelope(&self, state: &mut ChainState, envelope: &Envelope) -> LedgerResult<Applied> {
        let opcode = codec::decode(&envelope.payload)?;
        debug!(
            "Decoded {} opcode from {} at {}",
            opcode.kind().as_str(),
            envelope.context.sender,
            envelope.context.tx_ref
        );
        self.apply_opcode(state, &opcode, &envelope.context)
    }

    pub fn place_bet(
        &self,
        state: &mut ChainState,
        event_id: u32,
        outcome: Outcome,
        stake: Decimal,
        ctx: &TxContext,
    ) -> LedgerResult<Bet> {
        self.betting_service
            .place_bet(state, event_id, outcome, stake, ctx)
    }

    /// Settle a resulted event outside of block processing
    pub fn settle_event(
        &self,
        state: &mut ChainState,
        event_id: u32,
        height: u64,
    ) -> LedgerResult<SettlementBatch> {
        self.settlement_service.settle_event(state, event_id, height)
    }

    /// Connect the next block.
    ///
    /// Non-fatal opcode errors are reported and skipped. A fatal error leaves
    /// `state` exactly as it was before the call.
    pub fn connect_block(&self, state: &mut ChainState, block: &Block) -> LedgerResult<BlockReport> {
        if let Some(tip) = state.tip_height {
            if block.height != tip + 1 {
                return Err(inconsistency(format!(
                    "block {} does not extend tip {}",
                    block.height, tip
                )));
            }
        }

        info!(
            "Connecting block {} ({} transactions)",
            block.height,
            block.transactions.len()
        );

        state.begin_block();
        match self.apply_block(state, block) {
            Ok(report) => {
                state.commit_block(block.height);
                info!(
                    "Block {} connected: {} applied, {} rejected, {} payouts",
                    block.height,
                    report.applied.len(),
                    report.rejected.len(),
                    report.payout_count()
                );
                Ok(report)
            }
            Err(e) => {
                state.rollback_block();
                Err(e)
            }
        }
    }

    /// Rebuild state from genesis
    pub fn replay(&self, blocks: &[Block]) -> LedgerResult<(ChainState, Vec<BlockReport>)> {
        let mut state = ChainState::new();
        let mut reports = Vec::with_capacity(blocks.len());
        for block in blocks {
            reports.push(self.connect_block(&mut state, block)?);
        }
        Ok((state, reports))
    }

    fn apply_block(&self, state: &mut ChainState, block: &Block) -> LedgerResult<BlockReport> {
        let locked_events = state
            .events
            .lock_started(block.time, self.params.bet_place_timeout_secs);
        if !locked_events.is_empty() {
            debug!("Block {} locked events {:?}", block.height, locked_events);
        }

        let mut applied = Vec::new();
        let mut rejected = Vec::new();
        let mut resulted = Vec::new();

        for envelope in block.envelopes() {
            let ctx = &envelope.context;
            let outcome = match codec::decode(&envelope.payload) {
                Ok(opcode) => self
                    .apply_opcode(state, &opcode, ctx)
                    .map(|effect| (opcode.kind(), effect)),
                Err(e) => Err(LedgerError::from(e)),
            };
            match outcome {
                Ok((kind, effect)) => {
                    if let Applied::ResultPosted { event_id, .. } = &effect {
                        resulted.push(*event_id);
                    }
                    applied.push(AppliedOpcode {
                        tx_ref: ctx.tx_ref,
                        sender: ctx.sender.clone(),
                        kind,
                        effect,
                    });
                }
                Err(e) if e.is_fatal() => {
                    error!("Block {} rejected at {}: {}", block.height, ctx.tx_ref, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Opcode at {} rejected: {}", ctx.tx_ref, e);
                    rejected.push(Rejection {
                        tx_ref: ctx.tx_ref,
                        sender: ctx.sender.clone(),
                        code: e.code(),
                        message: e.to_string(),
                    });
                }
            }
        }

        // Every batch must resolve before any of them is written
        let batches = resulted
            .iter()
            .map(|event_id| {
                self.settlement_service
                    .prepare(state, *event_id, block.height)
            })
            .collect::<LedgerResult<Vec<_>>>()
            .map_err(|e| {
                error!("Block {} settlement failed: {}", block.height, e);
                e
            })?;
        for batch in &batches {
            self.settlement_service.commit(state, batch)?;
        }

        Ok(BlockReport {
            height: block.height,
            locked_events,
            applied,
            rejected,
            settlements: batches,
        })
    }

    fn update_line(
        &self,
        state: &mut ChainState,
        event_id: u32,
        update: LineUpdate,
        ctx: &TxContext,
    ) -> LedgerResult<Applied> {
        self.event_service
            .update_line(state, event_id, update, ctx.height)?;
        Ok(Applied::LineUpdated { event_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Moneyline, NewEvent, ProtocolVersion, ResultType, Transaction, TxHash, TxOutput,
    };
    use crate::oracle::OracleRegistry;

    const ORACLE: &str = "oracle";

    fn processor() -> BlockProcessor {
        BlockProcessor::new(
            ChainParams::default(),
            Arc::new(OracleRegistry::with_addresses([ORACLE])),
        )
    }

    fn ctx(sender: &str, height: u64, value: i64) -> TxContext {
        TxContext {
            sender: sender.to_string(),
            height,
            block_time: 0,
            tx_ref: TxRef::new(height, TxHash([height as u8; 32]), 0),
            value: Decimal::new(value, 0),
        }
    }

    fn event_opcode(event_id: u32) -> Opcode {
        Opcode::Event(NewEvent {
            event_id,
            start_time: 2_000_000_000,
            sport_id: 0,
            tournament_id: 0,
            round_id: 0,
            home_team_id: 0,
            away_team_id: 1,
            moneyline: Moneyline {
                home_odds: 15000,
                away_odds: 20000,
                draw_odds: 30000,
            },
        })
    }

    #[test]
    fn test_oracle_opcodes_require_authorization() {
        let processor = processor();
        let mut state = ChainState::new();

        let err = processor
            .apply_opcode(&mut state, &event_opcode(1), &ctx("mallory", 1, 0))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnauthorizedSender);
        assert!(state.events.is_empty());

        let applied = processor
            .apply_opcode(&mut state, &event_opcode(1), &ctx(ORACLE, 1, 0))
            .unwrap();
        assert_eq!(applied, Applied::EventCreated { event_id: 1 });
    }

    #[test]
    fn test_bet_opcode_uses_output_value_as_stake() {
        let processor = processor();
        let mut state = ChainState::new();
        processor
            .apply_opcode(&mut state, &event_opcode(1), &ctx(ORACLE, 1, 0))
            .unwrap();

        let bet = Opcode::Bet {
            event_id: 1,
            outcome: Outcome::AwayWin,
        };
        match processor
            .apply_opcode(&mut state, &bet, &ctx("alice", 2, 80))
            .unwrap()
        {
            Applied::BetPlaced(bet) => {
                assert_eq!(bet.stake, Decimal::new(80, 0));
                assert_eq!(bet.placement_version, ProtocolVersion(3));
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_connect_block_settles_after_all_transactions() {
        let processor = processor();
        let mut state = ChainState::new();
        processor
            .apply_opcode(&mut state, &event_opcode(1), &ctx(ORACLE, 1, 0))
            .unwrap();
        processor
            .place_bet(&mut state, 1, Outcome::HomeWin, Decimal::new(100, 0), &ctx("alice", 2, 100))
            .unwrap();
        state.tip_height = Some(2);

        let result = codec::encode(&Opcode::Result {
            event_id: 1,
            result_type: ResultType::Standard,
            home_score: 2,
            away_score: 1,
        })
        .unwrap();
        let block = Block {
            height: 3,
            time: 100,
            transactions: vec![Transaction {
                hash: TxHash([3; 32]),
                sender: ORACLE.to_string(),
                outputs: vec![
                    TxOutput::plain(Decimal::ONE),
                    TxOutput::with_payload(Decimal::ZERO, result),
                    TxOutput::with_payload(Decimal::ZERO, vec![0xde, 0xad]),
                ],
            }],
        };

        let report = processor.connect_block(&mut state, &block).unwrap();
        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].code, ErrorCode::MalformedOpcode);
        assert_eq!(report.rejected[0].tx_ref.tx_out, 2);
        assert_eq!(report.payout_count(), 1);
        assert_eq!(state.tip_height, Some(3));
        assert_eq!(state.payouts.len(), 1);
    }

    #[test]
    fn test_out_of_order_block_is_fatal() {
        let processor = processor();
        let mut state = ChainState::new();
        state.tip_height = Some(5);
        let block = Block {
            height: 7,
            time: 0,
            transactions: Vec::new(),
        };

        let err = processor.connect_block(&mut state, &block).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(state.tip_height, Some(5));
    }
}
