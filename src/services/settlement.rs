use crate::config::ChainParams;
use crate::error::{inconsistency, LedgerResult};
use crate::models::{
    Bet, BetResultType, BetSettlement, Event, EventResult, Market, Outcome, PayoutEntry,
    PayoutType, ProtocolVersion, ResultType, TxRef, VersionResolver,
};
use crate::store::ChainState;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Coin precision for payout amounts
pub const AMOUNT_SCALE: u32 = 8;

/// Grading rule applied to a spread or total bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSet {
    /// Grade against the line under the version active at settlement
    Current,
    /// Bet placed under an older version: half credited as winnings, half refunded
    LegacyCompat,
}

impl RuleSet {
    pub fn select(placement: ProtocolVersion, settlement: ProtocolVersion) -> Self {
        if placement < settlement {
            RuleSet::LegacyCompat
        } else {
            RuleSet::Current
        }
    }
}

/// Settlement outcome for one bet, not yet written to state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettledBet {
    pub tx_ref: TxRef,
    pub bettor: String,
    pub outcome: Outcome,
    pub rule: RuleSet,
    pub settlement: BetSettlement,
    pub payouts: Vec<PayoutEntry>,
}

/// Every bet settled for an event at one height
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementBatch {
    pub event_id: u32,
    pub height: u64,
    pub version: ProtocolVersion,
    pub bets: Vec<SettledBet>,
}

impl SettlementBatch {
    pub fn payout_count(&self) -> usize {
        self.bets.iter().map(|b| b.payouts.len()).sum()
    }

    pub fn total_paid(&self) -> Decimal {
        self.bets
            .iter()
            .flat_map(|b| b.payouts.iter())
            .map(|p| p.amount)
            .sum()
    }
}

/// Grades bets of a resulted event and writes the payout audit log
pub struct SettlementService {
    params: Arc<ChainParams>,
    versions: Arc<dyn VersionResolver>,
}

impl SettlementService {
    pub fn new(params: Arc<ChainParams>, versions: Arc<dyn VersionResolver>) -> Self {
        Self { params, versions }
    }

    /// Compute settlements for every unsettled bet on an event without
    /// touching state. Fails if any bet cannot be resolved.
    pub fn prepare(
        &self,
        state: &ChainState,
        event_id: u32,
        height: u64,
    ) -> LedgerResult<SettlementBatch> {
        let event = state
            .events
            .find(event_id)
            .ok_or_else(|| inconsistency(format!("settling unknown event {}", event_id)))?;
        if !event.is_settled() {
            return Err(inconsistency(format!(
                "settling event {} in status {}",
                event_id,
                event.status.as_str()
            )));
        }
        let result = event
            .result
            .ok_or_else(|| inconsistency(format!("event {} has no result", event_id)))?;

        let version = self.versions.version_at(height);
        let mut bets = Vec::new();

        for bet in state.bets.unsettled_bets_for_event(event_id) {
            if state.payouts.has_payouts_for(&bet.tx_ref) {
                debug!("Bet {} already has payouts, skipping", bet.tx_ref);
                continue;
            }
            bets.push(self.settle_bet(event, &result, bet, version, height)?);
        }

        Ok(SettlementBatch {
            event_id,
            height,
            version,
            bets,
        })
    }

    /// Write a prepared batch. Bets settled in the meantime are skipped.
    pub fn commit(&self, state: &mut ChainState, batch: &SettlementBatch) -> LedgerResult<usize> {
        let mut written = 0;
        for settled in &batch.bets {
            if state.payouts.has_payouts_for(&settled.tx_ref) {
                continue;
            }
            if !state
                .bets
                .record_settlement(settled.tx_ref, settled.settlement)?
            {
                continue;
            }
            for entry in &settled.payouts {
                state.payouts.record_payout(entry.clone());
            }
            written += 1;
        }

        info!(
            "Event {} settled at height {}: {} bets, {} payouts, {} paid",
            batch.event_id,
            batch.height,
            written,
            batch.payout_count(),
            batch.total_paid()
        );
        Ok(written)
    }

    /// Prepare and commit in one step. Running it twice is a no-op.
    pub fn settle_event(
        &self,
        state: &mut ChainState,
        event_id: u32,
        height: u64,
    ) -> LedgerResult<SettlementBatch> {
        let batch = self.prepare(state, event_id, height)?;
        self.commit(state, &batch)?;
        Ok(batch)
    }

    fn settle_bet(
        &self,
        event: &Event,
        result: &EventResult,
        bet: &Bet,
        version: ProtocolVersion,
        height: u64,
    ) -> LedgerResult<SettledBet> {
        let market = bet.outcome.market();
        let rule = match market {
            Market::Moneyline => RuleSet::Current,
            Market::Spread | Market::Total => RuleSet::select(bet.placement_version, version),
        };

        let refunded = match result.result_type {
            ResultType::Standard => false,
            ResultType::EventRefund => true,
            ResultType::MoneylineRefund => market == Market::Moneyline,
            ResultType::SpreadsRefund => market == Market::Spread,
            ResultType::TotalsRefund => market == Market::Total,
        };

        let grade = if refunded {
            Grade::Refund
        } else if rule == RuleSet::LegacyCompat {
            Grade::CompatSplit
        } else {
            self.grade_current(event, result, bet)?
        };

        let payout = |payout_type: PayoutType, amount: Decimal| PayoutEntry {
            payout_type,
            bet_ref: bet.tx_ref,
            bettor: bet.bettor.clone(),
            event_id: bet.event_id,
            amount,
            settlement_height: height,
        };

        let (result_type, payouts) = match grade {
            Grade::Win { odds } => {
                let amount = self.winning_amount(bet.stake, odds).ok_or_else(|| {
                    inconsistency(format!(
                        "payout for bet {} overflows at odds {}",
                        bet.tx_ref, odds
                    ))
                })?;
                (BetResultType::Win, vec![payout(PayoutType::Win, amount)])
            }
            Grade::Lose => (BetResultType::Lose, Vec::new()),
            Grade::Push => (BetResultType::Push, vec![payout(PayoutType::Push, bet.stake)]),
            Grade::Refund => (
                BetResultType::Refund,
                vec![payout(PayoutType::Refund, bet.stake)],
            ),
            Grade::CompatSplit => {
                let win = truncate(bet.stake / Decimal::TWO);
                let refund = bet.stake - win;
                (
                    BetResultType::CompatSplit,
                    vec![
                        payout(PayoutType::Win, win),
                        payout(PayoutType::Refund, refund),
                    ],
                )
            }
        };

        debug!(
            "Bet {} on event {} ({:?}, {:?}) -> {}",
            bet.tx_ref,
            bet.event_id,
            bet.outcome,
            rule,
            result_type.as_str()
        );

        Ok(SettledBet {
            tx_ref: bet.tx_ref,
            bettor: bet.bettor.clone(),
            outcome: bet.outcome,
            rule,
            settlement: BetSettlement {
                result: result_type,
                settlement_height: height,
            },
            payouts,
        })
    }

    fn grade_current(&self, event: &Event, result: &EventResult, bet: &Bet) -> LedgerResult<Grade> {
        let grade = match bet.outcome.market() {
            Market::Moneyline => {
                let moneyline = &event.moneyline.value;
                let (winner, odds) = match result.margin().cmp(&0) {
                    Ordering::Greater => (Outcome::HomeWin, moneyline.home_odds),
                    Ordering::Less => (Outcome::AwayWin, moneyline.away_odds),
                    Ordering::Equal => (Outcome::Draw, moneyline.draw_odds),
                };
                if bet.outcome == winner {
                    Grade::Win { odds }
                } else {
                    Grade::Lose
                }
            }
            Market::Spread => {
                let spread = event.spread.as_ref().map(|s| s.value).ok_or_else(|| {
                    inconsistency(format!(
                        "spread bet {} on event {} without a spread line",
                        bet.tx_ref, event.event_id
                    ))
                })?;
                let adjusted = result.margin() * 100 + i64::from(spread.line);
                let (winner, odds) = match adjusted.cmp(&0) {
                    Ordering::Greater => (Outcome::SpreadHome, spread.home_odds),
                    Ordering::Less => (Outcome::SpreadAway, spread.away_odds),
                    Ordering::Equal => return Ok(Grade::Push),
                };
                if bet.outcome == winner {
                    Grade::Win { odds }
                } else {
                    Grade::Lose
                }
            }
            Market::Total => {
                let total = event.total.as_ref().map(|t| t.value).ok_or_else(|| {
                    inconsistency(format!(
                        "total bet {} on event {} without a total line",
                        bet.tx_ref, event.event_id
                    ))
                })?;
                let points = result.total_points() * 100;
                let (winner, odds) = match points.cmp(&u64::from(total.line)) {
                    Ordering::Greater => (Outcome::TotalOver, total.over_odds),
                    Ordering::Less => (Outcome::TotalUnder, total.under_odds),
                    Ordering::Equal => return Ok(Grade::Push),
                };
                if bet.outcome == winner {
                    Grade::Win { odds }
                } else {
                    Grade::Lose
                }
            }
        };
        Ok(grade)
    }

    /// Stake plus profit at the given odds, less commission on the profit.
    /// `None` if the amount does not fit in a `Decimal`.
    fn winning_amount(&self, stake: Decimal, odds: u32) -> Option<Decimal> {
        let profit = stake
            .checked_mul(Decimal::from(odds))?
            .checked_div(Decimal::from(self.params.odds_divisor))?;
        let fee = profit
            .checked_mul(Decimal::from(self.params.betx_permille))?
            .checked_div(Decimal::ONE_THOUSAND)?;
        let amount = stake.checked_add(profit)?.checked_sub(fee)?;
        Some(truncate(amount))
    }
}

enum Grade {
    Win { odds: u32 },
    Lose,
    Push,
    Refund,
    CompatSplit,
}

fn truncate(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::ToZero)
}
