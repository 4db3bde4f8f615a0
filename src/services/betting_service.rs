use crate::config::ChainParams;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Bet, Event, Outcome, TxContext, VersionResolver};
use crate::store::ChainState;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

/// Service for validating and recording bets
pub struct BettingService {
    params: Arc<ChainParams>,
    versions: Arc<dyn VersionResolver>,
}

impl BettingService {
    pub fn new(params: Arc<ChainParams>, versions: Arc<dyn VersionResolver>) -> Self {
        Self { params, versions }
    }

    /// Place a bet carried by the transaction in `ctx`
    pub fn place_bet(
        &self,
        state: &mut ChainState,
        event_id: u32,
        outcome: Outcome,
        stake: Decimal,
        ctx: &TxContext,
    ) -> LedgerResult<Bet> {
        info!(
            "Placing bet: event={}, outcome={:?}, stake={}, tx={}",
            event_id, outcome, stake, ctx.tx_ref
        );

        // Validate stake
        if stake < self.params.min_bet || stake > self.params.max_bet {
            return Err(LedgerError::InvalidStake(stake));
        }

        // Get Event
        let event = state.events.get(event_id)?;
        if !event.is_open() {
            return Err(LedgerError::EventNotOpen {
                event_id,
                status: event.status,
            });
        }

        if !is_offered(event, outcome) {
            return Err(LedgerError::InvalidOutcomeForEvent { event_id, outcome });
        }

        let bet = Bet {
            bettor: ctx.sender.clone(),
            event_id,
            outcome,
            stake,
            placement_height: ctx.height,
            placement_version: self.versions.version_at(ctx.height),
            tx_ref: ctx.tx_ref,
        };

        state.bets.insert(bet.clone())?;
        Ok(bet)
    }
}

/// An outcome is offered when its market exists and carries non-zero odds
fn is_offered(event: &Event, outcome: Outcome) -> bool {
    let moneyline = &event.moneyline.value;
    let spread = event.spread.as_ref().map(|s| &s.value);
    let total = event.total.as_ref().map(|t| &t.value);

    match outcome {
        Outcome::HomeWin => moneyline.home_odds > 0,
        Outcome::AwayWin => moneyline.away_odds > 0,
        Outcome::Draw => moneyline.draw_odds > 0,
        Outcome::SpreadHome => spread.map_or(false, |s| s.home_odds > 0),
        Outcome::SpreadAway => spread.map_or(false, |s| s.away_odds > 0),
        Outcome::TotalOver => total.map_or(false, |t| t.over_odds > 0),
        Outcome::TotalUnder => total.map_or(false, |t| t.under_odds > 0),
    }
}
