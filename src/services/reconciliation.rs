use crate::models::{Bet, BetResultType, PayoutEntry, PayoutType, TxRef};
use crate::store::ChainState;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// A bet whose payout trail does not match its settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationIssue {
    pub bet_ref: TxRef,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub checked_bets: usize,
    pub issues: Vec<ReconciliationIssue>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    fn flag(&mut self, bet_ref: TxRef, detail: impl Into<String>) {
        let detail = detail.into();
        warn!("Reconciliation issue for bet {}: {}", bet_ref, detail);
        self.issues.push(ReconciliationIssue { bet_ref, detail });
    }
}

/// Check every bet on a graded or voided event against the payout log
pub fn reconcile(state: &ChainState) -> ReconciliationReport {
    let mut report = ReconciliationReport::default();

    for bet in state.bets.iter() {
        let settled_event = state
            .events
            .find(bet.event_id)
            .map_or(false, |event| event.is_settled());
        let settlement = state.bets.settlement(&bet.tx_ref);
        let payouts = state.payouts.find_by_bet(&bet.tx_ref);

        if !settled_event {
            if settlement.is_some() || !payouts.is_empty() {
                report.flag(bet.tx_ref, "settled before its event was resulted");
            }
            continue;
        }

        report.checked_bets += 1;
        let Some(settlement) = settlement else {
            report.flag(bet.tx_ref, "no settlement recorded");
            continue;
        };

        for entry in &payouts {
            if entry.bettor != bet.bettor || entry.event_id != bet.event_id {
                report.flag(
                    bet.tx_ref,
                    format!(
                        "payout entry for {} / event {} does not match bet",
                        entry.bettor, entry.event_id
                    ),
                );
            }
        }

        if let Err(detail) = check_amounts(bet, settlement.result, &payouts) {
            report.flag(bet.tx_ref, detail);
        }
    }

    let known: BTreeSet<TxRef> = state.bets.iter().map(|b| b.tx_ref).collect();
    for entry in state.payouts.iter() {
        if !known.contains(&entry.bet_ref) {
            report.flag(entry.bet_ref, "payout references no bet");
        }
    }

    info!(
        "Reconciliation checked {} bets, {} issues",
        report.checked_bets,
        report.issues.len()
    );
    report
}

fn check_amounts(bet: &Bet, result: BetResultType, payouts: &[&PayoutEntry]) -> Result<(), String> {
    let total: Decimal = payouts.iter().map(|p| p.amount).sum();
    let count = |kind: PayoutType| payouts.iter().filter(|p| p.payout_type == kind).count();

    match result {
        BetResultType::Lose => {
            if !payouts.is_empty() {
                return Err(format!("losing bet has {} payout entries", payouts.len()));
            }
        }
        BetResultType::Win => {
            if payouts.len() != 1 || count(PayoutType::Win) != 1 {
                return Err("winning bet must have exactly one win entry".to_string());
            }
            if total < bet.stake {
                return Err(format!("win of {} is below stake {}", total, bet.stake));
            }
        }
        BetResultType::Push | BetResultType::Refund => {
            let kind = if result == BetResultType::Push {
                PayoutType::Push
            } else {
                PayoutType::Refund
            };
            if payouts.len() != 1 || count(kind) != 1 {
                return Err(format!("{} must have exactly one entry", result.as_str()));
            }
            if total != bet.stake {
                return Err(format!("{} of {} does not return stake {}", result.as_str(), total, bet.stake));
            }
        }
        BetResultType::CompatSplit => {
            if count(PayoutType::Win) != 1 || count(PayoutType::Refund) != 1 || payouts.len() != 2 {
                return Err("compat split must have one win and one refund entry".to_string());
            }
            if total != bet.stake {
                return Err(format!("compat split of {} does not sum to stake {}", total, bet.stake));
            }
        }
    }
    Ok(())
}
