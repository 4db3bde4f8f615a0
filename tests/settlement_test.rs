mod helpers;

use helpers::*;
use rust_decimal::Decimal;
use sportsbook_ledger::error::ErrorCode;
use sportsbook_ledger::models::*;
use sportsbook_ledger::services::{reconcile, Applied, QueryService, RuleSet};
use sportsbook_ledger::StateManager;

/// Spread and total bets placed under v2 and resulted under v3
#[test]
fn test_version_transition_applies_legacy_split() {
    let mut chain = TestChain::new("0:2,300:3", 295);

    chain.connect(
        chain
            .next_block()
            .oracle(event(7, moneyline(15000, 25000, 0)))
            .oracle(spread_line(7, -150))
            .oracle(total_line(7, 4500)),
    );

    let block = chain
        .next_block()
        .bet("alice", 7, Outcome::SpreadHome, 400)
        .bet("bob", 7, Outcome::TotalOver, 300);
    let alice = block.tx_ref(0);
    let bob = block.tx_ref(1);
    chain.connect(block);

    chain.advance_to(300);
    let block = chain.next_block().bet("carol", 7, Outcome::SpreadAway, 200);
    let carol = block.last_ref();
    chain.connect(block);

    // home 0 - away 3: spread away covers, under hits
    let report = chain.connect(chain.next_block().oracle(result(7, 0, 3)));
    assert_eq!(report.settlements.len(), 1);
    let rules: Vec<RuleSet> = report.settlements[0].bets.iter().map(|b| b.rule).collect();
    assert_eq!(
        rules,
        vec![RuleSet::LegacyCompat, RuleSet::LegacyCompat, RuleSet::Current]
    );

    let payouts = &chain.state.payouts;
    let alice_entries = payouts.find_by_bet(&alice);
    let bob_entries = payouts.find_by_bet(&bob);
    assert_eq!(sum_of(&alice_entries, PayoutType::Win), Decimal::new(200, 0));
    assert_eq!(sum_of(&alice_entries, PayoutType::Refund), Decimal::new(200, 0));
    assert_eq!(sum_of(&bob_entries, PayoutType::Win), Decimal::new(150, 0));
    assert_eq!(sum_of(&bob_entries, PayoutType::Refund), Decimal::new(150, 0));

    let legacy_wins = sum_of(&alice_entries, PayoutType::Win) + sum_of(&bob_entries, PayoutType::Win);
    let legacy_refunds =
        sum_of(&alice_entries, PayoutType::Refund) + sum_of(&bob_entries, PayoutType::Refund);
    assert_eq!(legacy_wins + legacy_refunds, Decimal::new(700, 0));

    // carol bet under v3 and is graded against the line: 200 + 200 * 1.9
    let carol_entries = payouts.find_by_bet(&carol);
    assert_eq!(carol_entries.len(), 1);
    assert_eq!(carol_entries[0].amount, Decimal::new(580, 0));

    assert_eq!(
        chain.state.bets.settlement(&alice).unwrap().result,
        BetResultType::CompatSplit
    );
    assert!(reconcile(&chain.state).is_clean());
}

#[test]
fn test_moneyline_payout() {
    let mut chain = TestChain::new("0:3", 1);
    chain.connect(chain.next_block().oracle(event(1, moneyline(15000, 30000, 0))));

    let block = chain
        .next_block()
        .bet("alice", 1, Outcome::HomeWin, 100)
        .bet("bob", 1, Outcome::AwayWin, 100);
    let (alice, bob) = (block.tx_ref(0), block.tx_ref(1));
    chain.connect(block);
    chain.connect(chain.next_block().oracle(result(1, 2, 1)));

    let entries = chain.state.payouts.find_by_bet(&alice);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].payout_type, PayoutType::Win);
    assert_eq!(entries[0].amount, Decimal::new(250, 0));
    assert_eq!(entries[0].bet_ref, alice);

    assert!(chain.state.payouts.find_by_bet(&bob).is_empty());
    assert_eq!(
        chain.state.bets.settlement(&bob).unwrap().result,
        BetResultType::Lose
    );
    assert!(reconcile(&chain.state).is_clean());
}

#[test]
fn test_draw_rejected_without_draw_odds() {
    let mut chain = TestChain::new("0:3", 1);
    chain.connect(chain.next_block().oracle(event(1, moneyline(15000, 30000, 0))));

    let report = chain.connect(chain.next_block().bet("alice", 1, Outcome::Draw, 100));
    assert!(report.applied.is_empty());
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].code, ErrorCode::InvalidOutcomeForEvent);
    assert!(chain.state.bets.is_empty());
}

#[test]
fn test_settlement_is_idempotent() {
    let mut chain = TestChain::new("0:2,5:3", 1);
    chain.connect(
        chain
            .next_block()
            .oracle(event(1, moneyline(15000, 30000, 12000)))
            .oracle(total_line(1, 250)),
    );
    chain.connect(
        chain
            .next_block()
            .bet("alice", 1, Outcome::TotalUnder, 100)
            .bet("bob", 1, Outcome::Draw, 50),
    );
    chain.advance_to(6);
    chain.connect(chain.next_block().oracle(result(1, 1, 1)));

    let settled = chain.state.clone();
    let height = chain.state.tip_height.unwrap();
    let batch = chain
        .processor
        .settle_event(&mut chain.state, 1, height)
        .unwrap();
    assert!(batch.bets.is_empty());
    assert_eq!(chain.state, settled);
}

#[test]
fn test_event_refund_voids_and_refunds_everything() {
    let mut chain = TestChain::new("0:3", 1);
    chain.connect(
        chain
            .next_block()
            .oracle(event(1, moneyline(15000, 30000, 0)))
            .oracle(spread_line(1, 50)),
    );
    chain.connect(
        chain
            .next_block()
            .bet("alice", 1, Outcome::SpreadAway, 100)
            .bet("bob", 1, Outcome::HomeWin, 60),
    );
    let report = chain.connect(
        chain
            .next_block()
            .oracle(result_of(1, ResultType::EventRefund, 0, 0)),
    );

    assert!(matches!(
        report.applied[0].effect,
        Applied::ResultPosted {
            status: EventStatus::Voided,
            ..
        }
    ));
    assert!(chain
        .state
        .payouts
        .iter()
        .all(|p| p.payout_type == PayoutType::Refund));
    let refunded: Decimal = chain.state.payouts.iter().map(|p| p.amount).sum();
    assert_eq!(refunded, Decimal::new(160, 0));

    let info = QueryService::new(&chain.state)
        .list_payout_info(&[report.settlements[0].bets[0].tx_ref]);
    assert_eq!(info[0].payouts[0].payout_type, "Betting Refund");
}

#[test]
fn test_spread_push_returns_stake() {
    let mut chain = TestChain::new("0:3", 1);
    chain.connect(
        chain
            .next_block()
            .oracle(event(1, moneyline(15000, 30000, 0)))
            .oracle(spread_line(1, -200)),
    );
    let block = chain.next_block().bet("alice", 1, Outcome::SpreadHome, 100);
    let alice = block.last_ref();
    chain.connect(block);
    chain.connect(chain.next_block().oracle(result(1, 3, 1)));

    let entries = chain.state.payouts.find_by_bet(&alice);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].payout_type, PayoutType::Push);
    assert_eq!(entries[0].amount, Decimal::new(100, 0));
}

#[test]
fn test_odds_update_applies_at_settlement() {
    let mut chain = TestChain::new("0:3", 1);
    chain.connect(chain.next_block().oracle(event(1, moneyline(15000, 30000, 0))));
    let block = chain.next_block().bet("alice", 1, Outcome::AwayWin, 100);
    let alice = block.last_ref();
    chain.connect(block);
    chain.connect(chain.next_block().oracle(Opcode::UpdateOdds {
        event_id: 1,
        moneyline: moneyline(14000, 20000, 0),
    }));
    chain.connect(chain.next_block().oracle(result(1, 0, 1)));

    assert_eq!(
        chain.state.payouts.total_for_bet(&alice),
        Decimal::new(300, 0)
    );
}

#[test]
fn test_fatal_inconsistency_leaves_state_untouched() {
    let mut chain = TestChain::new("0:3", 1);
    chain.connect(chain.next_block().oracle(event(1, moneyline(15000, 30000, 0))));

    // A spread bet on an event that never got a spread line cannot be graded
    let orphan = TxRef::new(1, tx_hash(1, 99), 0);
    chain
        .state
        .bets
        .insert(Bet {
            bettor: "mallory".to_string(),
            event_id: 1,
            outcome: Outcome::SpreadHome,
            stake: Decimal::new(100, 0),
            placement_height: 1,
            placement_version: ProtocolVersion(3),
            tx_ref: orphan,
        })
        .unwrap();
    let before = chain.state.clone();
    let root_before = StateManager::new().state_root(&before);

    let block = chain
        .next_block()
        .oracle(mapping(MappingType::Sport, 1, "Soccer"))
        .oracle(result(1, 2, 0))
        .build();
    let err = chain.try_connect(block).unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(err.code(), ErrorCode::SettlementInconsistency);
    assert_eq!(chain.state, before);
    assert_eq!(StateManager::new().state_root(&chain.state), root_before);

    // the chain keeps going from the last good block
    let report = chain.connect(chain.next_block().bet("alice", 1, Outcome::HomeWin, 100));
    assert_eq!(report.height, 2);
    assert!(report.rejected.is_empty());
    assert_eq!(chain.state.bets.len(), 2);
    assert!(chain.state.mappings.is_empty());
}
