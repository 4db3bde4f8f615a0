use crate::error::{inconsistency, LedgerError, LedgerResult};
use crate::models::{Bet, BetSettlement, TxRef};
use std::collections::{BTreeMap, BTreeSet};

/// Append-only bet ledger.
///
/// Bets are keyed and iterated by `tx_ref`. Settlement outcomes are kept in a
/// separate map so the bet records themselves never change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BetRepository {
    bets: BTreeMap<TxRef, Bet>,
    by_event: BTreeMap<u32, BTreeSet<TxRef>>,
    by_bettor: BTreeMap<String, BTreeSet<TxRef>>,
    settlements: BTreeMap<TxRef, BetSettlement>,
    /// Writes since `begin`, while a block is open
    undo: Option<Vec<BetWrite>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BetWrite {
    Placed(TxRef),
    Settled(TxRef),
}

impl BetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a confirmed bet
    pub fn insert(&mut self, bet: Bet) -> LedgerResult<&Bet> {
        let key = bet.tx_ref;
        if self.bets.contains_key(&key) {
            return Err(LedgerError::DuplicateBet(key));
        }

        self.by_event.entry(bet.event_id).or_default().insert(key);
        self.by_bettor
            .entry(bet.bettor.clone())
            .or_default()
            .insert(key);
        if let Some(undo) = self.undo.as_mut() {
            undo.push(BetWrite::Placed(key));
        }
        Ok(self.bets.entry(key).or_insert(bet))
    }

    pub fn find(&self, tx_ref: &TxRef) -> Option<&Bet> {
        self.bets.get(tx_ref)
    }

    /// All bets on an event in `tx_ref` order
    pub fn find_by_event(&self, event_id: u32) -> Vec<&Bet> {
        self.by_event
            .get(&event_id)
            .map(|keys| keys.iter().filter_map(|k| self.bets.get(k)).collect())
            .unwrap_or_default()
    }

    /// Bets on an event with no recorded settlement, in `tx_ref` order
    pub fn unsettled_bets_for_event(&self, event_id: u32) -> Vec<&Bet> {
        self.find_by_event(event_id)
            .into_iter()
            .filter(|bet| !self.settlements.contains_key(&bet.tx_ref))
            .collect()
    }

    pub fn bets_for_address(&self, bettor: &str) -> Vec<&Bet> {
        self.by_bettor
            .get(bettor)
            .map(|keys| keys.iter().filter_map(|k| self.bets.get(k)).collect())
            .unwrap_or_default()
    }

    pub fn settlement(&self, tx_ref: &TxRef) -> Option<&BetSettlement> {
        self.settlements.get(tx_ref)
    }

    /// Record how a bet settled. Returns `false` if it was already settled.
    pub fn record_settlement(
        &mut self,
        tx_ref: TxRef,
        settlement: BetSettlement,
    ) -> LedgerResult<bool> {
        if !self.bets.contains_key(&tx_ref) {
            return Err(inconsistency(format!(
                "settlement recorded for unknown bet {}",
                tx_ref
            )));
        }
        if self.settlements.contains_key(&tx_ref) {
            return Ok(false);
        }
        self.settlements.insert(tx_ref, settlement);
        if let Some(undo) = self.undo.as_mut() {
            undo.push(BetWrite::Settled(tx_ref));
        }
        Ok(true)
    }

    pub(crate) fn begin(&mut self) {
        self.undo = Some(Vec::new());
    }

    pub(crate) fn commit(&mut self) {
        self.undo = None;
    }

    /// Undo every bet and settlement written since `begin`
    pub(crate) fn rollback(&mut self) {
        let Some(undo) = self.undo.take() else {
            return;
        };
        for write in undo.into_iter().rev() {
            match write {
                BetWrite::Settled(key) => {
                    self.settlements.remove(&key);
                }
                BetWrite::Placed(key) => {
                    if let Some(bet) = self.bets.remove(&key) {
                        unlink(&mut self.by_event, &bet.event_id, &key);
                        unlink(&mut self.by_bettor, &bet.bettor, &key);
                    }
                }
            }
        }
    }

    /// All bets in `tx_ref` order
    pub fn iter(&self) -> impl Iterator<Item = &Bet> {
        self.bets.values()
    }

    pub fn settlements(&self) -> impl Iterator<Item = (&TxRef, &BetSettlement)> {
        self.settlements.iter()
    }

    pub fn len(&self) -> usize {
        self.bets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }
}

fn unlink<K: Ord>(index: &mut BTreeMap<K, BTreeSet<TxRef>>, key: &K, tx_ref: &TxRef) {
    if let Some(refs) = index.get_mut(key) {
        refs.remove(tx_ref);
        if refs.is_empty() {
            index.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BetResultType, Outcome, ProtocolVersion, TxHash};
    use rust_decimal::Decimal;

    fn bet(height: u64, hash: u8, event_id: u32, bettor: &str) -> Bet {
        Bet {
            bettor: bettor.to_string(),
            event_id,
            outcome: Outcome::HomeWin,
            stake: Decimal::new(100, 0),
            placement_height: height,
            placement_version: ProtocolVersion(3),
            tx_ref: TxRef::new(height, TxHash([hash; 32]), 0),
        }
    }

    #[test]
    fn test_duplicate_tx_ref_rejected() {
        let mut repo = BetRepository::new();
        repo.insert(bet(5, 1, 1, "alice")).unwrap();
        let err = repo.insert(bet(5, 1, 1, "bob")).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateBet(_)));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_event_bets_ordered_by_tx_ref() {
        let mut repo = BetRepository::new();
        repo.insert(bet(9, 1, 1, "alice")).unwrap();
        repo.insert(bet(5, 7, 1, "bob")).unwrap();
        repo.insert(bet(5, 2, 1, "alice")).unwrap();
        repo.insert(bet(6, 2, 2, "alice")).unwrap();

        let order: Vec<(u64, u8)> = repo
            .find_by_event(1)
            .iter()
            .map(|b| (b.tx_ref.block_height, b.tx_ref.tx_hash.0[0]))
            .collect();
        assert_eq!(order, vec![(5, 2), (5, 7), (9, 1)]);
        assert_eq!(repo.bets_for_address("alice").len(), 3);
        assert!(repo.bets_for_address("carol").is_empty());
    }

    #[test]
    fn test_settlement_recorded_once() {
        let mut repo = BetRepository::new();
        let placed = bet(5, 1, 1, "alice");
        let key = placed.tx_ref;
        repo.insert(placed).unwrap();

        let settlement = BetSettlement {
            result: BetResultType::Lose,
            settlement_height: 8,
        };
        assert!(repo.record_settlement(key, settlement).unwrap());
        assert!(!repo.record_settlement(key, settlement).unwrap());
        assert!(repo.unsettled_bets_for_event(1).is_empty());
    }

    #[test]
    fn test_rollback_restores_indexes() {
        let mut repo = BetRepository::new();
        let kept = bet(5, 1, 1, "alice");
        let kept_ref = kept.tx_ref;
        repo.insert(kept).unwrap();
        let before = repo.clone();

        repo.begin();
        repo.insert(bet(6, 1, 1, "alice")).unwrap();
        repo.insert(bet(6, 2, 2, "bob")).unwrap();
        repo.record_settlement(
            kept_ref,
            BetSettlement {
                result: BetResultType::Win,
                settlement_height: 6,
            },
        )
        .unwrap();
        repo.rollback();

        assert_eq!(repo, before);
        assert!(repo.bets_for_address("bob").is_empty());
        assert_eq!(repo.unsettled_bets_for_event(1).len(), 1);
    }

    #[test]
    fn test_settlement_of_unknown_bet_is_fatal() {
        let mut repo = BetRepository::new();
        let err = repo
            .record_settlement(
                TxRef::new(1, TxHash::default(), 0),
                BetSettlement {
                    result: BetResultType::Win,
                    settlement_height: 2,
                },
            )
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
