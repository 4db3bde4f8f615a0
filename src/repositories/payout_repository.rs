use crate::models::{PayoutEntry, TxRef};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Append-only payout audit log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayoutRepository {
    entries: Vec<PayoutEntry>,
    by_bet: BTreeMap<TxRef, Vec<usize>>,
    by_height: BTreeMap<u64, Vec<usize>>,
    /// Log length at `begin`, while a block is open
    checkpoint: Option<usize>,
}

impl PayoutRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_payout(&mut self, entry: PayoutEntry) {
        let index = self.entries.len();
        self.by_bet.entry(entry.bet_ref).or_default().push(index);
        self.by_height
            .entry(entry.settlement_height)
            .or_default()
            .push(index);
        self.entries.push(entry);
    }

    pub(crate) fn begin(&mut self) {
        self.checkpoint = Some(self.entries.len());
    }

    pub(crate) fn commit(&mut self) {
        self.checkpoint = None;
    }

    /// Truncate the log back to its length at `begin`
    pub(crate) fn rollback(&mut self) {
        if let Some(len) = self.checkpoint.take() {
            let len = len.min(self.entries.len());
            for entry in self.entries.split_off(len).into_iter().rev() {
                unlink(&mut self.by_bet, entry.bet_ref);
                unlink(&mut self.by_height, entry.settlement_height);
            }
        }
    }

    pub fn has_payouts_for(&self, bet_ref: &TxRef) -> bool {
        self.by_bet.contains_key(bet_ref)
    }

    /// Entries referencing a bet, in recording order
    pub fn find_by_bet(&self, bet_ref: &TxRef) -> Vec<&PayoutEntry> {
        self.by_bet
            .get(bet_ref)
            .map(|indexes| indexes.iter().map(|i| &self.entries[*i]).collect())
            .unwrap_or_default()
    }

    pub fn total_for_bet(&self, bet_ref: &TxRef) -> Decimal {
        self.find_by_bet(bet_ref).iter().map(|e| e.amount).sum()
    }

    /// Entries settled at or after `height`
    pub fn since(&self, height: u64) -> Vec<&PayoutEntry> {
        self.by_height
            .range(height..)
            .flat_map(|(_, indexes)| indexes.iter().map(|i| &self.entries[*i]))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PayoutEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Entries are popped newest first, so the index being removed is always last
fn unlink<K: Ord>(index: &mut BTreeMap<K, Vec<usize>>, key: K) {
    if let Some(positions) = index.get_mut(&key) {
        positions.pop();
        if positions.is_empty() {
            index.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PayoutType, TxHash};

    fn entry(height: u64, bet: u8, payout_type: PayoutType, amount: i64) -> PayoutEntry {
        PayoutEntry {
            payout_type,
            bet_ref: TxRef::new(3, TxHash([bet; 32]), 1),
            bettor: "alice".to_string(),
            event_id: 10,
            amount: Decimal::new(amount, 0),
            settlement_height: height,
        }
    }

    #[test]
    fn test_lookup_by_bet_and_height() {
        let mut repo = PayoutRepository::new();
        repo.record_payout(entry(20, 1, PayoutType::Win, 200));
        repo.record_payout(entry(20, 1, PayoutType::Refund, 200));
        repo.record_payout(entry(25, 2, PayoutType::Push, 50));

        let bet_ref = TxRef::new(3, TxHash([1; 32]), 1);
        assert!(repo.has_payouts_for(&bet_ref));
        assert_eq!(repo.find_by_bet(&bet_ref).len(), 2);
        assert_eq!(repo.total_for_bet(&bet_ref), Decimal::new(400, 0));

        assert_eq!(repo.since(21).len(), 1);
        assert_eq!(repo.since(0).len(), 3);
        assert!(repo.since(26).is_empty());
    }

    #[test]
    fn test_rollback_truncates_to_checkpoint() {
        let mut repo = PayoutRepository::new();
        repo.record_payout(entry(20, 1, PayoutType::Win, 200));
        let before = repo.clone();

        repo.begin();
        repo.record_payout(entry(20, 1, PayoutType::Refund, 200));
        repo.record_payout(entry(21, 2, PayoutType::Push, 50));
        repo.rollback();

        assert_eq!(repo, before);
        assert!(repo.since(21).is_empty());
        assert!(!repo.has_payouts_for(&TxRef::new(3, TxHash([2; 32]), 1)));
    }
}
