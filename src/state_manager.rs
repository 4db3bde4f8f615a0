use crate::models::{Bet, BetSettlement, Event, MappingEntry, PayoutEntry, TxRef};
use crate::store::ChainState;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// One step of a merkle proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Vec<u8>,
    /// Sibling is hashed on the left of the running hash
    pub sibling_is_left: bool,
}

/// Merkle proof for a bet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub bet_ref: TxRef,
    pub path: Vec<ProofStep>,
    pub leaf_hash: Vec<u8>,
}

/// Commitment over the whole ledger, plus one root per component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRoot {
    pub root: Vec<u8>,
    pub components: BTreeMap<String, Vec<u8>>,
}

impl StateRoot {
    pub fn root_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.root))
    }
}

/// Computes deterministic state roots used to compare replicas
#[derive(Debug, Clone, Copy, Default)]
pub struct StateManager;

impl StateManager {
    pub fn new() -> Self {
        Self
    }

    /// Generate the state root.
    ///
    /// Every repository iterates in key order, so equal states always hash
    /// to equal roots.
    pub fn state_root(&self, state: &ChainState) -> StateRoot {
        let mut components = BTreeMap::new();

        let mappings: Vec<Vec<u8>> = state.mappings.iter().map(|m| self.hash_mapping(&m)).collect();
        components.insert("mappings".to_string(), self.merkle_root(&mappings));

        let events: Vec<Vec<u8>> = state.events.iter().map(|e| self.hash_event(e)).collect();
        components.insert("events".to_string(), self.merkle_root(&events));

        let bets: Vec<Vec<u8>> = state.bets.iter().map(|b| self.hash_bet(b)).collect();
        components.insert("bets".to_string(), self.merkle_root(&bets));

        let settlements: Vec<Vec<u8>> = state
            .bets
            .settlements()
            .map(|(tx_ref, s)| self.hash_settlement(tx_ref, s))
            .collect();
        components.insert("settlements".to_string(), self.merkle_root(&settlements));

        let payouts: Vec<Vec<u8>> = state.payouts.iter().map(|p| self.hash_payout(p)).collect();
        components.insert("payouts".to_string(), self.merkle_root(&payouts));

        let tip = state
            .tip_height
            .map(|h| h.to_string())
            .unwrap_or_else(|| "genesis".to_string());
        let mut leaves = vec![self.hash_str(&format!("tip:{}", tip))];
        leaves.extend(components.values().cloned());

        StateRoot {
            root: self.merkle_root(&leaves),
            components,
        }
    }

    /// Proof that a bet is included in the bets component root
    pub fn bet_proof(&self, state: &ChainState, bet_ref: &TxRef) -> Option<MerkleProof> {
        let bets: Vec<&Bet> = state.bets.iter().collect();
        let index = bets.iter().position(|b| &b.tx_ref == bet_ref)?;
        let leaves: Vec<Vec<u8>> = bets.iter().map(|b| self.hash_bet(b)).collect();

        let mut path = Vec::new();
        let mut position = index;
        let mut level = leaves.clone();
        while level.len() > 1 {
            let sibling_index = if position % 2 == 0 {
                // Odd levels duplicate their last node
                (position + 1).min(level.len() - 1)
            } else {
                position - 1
            };
            path.push(ProofStep {
                sibling: level[sibling_index].clone(),
                sibling_is_left: position % 2 == 1,
            });
            level = self.next_level(&level);
            position /= 2;
        }

        Some(MerkleProof {
            bet_ref: *bet_ref,
            path,
            leaf_hash: leaves[index].clone(),
        })
    }

    /// Verify a merkle proof
    pub fn verify_proof(&self, proof: &MerkleProof, root_hash: &[u8]) -> bool {
        let mut current_hash = proof.leaf_hash.clone();

        for step in &proof.path {
            current_hash = if step.sibling_is_left {
                self.hash_pair(&step.sibling, &current_hash)
            } else {
                self.hash_pair(&current_hash, &step.sibling)
            };
        }

        current_hash == root_hash
    }

    fn merkle_root(&self, leaves: &[Vec<u8>]) -> Vec<u8> {
        if leaves.is_empty() {
            // Zero hash for empty tree
            return vec![0u8; 32];
        }

        let mut level = leaves.to_vec();
        while level.len() > 1 {
            level = self.next_level(&level);
        }
        level.swap_remove(0)
    }

    fn next_level(&self, level: &[Vec<u8>]) -> Vec<Vec<u8>> {
        level
            .chunks(2)
            .map(|pair| {
                // Duplicate last node if odd number
                let right = pair.get(1).unwrap_or(&pair[0]);
                self.hash_pair(&pair[0], right)
            })
            .collect()
    }

    fn hash_mapping(&self, mapping: &MappingEntry) -> Vec<u8> {
        self.hash_str(&format!(
            "mapping:{}:{}:{}",
            mapping.category.index_name(),
            mapping.id,
            mapping.name
        ))
    }

    fn hash_event(&self, event: &Event) -> Vec<u8> {
        let ml = &event.moneyline;
        let spread = event
            .spread
            .map(|s| {
                format!(
                    "{}:{}:{}@{}/{}",
                    s.value.line, s.value.home_odds, s.value.away_odds, s.height, s.version
                )
            })
            .unwrap_or_default();
        let total = event
            .total
            .map(|t| {
                format!(
                    "{}:{}:{}@{}/{}",
                    t.value.line, t.value.over_odds, t.value.under_odds, t.height, t.version
                )
            })
            .unwrap_or_default();
        let result = event
            .result
            .map(|r| {
                format!(
                    "{}:{}:{}@{}",
                    r.home_score,
                    r.away_score,
                    r.result_type.code(),
                    r.height
                )
            })
            .unwrap_or_default();

        self.hash_str(&format!(
            "event:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}@{}/{}|{}|{}|{}|{}|{}",
            event.event_id,
            event.start_time,
            event.sport_id,
            event.tournament_id,
            event.round_id,
            event.home_team_id,
            event.away_team_id,
            ml.value.home_odds,
            ml.value.away_odds,
            ml.value.draw_odds,
            ml.height,
            ml.version,
            spread,
            total,
            event.status.as_str(),
            result,
            event.created_height
        ))
    }

    /// Hash a bet into a leaf node
    fn hash_bet(&self, bet: &Bet) -> Vec<u8> {
        self.hash_str(&format!(
            "bet:{}:{}:{}:{}:{}:{}:{}",
            bet.tx_ref,
            bet.bettor,
            bet.event_id,
            bet.outcome.code(),
            bet.stake.normalize(),
            bet.placement_height,
            bet.placement_version
        ))
    }

    fn hash_settlement(&self, tx_ref: &TxRef, settlement: &BetSettlement) -> Vec<u8> {
        self.hash_str(&format!(
            "settlement:{}:{}:{}",
            tx_ref,
            settlement.result.as_str(),
            settlement.settlement_height
        ))
    }

    fn hash_payout(&self, payout: &PayoutEntry) -> Vec<u8> {
        self.hash_str(&format!(
            "payout:{}:{}:{}:{}:{}:{}",
            payout.payout_type.as_str(),
            payout.bet_ref,
            payout.bettor,
            payout.event_id,
            payout.amount.normalize(),
            payout.settlement_height
        ))
    }

    fn hash_str(&self, data: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hasher.finalize().to_vec()
    }

    /// Hash a pair of hashes
    fn hash_pair(&self, left: &[u8], right: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(left);
        hasher.update(right);
        hasher.finalize().to_vec()
    }
}
