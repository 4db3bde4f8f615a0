use crate::error::LedgerResult;
use crate::models::{Bet, BetSettlement, Event, MappingEntry, MappingType, PayoutEntry, TxRef};
use crate::store::ChainState;
use rust_decimal::Decimal;
use serde::Serialize;

/// Event with its mapping ids resolved to names where registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub sport: Option<String>,
    pub tournament: Option<String>,
    pub round: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
}

/// Bet with its settlement state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BetView {
    #[serde(flatten)]
    pub bet: Bet,
    pub settlement: Option<BetSettlement>,
    pub payout: Decimal,
}

/// One payout line as shown to wallets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutLine {
    pub payout_type: &'static str,
    pub address: String,
    pub amount: Decimal,
    pub event_id: u32,
    pub settlement_height: u64,
}

impl From<&PayoutEntry> for PayoutLine {
    fn from(entry: &PayoutEntry) -> Self {
        Self {
            payout_type: entry.payout_type.as_str(),
            address: entry.bettor.clone(),
            amount: entry.amount,
            event_id: entry.event_id,
            settlement_height: entry.settlement_height,
        }
    }
}

/// Payout lookup result for one bet reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutInfo {
    pub bet_ref: TxRef,
    pub found: bool,
    pub payouts: Vec<PayoutLine>,
}

/// Read-only projections over the ledger state
pub struct QueryService<'a> {
    state: &'a ChainState,
}

impl<'a> QueryService<'a> {
    pub fn new(state: &'a ChainState) -> Self {
        Self { state }
    }

    pub fn list_mappings(&self, category: MappingType) -> Vec<MappingEntry> {
        self.state.mappings.list(category)
    }

    /// List mappings by index name (`sports`, `rounds`, `teamnames`, `tournaments`)
    pub fn list_mappings_by_index(&self, index: &str) -> Result<Vec<MappingEntry>, String> {
        let category = MappingType::from_index_name(index)?;
        Ok(self.list_mappings(category))
    }

    pub fn resolve_mapping_id(&self, category: MappingType, name: &str) -> LedgerResult<u32> {
        self.state.mappings.resolve_id(category, name)
    }

    pub fn resolve_mapping_name(&self, category: MappingType, id: u32) -> LedgerResult<&'a str> {
        self.state.mappings.resolve_name(category, id)
    }

    /// Events in id order, optionally restricted to one sport by name
    pub fn list_events(&self, sport: Option<&str>) -> LedgerResult<Vec<EventView>> {
        let sport_id = sport
            .map(|name| self.resolve_mapping_id(MappingType::Sport, name))
            .transpose()?;

        Ok(self
            .state
            .events
            .iter()
            .filter(|event| sport_id.map_or(true, |id| event.sport_id == id))
            .map(|event| self.event_view(event))
            .collect())
    }

    pub fn get_event(&self, event_id: u32) -> LedgerResult<EventView> {
        let event = self.state.events.get(event_id)?;
        Ok(self.event_view(event))
    }

    /// Bets placed by an address, in `tx_ref` order
    pub fn list_bets_for_address(&self, address: &str) -> Vec<BetView> {
        self.state
            .bets
            .bets_for_address(address)
            .into_iter()
            .map(|bet| BetView {
                bet: bet.clone(),
                settlement: self.state.bets.settlement(&bet.tx_ref).copied(),
                payout: self.state.payouts.total_for_bet(&bet.tx_ref),
            })
            .collect()
    }

    /// Payout info for each requested bet reference, in request order
    pub fn list_payout_info(&self, refs: &[TxRef]) -> Vec<PayoutInfo> {
        refs.iter()
            .map(|bet_ref| {
                let payouts: Vec<PayoutLine> = self
                    .state
                    .payouts
                    .find_by_bet(bet_ref)
                    .into_iter()
                    .map(PayoutLine::from)
                    .collect();
                PayoutInfo {
                    bet_ref: *bet_ref,
                    found: !payouts.is_empty(),
                    payouts,
                }
            })
            .collect()
    }

    /// Payout info for every bet settled at or after `height`
    pub fn payout_info_since(&self, height: u64) -> Vec<PayoutInfo> {
        let mut grouped: Vec<PayoutInfo> = Vec::new();
        for entry in self.state.payouts.since(height) {
            match grouped.iter_mut().find(|info| info.bet_ref == entry.bet_ref) {
                Some(info) => info.payouts.push(PayoutLine::from(entry)),
                None => grouped.push(PayoutInfo {
                    bet_ref: entry.bet_ref,
                    found: true,
                    payouts: vec![PayoutLine::from(entry)],
                }),
            }
        }
        grouped
    }

    /// Payout info for the last `blocks` connected blocks
    pub fn payout_info_last_blocks(&self, blocks: u64) -> Vec<PayoutInfo> {
        match self.state.tip_height {
            Some(tip) if blocks > 0 => {
                self.payout_info_since(tip.saturating_sub(blocks.saturating_sub(1)))
            }
            _ => Vec::new(),
        }
    }

    fn event_view(&self, event: &Event) -> EventView {
        let name = |category: MappingType, id: u32| {
            self.state
                .mappings
                .resolve_name(category, id)
                .ok()
                .map(String::from)
        };
        EventView {
            event: event.clone(),
            sport: name(MappingType::Sport, event.sport_id),
            tournament: name(MappingType::Tournament, event.tournament_id),
            round: name(MappingType::Round, event.round_id),
            home_team: name(MappingType::Team, event.home_team_id),
            away_team: name(MappingType::Team, event.away_team_id),
        }
    }
}
