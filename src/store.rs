use crate::repositories::{BetRepository, EventRepository, MappingRepository, PayoutRepository};

/// Replicated betting state owned by the settlement pipeline.
///
/// Constructed empty at genesis and passed by reference into each pipeline
/// stage; independent instances back replay and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainState {
    pub mappings: MappingRepository,
    pub events: EventRepository,
    pub bets: BetRepository,
    pub payouts: PayoutRepository,
    /// Height of the last connected block, `None` at genesis
    pub tip_height: Option<u64>,
}

impl ChainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start journaling writes so the block can be undone.
    ///
    /// Only the entries a block touches are recorded, so connecting a block
    /// costs the same at any chain height.
    pub(crate) fn begin_block(&mut self) {
        self.mappings.begin();
        self.events.begin();
        self.bets.begin();
        self.payouts.begin();
    }

    /// Keep the block's writes and advance the tip
    pub(crate) fn commit_block(&mut self, height: u64) {
        self.mappings.commit();
        self.events.commit();
        self.bets.commit();
        self.payouts.commit();
        self.tip_height = Some(height);
    }

    /// Undo every write since `begin_block`
    pub(crate) fn rollback_block(&mut self) {
        self.payouts.rollback();
        self.bets.rollback();
        self.events.rollback();
        self.mappings.rollback();
    }
}
