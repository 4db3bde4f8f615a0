use crate::error::LedgerResult;
use crate::models::{
    EventStatus, LineUpdate, MappingType, NewEvent, ResultType, VersionResolver,
};
use crate::store::ChainState;
use std::sync::Arc;
use tracing::{debug, info};

/// Applies oracle opcodes to the mapping table and event registry
pub struct EventService {
    versions: Arc<dyn VersionResolver>,
}

impl EventService {
    pub fn new(versions: Arc<dyn VersionResolver>) -> Self {
        Self { versions }
    }

    pub fn register_mapping(
        &self,
        state: &mut ChainState,
        category: MappingType,
        id: u32,
        name: &str,
    ) -> LedgerResult<()> {
        state.mappings.register(category, id, name)?;
        debug!("Mapping registered: {}[{}] = {}", category.index_name(), id, name);
        Ok(())
    }

    pub fn create_event(
        &self,
        state: &mut ChainState,
        fields: NewEvent,
        height: u64,
    ) -> LedgerResult<()> {
        let version = self.versions.version_at(height);
        let event = state.events.create(fields, height, version)?;
        info!(
            "Event {} created at height {} (start_time={}, {})",
            event.event_id, height, event.start_time, version
        );
        Ok(())
    }

    pub fn update_line(
        &self,
        state: &mut ChainState,
        event_id: u32,
        update: LineUpdate,
        height: u64,
    ) -> LedgerResult<()> {
        let version = self.versions.version_at(height);
        state.events.update_line(event_id, update, height, version)?;
        info!("Event {} line updated at height {}: {:?}", event_id, height, update);
        Ok(())
    }

    /// Grade or void an event. Settlement runs later, once the block's
    /// remaining transactions have been applied.
    pub fn post_result(
        &self,
        state: &mut ChainState,
        event_id: u32,
        home_score: u32,
        away_score: u32,
        result_type: ResultType,
        height: u64,
    ) -> LedgerResult<EventStatus> {
        let status = state
            .events
            .post_result(event_id, home_score, away_score, result_type, height)?;
        info!(
            "Event {} result posted at height {}: {}-{} ({:?}) -> {}",
            event_id,
            height,
            home_score,
            away_score,
            result_type,
            status.as_str()
        );
        Ok(status)
    }
}
