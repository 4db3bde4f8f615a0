use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Event, EventResult, EventStatus, LineUpdate, NewEvent, ProtocolVersion, ResultType, Tagged,
};
use std::collections::{BTreeMap, BTreeSet};

/// Event registry: an arena of events keyed by `event_id`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRepository {
    events: BTreeMap<u32, Event>,
    /// Open events keyed by `(start_time, event_id)`
    open: BTreeSet<(u64, u32)>,
    /// Prior versions of events touched since `begin`, while a block is open
    undo: Option<Vec<(u32, Option<Event>)>>,
}

impl EventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new open event
    pub fn create(
        &mut self,
        fields: NewEvent,
        height: u64,
        version: ProtocolVersion,
    ) -> LedgerResult<&Event> {
        if self.events.contains_key(&fields.event_id) {
            return Err(LedgerError::DuplicateEvent(fields.event_id));
        }

        if let Some(undo) = self.undo.as_mut() {
            undo.push((fields.event_id, None));
        }
        let event = Event::new(fields, height, version);
        self.index(&event);
        Ok(self.events.entry(fields.event_id).or_insert(event))
    }

    pub fn find(&self, event_id: u32) -> Option<&Event> {
        self.events.get(&event_id)
    }

    pub fn get(&self, event_id: u32) -> LedgerResult<&Event> {
        self.find(event_id)
            .ok_or(LedgerError::UnknownEvent(event_id))
    }

    fn get_mutable(&mut self, event_id: u32) -> LedgerResult<&mut Event> {
        let event = self
            .events
            .get_mut(&event_id)
            .ok_or(LedgerError::UnknownEvent(event_id))?;

        if event.status.is_final() {
            return Err(LedgerError::EventAlreadyGraded {
                event_id,
                status: event.status,
            });
        }
        if let Some(undo) = self.undo.as_mut() {
            undo.push((event_id, Some(event.clone())));
        }
        Ok(event)
    }

    /// Replace odds or a line in place. Placed bets are unaffected because
    /// they carry no odds of their own.
    pub fn update_line(
        &mut self,
        event_id: u32,
        update: LineUpdate,
        height: u64,
        version: ProtocolVersion,
    ) -> LedgerResult<()> {
        let event = self.get_mutable(event_id)?;

        match update {
            LineUpdate::Moneyline(moneyline) => {
                event.moneyline = Tagged::new(moneyline, height, version);
            }
            LineUpdate::Spread(spread) => {
                event.spread = Some(Tagged::new(spread, height, version));
            }
            LineUpdate::Total(total) => {
                event.total = Some(Tagged::new(total, height, version));
            }
        }
        Ok(())
    }

    /// Snapshot the final score and close the event
    pub fn post_result(
        &mut self,
        event_id: u32,
        home_score: u32,
        away_score: u32,
        result_type: ResultType,
        height: u64,
    ) -> LedgerResult<EventStatus> {
        let event = self.get_mutable(event_id)?;

        event.result = Some(EventResult {
            home_score,
            away_score,
            result_type,
            height,
        });
        event.status = result_type.final_status();
        let (status, start_time) = (event.status, event.start_time);
        self.open.remove(&(start_time, event_id));
        Ok(status)
    }

    /// Close betting on open events that start within `timeout_secs` of
    /// `block_time`. Returns the ids that changed.
    pub fn lock_started(&mut self, block_time: u64, timeout_secs: u64) -> Vec<u32> {
        let cutoff = block_time.saturating_add(timeout_secs);
        let due: Vec<(u64, u32)> = self
            .open
            .range(..=(cutoff, u32::MAX))
            .copied()
            .collect();

        let mut locked = Vec::with_capacity(due.len());
        for key in due {
            self.open.remove(&key);
            if let Some(event) = self.events.get_mut(&key.1) {
                if let Some(undo) = self.undo.as_mut() {
                    undo.push((key.1, Some(event.clone())));
                }
                event.status = EventStatus::Locked;
                locked.push(key.1);
            }
        }
        locked.sort_unstable();
        locked
    }

    pub(crate) fn begin(&mut self) {
        self.undo = Some(Vec::new());
    }

    pub(crate) fn commit(&mut self) {
        self.undo = None;
    }

    /// Put back every event touched since `begin` as it was before
    pub(crate) fn rollback(&mut self) {
        if let Some(undo) = self.undo.take() {
            for (event_id, prior) in undo.into_iter().rev() {
                if let Some(current) = self.events.remove(&event_id) {
                    self.open.remove(&(current.start_time, event_id));
                }
                if let Some(event) = prior {
                    self.index(&event);
                    self.events.insert(event_id, event);
                }
            }
        }
    }

    fn index(&mut self, event: &Event) {
        if event.status == EventStatus::Open {
            self.open.insert((event.start_time, event.event_id));
        }
    }

    /// Events in id order
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
