//! Versioned, copy-on-write appointment collection.
//!
//! Every mutation returns a new `EventSet` with a bumped version; snapshots
//! already handed to readers keep seeing the list they were given.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::CalendarError;
use crate::models::{validate_span, AppointmentEvent, EventId};

#[derive(Debug, Clone, Default)]
pub struct EventSet {
    events: Arc<Vec<AppointmentEvent>>,
    version: u64,
}

impl EventSet {
    pub fn new(events: Vec<AppointmentEvent>) -> Self {
        Self {
            events: Arc::new(events),
            version: 0,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn as_slice(&self) -> &[AppointmentEvent] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &AppointmentEvent> {
        self.events.iter()
    }

    pub fn get(&self, id: EventId) -> Option<&AppointmentEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.get(id).is_some()
    }

    /// An id not used by any event in the set.
    pub fn next_id(&self) -> EventId {
        let max = self.events.iter().map(|e| e.id.0).max().unwrap_or(0);
        EventId(max.max(0) + 1)
    }

    /// A negative id below every id in the set. Store-issued ids are
    /// positive, so these never collide with a persisted appointment.
    pub fn provisional_id(&self) -> EventId {
        let min = self.events.iter().map(|e| e.id.0).min().unwrap_or(0);
        EventId(min.min(0) - 1)
    }

    /// Replaces the whole list, e.g. after loading from the store.
    pub fn replaced_all(&self, events: Vec<AppointmentEvent>) -> Self {
        self.derive(events)
    }

    pub fn with_inserted(&self, event: AppointmentEvent) -> Result<Self, CalendarError> {
        if self.contains(event.id) {
            return Err(CalendarError::DuplicateId(event.id));
        }
        validate_span(event.start, event.end)?;
        let mut next = self.cloned();
        next.push(event);
        Ok(self.derive(next))
    }

    pub fn with_replaced(&self, event: AppointmentEvent) -> Result<Self, CalendarError> {
        validate_span(event.start, event.end)?;
        let idx = self.index_of(event.id)?;
        let mut next = self.cloned();
        next[idx] = event;
        Ok(self.derive(next))
    }

    /// Moves or resizes one event; every other field is left as is.
    pub fn with_retimed(
        &self,
        id: EventId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, CalendarError> {
        validate_span(start, end)?;
        let idx = self.index_of(id)?;
        let mut next = self.cloned();
        next[idx].start = start;
        next[idx].end = end;
        Ok(self.derive(next))
    }

    /// Swaps a locally assigned id for the one the store handed back.
    pub fn with_reassigned_id(&self, from: EventId, to: EventId) -> Result<Self, CalendarError> {
        if from == to {
            return Ok(self.clone());
        }
        if self.contains(to) {
            return Err(CalendarError::DuplicateId(to));
        }
        let idx = self.index_of(from)?;
        let mut next = self.cloned();
        next[idx].id = to;
        Ok(self.derive(next))
    }

    pub fn without(&self, id: EventId) -> Result<Self, CalendarError> {
        let idx = self.index_of(id)?;
        let mut next = self.cloned();
        next.remove(idx);
        Ok(self.derive(next))
    }

    fn index_of(&self, id: EventId) -> Result<usize, CalendarError> {
        self.events
            .iter()
            .position(|e| e.id == id)
            .ok_or(CalendarError::EventNotFound(id))
    }

    fn cloned(&self) -> Vec<AppointmentEvent> {
        self.events.as_ref().clone()
    }

    fn derive(&self, events: Vec<AppointmentEvent>) -> Self {
        Self {
            events: Arc::new(events),
            version: self.version + 1,
        }
    }
}
