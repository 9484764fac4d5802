//! Attendee-counter maintenance.
//!
//! `Event.attendees_count` is a cached denormalization of the matching
//! Attendance rows. It is moved only by the store's atomic increment
//! primitive (never read-modify-write) and refreshed by an authoritative
//! re-read after every attendance change. Long-term drift between the
//! counter and the true row count is not audited here.

use std::sync::Arc;

use record_store::{from_document, RecordStore, StoreResult};
use uuid::Uuid;

use crate::domain::models::{collections, fields, Event};

#[derive(Clone)]
pub struct CounterMaintainer {
    store: Arc<dyn RecordStore>,
}

impl CounterMaintainer {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Add one reserved space (called after the Attendance insert).
    pub async fn increment_attendees(&self, event_id: Uuid) -> StoreResult<()> {
        self.store
            .increment(
                collections::EVENTS,
                &event_id.to_string(),
                fields::ATTENDEES_COUNT,
                1,
            )
            .await
    }

    /// Release one reserved space (called after the Attendance delete).
    pub async fn decrement_attendees(&self, event_id: Uuid) -> StoreResult<()> {
        self.store
            .increment(
                collections::EVENTS,
                &event_id.to_string(),
                fields::ATTENDEES_COUNT,
                -1,
            )
            .await
    }

    /// Authoritative re-read of the event for cache reconciliation;
    /// `None` if the event was deleted remotely.
    pub async fn reconcile(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        match self
            .store
            .get(collections::EVENTS, &event_id.to_string())
            .await?
        {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }
}
