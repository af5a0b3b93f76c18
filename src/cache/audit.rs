use std::collections::VecDeque;

use crate::domain::RecordId;

use super::WriteStamp;

pub(super) const DEFAULT_AUDIT_CAPACITY: usize = 256;

/// Tagged record of every mutation the cache accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Seeded { record: RecordId },
    KeySet { record: RecordId, key: String, stamp: WriteStamp },
    KeyReplaced { record: RecordId, key: String, stamp: WriteStamp },
    KeyRestored { record: RecordId, key: String, stamp: WriteStamp },
    RestoreSkipped { record: RecordId, key: String, stamp: WriteStamp },
    RecordRestored { record: RecordId },
    KeySettled { record: RecordId, key: String, stamp: WriteStamp },
    Invalidated { record: RecordId },
    ReadStarted { record: RecordId, ticket: u64 },
    ReadsCancelled { record: RecordId, count: usize },
    ReadApplied { record: RecordId, ticket: u64 },
    ReadDiscarded { record: RecordId, ticket: u64 },
}

impl CacheEvent {
    pub fn record(&self) -> &RecordId {
        match self {
            CacheEvent::Seeded { record }
            | CacheEvent::KeySet { record, .. }
            | CacheEvent::KeyReplaced { record, .. }
            | CacheEvent::KeyRestored { record, .. }
            | CacheEvent::RestoreSkipped { record, .. }
            | CacheEvent::RecordRestored { record }
            | CacheEvent::KeySettled { record, .. }
            | CacheEvent::Invalidated { record }
            | CacheEvent::ReadStarted { record, .. }
            | CacheEvent::ReadsCancelled { record, .. }
            | CacheEvent::ReadApplied { record, .. }
            | CacheEvent::ReadDiscarded { record, .. } => record,
        }
    }
}

#[derive(Debug)]
pub(super) struct AuditLog {
    events: VecDeque<CacheEvent>,
    capacity: usize,
}

impl AuditLog {
    pub(super) fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(DEFAULT_AUDIT_CAPACITY)),
            capacity,
        }
    }

    pub(super) fn push(&mut self, event: CacheEvent) {
        if self.capacity == 0 {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub(super) fn snapshot(&self) -> Vec<CacheEvent> {
        self.events.iter().cloned().collect()
    }

    pub(super) fn drain(&mut self) -> Vec<CacheEvent> {
        self.events.drain(..).collect()
    }
}
