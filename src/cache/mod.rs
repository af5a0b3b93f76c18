//! Shared, keyed record cache.
//!
//! One entry per record id, shared by every field editor rendering that
//! record. Writes go through [`RecordCache::set_key`] which touches a single
//! key; there is no operation that overwrites a record wholesale while a
//! write is pending on one of its keys.

mod audit;
mod source;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::domain::{Fields, RecordId};

pub use audit::CacheEvent;
pub use source::{FetchError, ReadTicket, RecordSource};

use audit::{AuditLog, DEFAULT_AUDIT_CAPACITY};

/// Monotonic identity of one optimistic key write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriteStamp(u64);

/// Copy of a record's cached fields taken before a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSnapshot {
    record: RecordId,
    fields: Fields,
}

impl RecordSnapshot {
    pub fn empty(record: RecordId) -> Self {
        Self {
            record,
            fields: Fields::new(),
        }
    }

    pub fn record(&self) -> &RecordId {
        &self.record
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

#[derive(Debug, Default)]
struct Entry {
    fields: Fields,
    stale: bool,
    version: u64,
    writes: HashMap<String, KeyWrites>,
}

impl Entry {
    fn show(&mut self, key: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.fields.insert(key.to_string(), value);
            }
            None => {
                self.fields.shift_remove(key);
            }
        }
        self.version += 1;
    }

    fn is_pending(&self, key: &str) -> bool {
        self.writes
            .get(key)
            .is_some_and(|writes| !writes.outstanding.is_empty())
    }
}

/// Optimistic writes to one key that have not all settled.
///
/// `base` is the value the key falls back to once every outstanding write
/// has failed: the key's value before the first of them, or the value of
/// the newest write confirmed since.
#[derive(Debug)]
struct KeyWrites {
    /// Write whose value the cache currently shows.
    owner: WriteStamp,
    base: Option<Value>,
    confirmed: Option<WriteStamp>,
    outstanding: BTreeMap<WriteStamp, Value>,
}

#[derive(Debug)]
struct CacheState {
    entries: HashMap<RecordId, Entry>,
    reads: HashMap<RecordId, Vec<u64>>,
    next_stamp: u64,
    next_read: u64,
    audit: AuditLog,
}

#[derive(Debug, Clone)]
pub struct RecordCache {
    inner: Rc<RefCell<CacheState>>,
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::with_audit_capacity(DEFAULT_AUDIT_CAPACITY)
    }
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audit_capacity(capacity: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CacheState {
                entries: HashMap::new(),
                reads: HashMap::new(),
                next_stamp: 0,
                next_read: 0,
                audit: AuditLog::with_capacity(capacity),
            })),
        }
    }

    /// Install the first fetched state of a record, replacing any entry.
    pub fn seed(&self, record: RecordId, fields: Fields) {
        let mut state = self.inner.borrow_mut();
        let entry = state.entries.entry(record.clone()).or_default();
        entry.fields = fields;
        entry.stale = false;
        entry.version += 1;
        state.audit.push(CacheEvent::Seeded { record });
    }

    pub fn get(&self, record: &RecordId) -> Option<Fields> {
        self.inner
            .borrow()
            .entries
            .get(record)
            .map(|entry| entry.fields.clone())
    }

    pub fn field(&self, record: &RecordId, key: &str) -> Option<Value> {
        self.inner
            .borrow()
            .entries
            .get(record)
            .and_then(|entry| entry.fields.get(key).cloned())
    }

    pub fn contains(&self, record: &RecordId) -> bool {
        self.inner.borrow().entries.contains_key(record)
    }

    /// Bumped on every change to the record; hosts use it to decide when to redraw.
    pub fn version(&self, record: &RecordId) -> u64 {
        self.inner
            .borrow()
            .entries
            .get(record)
            .map_or(0, |entry| entry.version)
    }

    pub fn snapshot(&self, record: &RecordId) -> Option<RecordSnapshot> {
        self.inner
            .borrow()
            .entries
            .get(record)
            .map(|entry| RecordSnapshot {
                record: record.clone(),
                fields: entry.fields.clone(),
            })
    }

    /// Optimistically write one key. Sibling keys are never touched.
    pub fn set_key(&self, record: &RecordId, key: &str, value: Value) -> WriteStamp {
        let mut state = self.inner.borrow_mut();
        state.next_stamp += 1;
        let stamp = WriteStamp(state.next_stamp);
        let entry = state.entries.entry(record.clone()).or_default();
        let current = entry.fields.get(key).cloned();
        let writes = entry
            .writes
            .entry(key.to_string())
            .or_insert_with(|| KeyWrites {
                owner: stamp,
                base: current.clone(),
                confirmed: None,
                outstanding: BTreeMap::new(),
            });
        if writes.outstanding.is_empty() {
            writes.base = current;
            writes.confirmed = None;
        }
        writes.owner = stamp;
        writes.outstanding.insert(stamp, value.clone());
        entry.show(key, Some(value));
        trace!(%record, key, stamp = stamp.0, "optimistic key write");
        state.audit.push(CacheEvent::KeySet {
            record: record.clone(),
            key: key.to_string(),
            stamp,
        });
        stamp
    }

    /// Overwrite `key` only if `stamp` is still the write the cache shows.
    pub fn replace_if_current(
        &self,
        record: &RecordId,
        key: &str,
        value: Value,
        stamp: WriteStamp,
    ) -> bool {
        let mut state = self.inner.borrow_mut();
        let Some(entry) = state.entries.get_mut(record) else {
            return false;
        };
        if entry.writes.get(key).map(|writes| writes.owner) != Some(stamp) {
            return false;
        }
        entry.show(key, Some(value));
        state.audit.push(CacheEvent::KeyReplaced {
            record: record.clone(),
            key: key.to_string(),
            stamp,
        });
        true
    }

    /// Record that the server accepted the write behind `stamp` as `committed`.
    /// The shown value is reconciled only while `stamp` still owns the key.
    pub fn confirm_key(
        &self,
        record: &RecordId,
        key: &str,
        committed: Value,
        stamp: WriteStamp,
    ) -> bool {
        let reconcile = {
            let mut state = self.inner.borrow_mut();
            let Some(writes) = state
                .entries
                .get_mut(record)
                .and_then(|entry| entry.writes.get_mut(key))
            else {
                return false;
            };
            if writes.outstanding.remove(&stamp).is_none() {
                return false;
            }
            if writes.confirmed.is_none_or(|confirmed| confirmed < stamp) {
                writes.confirmed = Some(stamp);
                writes.base = Some(committed.clone());
            }
            writes.owner == stamp
        };
        let shown = self.field(record, key);
        reconcile
            && shown.as_ref() != Some(&committed)
            && self.replace_if_current(record, key, committed, stamp)
    }

    /// Roll back the failed write behind `stamp`, unless a newer write owns
    /// the key. The key goes back to the newest older write still in flight,
    /// or to its last confirmed value, which is the snapshot's value when
    /// this write did not overlap another write to the same key.
    pub fn restore_key(&self, snapshot: &RecordSnapshot, key: &str, stamp: WriteStamp) -> bool {
        let mut state = self.inner.borrow_mut();
        let record = snapshot.record.clone();
        let restored = match state.entries.get_mut(&record) {
            Some(entry) => match entry.writes.get_mut(key) {
                Some(writes) => {
                    if writes.outstanding.remove(&stamp).is_none() {
                        false
                    } else if writes.owner == stamp {
                        let newest_outstanding = writes
                            .outstanding
                            .last_key_value()
                            .filter(|(older, _)| writes.confirmed.is_none_or(|c| c < **older))
                            .map(|(older, value)| (*older, value.clone()));
                        let fallback = match newest_outstanding {
                            Some((older, value)) => {
                                writes.owner = older;
                                Some(value)
                            }
                            None => {
                                if let Some(confirmed) = writes.confirmed {
                                    writes.owner = confirmed;
                                }
                                writes.base.clone()
                            }
                        };
                        entry.show(key, fallback);
                        true
                    } else {
                        false
                    }
                }
                None => false,
            },
            None => false,
        };
        let event = if restored {
            CacheEvent::KeyRestored {
                record,
                key: key.to_string(),
                stamp,
            }
        } else {
            CacheEvent::RestoreSkipped {
                record,
                key: key.to_string(),
                stamp,
            }
        };
        state.audit.push(event);
        restored
    }

    /// Replace the whole record with `snapshot`.
    pub fn restore(&self, snapshot: &RecordSnapshot) {
        let mut state = self.inner.borrow_mut();
        let entry = state.entries.entry(snapshot.record.clone()).or_default();
        entry.fields = snapshot.fields.clone();
        entry.version += 1;
        state.audit.push(CacheEvent::RecordRestored {
            record: snapshot.record.clone(),
        });
    }

    /// Mark the write behind `stamp` as finished so reads may land on the key again.
    pub fn settle_key(&self, record: &RecordId, key: &str, stamp: WriteStamp) {
        let mut state = self.inner.borrow_mut();
        if let Some(entry) = state.entries.get_mut(record)
            && let Some(writes) = entry.writes.get_mut(key)
        {
            writes.outstanding.remove(&stamp);
            if writes.outstanding.is_empty() {
                entry.writes.remove(key);
            }
        }
        state.audit.push(CacheEvent::KeySettled {
            record: record.clone(),
            key: key.to_string(),
            stamp,
        });
    }

    pub fn has_pending(&self, record: &RecordId) -> bool {
        self.inner.borrow().entries.get(record).is_some_and(|entry| {
            entry
                .writes
                .values()
                .any(|writes| !writes.outstanding.is_empty())
        })
    }

    pub fn invalidate(&self, record: &RecordId) {
        let mut state = self.inner.borrow_mut();
        if let Some(entry) = state.entries.get_mut(record) {
            entry.stale = true;
            state.audit.push(CacheEvent::Invalidated {
                record: record.clone(),
            });
        }
    }

    pub fn is_stale(&self, record: &RecordId) -> bool {
        self.inner
            .borrow()
            .entries
            .get(record)
            .is_some_and(|entry| entry.stale)
    }

    pub fn stale_records(&self) -> Vec<RecordId> {
        let state = self.inner.borrow();
        let mut records = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.stale)
            .map(|(record, _)| record.clone())
            .collect::<Vec<_>>();
        records.sort();
        records
    }

    pub fn begin_read(&self, record: &RecordId) -> ReadTicket {
        let mut state = self.inner.borrow_mut();
        state.next_read += 1;
        let id = state.next_read;
        state.reads.entry(record.clone()).or_default().push(id);
        state.audit.push(CacheEvent::ReadStarted {
            record: record.clone(),
            ticket: id,
        });
        ReadTicket {
            record: record.clone(),
            id,
        }
    }

    pub fn reads_in_flight(&self, record: &RecordId) -> usize {
        self.inner.borrow().reads.get(record).map_or(0, Vec::len)
    }

    /// Drop every outstanding read of `record`; their results will be discarded.
    pub fn cancel_reads(&self, record: &RecordId) -> usize {
        let mut state = self.inner.borrow_mut();
        let count = state.reads.remove(record).map_or(0, |reads| reads.len());
        if count > 0 {
            debug!(%record, count, "cancelled in-flight reads");
            state.audit.push(CacheEvent::ReadsCancelled {
                record: record.clone(),
                count,
            });
        }
        count
    }

    /// Land a fetched record. Keys with an unsettled optimistic write keep their local value.
    pub fn complete_read(&self, ticket: ReadTicket, fetched: Fields) -> bool {
        let mut state = self.inner.borrow_mut();
        let ReadTicket { record, id } = ticket;
        if !forget_read(&mut state.reads, &record, id) {
            trace!(%record, ticket = id, "discarding cancelled read");
            state.audit.push(CacheEvent::ReadDiscarded { record, ticket: id });
            return false;
        }

        let entry = state.entries.entry(record.clone()).or_default();
        let mut merged = fetched;
        for key in entry.writes.keys().filter(|key| entry.is_pending(key)) {
            match entry.fields.get(key) {
                Some(local) => {
                    merged.insert(key.clone(), local.clone());
                }
                None => {
                    merged.shift_remove(key);
                }
            }
        }
        entry.fields = merged;
        entry.stale = false;
        entry.version += 1;
        state.audit.push(CacheEvent::ReadApplied { record, ticket: id });
        true
    }

    /// Forget a read that failed without landing anything.
    pub fn abandon_read(&self, ticket: ReadTicket) {
        let mut state = self.inner.borrow_mut();
        forget_read(&mut state.reads, &ticket.record, ticket.id);
    }

    /// Fetch `record` through `source` and land it unless cancelled meanwhile.
    pub async fn refresh(
        &self,
        source: &dyn RecordSource,
        record: &RecordId,
    ) -> Result<bool, FetchError> {
        let ticket = self.begin_read(record);
        match source.fetch(record).await {
            Ok(fields) => Ok(self.complete_read(ticket, fields)),
            Err(err) => {
                self.abandon_read(ticket);
                Err(err)
            }
        }
    }

    pub fn audit(&self) -> Vec<CacheEvent> {
        self.inner.borrow().audit.snapshot()
    }

    pub fn drain_audit(&self) -> Vec<CacheEvent> {
        self.inner.borrow_mut().audit.drain()
    }
}

fn forget_read(reads: &mut HashMap<RecordId, Vec<u64>>, record: &RecordId, id: u64) -> bool {
    let Some(active) = reads.get_mut(record) else {
        return false;
    };
    let Some(position) = active.iter().position(|ticket| *ticket == id) else {
        return false;
    };
    active.swap_remove(position);
    if active.is_empty() {
        reads.remove(record);
    }
    true
}
