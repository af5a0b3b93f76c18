//! Applies one field write against the shared [`RecordCache`].
//!
//! Per save: cancel outstanding reads of the record, snapshot it, write the
//! new value into the single key, dispatch the network write, then either
//! keep (or reconcile) the value or restore that key from the snapshot.
//! The record is invalidated once the write settles either way.

mod writer;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{RecordCache, RecordSnapshot, WriteStamp};
use crate::domain::{Fields, RecordId};

pub use writer::{FieldWriter, WriteError};

/// Rollback bookkeeping for one dispatched write. Dropped once it settles.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub record: RecordId,
    pub field: String,
    pub previous: RecordSnapshot,
    pub new_value: Value,
    pub stamp: WriteStamp,
}

#[derive(Clone)]
pub struct MutationCoordinator {
    cache: RecordCache,
    writer: Rc<dyn FieldWriter>,
    in_flight: Rc<RefCell<HashMap<RecordId, usize>>>,
}

impl fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationCoordinator")
            .field("cache", &self.cache)
            .field("in_flight", &self.in_flight.borrow())
            .finish_non_exhaustive()
    }
}

impl MutationCoordinator {
    pub fn new(cache: RecordCache, writer: Rc<dyn FieldWriter>) -> Self {
        Self {
            cache,
            writer,
            in_flight: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    /// Writes dispatched for `record` that have not settled yet.
    pub fn in_flight(&self, record: &RecordId) -> usize {
        self.in_flight.borrow().get(record).copied().unwrap_or(0)
    }

    /// Apply `value` to `record.field`. The write is attempted exactly once.
    pub async fn apply(
        &self,
        record: &RecordId,
        field: &str,
        value: Value,
    ) -> Result<Value, WriteError> {
        let pending = self.begin(record, field, value);
        let settle = SettleGuard {
            coordinator: self,
            pending: &pending,
        };
        debug!(%record, field, "dispatching field write");
        let outcome = self
            .writer
            .write(&pending.record, &pending.field, pending.new_value.clone())
            .await;
        let result = self.finish(&pending, outcome);
        drop(settle);
        result
    }

    fn begin(&self, record: &RecordId, field: &str, value: Value) -> PendingMutation {
        self.cache.cancel_reads(record);
        let previous = self
            .cache
            .snapshot(record)
            .unwrap_or_else(|| RecordSnapshot::empty(record.clone()));
        let stamp = self.cache.set_key(record, field, value.clone());
        *self
            .in_flight
            .borrow_mut()
            .entry(record.clone())
            .or_insert(0) += 1;
        PendingMutation {
            record: record.clone(),
            field: field.to_string(),
            previous,
            new_value: value,
            stamp,
        }
    }

    fn finish(
        &self,
        pending: &PendingMutation,
        outcome: Result<Fields, WriteError>,
    ) -> Result<Value, WriteError> {
        match outcome {
            Ok(canonical) => {
                let committed = canonical
                    .get(&pending.field)
                    .cloned()
                    .unwrap_or_else(|| pending.new_value.clone());
                let reconciled = self.cache.confirm_key(
                    &pending.record,
                    &pending.field,
                    committed.clone(),
                    pending.stamp,
                );
                if reconciled {
                    debug!(
                        record = %pending.record,
                        field = %pending.field,
                        "server transformed value; reconciled"
                    );
                }
                Ok(committed)
            }
            Err(err) => {
                let restored =
                    self.cache
                        .restore_key(&pending.previous, &pending.field, pending.stamp);
                warn!(
                    record = %pending.record,
                    field = %pending.field,
                    restored,
                    error = %err,
                    "field write failed; rolled back"
                );
                Err(err)
            }
        }
    }

    fn settle(&self, pending: &PendingMutation) {
        self.cache
            .settle_key(&pending.record, &pending.field, pending.stamp);
        self.cache.invalidate(&pending.record);
        let mut in_flight = self.in_flight.borrow_mut();
        if let Some(count) = in_flight.get_mut(&pending.record) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                in_flight.remove(&pending.record);
            }
        }
    }
}

/// Runs the settle step even when the write future is dropped mid-flight.
struct SettleGuard<'a> {
    coordinator: &'a MutationCoordinator,
    pending: &'a PendingMutation,
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.settle(self.pending);
    }
}
