use futures::future::LocalBoxFuture;
use thiserror::Error;

use crate::domain::{Fields, RecordId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("record {0} not found")]
    NotFound(RecordId),
    #[error("failed to load record: {0}")]
    Transport(String),
}

/// Keyed record read: the authoritative state of one record.
pub trait RecordSource {
    fn fetch(&self, record: &RecordId) -> LocalBoxFuture<'static, Result<Fields, FetchError>>;
}

/// Handle for one in-flight read; only a ticket that was not cancelled may land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadTicket {
    pub(super) record: RecordId,
    pub(super) id: u64,
}

impl ReadTicket {
    pub fn record(&self) -> &RecordId {
        &self.record
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}
