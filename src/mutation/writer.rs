use futures::future::LocalBoxFuture;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Fields, RecordId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WriteError {
    /// The server refused the value.
    #[error("{0}")]
    Rejected(String),
    #[error("connection failed: {0}")]
    Transport(String),
}

impl WriteError {
    pub fn rejected(message: impl Into<String>) -> Self {
        WriteError::Rejected(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        WriteError::Transport(message.into())
    }
}

/// Per-field persistence call. Resolves to the canonical record after the write.
pub trait FieldWriter {
    fn write(
        &self,
        record: &RecordId,
        field: &str,
        value: Value,
    ) -> LocalBoxFuture<'static, Result<Fields, WriteError>>;
}
