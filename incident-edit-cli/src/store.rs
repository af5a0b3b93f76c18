use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use futures::FutureExt;
use futures::future::{LocalBoxFuture, ready};
use inline_edit::domain::{FieldKey, Fields, RecordId};
use inline_edit::prelude::{
    CandidateCreator, CreateCandidateError, FetchError, FieldWriter, RecordSource, WriteError,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const ID_KEY: &str = "id";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} must contain a JSON object")]
    NotAnObject(PathBuf),
    #[error("{0} is missing a string \"id\" property")]
    MissingId(PathBuf),
}

/// Failure injection for the demo backend.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub fields: BTreeSet<String>,
    pub create: bool,
}

/// One record persisted as a JSON object on disk. Every accepted write
/// rewrites the whole file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    id: RecordId,
    fields: RefCell<Fields>,
    faults: Faults,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>, faults: Faults) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        let parse_error = |source| StoreError::Parse {
            path: path.clone(),
            source,
        };
        let value: Value = serde_json::from_str(&raw).map_err(parse_error)?;
        if !value.is_object() {
            return Err(StoreError::NotAnObject(path));
        }
        // parsed again into an ordered map so the file keeps its field order
        let mut fields: Fields = serde_json::from_str(&raw).map_err(parse_error)?;
        let id = match fields.shift_remove(ID_KEY) {
            Some(Value::String(id)) if !id.trim().is_empty() => RecordId::new(id),
            _ => return Err(StoreError::MissingId(path)),
        };
        Ok(Self {
            path,
            id,
            fields: RefCell::new(fields),
            faults,
        })
    }

    pub fn record(&self) -> &RecordId {
        &self.id
    }

    pub fn fields(&self) -> Fields {
        self.fields.borrow().clone()
    }

    fn persist(&self) -> std::io::Result<()> {
        let document = to_document(&self.id, &self.fields.borrow());
        let body = serde_json::to_string_pretty(&document).map_err(std::io::Error::other)?;
        fs::write(&self.path, body + "\n")
    }
}

/// The record as written to disk and printed on exit: `id` first, then the
/// fields in their stored order.
pub fn to_document(id: &RecordId, fields: &Fields) -> Fields {
    let mut document = Fields::with_capacity(fields.len() + 1);
    document.insert(ID_KEY.to_string(), Value::String(id.to_string()));
    for (name, value) in fields {
        document.insert(name.clone(), value.clone());
    }
    document
}

impl RecordSource for JsonFileStore {
    fn fetch(&self, record: &RecordId) -> LocalBoxFuture<'static, Result<Fields, FetchError>> {
        let result = if *record == self.id {
            Ok(self.fields())
        } else {
            Err(FetchError::NotFound(record.clone()))
        };
        ready(result).boxed_local()
    }
}

impl FieldWriter for JsonFileStore {
    fn write(
        &self,
        record: &RecordId,
        field: &str,
        value: Value,
    ) -> LocalBoxFuture<'static, Result<Fields, WriteError>> {
        if *record != self.id {
            return ready(Err(WriteError::rejected(format!("unknown record {record}"))))
                .boxed_local();
        }
        if self.faults.fields.contains(field) {
            warn!(%record, field, "rejecting write (injected fault)");
            return ready(Err(WriteError::rejected(format!(
                "the server refused to update {field}"
            ))))
            .boxed_local();
        }

        let previous = self
            .fields
            .borrow_mut()
            .insert(field.to_string(), canonical(value));
        if let Err(err) = self.persist() {
            // keep memory and disk in agreement
            let mut fields = self.fields.borrow_mut();
            match previous {
                Some(previous) => {
                    fields.insert(field.to_string(), previous);
                }
                None => {
                    fields.shift_remove(field);
                }
            }
            return ready(Err(WriteError::transport(err.to_string()))).boxed_local();
        }
        debug!(%record, field, path = %self.path.display(), "record persisted");
        ready(Ok(self.fields())).boxed_local()
    }
}

impl CandidateCreator for JsonFileStore {
    fn create(
        &self,
        field: &FieldKey,
        label: &str,
    ) -> LocalBoxFuture<'static, Result<String, CreateCandidateError>> {
        let label = label.trim().to_string();
        let result = if self.faults.create {
            warn!(%field, %label, "rejecting creation (injected fault)");
            Err(CreateCandidateError::new(format!(
                "could not create \"{label}\""
            )))
        } else if label.is_empty() {
            Err(CreateCandidateError::new("name cannot be empty"))
        } else {
            Ok(label)
        };
        ready(result).boxed_local()
    }
}

/// Server-side cleanup applied to every accepted value.
fn canonical(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(text.trim_end().to_string()),
        other => other,
    }
}
