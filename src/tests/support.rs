use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::block_on;
use futures::future::LocalBoxFuture;
use serde_json::Value;

use crate::cache::{FetchError, RecordCache, RecordSource};
use crate::domain::{FieldKey, Fields, RecordId};
use crate::form::{CandidateCreator, CreateCandidateError, FieldResponse, InlineField};
use crate::mutation::{FieldWriter, MutationCoordinator, WriteError};

pub(crate) const RECORD: &str = "inc-42";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WriteCall {
    pub record: RecordId,
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Echo,
    Transform(Value),
    Reject(String),
}

/// Records every write; replies per field, optionally held until a gate opens.
#[derive(Default)]
pub(crate) struct ScriptedWriter {
    calls: RefCell<Vec<WriteCall>>,
    replies: RefCell<HashMap<String, Reply>>,
    gates: RefCell<HashMap<String, Vec<oneshot::Receiver<()>>>>,
}

impl ScriptedWriter {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn reply(&self, field: &str, reply: Reply) {
        self.replies.borrow_mut().insert(field.to_string(), reply);
    }

    /// Hold the next write to `field` until the returned sender fires.
    pub fn gate(&self, field: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .borrow_mut()
            .entry(field.to_string())
            .or_default()
            .push(rx);
        tx
    }

    pub fn calls(&self) -> Vec<WriteCall> {
        self.calls.borrow().clone()
    }

    pub fn calls_for(&self, field: &str) -> Vec<Value> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.field == field)
            .map(|call| call.value.clone())
            .collect()
    }
}

impl FieldWriter for ScriptedWriter {
    fn write(
        &self,
        record: &RecordId,
        field: &str,
        value: Value,
    ) -> LocalBoxFuture<'static, Result<Fields, WriteError>> {
        self.calls.borrow_mut().push(WriteCall {
            record: record.clone(),
            field: field.to_string(),
            value: value.clone(),
        });
        let gate = self.gates.borrow_mut().get_mut(field).and_then(|gates| {
            if gates.is_empty() {
                None
            } else {
                Some(gates.remove(0))
            }
        });
        let reply = self
            .replies
            .borrow()
            .get(field)
            .cloned()
            .unwrap_or(Reply::Echo);
        let field = field.to_string();
        async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            let mut canonical = Fields::new();
            match reply {
                Reply::Echo => {
                    canonical.insert(field, value);
                }
                Reply::Transform(server) => {
                    canonical.insert(field, server);
                }
                Reply::Reject(message) => return Err(WriteError::rejected(message)),
            }
            Ok(canonical)
        }
        .boxed_local()
    }
}

/// In-memory authoritative store for reads.
#[derive(Default)]
pub(crate) struct MemorySource {
    records: RefCell<HashMap<RecordId, Fields>>,
    fetches: Cell<usize>,
}

impl MemorySource {
    pub fn with_record(record: &str, fields: Value) -> Rc<Self> {
        let source = Self::default();
        source
            .records
            .borrow_mut()
            .insert(RecordId::from(record), fields_of(fields));
        Rc::new(source)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

impl RecordSource for MemorySource {
    fn fetch(&self, record: &RecordId) -> LocalBoxFuture<'static, Result<Fields, FetchError>> {
        self.fetches.set(self.fetches.get() + 1);
        let result = self
            .records
            .borrow()
            .get(record)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(record.clone()));
        async move { result }.boxed_local()
    }
}

/// Creates candidates instantly, or fails every call with `failure`.
#[derive(Default)]
pub(crate) struct MemoryCreator {
    failure: Option<String>,
    calls: RefCell<Vec<(FieldKey, String)>>,
}

impl MemoryCreator {
    pub fn succeeding() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn failing(message: &str) -> Rc<Self> {
        Rc::new(Self {
            failure: Some(message.to_string()),
            calls: RefCell::default(),
        })
    }

    pub fn calls(&self) -> Vec<(FieldKey, String)> {
        self.calls.borrow().clone()
    }
}

impl CandidateCreator for MemoryCreator {
    fn create(
        &self,
        field: &FieldKey,
        label: &str,
    ) -> LocalBoxFuture<'static, Result<String, CreateCandidateError>> {
        self.calls
            .borrow_mut()
            .push((field.clone(), label.to_string()));
        let result = match &self.failure {
            Some(message) => Err(CreateCandidateError::new(message.clone())),
            None => Ok(label.trim().to_string()),
        };
        async move { result }.boxed_local()
    }
}

pub(crate) fn fields_of(value: Value) -> Fields {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        other => panic!("expected an object, got {other}"),
    }
}

pub(crate) fn record() -> RecordId {
    RecordId::from(RECORD)
}

/// Cache seeded with `fields` for [`RECORD`], plus a coordinator over a scripted writer.
pub(crate) fn fixture(fields: Value) -> (MutationCoordinator, Rc<ScriptedWriter>) {
    let cache = RecordCache::new();
    cache.seed(record(), fields_of(fields));
    let writer = ScriptedWriter::new();
    let coordinator = MutationCoordinator::new(cache, writer.clone());
    (coordinator, writer)
}

pub(crate) fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

pub(crate) fn ctrl(ch: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
}

pub(crate) fn press(field: &mut InlineField, event: KeyEvent) -> FieldResponse {
    block_on(field.dispatch_key(&event)).expect("key dispatch failed")
}

pub(crate) fn type_text(field: &mut InlineField, text: &str) {
    for ch in text.chars() {
        press(field, key(KeyCode::Char(ch)));
    }
}
