use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::FieldDefinition;

/// Asked before a dirty draft is thrown away; `false` keeps the editor open.
pub trait DiscardConfirm {
    fn confirm_discard(&self, field: &FieldDefinition, draft: &Value) -> bool;
}

impl<F> DiscardConfirm for F
where
    F: Fn(&FieldDefinition, &Value) -> bool,
{
    fn confirm_discard(&self, field: &FieldDefinition, draft: &Value) -> bool {
        self(field, draft)
    }
}

#[derive(Clone, Default)]
pub enum DiscardPolicy {
    #[default]
    Immediate,
    Confirm(Rc<dyn DiscardConfirm>),
}

impl fmt::Debug for DiscardPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardPolicy::Immediate => f.write_str("Immediate"),
            DiscardPolicy::Confirm(_) => f.write_str("Confirm"),
        }
    }
}

/// What Escape and outside clicks do to an open editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveTrigger {
    /// Only the Save action persists; closing cancels.
    #[default]
    Explicit,
    /// Closing the editor saves it.
    OnClose,
}

impl FromStr for SaveTrigger {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "explicit" => Ok(SaveTrigger::Explicit),
            "on-close" | "onclose" | "on_close" => Ok(SaveTrigger::OnClose),
            other => Err(format!(
                "unknown save trigger '{other}' (expected explicit or on-close)"
            )),
        }
    }
}

/// Query handling after a candidate creation call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CreateFailure {
    #[default]
    KeepQuery,
    ClearQuery,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldPolicy {
    pub save_trigger: SaveTrigger,
    pub create_failure: CreateFailure,
}

impl FieldPolicy {
    pub fn with_save_trigger(mut self, trigger: SaveTrigger) -> Self {
        self.save_trigger = trigger;
        self
    }

    pub fn with_create_failure(mut self, behaviour: CreateFailure) -> Self {
        self.create_failure = behaviour;
        self
    }
}
