use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::domain::{FieldDefinition, FieldKey, RecordId};
use crate::mutation::MutationCoordinator;
use crate::validation::{Verdict, validate};

use super::error::FieldError;
use super::policy::DiscardPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Viewing,
    Editing,
    Saving,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Mode::Viewing => "viewing",
            Mode::Editing => "editing",
            Mode::Saving => "saving",
        };
        f.write_str(label)
    }
}

/// Local state of one open editor. Exists only between open and close.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    pub original: Value,
    pub draft: Value,
    pub saving: bool,
    pub validation_error: Option<String>,
    pub save_error: Option<String>,
}

impl FieldState {
    fn seeded(committed: Value) -> Self {
        Self {
            original: committed.clone(),
            draft: committed,
            saving: false,
            validation_error: None,
            save_error: None,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.saving {
            Mode::Saving
        } else {
            Mode::Editing
        }
    }

    /// Validation errors win over save errors.
    pub fn error(&self) -> Option<&str> {
        self.validation_error
            .as_deref()
            .or(self.save_error.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// A rule rejected the draft; nothing was sent.
    Invalid(String),
    /// The draft matched the original; nothing was sent and the editor closed.
    Unchanged,
    /// The write succeeded with this committed value.
    Saved(Value),
    /// The write failed; the editor is open again with the draft intact.
    Failed(String),
}

impl SaveOutcome {
    pub fn closed_editor(&self) -> bool {
        matches!(self, SaveOutcome::Unchanged | SaveOutcome::Saved(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Closed,
    /// The discard confirmation declined; the draft is still open.
    Kept,
}

/// Per-field state machine: `Viewing → Editing → Saving → Viewing | Editing`.
pub struct FieldController {
    record: RecordId,
    definition: Rc<FieldDefinition>,
    coordinator: MutationCoordinator,
    discard: DiscardPolicy,
    state: RefCell<Option<FieldState>>,
}

impl fmt::Debug for FieldController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldController")
            .field("record", &self.record)
            .field("field", &self.definition.name)
            .field("state", &self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl FieldController {
    pub fn new(
        record: RecordId,
        definition: impl Into<Rc<FieldDefinition>>,
        coordinator: MutationCoordinator,
    ) -> Self {
        Self {
            record,
            definition: definition.into(),
            coordinator,
            discard: DiscardPolicy::default(),
            state: RefCell::new(None),
        }
    }

    pub fn with_discard_policy(mut self, policy: DiscardPolicy) -> Self {
        self.discard = policy;
        self
    }

    pub fn record(&self) -> &RecordId {
        &self.record
    }

    pub fn definition(&self) -> &FieldDefinition {
        &self.definition
    }

    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    pub fn key(&self) -> FieldKey {
        FieldKey::new(self.record.clone(), self.definition.name.clone())
    }

    /// The value currently in the record cache for this field.
    pub fn committed(&self) -> Value {
        self.coordinator
            .cache()
            .field(&self.record, &self.definition.name)
            .unwrap_or_else(|| self.definition.kind.empty_value())
    }

    pub fn mode(&self) -> Mode {
        self.state
            .borrow()
            .as_ref()
            .map_or(Mode::Viewing, FieldState::mode)
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn state(&self) -> Option<FieldState> {
        self.state.borrow().clone()
    }

    pub fn draft(&self) -> Option<Value> {
        self.state.borrow().as_ref().map(|state| state.draft.clone())
    }

    pub fn error(&self) -> Option<String> {
        self.state
            .borrow()
            .as_ref()
            .and_then(|state| state.error().map(str::to_string))
    }

    pub fn is_dirty(&self) -> bool {
        self.state.borrow().as_ref().is_some_and(|state| {
            let kind = self.definition.kind;
            !kind.same_value(&kind.normalize(&state.draft), &kind.normalize(&state.original))
        })
    }

    /// Open the editor, seeding the draft from the committed value.
    /// Calling it while already editing re-seeds and drops the unsaved draft.
    pub fn start_edit(&self) -> Result<(), FieldError> {
        if self.mode() == Mode::Saving {
            return Err(FieldError::SaveInFlight);
        }
        let committed = self.committed();
        trace!(field = %self.definition.name, "start edit");
        *self.state.borrow_mut() = Some(FieldState::seeded(committed));
        Ok(())
    }

    pub fn update_draft(&self, value: Value) -> Result<(), FieldError> {
        self.edit_draft(|draft| *draft = value)
    }

    /// Mutate the draft in place. Clears the validation error, keeps the save error.
    pub fn edit_draft(&self, edit: impl FnOnce(&mut Value)) -> Result<(), FieldError> {
        let mut guard = self.state.borrow_mut();
        let state = editing_state(&mut guard, "update the draft")?;
        edit(&mut state.draft);
        state.validation_error = None;
        Ok(())
    }

    /// Leave Editing, asking the discard policy first when the draft is dirty.
    pub fn cancel(&self) -> Result<CancelOutcome, FieldError> {
        let draft = {
            let mut guard = self.state.borrow_mut();
            editing_state(&mut guard, "cancel")?.draft.clone()
        };
        if let DiscardPolicy::Confirm(confirm) = &self.discard
            && self.is_dirty()
            && !confirm.confirm_discard(&self.definition, &draft)
        {
            return Ok(CancelOutcome::Kept);
        }
        self.close();
        Ok(CancelOutcome::Closed)
    }

    /// Leave Editing without consulting the discard policy.
    pub fn discard(&self) -> Result<(), FieldError> {
        {
            let mut guard = self.state.borrow_mut();
            editing_state(&mut guard, "discard")?;
        }
        self.close();
        Ok(())
    }

    pub async fn save(&self) -> Result<SaveOutcome, FieldError> {
        let kind = self.definition.kind;
        let value = {
            let mut guard = self.state.borrow_mut();
            let state = editing_state(&mut guard, "save")?;
            let value = kind.normalize(&state.draft);
            let rules = self.definition.effective_rules();
            if let Verdict::Invalid(message) = validate(&value, rules.as_ref()) {
                state.validation_error = Some(message.clone());
                return Ok(SaveOutcome::Invalid(message));
            }
            if kind.same_value(&value, &kind.normalize(&state.original)) {
                *guard = None;
                trace!(field = %self.definition.name, "save skipped, draft unchanged");
                return Ok(SaveOutcome::Unchanged);
            }
            state.saving = true;
            state.validation_error = None;
            state.save_error = None;
            value
        };

        let result = self
            .coordinator
            .apply(&self.record, &self.definition.name, value)
            .await;

        let mut guard = self.state.borrow_mut();
        match result {
            Ok(committed) => {
                *guard = None;
                Ok(SaveOutcome::Saved(committed))
            }
            Err(err) => {
                let message = err.to_string();
                debug!(field = %self.definition.name, error = %message, "save failed");
                let state = guard.get_or_insert_with(|| FieldState::seeded(self.committed()));
                state.saving = false;
                state.save_error = Some(message.clone());
                Ok(SaveOutcome::Failed(message))
            }
        }
    }

    fn close(&self) {
        trace!(field = %self.definition.name, "editor closed");
        *self.state.borrow_mut() = None;
    }
}

fn editing_state<'a>(
    state: &'a mut Option<FieldState>,
    operation: &'static str,
) -> Result<&'a mut FieldState, FieldError> {
    match state {
        None => Err(FieldError::transition(operation, Mode::Viewing)),
        Some(state) if state.saving => Err(FieldError::SaveInFlight),
        Some(state) => Ok(state),
    }
}
