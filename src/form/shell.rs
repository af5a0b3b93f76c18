//! The editor shell: one [`FieldController`] plus a kind-specific
//! [`FieldEditor`], rendered as Display / Trigger / Input / Actions / Error
//! slots.
//!
//! Hosts drive it either synchronously (`handle_key` → run the returned
//! command's task on their own executor → `finish_create` / `sync_scope`)
//! or through the async convenience `dispatch_key`.

use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use futures::future::LocalBoxFuture;
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use thiserror::Error;
use tracing::{debug, trace};

use crate::domain::FieldKey;
use crate::events::{DismissHub, Dismissal, Subscription};

use super::components::{EditorIntent, EditorPalette, FieldEditor, editor_for};
use super::controller::{CancelOutcome, FieldController, Mode, SaveOutcome};
use super::error::FieldError;
use super::policy::{FieldPolicy, SaveTrigger};

/// Failure of the "create new candidate" call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CreateCandidateError {
    message: String,
}

impl CreateCandidateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Creates a new option or tag. Resolves to the value to add to the draft.
pub trait CandidateCreator {
    fn create(
        &self,
        field: &FieldKey,
        label: &str,
    ) -> LocalBoxFuture<'static, Result<String, CreateCandidateError>>;
}

/// Work the host must perform after a key press or dismissal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldCommand {
    None,
    /// Something visible changed; redraw.
    Updated,
    Save,
    Cancel,
    Create(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldResponse {
    Idle,
    Updated,
    Saved(SaveOutcome),
    Cancelled(CancelOutcome),
    Created(String),
    CreateFailed(String),
}

/// Rendered slots for one field. `trigger` shows only while Viewing;
/// `input` and `actions` only while the editor is open.
#[derive(Debug, Clone, Default)]
pub struct SlotView {
    pub display: Vec<Line<'static>>,
    pub trigger: Option<Line<'static>>,
    pub input: Vec<Line<'static>>,
    pub actions: Option<Line<'static>>,
    pub error: Option<Line<'static>>,
}

pub struct InlineField {
    controller: Rc<FieldController>,
    editor: Box<dyn FieldEditor>,
    creator: Option<Rc<dyn CandidateCreator>>,
    policy: FieldPolicy,
    palette: Arc<EditorPalette>,
    hub: Option<DismissHub>,
    subscription: Option<Subscription>,
}

impl fmt::Debug for InlineField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineField")
            .field("controller", &self.controller)
            .field("editor", &self.editor)
            .field("policy", &self.policy)
            .field("creates", &self.creator.is_some())
            .field("subscribed", &self.subscription.is_some())
            .finish_non_exhaustive()
    }
}

impl InlineField {
    pub fn new(controller: FieldController) -> Self {
        let editor = editor_for(controller.definition(), false);
        Self {
            controller: Rc::new(controller),
            editor,
            creator: None,
            policy: FieldPolicy::default(),
            palette: Arc::new(EditorPalette::default()),
            hub: None,
            subscription: None,
        }
    }

    /// Enables the "create new" affordance on selector-backed kinds.
    pub fn with_creator(mut self, creator: Rc<dyn CandidateCreator>) -> Self {
        self.editor = editor_for(self.controller.definition(), true);
        self.creator = Some(creator);
        self
    }

    pub fn with_editor(mut self, editor: Box<dyn FieldEditor>) -> Self {
        self.editor = editor;
        self
    }

    pub fn with_policy(mut self, policy: FieldPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_palette(mut self, palette: Arc<EditorPalette>) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_dismiss_hub(mut self, hub: DismissHub) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn controller(&self) -> &Rc<FieldController> {
        &self.controller
    }

    pub fn editor(&self) -> &dyn FieldEditor {
        self.editor.as_ref()
    }

    pub fn policy(&self) -> FieldPolicy {
        self.policy
    }

    pub fn key(&self) -> FieldKey {
        self.controller.key()
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Trigger slot: open (or re-open) the editor from the committed value.
    pub fn open(&mut self) -> Result<(), FieldError> {
        self.controller.start_edit()?;
        self.editor.reset();
        self.sync_scope();
        Ok(())
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> Result<FieldCommand, FieldError> {
        match self.controller.mode() {
            Mode::Saving => return Ok(FieldCommand::None),
            Mode::Viewing => {
                return match key.code {
                    KeyCode::Enter => {
                        self.open()?;
                        Ok(FieldCommand::Updated)
                    }
                    _ => Ok(FieldCommand::None),
                };
            }
            Mode::Editing => {}
        }
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('s') | KeyCode::Char('S'))
        {
            return Ok(FieldCommand::Save);
        }
        if key.code == KeyCode::Esc {
            return Ok(self.dismiss(Dismissal::Escape));
        }
        let intent = self.editor.handle_key(&self.controller, key)?;
        Ok(self.resolve(intent))
    }

    /// Escape or outside click. What it means depends on the save trigger.
    pub fn dismiss(&self, reason: Dismissal) -> FieldCommand {
        if self.controller.mode() != Mode::Editing {
            return FieldCommand::None;
        }
        trace!(field = %self.key(), ?reason, trigger = ?self.policy.save_trigger, "dismissed");
        self.close_command()
    }

    pub fn cancel(&mut self) -> Result<CancelOutcome, FieldError> {
        let outcome = self.controller.cancel()?;
        self.sync_scope();
        Ok(outcome)
    }

    /// Leave the editor without asking the discard policy.
    pub fn discard(&mut self) -> Result<(), FieldError> {
        self.controller.discard()?;
        self.sync_scope();
        Ok(())
    }

    /// The save as a detached future; call [`InlineField::sync_scope`] once it resolves.
    pub fn save_task(&self) -> impl Future<Output = Result<SaveOutcome, FieldError>> + 'static {
        let controller = Rc::clone(&self.controller);
        async move { controller.save().await }
    }

    /// `None` when no creator is configured.
    pub fn create_task(
        &self,
        label: &str,
    ) -> Option<impl Future<Output = Result<String, String>> + 'static> {
        let creator = Rc::clone(self.creator.as_ref()?);
        let key = self.key();
        let label = label.to_string();
        debug!(field = %key, %label, "creating candidate");
        Some(async move {
            creator
                .create(&key, &label)
                .await
                .map_err(|err| err.to_string())
        })
    }

    /// Hand a creation result to the editor. Results for a closed editor
    /// are dropped.
    pub fn finish_create(
        &mut self,
        outcome: Result<String, String>,
    ) -> Result<FieldCommand, FieldError> {
        if self.controller.mode() != Mode::Editing {
            debug!(field = %self.key(), "dropping creation result for closed editor");
            return Ok(FieldCommand::None);
        }
        let intent =
            self.editor
                .finish_create(&self.controller, outcome, self.policy.create_failure)?;
        Ok(self.resolve(intent))
    }

    /// Keep the dismissal subscription alive exactly while Editing.
    pub fn sync_scope(&mut self) {
        let editing = self.controller.mode() == Mode::Editing;
        match (&self.hub, editing, self.subscription.is_some()) {
            (Some(hub), true, false) => self.subscription = Some(hub.subscribe(self.key())),
            (_, false, true) => self.subscription = None,
            _ => {}
        }
    }

    pub async fn run_command(&mut self, command: FieldCommand) -> Result<FieldResponse, FieldError> {
        match command {
            FieldCommand::None => Ok(FieldResponse::Idle),
            FieldCommand::Updated => Ok(FieldResponse::Updated),
            FieldCommand::Save => self.run_save().await,
            FieldCommand::Cancel => Ok(FieldResponse::Cancelled(self.cancel()?)),
            FieldCommand::Create(label) => {
                let outcome = match self.create_task(&label) {
                    Some(task) => task.await,
                    None => Err(format!("cannot create \"{label}\" here")),
                };
                let response = match &outcome {
                    Ok(created) => FieldResponse::Created(created.clone()),
                    Err(message) => FieldResponse::CreateFailed(message.clone()),
                };
                if self.finish_create(outcome)? == FieldCommand::Save {
                    return self.run_save().await;
                }
                Ok(response)
            }
        }
    }

    pub async fn dispatch_key(&mut self, key: &KeyEvent) -> Result<FieldResponse, FieldError> {
        let command = self.handle_key(key)?;
        self.run_command(command).await
    }

    pub fn slots(&self) -> SlotView {
        let palette = self.palette.as_ref();
        let mode = self.controller.mode();
        let display = self
            .editor
            .display_lines(&self.controller.committed(), palette);
        let hint = Style::default().fg(Color::DarkGray);

        let trigger = (mode == Mode::Viewing)
            .then(|| Line::from(Span::styled(palette.slots.trigger_hint.to_string(), hint)));
        let input = self
            .controller
            .draft()
            .map(|draft| self.editor.input_lines(&draft, palette))
            .unwrap_or_default();
        let actions = match mode {
            Mode::Viewing => None,
            Mode::Editing => Some(Line::from(vec![
                Span::styled(palette.slots.save_hint.to_string(), hint),
                Span::styled("  ·  ", hint),
                Span::styled(palette.slots.cancel_hint.to_string(), hint),
            ])),
            Mode::Saving => Some(Line::from(Span::styled(
                palette.slots.saving.to_string(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ))),
        };
        let error = self.controller.error().map(|message| {
            Line::from(Span::styled(
                format!("⚠ {message}"),
                Style::default().fg(Color::Red),
            ))
        });

        SlotView {
            display,
            trigger,
            input,
            actions,
            error,
        }
    }

    async fn run_save(&mut self) -> Result<FieldResponse, FieldError> {
        let outcome = self.save_task().await;
        self.sync_scope();
        Ok(FieldResponse::Saved(outcome?))
    }

    fn resolve(&self, intent: EditorIntent) -> FieldCommand {
        match intent {
            EditorIntent::None => FieldCommand::None,
            EditorIntent::Updated => FieldCommand::Updated,
            EditorIntent::Save => FieldCommand::Save,
            EditorIntent::Close => self.close_command(),
            EditorIntent::Create(label) => FieldCommand::Create(label),
        }
    }

    fn close_command(&self) -> FieldCommand {
        match self.policy.save_trigger {
            SaveTrigger::Explicit => FieldCommand::Cancel,
            SaveTrigger::OnClose => FieldCommand::Save,
        }
    }
}
