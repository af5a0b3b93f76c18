use std::fmt;

use crossterm::event::KeyEvent;
use ratatui::text::Line;
use serde_json::Value;

use crate::domain::FieldKind;
use crate::form::controller::FieldController;
use crate::form::error::FieldError;
use crate::form::policy::CreateFailure;
use crate::form::selector::AutocompleteSelector;

use super::palette::EditorPalette;

/// What an editor wants the shell to do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorIntent {
    None,
    Updated,
    Save,
    /// Escape or an equivalent; the shell's save trigger decides.
    Close,
    Create(String),
}

/// Kind-specific input control bound to one controller's draft.
///
/// Editors hold only transient input state (query, focus). The draft itself
/// lives in the [`FieldController`] and is changed through it.
pub trait FieldEditor: fmt::Debug {
    fn kind(&self) -> FieldKind;

    /// Drop transient input state; called whenever the editor opens.
    fn reset(&mut self) {}

    fn handle_key(
        &mut self,
        controller: &FieldController,
        key: &KeyEvent,
    ) -> Result<EditorIntent, FieldError>;

    fn display_lines(&self, value: &Value, palette: &EditorPalette) -> Vec<Line<'static>>;

    fn input_lines(&self, draft: &Value, palette: &EditorPalette) -> Vec<Line<'static>>;

    fn selector(&self) -> Option<&AutocompleteSelector> {
        None
    }

    fn finish_create(
        &mut self,
        controller: &FieldController,
        outcome: Result<String, String>,
        on_failure: CreateFailure,
    ) -> Result<EditorIntent, FieldError> {
        let _ = (controller, outcome, on_failure);
        Ok(EditorIntent::None)
    }
}
