use crossterm::event::KeyEvent;
use ratatui::text::Line;
use serde_json::Value;

use crate::domain::{FieldDefinition, FieldKind};
use crate::form::controller::FieldController;
use crate::form::error::FieldError;
use crate::form::policy::CreateFailure;
use crate::form::selector::{AutocompleteSelector, SelectorAction};

use super::helpers::{draft_text, pill, placeholder, selector_lines};
use super::palette::EditorPalette;
use super::{EditorIntent, FieldEditor};

/// Single-select pill. Choosing an option saves right away, so choosing the
/// current value again is an unchanged save that just closes the picker.
#[derive(Debug, Clone)]
pub struct SelectEditor {
    selector: AutocompleteSelector,
}

impl SelectEditor {
    pub fn new(definition: &FieldDefinition, allow_create: bool) -> Self {
        Self {
            selector: AutocompleteSelector::new(definition.candidates.iter().cloned())
                .excluding_selected(false)
                .with_create(allow_create),
        }
    }
}

impl FieldEditor for SelectEditor {
    fn kind(&self) -> FieldKind {
        FieldKind::SingleSelect
    }

    fn reset(&mut self) {
        self.selector.reset();
    }

    fn handle_key(
        &mut self,
        controller: &FieldController,
        key: &KeyEvent,
    ) -> Result<EditorIntent, FieldError> {
        let intent = match self.selector.handle_key(key, &[]) {
            SelectorAction::Ignored | SelectorAction::RemoveLast => EditorIntent::None,
            SelectorAction::Updated => EditorIntent::Updated,
            SelectorAction::Pick(option) => {
                controller.update_draft(Value::String(option))?;
                EditorIntent::Save
            }
            SelectorAction::Create(label) => EditorIntent::Create(label),
            SelectorAction::Dismiss => EditorIntent::Close,
            SelectorAction::Submit => EditorIntent::Save,
        };
        Ok(intent)
    }

    fn display_lines(&self, value: &Value, palette: &EditorPalette) -> Vec<Line<'static>> {
        let text = draft_text(value);
        if text.is_empty() {
            vec![placeholder(&palette.placeholders.empty_text)]
        } else {
            vec![Line::from(pill(&text))]
        }
    }

    fn input_lines(&self, draft: &Value, palette: &EditorPalette) -> Vec<Line<'static>> {
        let current = draft_text(draft);
        selector_lines(&self.selector, &[], Some(current.as_str()), palette)
    }

    fn selector(&self) -> Option<&AutocompleteSelector> {
        Some(&self.selector)
    }

    fn finish_create(
        &mut self,
        controller: &FieldController,
        outcome: Result<String, String>,
        on_failure: CreateFailure,
    ) -> Result<EditorIntent, FieldError> {
        match outcome {
            Ok(created) => {
                self.selector.finish_create(Ok(&created), on_failure);
                controller.update_draft(Value::String(created))?;
                Ok(EditorIntent::Save)
            }
            Err(message) => {
                self.selector.finish_create(Err(&message), on_failure);
                Ok(EditorIntent::Updated)
            }
        }
    }
}
