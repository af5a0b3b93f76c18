use crossterm::event::{KeyCode, KeyEvent};
use ratatui::text::{Line, Span};
use serde_json::Value;

use crate::domain::FieldKind;
use crate::form::controller::FieldController;
use crate::form::error::FieldError;

use super::helpers::{draft_text, handle_text_edit, input_style, placeholder};
use super::palette::EditorPalette;
use super::{EditorIntent, FieldEditor};

/// Single-line text input. Enter saves.
#[derive(Debug, Clone, Default)]
pub struct TextEditor;

impl FieldEditor for TextEditor {
    fn kind(&self) -> FieldKind {
        FieldKind::Text
    }

    fn handle_key(
        &mut self,
        controller: &FieldController,
        key: &KeyEvent,
    ) -> Result<EditorIntent, FieldError> {
        if key.code == KeyCode::Enter {
            return Ok(EditorIntent::Save);
        }
        let mut buffer = controller.draft().map(|draft| draft_text(&draft)).unwrap_or_default();
        if handle_text_edit(&mut buffer, key, |ch| ch != '\n') {
            controller.update_draft(Value::String(buffer))?;
            Ok(EditorIntent::Updated)
        } else {
            Ok(EditorIntent::None)
        }
    }

    fn display_lines(&self, value: &Value, palette: &EditorPalette) -> Vec<Line<'static>> {
        let text = draft_text(value);
        if text.trim().is_empty() {
            vec![placeholder(&palette.placeholders.empty_text)]
        } else {
            vec![Line::from(text)]
        }
    }

    fn input_lines(&self, draft: &Value, _palette: &EditorPalette) -> Vec<Line<'static>> {
        vec![Line::from(Span::styled(
            format!("{}▏", draft_text(draft)),
            input_style(),
        ))]
    }
}
