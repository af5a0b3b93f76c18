use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::text::{Line, Span};
use serde_json::Value;

use crate::domain::FieldKind;
use crate::form::controller::FieldController;
use crate::form::error::FieldError;

use super::helpers::{draft_text, handle_text_edit, input_style, placeholder};
use super::palette::EditorPalette;
use super::{EditorIntent, FieldEditor};

/// Multi-line text area. Enter inserts a newline; Alt+Enter saves.
#[derive(Debug, Clone, Default)]
pub struct MultilineEditor;

impl FieldEditor for MultilineEditor {
    fn kind(&self) -> FieldKind {
        FieldKind::Multiline
    }

    fn handle_key(
        &mut self,
        controller: &FieldController,
        key: &KeyEvent,
    ) -> Result<EditorIntent, FieldError> {
        let mut buffer = controller.draft().map(|draft| draft_text(&draft)).unwrap_or_default();
        let changed = match key.code {
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
                return Ok(EditorIntent::Save);
            }
            KeyCode::Enter => {
                buffer.push('\n');
                true
            }
            _ => handle_text_edit(&mut buffer, key, |_| true),
        };
        if changed {
            controller.update_draft(Value::String(buffer))?;
            Ok(EditorIntent::Updated)
        } else {
            Ok(EditorIntent::None)
        }
    }

    fn display_lines(&self, value: &Value, palette: &EditorPalette) -> Vec<Line<'static>> {
        let text = draft_text(value);
        if text.trim().is_empty() {
            return vec![placeholder(&palette.placeholders.empty_text)];
        }
        text.lines().map(|line| Line::from(line.to_string())).collect()
    }

    fn input_lines(&self, draft: &Value, _palette: &EditorPalette) -> Vec<Line<'static>> {
        let text = draft_text(draft);
        let mut lines = text
            .split('\n')
            .map(|line| Line::from(Span::styled(line.to_string(), input_style())))
            .collect::<Vec<_>>();
        if let Some(last) = lines.last_mut() {
            last.push_span(Span::styled("▏", input_style()));
        }
        lines
    }
}
