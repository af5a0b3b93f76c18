use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};
use serde_json::Value;

use crate::domain::FieldKind;
use crate::form::controller::FieldController;
use crate::form::error::FieldError;

use super::helpers::{draft_text, handle_text_edit, input_style, placeholder};
use super::palette::EditorPalette;
use super::{EditorIntent, FieldEditor};

const FORMAT_HINT: &str = "YYYY-MM-DDTHH:MM";

/// Date/time milestone input; only date/time characters are accepted.
#[derive(Debug, Clone, Default)]
pub struct DateTimeEditor;

fn is_date_time_char(ch: char) -> bool {
    ch.is_ascii_digit() || matches!(ch, '-' | ':' | 'T' | ' ' | '.' | 'Z' | '+')
}

impl FieldEditor for DateTimeEditor {
    fn kind(&self) -> FieldKind {
        FieldKind::DateTime
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
        if handle_text_edit(&mut buffer, key, is_date_time_char) {
            controller.update_draft(Value::String(buffer))?;
            Ok(EditorIntent::Updated)
        } else {
            Ok(EditorIntent::None)
        }
    }

    fn display_lines(&self, value: &Value, palette: &EditorPalette) -> Vec<Line<'static>> {
        match value {
            Value::String(text) if !text.trim().is_empty() => vec![Line::from(vec![
                Span::styled("◷ ", Style::default().fg(Color::Magenta)),
                Span::raw(text.clone()),
            ])],
            _ => vec![placeholder(&palette.placeholders.unset_date)],
        }
    }

    fn input_lines(&self, draft: &Value, _palette: &EditorPalette) -> Vec<Line<'static>> {
        vec![Line::from(vec![
            Span::styled(format!("{}▏", draft_text(draft)), input_style()),
            Span::styled(
                format!("  {FORMAT_HINT}"),
                Style::default().fg(Color::DarkGray),
            ),
        ])]
    }
}
