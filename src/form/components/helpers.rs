use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use serde_json::Value;
use unicode_width::UnicodeWidthStr;

use crate::form::selector::AutocompleteSelector;

use super::palette::EditorPalette;

/// Apply a plain editing key to `buffer`. Returns whether the buffer changed.
pub(crate) fn handle_text_edit(
    buffer: &mut String,
    key: &KeyEvent,
    accept: impl Fn(char) -> bool,
) -> bool {
    match key.code {
        KeyCode::Char(ch) => {
            if key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                || !accept(ch)
            {
                return false;
            }
            buffer.push(ch);
            true
        }
        KeyCode::Backspace => buffer.pop().is_some(),
        KeyCode::Delete => {
            let changed = !buffer.is_empty();
            buffer.clear();
            changed
        }
        _ => false,
    }
}

pub(crate) fn draft_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn input_style() -> Style {
    Style::default().fg(Color::White).add_modifier(Modifier::UNDERLINED)
}

pub(crate) fn placeholder(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    ))
}

pub(crate) fn pill(text: &str) -> Span<'static> {
    Span::styled(
        format!(" {text} "),
        Style::default().fg(Color::Black).bg(Color::Cyan),
    )
}

fn pad_to_width(text: &str, width: usize) -> String {
    let current = UnicodeWidthStr::width(text);
    let mut padded = text.to_string();
    padded.extend(std::iter::repeat_n(' ', width.saturating_sub(current)));
    padded
}

/// Query line plus one line per focusable option of `selector`.
pub(crate) fn selector_lines(
    selector: &AutocompleteSelector,
    selected: &[String],
    current: Option<&str>,
    palette: &EditorPalette,
) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::raw("› "),
        Span::styled(format!("{}▏", selector.query()), input_style()),
    ])];

    let filtered = selector.filtered(selected);
    let width = filtered
        .iter()
        .map(|candidate| UnicodeWidthStr::width(*candidate))
        .max()
        .unwrap_or(0);
    for (idx, candidate) in filtered.iter().enumerate() {
        let focused = selector.focus() == Some(idx);
        let marker = if focused { "▸ " } else { "  " };
        let mut style = Style::default();
        if focused {
            style = style.fg(Color::Black).bg(Color::Yellow);
        }
        let mut spans = vec![
            Span::raw(marker),
            Span::styled(pad_to_width(candidate, width), style),
        ];
        if current == Some(*candidate) {
            spans.push(Span::styled(" ●", Style::default().fg(Color::Green)));
        }
        lines.push(Line::from(spans));
    }

    if let Some(label) = selector.create_label(selected) {
        let focused = selector.focus() == Some(filtered.len());
        let marker = if focused { "▸ " } else { "  " };
        let mut style = Style::default().fg(Color::Green);
        if focused {
            style = style.bg(Color::Yellow).fg(Color::Black);
        }
        let text = match selector.pending_create() {
            Some(_) => format!("{} \"{label}\"", palette.selector.creating),
            None => format!("{} \"{label}\"", palette.selector.create_prefix),
        };
        lines.push(Line::from(vec![Span::raw(marker), Span::styled(text, style)]));
    } else if filtered.is_empty() {
        lines.push(placeholder(&palette.selector.no_matches));
    }

    if let Some(message) = selector.create_error() {
        lines.push(Line::from(Span::styled(
            format!("✗ {message}"),
            Style::default().fg(Color::Red),
        )));
    }
    lines
}
