use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};

/// Keys understood while no editor is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Quit,
    NextField,
    PrevField,
    Open,
    ResetStatus,
    None,
}

/// Ctrl+Q / Ctrl+C quit from anywhere, including an open editor.
pub fn is_quit(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(
            key.code,
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Char('c') | KeyCode::Char('C')
        )
}

pub fn classify(key: &KeyEvent) -> KeyCommand {
    if is_quit(key) {
        return KeyCommand::Quit;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return KeyCommand::None;
    }
    match key.code {
        KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => KeyCommand::NextField,
        KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => KeyCommand::PrevField,
        KeyCode::Enter | KeyCode::Char('e') => KeyCommand::Open,
        KeyCode::Esc => KeyCommand::ResetStatus,
        _ => KeyCommand::None,
    }
}

/// Position of a left-button press, if `event` is one.
pub fn left_click(event: &MouseEvent) -> Option<Position> {
    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(Position::new(event.column, event.row)),
        _ => None,
    }
}

/// Index of the area under `position`.
pub fn hit_test(areas: &[Rect], position: Position) -> Option<usize> {
    areas.iter().position(|area| area.contains(position))
}
