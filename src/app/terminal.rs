//! Terminal session for the editor: raw mode, alternate screen and mouse
//! reporting. Every stage that was switched on is switched off again, in
//! reverse order, when the session drops, when setup fails halfway, or when
//! the process panics.

use std::{
    io::{self, Stdout},
    sync::{
        Once,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use anyhow::{Context, Result};
use crossterm::{
    cursor::Show,
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Frame, Terminal, backend::CrosstermBackend};

static PANIC_HOOK: Once = Once::new();
static ACTIVE: AtomicU8 = AtomicU8::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    RawMode,
    AlternateScreen,
    MouseCapture,
}

impl Stage {
    /// Undo order.
    const REVERSED: [Stage; 3] = [Stage::MouseCapture, Stage::AlternateScreen, Stage::RawMode];

    fn bit(self) -> u8 {
        match self {
            Stage::RawMode => 1,
            Stage::AlternateScreen => 1 << 1,
            Stage::MouseCapture => 1 << 2,
        }
    }

    fn undo(self, stdout: &mut Stdout) {
        let _ = match self {
            Stage::MouseCapture => execute!(stdout, DisableMouseCapture),
            Stage::AlternateScreen => execute!(stdout, LeaveAlternateScreen, Show),
            Stage::RawMode => disable_raw_mode(),
        };
    }
}

/// Stages in `flags`, in the order they must be undone.
fn stages_to_undo(flags: u8) -> impl Iterator<Item = Stage> {
    Stage::REVERSED
        .into_iter()
        .filter(move |stage| flags & stage.bit() != 0)
}

fn mark(stage: Stage) {
    ACTIVE.fetch_or(stage.bit(), Ordering::SeqCst);
}

pub struct EditorTerminal {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl EditorTerminal {
    /// Mouse capture lets clicks outside an open editor dismiss it.
    pub fn enter(capture_mouse: bool) -> Result<Self> {
        install_panic_hook();
        let session = Self::setup(capture_mouse);
        if session.is_err() {
            leave();
        }
        session
    }

    fn setup(capture_mouse: bool) -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        mark(Stage::RawMode);
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        mark(Stage::AlternateScreen);
        if capture_mouse {
            execute!(stdout, EnableMouseCapture).context("failed to enable mouse capture")?;
            mark(Stage::MouseCapture);
        }
        let terminal =
            Terminal::new(CrosstermBackend::new(stdout)).context("failed to initialize terminal")?;
        Ok(Self { terminal })
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame<'_>)) -> Result<()> {
        self.terminal
            .draw(render)
            .map(|_| ())
            .context("failed to draw frame")
    }

    /// Next input event, or `None` once `timeout` passes without one.
    pub fn next_event(&self, timeout: Duration) -> Result<Option<Event>> {
        if !event::poll(timeout).context("failed to poll terminal events")? {
            return Ok(None);
        }
        event::read()
            .map(Some)
            .context("failed to read terminal event")
    }
}

impl Drop for EditorTerminal {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        leave();
    }
}

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            leave();
            previous(panic_info);
        }));
    });
}

fn leave() {
    let flags = ACTIVE.swap(0, Ordering::SeqCst);
    let mut stdout = io::stdout();
    for stage in stages_to_undo(flags) {
        stage.undo(&mut stdout);
    }
}
