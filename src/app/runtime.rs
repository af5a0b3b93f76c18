use std::{cell::Cell, cell::RefCell, collections::VecDeque, rc::Rc};

use anyhow::{Context, Result};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, MouseEvent};
use futures::{
    executor::{LocalPool, LocalSpawner},
    task::LocalSpawnExt,
};
use ratatui::layout::Rect;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    cache::{FetchError, RecordSource},
    domain::{FieldDefinition, Fields, RecordId},
    events::{DismissHub, Dismissal},
    form::{
        CancelOutcome, DiscardConfirm, FieldCommand, FieldError, InlineField, Mode, SaveOutcome,
    },
    mutation::MutationCoordinator,
};

use super::{
    input::{self, KeyCommand},
    options::UiOptions,
    status::StatusLine,
    terminal::EditorTerminal,
    view::{self, ViewContext},
};

const HELP_TEXT: &str = "↑/↓ move • Enter edit • Ctrl+S save • Esc close • Ctrl+Q quit";

/// First Escape on a dirty draft arms, the second one discards.
#[derive(Debug, Default)]
pub(crate) struct ArmedConfirm {
    armed: Cell<bool>,
}

impl ArmedConfirm {
    pub(crate) fn disarm(&self) {
        self.armed.set(false);
    }
}

impl DiscardConfirm for ArmedConfirm {
    fn confirm_discard(&self, _field: &FieldDefinition, _draft: &Value) -> bool {
        if self.armed.replace(false) {
            true
        } else {
            self.armed.set(true);
            false
        }
    }
}

/// Completion of work spawned on the local pool.
enum TaskEvent {
    SaveSettled {
        index: usize,
        outcome: Result<SaveOutcome, FieldError>,
    },
    CreateSettled {
        index: usize,
        outcome: Result<String, String>,
    },
    Refreshed(Result<bool, FetchError>),
}

type Inbox = Rc<RefCell<VecDeque<TaskEvent>>>;

pub(crate) struct App {
    title: String,
    record: RecordId,
    fields: Vec<InlineField>,
    selected: usize,
    coordinator: MutationCoordinator,
    source: Rc<dyn RecordSource>,
    hub: DismissHub,
    options: UiOptions,
    status: StatusLine,
    discard_guard: Rc<ArmedConfirm>,
    inbox: Inbox,
    field_areas: Vec<Rect>,
    refreshing: bool,
    sync_paused: bool,
    exit_armed: bool,
    should_quit: bool,
}

impl App {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: String,
        record: RecordId,
        fields: Vec<InlineField>,
        coordinator: MutationCoordinator,
        source: Rc<dyn RecordSource>,
        hub: DismissHub,
        discard_guard: Rc<ArmedConfirm>,
        options: UiOptions,
    ) -> Self {
        Self {
            title,
            record,
            fields,
            selected: 0,
            coordinator,
            source,
            hub,
            options,
            status: StatusLine::new(),
            discard_guard,
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            field_areas: Vec::new(),
            refreshing: false,
            sync_paused: false,
            exit_armed: false,
            should_quit: false,
        }
    }

    pub fn run(&mut self, pool: &mut LocalPool) -> Result<Fields> {
        let spawner = pool.spawner();
        let mut terminal = EditorTerminal::enter(true)?;
        while !self.should_quit {
            self.step(pool, &spawner)?;

            terminal.draw(|frame| self.draw(frame))?;
            let Some(event) = terminal.next_event(self.options.tick_rate)? else {
                continue;
            };
            match event {
                Event::Key(key) => self.handle_key(key, &spawner)?,
                Event::Mouse(mouse) => self.handle_mouse(mouse, &spawner)?,
                Event::Resize(_, _) => {}
                Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
            }
        }
        pool.run_until_stalled();

        Ok(self
            .coordinator
            .cache()
            .get(&self.record)
            .unwrap_or_default())
    }

    /// Run spawned work until it stalls, then apply whatever settled.
    pub(crate) fn step(&mut self, pool: &mut LocalPool, spawner: &LocalSpawner) -> Result<()> {
        pool.run_until_stalled();
        self.sync_scopes();
        self.drain_inbox(spawner)?;
        self.reconcile(spawner)
    }

    #[cfg(test)]
    pub(crate) fn selected(&self) -> usize {
        self.selected
    }

    #[cfg(test)]
    pub(crate) fn fields(&self) -> &[InlineField] {
        &self.fields
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let help = self.options.show_help.then_some(HELP_TEXT);
        let stale = self.coordinator.cache().is_stale(&self.record);
        self.field_areas = view::draw(
            frame,
            ViewContext {
                title: &self.title,
                record: &self.record,
                fields: &self.fields,
                selected: self.selected,
                status: self.status.message(),
                help,
                stale,
            },
        );
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent, spawner: &LocalSpawner) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        if input::is_quit(&key) {
            self.on_exit();
            return Ok(());
        }
        self.exit_armed = false;

        if let Some(index) = self.active_editor() {
            if key.code == KeyCode::Esc {
                return self.dismiss(Dismissal::Escape, spawner);
            }
            self.discard_guard.disarm();
            let command = self.fields[index].handle_key(&key);
            return self.execute(index, command, spawner);
        }

        match input::classify(&key) {
            KeyCommand::NextField => self.move_selection(1),
            KeyCommand::PrevField => self.move_selection(-1),
            KeyCommand::Open => self.open(self.selected),
            KeyCommand::ResetStatus => self.status.ready(),
            KeyCommand::Quit | KeyCommand::None => {}
        }
        Ok(())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, spawner: &LocalSpawner) -> Result<()> {
        let Some(position) = input::left_click(&mouse) else {
            return Ok(());
        };
        let hit = input::hit_test(&self.field_areas, position);
        if let Some(index) = self.active_editor() {
            if hit != Some(index) {
                return self.dismiss(Dismissal::OutsideClick, spawner);
            }
            return Ok(());
        }
        if let Some(index) = hit {
            self.selected = index;
            self.open(index);
        }
        Ok(())
    }

    /// Route a dismissal to the editor currently subscribed to the hub.
    fn dismiss(&mut self, reason: Dismissal, spawner: &LocalSpawner) -> Result<()> {
        let Some((owner, reason)) = self.hub.route(reason) else {
            return Ok(());
        };
        let Some(index) = self.fields.iter().position(|field| field.key() == owner) else {
            warn!(%owner, "dismissal routed to unknown field");
            return Ok(());
        };
        let command = self.fields[index].dismiss(reason);
        self.execute(index, Ok(command), spawner)
    }

    fn execute(
        &mut self,
        index: usize,
        command: Result<FieldCommand, FieldError>,
        spawner: &LocalSpawner,
    ) -> Result<()> {
        let label = self.fields[index].controller().definition().label.clone();
        let command = match command {
            Ok(command) => command,
            Err(err) => {
                self.status.set_raw(err.to_string());
                return Ok(());
            }
        };
        match command {
            FieldCommand::None => {}
            FieldCommand::Updated => self.status.editing(&label),
            FieldCommand::Save => {
                let task = self.fields[index].save_task();
                let inbox = Rc::clone(&self.inbox);
                spawner
                    .spawn_local(async move {
                        let outcome = task.await;
                        inbox
                            .borrow_mut()
                            .push_back(TaskEvent::SaveSettled { index, outcome });
                    })
                    .context("failed to schedule save")?;
                self.status.saving(&label);
            }
            FieldCommand::Cancel => match self.fields[index].cancel() {
                Ok(CancelOutcome::Closed) => self.status.cancelled(&label),
                Ok(CancelOutcome::Kept) => self.status.pending_discard(),
                Err(err) => self.status.set_raw(err.to_string()),
            },
            FieldCommand::Create(candidate) => match self.fields[index].create_task(&candidate) {
                Some(task) => {
                    let inbox = Rc::clone(&self.inbox);
                    spawner
                        .spawn_local(async move {
                            let outcome = task.await;
                            inbox
                                .borrow_mut()
                                .push_back(TaskEvent::CreateSettled { index, outcome });
                        })
                        .context("failed to schedule candidate creation")?;
                    self.status.creating(&candidate);
                }
                None => {
                    let command = self.fields[index]
                        .finish_create(Err(format!("cannot create \"{candidate}\" here")));
                    return self.execute(index, command, spawner);
                }
            },
        }
        Ok(())
    }

    fn drain_inbox(&mut self, spawner: &LocalSpawner) -> Result<()> {
        loop {
            let Some(event) = self.inbox.borrow_mut().pop_front() else {
                return Ok(());
            };
            match event {
                TaskEvent::SaveSettled { index, outcome } => {
                    self.sync_paused = false;
                    self.fields[index].sync_scope();
                    if self.fields[index].mode() == Mode::Editing {
                        // the failed editor is back on top of the dismissal stack
                        self.selected = index;
                    }
                    let label = self.fields[index].controller().definition().label.clone();
                    match outcome {
                        Ok(SaveOutcome::Saved(_)) => self.status.saved(&label),
                        Ok(SaveOutcome::Unchanged) => self.status.unchanged(&label),
                        Ok(SaveOutcome::Invalid(reason)) => self.status.invalid(&label, &reason),
                        Ok(SaveOutcome::Failed(reason)) => self.status.save_failed(&label, &reason),
                        Err(err) => self.status.set_raw(err.to_string()),
                    }
                }
                TaskEvent::CreateSettled { index, outcome } => {
                    match &outcome {
                        Ok(created) => self.status.created(created),
                        Err(reason) => self.status.create_failed(reason),
                    }
                    let command = self.fields[index].finish_create(outcome);
                    self.execute(index, command, spawner)?;
                }
                TaskEvent::Refreshed(result) => {
                    self.refreshing = false;
                    match result {
                        Ok(applied) => debug!(record = %self.record, applied, "record reconciled"),
                        Err(err) => {
                            warn!(record = %self.record, error = %err, "reconcile failed");
                            self.sync_paused = true;
                            self.status.set_raw(format!("Could not refresh record: {err}"));
                        }
                    }
                }
            }
        }
    }

    /// Re-read invalidated records once no write for them is in flight.
    fn reconcile(&mut self, spawner: &LocalSpawner) -> Result<()> {
        if self.refreshing || self.sync_paused {
            return Ok(());
        }
        let cache = self.coordinator.cache();
        if !cache.is_stale(&self.record) || self.coordinator.in_flight(&self.record) > 0 {
            return Ok(());
        }
        let cache = cache.clone();
        let source = Rc::clone(&self.source);
        let record = self.record.clone();
        let inbox = Rc::clone(&self.inbox);
        spawner
            .spawn_local(async move {
                let result = cache.refresh(source.as_ref(), &record).await;
                inbox.borrow_mut().push_back(TaskEvent::Refreshed(result));
            })
            .context("failed to schedule record refresh")?;
        self.refreshing = true;
        Ok(())
    }

    fn sync_scopes(&mut self) {
        for field in &mut self.fields {
            field.sync_scope();
        }
    }

    /// The open editor that receives keys: the one Escape would dismiss.
    pub(crate) fn active_editor(&self) -> Option<usize> {
        self.hub
            .target()
            .and_then(|owner| self.fields.iter().position(|field| field.key() == owner))
            .filter(|index| self.fields[*index].mode() == Mode::Editing)
            .or_else(|| {
                self.fields
                    .iter()
                    .position(|field| field.mode() == Mode::Editing)
            })
    }

    fn open(&mut self, index: usize) {
        let Some(field) = self.fields.get_mut(index) else {
            return;
        };
        let label = field.controller().definition().label.clone();
        match field.open() {
            Ok(()) => {
                self.discard_guard.disarm();
                self.status.editing(&label);
            }
            Err(err) => self.status.set_raw(format!("{label}: {err}")),
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.fields.len();
        if len == 0 {
            return;
        }
        self.selected = (self.selected as isize + delta).rem_euclid(len as isize) as usize;
    }

    fn on_exit(&mut self) {
        let unsaved = self
            .fields
            .iter()
            .any(|field| field.mode() == Mode::Saving || field.controller().is_dirty());
        if self.options.confirm_exit && unsaved && !self.exit_armed {
            self.exit_armed = true;
            self.status.pending_exit();
            return;
        }
        self.should_quit = true;
    }
}
