use std::rc::Rc;

use crossterm::event::KeyCode;
use futures::executor::{LocalPool, LocalSpawner};
use serde_json::json;

use crate::app::{App, ArmedConfirm, UiOptions};
use crate::domain::FieldDefinition;
use crate::events::DismissHub;
use crate::form::{FieldController, InlineField, Mode};
use crate::tests::support::{
    MemorySource, RECORD, Reply, ScriptedWriter, ctrl, fixture, key, record,
};

struct Harness {
    app: App,
    pool: LocalPool,
    spawner: LocalSpawner,
    writer: Rc<ScriptedWriter>,
}

impl Harness {
    /// `title` first, `status` second, both text fields over one record.
    fn new() -> Self {
        let values = json!({ "title": "Disk full", "status": "open" });
        let (coordinator, writer) = fixture(values.clone());
        let hub = DismissHub::new();
        let options = UiOptions::default();
        let fields = ["title", "status"]
            .into_iter()
            .map(|name| {
                let controller = FieldController::new(
                    record(),
                    FieldDefinition::text(name),
                    coordinator.clone(),
                );
                InlineField::new(controller)
                    .with_policy(options.policy)
                    .with_dismiss_hub(hub.clone())
            })
            .collect();
        let app = App::new(
            "Incident".to_string(),
            record(),
            fields,
            coordinator,
            MemorySource::with_record(RECORD, values),
            hub,
            Rc::new(ArmedConfirm::default()),
            options,
        );
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            app,
            pool,
            spawner,
            writer,
        }
    }

    fn press(&mut self, event: crossterm::event::KeyEvent) {
        self.app
            .handle_key(event, &self.spawner)
            .expect("key handling failed");
    }

    fn type_text(&mut self, text: &str) {
        for ch in text.chars() {
            self.press(key(KeyCode::Char(ch)));
        }
    }

    fn step(&mut self) {
        self.app
            .step(&mut self.pool, &self.spawner)
            .expect("step failed");
    }

    fn draft(&self, index: usize) -> Option<serde_json::Value> {
        self.app.fields()[index].controller().draft()
    }
}

#[test]
fn failed_save_takes_keys_and_dismissals_together() {
    let mut h = Harness::new();
    h.writer.reply("status", Reply::Reject("status is locked".into()));
    let gate = h.writer.gate("status");

    // Save `status` and, while it is in flight, open `title` above it.
    h.press(key(KeyCode::Down));
    h.press(key(KeyCode::Enter));
    h.type_text("!");
    h.press(ctrl('s'));
    h.step();
    assert_eq!(h.app.fields()[1].mode(), Mode::Saving);
    assert_eq!(h.app.active_editor(), None);

    h.press(key(KeyCode::Up));
    h.press(key(KeyCode::Enter));
    h.type_text("?");
    assert_eq!(h.app.active_editor(), Some(0));

    gate.send(()).expect("gate");
    h.step();
    assert_eq!(h.app.fields()[1].mode(), Mode::Editing);
    assert_eq!(h.app.selected(), 1);
    assert_eq!(h.app.active_editor(), Some(1));

    // Typing reaches the editor that Escape would close.
    h.type_text("1");
    assert_eq!(h.draft(1), Some(json!("open!1")));
    assert_eq!(h.draft(0), Some(json!("Disk full?")));

    h.press(key(KeyCode::Esc));
    assert_eq!(h.app.fields()[1].mode(), Mode::Viewing);
    assert_eq!(h.app.fields()[0].mode(), Mode::Editing);
    assert_eq!(h.app.active_editor(), Some(0));

    h.type_text("!");
    assert_eq!(h.draft(0), Some(json!("Disk full?!")));
}
