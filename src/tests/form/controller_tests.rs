use std::rc::Rc;

use futures::executor::{LocalPool, block_on};
use futures::task::LocalSpawnExt;
use serde_json::{Value, json};

use crate::cache::RecordCache;
use crate::domain::FieldDefinition;
use crate::form::{
    CancelOutcome, DiscardPolicy, FieldController, FieldError, Mode, SaveOutcome,
};
use crate::tests::support::{Reply, ScriptedWriter, fixture, record};
use crate::validation::Rule;

fn title_controller(value: Value) -> (FieldController, Rc<ScriptedWriter>) {
    let (coordinator, writer) = fixture(json!({ "title": value, "severity": "P2" }));
    let definition = FieldDefinition::text("title")
        .with_label("Title")
        .with_rule(Rule::required("Title is required"));
    (FieldController::new(record(), definition, coordinator), writer)
}

#[test]
fn saving_unchanged_draft_dispatches_nothing() {
    let (controller, writer) = title_controller(json!("Unchanged"));
    controller.start_edit().unwrap();

    let outcome = block_on(controller.save()).unwrap();

    assert_eq!(outcome, SaveOutcome::Unchanged);
    assert!(writer.calls().is_empty());
    assert_eq!(controller.mode(), Mode::Viewing);
}

#[test]
fn failed_write_restores_cache_exactly() {
    let (controller, writer) = title_controller(json!("Test"));
    writer.reply("title", Reply::Reject("Server unavailable".into()));
    let cache = controller_cache(&controller);
    let before = cache.get(&record()).unwrap();

    controller.start_edit().unwrap();
    controller.update_draft(json!("Test Updated")).unwrap();
    let outcome = block_on(controller.save()).unwrap();

    assert_eq!(outcome, SaveOutcome::Failed("Server unavailable".into()));
    assert_eq!(cache.get(&record()).unwrap(), before);
    assert_eq!(controller.mode(), Mode::Editing);
    assert_eq!(controller.draft(), Some(json!("Test Updated")));
    assert_eq!(controller.error().as_deref(), Some("Server unavailable"));
    assert_eq!(writer.calls_for("title").len(), 1);
}

#[test]
fn successful_save_closes_and_keeps_value() {
    let (controller, writer) = title_controller(json!("Original"));
    controller.start_edit().unwrap();
    controller.update_draft(json!("Updated")).unwrap();

    let outcome = block_on(controller.save()).unwrap();

    assert_eq!(outcome, SaveOutcome::Saved(json!("Updated")));
    assert_eq!(writer.calls_for("title"), vec![json!("Updated")]);
    assert_eq!(controller.mode(), Mode::Viewing);
    assert_eq!(controller.state(), None);
    assert_eq!(controller.committed(), json!("Updated"));
}

#[test]
fn server_transformed_value_is_reconciled() {
    let (controller, writer) = title_controller(json!("old"));
    writer.reply("title", Reply::Transform(json!("Normalized Title")));
    controller.start_edit().unwrap();
    controller.update_draft(json!("normalized title")).unwrap();

    let outcome = block_on(controller.save()).unwrap();

    assert_eq!(outcome, SaveOutcome::Saved(json!("Normalized Title")));
    assert_eq!(controller.committed(), json!("Normalized Title"));
}

#[test]
fn start_edit_always_reseeds_from_committed_value() {
    let (controller, _writer) = title_controller(json!("First"));
    controller.start_edit().unwrap();
    controller.update_draft(json!("scratch")).unwrap();

    controller_cache(&controller).set_key(&record(), "title", json!("Second"));
    controller.start_edit().unwrap();

    assert_eq!(controller.draft(), Some(json!("Second")));
    assert!(!controller.is_dirty());
}

#[test]
fn cancel_restores_original_after_any_edits() {
    let (controller, writer) = title_controller(json!("Original"));
    controller.start_edit().unwrap();
    for draft in ["a", "ab", "", "Original!", "zzz"] {
        controller.update_draft(json!(draft)).unwrap();
    }

    assert_eq!(controller.cancel().unwrap(), CancelOutcome::Closed);
    assert_eq!(controller.mode(), Mode::Viewing);
    assert!(writer.calls().is_empty());

    controller.start_edit().unwrap();
    assert_eq!(controller.draft(), Some(json!("Original")));
    assert_eq!(controller.error(), None);
}

#[test]
fn invalid_draft_stays_open_and_never_writes() {
    let (controller, writer) = title_controller(json!("Something"));
    controller.start_edit().unwrap();
    controller.update_draft(json!("   ")).unwrap();

    let outcome = block_on(controller.save()).unwrap();

    assert_eq!(outcome, SaveOutcome::Invalid("Title is required".into()));
    assert_eq!(controller.mode(), Mode::Editing);
    assert_eq!(controller.error().as_deref(), Some("Title is required"));
    assert!(writer.calls().is_empty());

    controller.update_draft(json!("Fixed")).unwrap();
    assert_eq!(controller.error(), None);
}

#[test]
fn draft_update_keeps_save_error_visible() {
    let (controller, writer) = title_controller(json!("Test"));
    writer.reply("title", Reply::Reject("Conflict".into()));
    controller.start_edit().unwrap();
    controller.update_draft(json!("Retry me")).unwrap();
    block_on(controller.save()).unwrap();

    controller.update_draft(json!("Retry me again")).unwrap();

    let state = controller.state().unwrap();
    assert_eq!(state.save_error.as_deref(), Some("Conflict"));
    assert_eq!(state.validation_error, None);
}

#[test]
fn validation_runs_again_on_every_save() {
    let (coordinator, writer) = fixture(json!({ "code": "AB" }));
    let definition = FieldDefinition::text("code")
        .with_rule(Rule::max_length(3, "Too long"));
    let controller = FieldController::new(record(), definition, coordinator);
    controller.start_edit().unwrap();

    controller.update_draft(json!("ABCD")).unwrap();
    assert_eq!(
        block_on(controller.save()).unwrap(),
        SaveOutcome::Invalid("Too long".into())
    );
    controller.update_draft(json!("ABC")).unwrap();
    assert_eq!(
        block_on(controller.save()).unwrap(),
        SaveOutcome::Saved(json!("ABC"))
    );
    assert_eq!(writer.calls_for("code"), vec![json!("ABC")]);
}

#[test]
fn calls_while_saving_are_rejected() {
    let (controller, writer) = title_controller(json!("Before"));
    let gate = writer.gate("title");
    let controller = Rc::new(controller);
    controller.start_edit().unwrap();
    controller.update_draft(json!("After")).unwrap();

    let mut pool = LocalPool::new();
    let saving = Rc::clone(&controller);
    let handle = pool
        .spawner()
        .spawn_local_with_handle(async move { saving.save().await })
        .unwrap();
    pool.run_until_stalled();

    assert_eq!(controller.mode(), Mode::Saving);
    assert_eq!(controller.committed(), json!("After"));
    assert_eq!(block_on(controller.save()), Err(FieldError::SaveInFlight));
    assert_eq!(
        controller.update_draft(json!("Other")),
        Err(FieldError::SaveInFlight)
    );
    assert_eq!(controller.start_edit(), Err(FieldError::SaveInFlight));
    assert_eq!(controller.cancel(), Err(FieldError::SaveInFlight));

    gate.send(()).unwrap();
    let outcome = pool.run_until(handle).unwrap();
    assert_eq!(outcome, SaveOutcome::Saved(json!("After")));
    assert_eq!(writer.calls_for("title").len(), 1);
}

#[test]
fn viewing_rejects_draft_operations() {
    let (controller, _writer) = title_controller(json!("x"));
    assert_eq!(
        controller.update_draft(json!("y")),
        Err(FieldError::InvalidTransition {
            operation: "update the draft",
            mode: Mode::Viewing,
        })
    );
    assert!(matches!(
        block_on(controller.save()),
        Err(FieldError::InvalidTransition { operation: "save", .. })
    ));
    assert!(controller.cancel().is_err());
}

#[test]
fn discard_confirmation_only_guards_dirty_drafts() {
    let (coordinator, _writer) = fixture(json!({ "title": "Kept" }));
    let definition = FieldDefinition::text("title");
    let controller = FieldController::new(record(), definition, coordinator)
        .with_discard_policy(DiscardPolicy::Confirm(Rc::new(
            |_: &FieldDefinition, _: &Value| false,
        )));

    controller.start_edit().unwrap();
    assert_eq!(controller.cancel().unwrap(), CancelOutcome::Closed);

    controller.start_edit().unwrap();
    controller.update_draft(json!("Changed")).unwrap();
    assert_eq!(controller.cancel().unwrap(), CancelOutcome::Kept);
    assert_eq!(controller.draft(), Some(json!("Changed")));

    controller.discard().unwrap();
    assert_eq!(controller.mode(), Mode::Viewing);
}

#[test]
fn tag_set_reorder_is_not_a_change() {
    let (coordinator, writer) = fixture(json!({ "tags": ["API", "Database"] }));
    let controller = FieldController::new(
        record(),
        FieldDefinition::tag_set("tags", ["API", "Database"]),
        coordinator,
    );
    controller.start_edit().unwrap();
    controller.update_draft(json!(["Database", "API"])).unwrap();

    assert!(!controller.is_dirty());
    assert_eq!(block_on(controller.save()).unwrap(), SaveOutcome::Unchanged);
    assert!(writer.calls().is_empty());
}

#[test]
fn clearing_a_date_time_writes_null() {
    let (coordinator, writer) = fixture(json!({ "due": "2024-05-01T13:30" }));
    let controller =
        FieldController::new(record(), FieldDefinition::date_time("due"), coordinator);
    controller.start_edit().unwrap();
    controller.update_draft(json!("")).unwrap();

    assert_eq!(block_on(controller.save()).unwrap(), SaveOutcome::Saved(Value::Null));
    assert_eq!(writer.calls_for("due"), vec![Value::Null]);
}

#[test]
fn bad_date_time_is_rejected_locally() {
    let (coordinator, writer) = fixture(json!({}));
    let controller =
        FieldController::new(record(), FieldDefinition::date_time("due"), coordinator);
    controller.start_edit().unwrap();
    controller.update_draft(json!("2024-02-30T10:00")).unwrap();

    assert!(matches!(
        block_on(controller.save()).unwrap(),
        SaveOutcome::Invalid(_)
    ));
    assert!(writer.calls().is_empty());
}

fn controller_cache(controller: &FieldController) -> RecordCache {
    controller.coordinator().cache().clone()
}
