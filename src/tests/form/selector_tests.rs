use crossterm::event::KeyCode;

use crate::form::{AutocompleteSelector, CreateFailure, SelectorAction};
use crate::tests::support::key;

fn severities() -> AutocompleteSelector {
    AutocompleteSelector::new(["P0", "P1", "P2", "P3", "P4"])
}

fn type_query(selector: &mut AutocompleteSelector, text: &str, selected: &[String]) {
    for ch in text.chars() {
        selector.handle_key(&key(KeyCode::Char(ch)), selected);
    }
}

#[test]
fn focus_wraps_in_both_directions() {
    for len in 1..=5 {
        let mut selector = AutocompleteSelector::new((0..len).map(|idx| format!("option-{idx}")));
        for _ in 0..len {
            selector.focus_next(&[]);
        }
        assert_eq!(selector.focus(), Some(len - 1));
        selector.focus_next(&[]);
        assert_eq!(selector.focus(), Some(0), "down from last wraps for n={len}");
        selector.focus_prev(&[]);
        assert_eq!(selector.focus(), Some(len - 1), "up from first wraps for n={len}");
    }
}

#[test]
fn arrow_up_with_no_focus_lands_on_last_option() {
    let mut selector = severities();
    assert_eq!(
        selector.handle_key(&key(KeyCode::Up), &[]),
        SelectorAction::Updated
    );
    assert_eq!(selector.focus(), Some(4));
}

#[test]
fn empty_list_ignores_arrows() {
    let mut selector = AutocompleteSelector::new(Vec::<String>::new());
    assert_eq!(
        selector.handle_key(&key(KeyCode::Down), &[]),
        SelectorAction::Ignored
    );
    assert_eq!(selector.focus(), None);
}

#[test]
fn filter_is_case_insensitive_and_skips_selected() {
    let mut selector = AutocompleteSelector::new(["API", "Database", "Frontend", "api-gateway"]);
    let selected = vec!["API".to_string()];
    type_query(&mut selector, "aPi", &selected);
    assert_eq!(selector.filtered(&selected), vec!["api-gateway"]);
}

#[test]
fn create_affordance_joins_the_focus_cycle() {
    let mut selector = AutocompleteSelector::new(["Database", "Data Lake"]).with_create(true);
    type_query(&mut selector, "data", &[]);
    assert_eq!(selector.create_label(&[]), Some("data"));
    assert_eq!(selector.focusable_len(&[]), 3);

    type_query(&mut selector, "base", &[]);
    assert_eq!(
        selector.create_label(&[]),
        None,
        "matches an existing candidate ignoring case"
    );

    selector.set_query("  Networking ");
    assert_eq!(selector.create_label(&[]), Some("Networking"));
    selector.focus_next(&[]);
    assert_eq!(
        selector.handle_key(&key(KeyCode::Enter), &[]),
        SelectorAction::Create("Networking".into())
    );
    assert_eq!(selector.pending_create(), Some("Networking"));
    assert_eq!(
        selector.handle_key(&key(KeyCode::Enter), &[]),
        SelectorAction::Ignored,
        "a second create waits for the first"
    );
}

#[test]
fn create_is_hidden_for_values_already_selected() {
    let mut selector = AutocompleteSelector::new(Vec::<String>::new()).with_create(true);
    let selected = vec!["Custom".to_string()];
    selector.set_query("Custom");
    assert_eq!(selector.create_label(&selected), None);
}

#[test]
fn picking_clears_query() {
    let mut selector = severities();
    type_query(&mut selector, "p3", &[]);
    selector.handle_key(&key(KeyCode::Down), &[]);
    assert_eq!(
        selector.handle_key(&key(KeyCode::Char(' ')), &[]),
        SelectorAction::Pick("P3".into())
    );
    assert_eq!(selector.query(), "");
    assert_eq!(selector.focus(), None);
}

#[test]
fn backspace_on_empty_query_asks_to_remove_last() {
    let mut selector = severities();
    type_query(&mut selector, "p", &[]);
    assert_eq!(
        selector.handle_key(&key(KeyCode::Backspace), &[]),
        SelectorAction::Updated
    );
    assert_eq!(
        selector.handle_key(&key(KeyCode::Backspace), &[]),
        SelectorAction::RemoveLast
    );
}

#[test]
fn removing_last_tag_clears_focus() {
    let mut selector = severities();
    let selected = vec!["P0".to_string(), "P1".to_string()];
    selector.handle_key(&key(KeyCode::Down), &selected);
    assert_eq!(selector.focus(), Some(0));
    assert_eq!(selector.filtered(&selected)[0], "P2");

    assert_eq!(
        selector.handle_key(&key(KeyCode::Backspace), &selected),
        SelectorAction::RemoveLast
    );
    assert_eq!(selector.focus(), None);
    // "P1" is back in the list ahead of "P2"
    assert_eq!(selector.filtered(&selected[..1])[0], "P1");
}

#[test]
fn enter_without_focus_or_query_submits() {
    let mut selector = severities();
    assert_eq!(
        selector.handle_key(&key(KeyCode::Enter), &[]),
        SelectorAction::Submit
    );
    type_query(&mut selector, "x", &[]);
    assert_eq!(
        selector.handle_key(&key(KeyCode::Enter), &[]),
        SelectorAction::Ignored
    );
}

#[test]
fn failed_create_keeps_or_clears_query_by_policy() {
    let mut keep = AutocompleteSelector::new(["API"]).with_create(true);
    keep.set_query("Payments");
    keep.finish_create(Err("quota exceeded"), CreateFailure::KeepQuery);
    assert_eq!(keep.query(), "Payments");
    assert_eq!(keep.create_error(), Some("quota exceeded"));

    let mut clear = AutocompleteSelector::new(["API"]).with_create(true);
    clear.set_query("Payments");
    clear.finish_create(Err("quota exceeded"), CreateFailure::ClearQuery);
    assert_eq!(clear.query(), "");
    assert_eq!(clear.create_error(), Some("quota exceeded"));
}

#[test]
fn successful_create_becomes_a_candidate() {
    let mut selector = AutocompleteSelector::new(["API"]).with_create(true);
    selector.set_query("Payments");
    selector.finish_create(Ok("Payments"), CreateFailure::KeepQuery);
    assert_eq!(selector.query(), "");
    assert_eq!(selector.candidates(), ["API".to_string(), "Payments".to_string()]);
    assert_eq!(selector.create_error(), None);
}
