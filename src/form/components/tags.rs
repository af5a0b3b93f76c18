use crossterm::event::KeyEvent;
use ratatui::text::{Line, Span};
use serde_json::Value;

use crate::domain::{FieldDefinition, FieldKind, tag_list};
use crate::form::controller::FieldController;
use crate::form::error::FieldError;
use crate::form::policy::CreateFailure;
use crate::form::selector::{AutocompleteSelector, SelectorAction};

use super::helpers::{pill, placeholder, selector_lines};
use super::palette::EditorPalette;
use super::{EditorIntent, FieldEditor};

/// Multi-value tag set. The draft keeps insertion order so Backspace removes
/// the most recent tag; the display slot always shows tags sorted.
#[derive(Debug, Clone)]
pub struct TagSetEditor {
    selector: AutocompleteSelector,
}

impl TagSetEditor {
    pub fn new(definition: &FieldDefinition, allow_create: bool) -> Self {
        Self {
            selector: AutocompleteSelector::new(definition.candidates.iter().cloned())
                .with_create(allow_create),
        }
    }
}

/// Add `tag` unless already present. Position of existing tags never changes.
pub(crate) fn add_tag(draft: &mut Value, tag: String) {
    let mut tags = tag_list(draft);
    if !tags.contains(&tag) {
        tags.push(tag);
    }
    *draft = Value::Array(tags.into_iter().map(Value::String).collect());
}

pub(crate) fn remove_last_tag(draft: &mut Value) {
    let mut tags = tag_list(draft);
    tags.pop();
    *draft = Value::Array(tags.into_iter().map(Value::String).collect());
}

impl FieldEditor for TagSetEditor {
    fn kind(&self) -> FieldKind {
        FieldKind::TagSet
    }

    fn reset(&mut self) {
        self.selector.reset();
    }

    fn handle_key(
        &mut self,
        controller: &FieldController,
        key: &KeyEvent,
    ) -> Result<EditorIntent, FieldError> {
        let selected = controller
            .draft()
            .map(|draft| tag_list(&draft))
            .unwrap_or_default();
        let intent = match self.selector.handle_key(key, &selected) {
            SelectorAction::Ignored => EditorIntent::None,
            SelectorAction::Updated => EditorIntent::Updated,
            SelectorAction::Pick(tag) => {
                controller.edit_draft(|draft| add_tag(draft, tag))?;
                EditorIntent::Updated
            }
            SelectorAction::RemoveLast => {
                if selected.is_empty() {
                    EditorIntent::None
                } else {
                    controller.edit_draft(remove_last_tag)?;
                    EditorIntent::Updated
                }
            }
            SelectorAction::Create(label) => EditorIntent::Create(label),
            SelectorAction::Dismiss => EditorIntent::Close,
            SelectorAction::Submit => EditorIntent::Save,
        };
        Ok(intent)
    }

    fn display_lines(&self, value: &Value, palette: &EditorPalette) -> Vec<Line<'static>> {
        let mut tags = tag_list(value);
        if tags.is_empty() {
            return vec![placeholder(&palette.placeholders.empty_tags)];
        }
        tags.sort();
        let mut spans = Vec::with_capacity(tags.len() * 2);
        for tag in &tags {
            if !spans.is_empty() {
                spans.push(Span::raw(" "));
            }
            spans.push(pill(tag));
        }
        vec![Line::from(spans)]
    }

    fn input_lines(&self, draft: &Value, palette: &EditorPalette) -> Vec<Line<'static>> {
        let selected = tag_list(draft);
        let mut chips = Vec::with_capacity(selected.len() * 2);
        for tag in &selected {
            if !chips.is_empty() {
                chips.push(Span::raw(" "));
            }
            chips.push(pill(tag));
        }
        let mut lines = Vec::new();
        if !chips.is_empty() {
            lines.push(Line::from(chips));
        }
        lines.extend(selector_lines(&self.selector, &selected, None, palette));
        lines
    }

    fn selector(&self) -> Option<&AutocompleteSelector> {
        Some(&self.selector)
    }

    fn finish_create(
        &mut self,
        controller: &FieldController,
        outcome: Result<String, String>,
        on_failure: CreateFailure,
    ) -> Result<EditorIntent, FieldError> {
        match outcome {
            Ok(created) => {
                self.selector.finish_create(Ok(&created), on_failure);
                controller.edit_draft(|draft| add_tag(draft, created))?;
            }
            Err(message) => self.selector.finish_create(Err(&message), on_failure),
        }
        Ok(EditorIntent::Updated)
    }
}
