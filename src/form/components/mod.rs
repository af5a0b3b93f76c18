//! Per-kind input controls plugged into the editor shell.

mod base;
mod datetime;
mod helpers;
mod multiline;
mod palette;
mod select;
mod tags;
mod text;

pub use base::{EditorIntent, FieldEditor};
pub use datetime::DateTimeEditor;
pub use multiline::MultilineEditor;
pub use palette::{EditorPalette, Placeholders, SelectorHints, SlotLabels};
pub use select::SelectEditor;
pub use tags::TagSetEditor;
pub use text::TextEditor;

pub(crate) use helpers::placeholder;

use crate::domain::{FieldDefinition, FieldKind};

/// Default editor for a definition's kind. `allow_create` enables the
/// "create new" affordance on selector-backed kinds.
pub fn editor_for(definition: &FieldDefinition, allow_create: bool) -> Box<dyn FieldEditor> {
    match definition.kind {
        FieldKind::Text => Box::new(TextEditor),
        FieldKind::Multiline => Box::new(MultilineEditor),
        FieldKind::DateTime => Box::new(DateTimeEditor),
        FieldKind::SingleSelect => Box::new(SelectEditor::new(definition, allow_create)),
        FieldKind::TagSet => Box::new(TagSetEditor::new(definition, allow_create)),
    }
}
