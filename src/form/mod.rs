mod components;
mod controller;
mod error;
mod policy;
mod selector;
mod shell;

pub use components::{
    DateTimeEditor, EditorIntent, EditorPalette, FieldEditor, MultilineEditor, Placeholders,
    SelectEditor, SelectorHints, SlotLabels, TagSetEditor, TextEditor, editor_for,
};
pub use controller::{CancelOutcome, FieldController, FieldState, Mode, SaveOutcome};
pub use error::FieldError;
pub use policy::{CreateFailure, DiscardConfirm, DiscardPolicy, FieldPolicy, SaveTrigger};
pub use selector::{AutocompleteSelector, SelectorAction};
pub use shell::{
    CandidateCreator, CreateCandidateError, FieldCommand, FieldResponse, InlineField, SlotView,
};
