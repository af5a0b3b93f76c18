#![deny(rust_2018_idioms)]

pub mod app;
pub mod cache;
pub mod domain;
pub mod events;
pub mod form;
pub mod mutation;
pub mod validation;

#[cfg(test)]
mod tests;

pub use app::{IncidentEditor, UiOptions};

pub mod prelude {
    pub use super::app::{IncidentEditor, UiOptions};
    pub use super::cache::{FetchError, RecordCache, RecordSource};
    pub use super::domain::{FieldDefinition, FieldKey, FieldKind, Fields, RecordId};
    pub use super::events::{DismissHub, Dismissal};
    pub use super::form::{
        CandidateCreator, CreateCandidateError, CreateFailure, DiscardPolicy, FieldController,
        FieldError, FieldPolicy, InlineField, Mode, SaveOutcome, SaveTrigger,
    };
    pub use super::mutation::{FieldWriter, MutationCoordinator, WriteError};
    pub use super::validation::{Rule, RuleSet, Verdict, validate};
}
