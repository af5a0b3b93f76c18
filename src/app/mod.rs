mod incident_editor;
mod input;
mod options;
mod runtime;
mod status;
mod terminal;
mod view;

pub use incident_editor::IncidentEditor;
pub use options::UiOptions;

#[cfg(test)]
pub(crate) use runtime::{App, ArmedConfirm};
