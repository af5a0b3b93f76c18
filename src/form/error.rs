use thiserror::Error;

use super::controller::Mode;

/// A controller operation was called from a mode that does not allow it.
/// The field state is left exactly as it was.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("cannot {operation} while {mode}")]
    InvalidTransition {
        operation: &'static str,
        mode: Mode,
    },
    #[error("a save is already in flight")]
    SaveInFlight,
}

impl FieldError {
    pub(crate) fn transition(operation: &'static str, mode: Mode) -> Self {
        FieldError::InvalidTransition { operation, mode }
    }
}
