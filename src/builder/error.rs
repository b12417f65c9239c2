//! Build errors for statechart construction.

use thiserror::Error;

/// Errors that make a statechart unusable at construction time.
///
/// Unresolved `initial` or history-default names are deliberately *not*
/// errors: the builder falls back (first substate, or no default) and
/// logs a warning instead.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Duplicate state name '{0}'. State names must be unique within a statechart")]
    DuplicateStateName(String),

    #[error("Handler attached to unknown state '{0}'")]
    UnknownHandlerState(String),
}
