//! Runtime errors reported by the transition engine and dispatcher.

use thiserror::Error;

/// Recoverable engine errors.
///
/// Every variant aborts the requested operation, releases any lock the
/// operation held, and leaves the chart's state untouched. None of them
/// are retried automatically.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Statechart has not been initialized")]
    NotInitialized,

    #[error("State '{0}' is not a registered state of this statechart")]
    UnknownState(String),

    #[error("State '{0}' is not a current state of this statechart")]
    NotACurrentState(String),

    #[error("Pivot state '{0}' has parallel substates; the transition target is ambiguous")]
    AmbiguousPivot(String),

    #[error("No suspended transition to resume")]
    NotSuspended,

    #[error("History resolution from state '{0}' exceeded the cycle guard")]
    HistoryCycle(String),
}
