//! Transition tracing for tests and diagnostics.
//!
//! When enabled via [`crate::ChartBuilder::with_monitor`], the chart
//! appends a timestamped record for every state entered or exited, in
//! execution order. Tests assert on the recorded order with a
//! [`Sequence`] built from the expected exits and enters.
//!
//! ```rust
//! use statechart::{ChartBuilder, Sequence, StateTemplate};
//!
//! let mut chart = ChartBuilder::new()
//!     .initial("a")
//!     .substate(StateTemplate::new("a"))
//!     .substate(StateTemplate::new("b"))
//!     .with_monitor()
//!     .build()
//!     .unwrap();
//!
//! chart.initialize().unwrap();
//! chart.monitor_mut().unwrap().reset();
//! chart.goto_state("b").unwrap();
//!
//! let expected = Sequence::new().exited(&["a"]).entered(&["b"]);
//! assert!(chart.monitor().unwrap().matches(&expected));
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One monitored action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum TransitionStep {
    Entered(String),
    Exited(String),
}

/// A monitored action plus the wall-clock time it was recorded.
#[derive(Clone, Debug, Serialize)]
pub struct StepRecord {
    pub step: TransitionStep,
    pub at: DateTime<Utc>,
}

/// Ordered record of every enter and exit the chart has performed
/// since construction or the last [`reset`](Self::reset).
#[derive(Clone, Debug, Default, Serialize)]
pub struct TransitionMonitor {
    records: Vec<StepRecord>,
}

impl TransitionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_entered(&mut self, state: &str) {
        self.records.push(StepRecord {
            step: TransitionStep::Entered(state.to_string()),
            at: Utc::now(),
        });
    }

    pub(crate) fn push_exited(&mut self, state: &str) {
        self.records.push(StepRecord {
            step: TransitionStep::Exited(state.to_string()),
            at: Utc::now(),
        });
    }

    /// Discard all records. Typical test usage resets after
    /// initialization so assertions cover a single transition.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// True iff the recorded steps equal `expected`, in order and in
    /// full.
    pub fn matches(&self, expected: &Sequence) -> bool {
        self.records.len() == expected.steps.len()
            && self
                .records
                .iter()
                .zip(&expected.steps)
                .all(|(record, step)| record.step == *step)
    }
}

/// Expected step sequence, assembled in assertion order.
#[derive(Clone, Debug, Default)]
pub struct Sequence {
    steps: Vec<TransitionStep>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append expected exits, in the given order.
    pub fn exited(mut self, states: &[&str]) -> Self {
        self.steps
            .extend(states.iter().map(|s| TransitionStep::Exited(s.to_string())));
        self
    }

    /// Append expected enters, in the given order.
    pub fn entered(mut self, states: &[&str]) -> Self {
        self.steps
            .extend(states.iter().map(|s| TransitionStep::Entered(s.to_string())));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_requires_same_order() {
        let mut monitor = TransitionMonitor::new();
        monitor.push_exited("a");
        monitor.push_entered("b");

        assert!(monitor.matches(&Sequence::new().exited(&["a"]).entered(&["b"])));
        assert!(!monitor.matches(&Sequence::new().entered(&["b"]).exited(&["a"])));
    }

    #[test]
    fn matches_requires_same_length() {
        let mut monitor = TransitionMonitor::new();
        monitor.push_entered("a");

        assert!(!monitor.matches(&Sequence::new().entered(&["a", "b"])));
        assert!(!monitor.matches(&Sequence::new()));
    }

    #[test]
    fn reset_clears_records() {
        let mut monitor = TransitionMonitor::new();
        monitor.push_entered("a");
        monitor.reset();

        assert!(monitor.is_empty());
        assert!(monitor.matches(&Sequence::new()));
    }

    #[test]
    fn records_serialize_to_json() {
        let mut monitor = TransitionMonitor::new();
        monitor.push_entered("a");

        let json = serde_json::to_string(monitor.records()).unwrap();
        assert!(json.contains("\"Entered\":\"a\""));
    }
}
