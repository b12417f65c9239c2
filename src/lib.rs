//! Statechart: a hierarchical state machine engine with parallel
//! regions, history, and asynchronous transitions.
//!
//! States form a tree. Transitioning between two states exits the
//! source's ancestor chain up to the deepest common ancestor (the
//! pivot) and enters the target's chain down from it, invoking each
//! state's enter and exit hooks in order. States whose substates are
//! *parallel* keep every region active at once; non-parallel states
//! remember their last active substate as *history*.
//!
//! # Core Concepts
//!
//! - **Template**: a [`StateTemplate`] tree describes the chart's shape
//!   once, up front; [`ChartBuilder`] freezes it into a [`Statechart`]
//! - **Handlers**: behavior attaches per state via the [`StateHandler`]
//!   trait; hooks request further work through a [`RequestSink`]
//! - **Events**: [`Statechart::send_event`] offers an [`Event`] to the
//!   current states, bubbling unhandled events up the ancestor chain
//! - **Suspension**: a hook may return [`HookOutcome::Suspend`] to halt
//!   the transition until [`Statechart::resume`]; work arriving in the
//!   meantime queues in FIFO order
//!
//! # Example
//!
//! ```rust
//! use statechart::{ChartBuilder, StateTemplate};
//!
//! let mut chart = ChartBuilder::new()
//!     .initial("stopped")
//!     .substate(StateTemplate::new("stopped"))
//!     .substate(
//!         StateTemplate::new("playing")
//!             .initial("normal")
//!             .substate(StateTemplate::new("normal"))
//!             .substate(StateTemplate::new("fast_forward")),
//!     )
//!     .build()
//!     .unwrap();
//!
//! chart.initialize().unwrap();
//! assert_eq!(chart.current_states(), vec!["stopped"]);
//!
//! chart.goto_state("playing").unwrap();
//! assert_eq!(chart.current_states(), vec!["normal"]);
//! assert!(chart.is_current_substate_of("playing", "normal"));
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod monitor;

// Re-export the public surface at the crate root
pub use builder::{BuildError, ChartBuilder, StateTemplate, ROOT_STATE_NAME};
pub use core::{Event, HookFault, HookOutcome, RequestSink, StateHandler, StateId};
pub use engine::{ChartError, DispatchOutcome, EngineStatus, FaultPolicy, Statechart};
pub use monitor::{Sequence, StepRecord, TransitionMonitor, TransitionStep};
