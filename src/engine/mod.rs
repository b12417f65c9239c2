//! The statechart engine: transition execution, event dispatch, history
//! resolution, and the reentrancy gate that serializes them.
//!
//! A [`Statechart`] owns the frozen state tree plus all dynamic state.
//! It is single-flight by construction: at most one transition and one
//! dispatch are ever in progress, and requests arriving while the
//! engine is busy queue in FIFO order. A transition may additionally be
//! *suspended* by an asynchronous enter/exit hook; the transition lock
//! stays held across the suspension window, so queued work only drains
//! after an explicit [`Statechart::resume`].

mod dispatch;
mod error;
mod history;
mod transition;

pub use dispatch::{DispatchOutcome, FaultPolicy};
pub use error::ChartError;

use std::collections::{HashMap, VecDeque};

use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use crate::core::{Event, Request, RequestSink, StateId, Tree};
use crate::monitor::TransitionMonitor;

use transition::TransitionPlan;

/// Externally observable engine state.
///
/// This is the explicit rendering of the engine's two single-flight
/// locks: a suspended or active transition takes precedence over an
/// active dispatch in the report, since the transition lock is what
/// gates further work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineStatus {
    Idle,
    TransitionActive,
    TransitionSuspended,
    DispatchActive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TransitionLock {
    Idle,
    Active,
    Suspended,
}

/// A deferred `goto_state` request, FIFO-queued while the transition
/// lock is held.
pub(crate) struct TransitionRequest {
    pub(crate) target: StateId,
    pub(crate) from: Option<StateId>,
    pub(crate) use_history: bool,
    pub(crate) context: Option<Value>,
}

/// The reentrancy gate: both single-flight locks and both pending
/// queues, as first-class fields.
pub(crate) struct Gate {
    pub(crate) transition: TransitionLock,
    pub(crate) dispatch_active: bool,
    pub(crate) pending_transitions: VecDeque<TransitionRequest>,
    pub(crate) pending_events: VecDeque<Event>,
}

impl Gate {
    fn new() -> Self {
        Self {
            transition: TransitionLock::Idle,
            dispatch_active: false,
            pending_transitions: VecDeque::new(),
            pending_events: VecDeque::new(),
        }
    }
}

/// A hierarchical statechart instance.
///
/// Built once by [`crate::ChartBuilder`], then driven through
/// [`initialize`](Self::initialize), [`goto_state`](Self::goto_state),
/// [`send_event`](Self::send_event), and friends.
///
/// # Example
///
/// ```rust
/// use statechart::{ChartBuilder, StateTemplate};
///
/// let mut chart = ChartBuilder::new()
///     .initial("idle")
///     .substate(StateTemplate::new("idle"))
///     .substate(StateTemplate::new("busy"))
///     .build()
///     .unwrap();
///
/// chart.initialize().unwrap();
/// assert!(chart.is_current("idle"));
///
/// chart.goto_state("busy").unwrap();
/// assert_eq!(chart.current_states(), vec!["busy"]);
/// ```
pub struct Statechart {
    id: Uuid,
    tree: Tree,
    registry: HashMap<String, StateId>,
    root: StateId,
    initialized: bool,
    gate: Gate,
    /// The active transition's remaining steps. Present from admission
    /// until completion, including across a suspension window.
    plan: Option<TransitionPlan>,
    monitor: Option<TransitionMonitor>,
    fault_policy: FaultPolicy,
}

impl Statechart {
    pub(crate) fn from_parts(
        tree: Tree,
        registry: HashMap<String, StateId>,
        root: StateId,
        monitor: Option<TransitionMonitor>,
        fault_policy: FaultPolicy,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tree,
            registry,
            root,
            initialized: false,
            gate: Gate::new(),
            plan: None,
            monitor,
            fault_policy,
        }
    }

    /// Enter the root state, establishing the first current-state set.
    ///
    /// Idempotent: re-initializing an initialized chart is a no-op.
    pub fn initialize(&mut self) -> Result<(), ChartError> {
        if self.initialized {
            return Ok(());
        }
        debug!(chart = %self.id, "BEGIN initialize statechart");
        self.initialized = true;
        let root = self.root;
        let result = self.request_transition(TransitionRequest {
            target: root,
            from: None,
            use_history: false,
            context: None,
        });
        debug!(chart = %self.id, "END initialize statechart");
        result
    }

    /// Transition to `target` from the chart's default anchor (the
    /// first current state).
    pub fn goto_state(&mut self, target: &str) -> Result<(), ChartError> {
        self.goto_request(target, None, false, None)
    }

    /// Transition to `target` anchored at the current state `from`.
    ///
    /// `from` must be a member of the chart's current-state set,
    /// otherwise the request fails with [`ChartError::NotACurrentState`].
    pub fn goto_state_from(&mut self, target: &str, from: &str) -> Result<(), ChartError> {
        self.goto_request(target, Some(from), false, None)
    }

    /// Transition to `target` delivering `context` to the enter hook of
    /// every state entered by this transition.
    pub fn goto_state_with_context(
        &mut self,
        target: &str,
        from: Option<&str>,
        context: Value,
    ) -> Result<(), ChartError> {
        self.goto_request(target, from, false, Some(context))
    }

    /// Resume a transition suspended by an asynchronous enter/exit hook.
    ///
    /// Fails with [`ChartError::NotSuspended`] when no suspension is
    /// outstanding.
    pub fn resume(&mut self) -> Result<(), ChartError> {
        if self.gate.transition != TransitionLock::Suspended {
            return Err(ChartError::NotSuspended);
        }
        debug!(chart = %self.id, "resuming suspended transition");
        self.gate.transition = TransitionLock::Active;
        self.advance()
    }

    /// The chart's global current-state set, in entry order.
    pub fn current_states(&self) -> Vec<&str> {
        self.tree
            .node(self.root)
            .current_substates
            .iter()
            .map(|&s| self.tree.name(s))
            .collect()
    }

    /// Number of simultaneously current states (more than one only via
    /// parallel regions).
    pub fn current_state_count(&self) -> usize {
        self.tree.node(self.root).current_substates.len()
    }

    /// True iff `state` is a member of the global current-state set.
    pub fn is_current(&self, state: &str) -> bool {
        match self.registry.get(state) {
            Some(&id) => self.tree.node(self.root).current_substates.contains(&id),
            None => false,
        }
    }

    /// True iff `state` is a current leaf somewhere below `parent`.
    pub fn is_current_substate_of(&self, parent: &str, state: &str) -> bool {
        match (self.registry.get(parent), self.registry.get(state)) {
            (Some(&p), Some(&s)) => self.tree.node(p).current_substates.contains(&s),
            _ => false,
        }
    }

    /// Names of the current leaves below `state`; empty when `state` is
    /// unknown or has no current descendants.
    pub fn current_substates_of(&self, state: &str) -> Vec<&str> {
        match self.registry.get(state) {
            Some(&id) => self
                .tree
                .node(id)
                .current_substates
                .iter()
                .map(|&s| self.tree.name(s))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Look up a registered state by name.
    pub fn state(&self, name: &str) -> Option<StateId> {
        self.registry.get(name).copied()
    }

    /// True iff `name` is a registered state of this chart.
    pub fn contains_state(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    /// True iff `state` is one of several orthogonal regions, i.e. its
    /// parent's substates are flagged parallel.
    pub fn is_parallel_child(&self, state: &str) -> bool {
        let Some(&id) = self.registry.get(state) else {
            return false;
        };
        match self.tree.node(id).parent {
            Some(p) => self.tree.node(p).parallel,
            None => false,
        }
    }

    /// Name of a state id previously obtained from this chart, or
    /// `None` when the id does not index this chart's tree. Ids carry
    /// no chart identity, so an id from a different chart of similar
    /// size may still name an unrelated state.
    pub fn state_name(&self, id: StateId) -> Option<&str> {
        (id.0 < self.tree.len()).then(|| self.tree.name(id))
    }

    pub fn status(&self) -> EngineStatus {
        match (self.gate.transition, self.gate.dispatch_active) {
            (TransitionLock::Suspended, _) => EngineStatus::TransitionSuspended,
            (TransitionLock::Active, _) => EngineStatus::TransitionActive,
            (TransitionLock::Idle, true) => EngineStatus::DispatchActive,
            (TransitionLock::Idle, false) => EngineStatus::Idle,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// True iff a transition is halted awaiting [`resume`](Self::resume).
    pub fn is_suspended(&self) -> bool {
        self.gate.transition == TransitionLock::Suspended
    }

    /// Instance id, also attached to this chart's log records.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn monitor(&self) -> Option<&TransitionMonitor> {
        self.monitor.as_ref()
    }

    pub fn monitor_mut(&mut self) -> Option<&mut TransitionMonitor> {
        self.monitor.as_mut()
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<StateId, ChartError> {
        self.registry
            .get(name)
            .copied()
            .ok_or_else(|| ChartError::UnknownState(name.to_string()))
    }

    pub(crate) fn goto_request(
        &mut self,
        target: &str,
        from: Option<&str>,
        use_history: bool,
        context: Option<Value>,
    ) -> Result<(), ChartError> {
        if !self.initialized {
            return Err(ChartError::NotInitialized);
        }
        let target = self.resolve(target)?;
        let from = from.map(|f| self.resolve(f)).transpose()?;
        self.request_transition(TransitionRequest {
            target,
            from,
            use_history,
            context,
        })
    }

    /// Admission: run immediately when the transition lock is free,
    /// otherwise queue FIFO behind the active (or suspended) transition.
    pub(crate) fn request_transition(&mut self, request: TransitionRequest) -> Result<(), ChartError> {
        if self.gate.transition != TransitionLock::Idle || self.gate.dispatch_active {
            debug!(
                chart = %self.id,
                target = self.tree.name(request.target),
                "engine busy; queueing transition request"
            );
            self.gate.pending_transitions.push_back(request);
            return Ok(());
        }
        self.run_transition(request)
    }

    /// Drain the next queued transition after one completes. A queued
    /// request that fails at execution is logged and skipped, so one
    /// bad request cannot stall the queue. Once the transition queue is
    /// empty, give queued events a chance to run.
    pub(crate) fn flush_pending_transitions(&mut self) {
        while let Some(request) = self.gate.pending_transitions.pop_front() {
            match self.run_transition(request) {
                Ok(()) => return,
                Err(e) => {
                    error!(chart = %self.id, error = %e, "queued transition failed");
                    continue;
                }
            }
        }
        self.flush_pending_events();
    }

    /// Apply the requests a hook recorded, in order, through the normal
    /// admission paths. Failures cannot be returned to the hook; they
    /// are logged instead.
    pub(crate) fn process_requests(&mut self, mut sink: RequestSink) {
        for request in sink.drain() {
            let result = match request {
                Request::Goto {
                    target,
                    from,
                    use_history,
                    context,
                } => self.goto_request(&target, from.as_deref(), use_history, context),
                Request::GotoHistory {
                    target,
                    from,
                    recursive,
                } => self.goto_history_state(&target, from.as_deref(), recursive),
                Request::Send(event) => self.send_event(event).map(|_| ()),
                Request::Resume => self.resume(),
            };
            if let Err(error) = result {
                error!(chart = %self.id, %error, "hook-requested operation failed");
            }
        }
    }
}
