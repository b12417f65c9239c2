//! Event dispatch with hierarchical bubbling.
//!
//! An event is offered to every current leaf state. A leaf that does
//! not handle it passes it up its ancestor chain until some state
//! claims it or the chain is exhausted. Parallel regions bubble
//! independently: each branch walks its own chain, so a shared
//! ancestor is consulted once per branch that reaches it, and one
//! event can be claimed by several branches at once.
//!
//! Dispatch is single-flight like transitions: events sent while a
//! transition or another dispatch is in progress queue FIFO and drain
//! once the engine goes idle.

use tracing::{debug, warn};

use crate::core::{Event, RequestSink, StateId};

use super::{ChartError, Statechart, TransitionLock};

/// How a fault raised by an event handler counts for bubbling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FaultPolicy {
    /// A faulting handler is treated as not having handled the event;
    /// bubbling continues up the ancestor chain.
    #[default]
    TreatUnhandled,
    /// A faulting handler still claims the event and stops bubbling in
    /// its branch.
    TreatHandled,
}

/// Result of [`Statechart::send_event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The engine was busy; the event was queued and will dispatch once
    /// pending work drains.
    Queued,
    /// At least one state claimed the event; the id is the last
    /// responder in dispatch order.
    Handled(StateId),
    /// No current state or ancestor claimed the event.
    Unhandled,
}

impl Statechart {
    /// Dispatch `event` to the current states, or queue it when a
    /// transition or another dispatch is already in progress.
    pub fn send_event(&mut self, event: Event) -> Result<DispatchOutcome, ChartError> {
        if !self.initialized {
            return Err(ChartError::NotInitialized);
        }
        if self.gate.transition != TransitionLock::Idle || self.gate.dispatch_active {
            debug!(chart = %self.id, event = %event.name, "engine busy; queueing event");
            self.gate.pending_events.push_back(event);
            return Ok(DispatchOutcome::Queued);
        }
        Ok(self.dispatch_event(event))
    }

    fn dispatch_event(&mut self, event: Event) -> DispatchOutcome {
        self.gate.dispatch_active = true;
        debug!(chart = %self.id, event = %event.name, "BEGIN dispatch");

        // Snapshot the leaves up front: handler-requested transitions
        // queue behind this dispatch, so the set cannot change mid-walk,
        // but the snapshot makes that independence explicit.
        let leaves: Vec<StateId> = self.tree.node(self.root).current_substates.clone();
        let mut responder = None;

        for leaf in leaves {
            let mut cursor = Some(leaf);
            while let Some(s) = cursor {
                if self.try_handle(s, &event) {
                    responder = Some(s);
                    break;
                }
                cursor = self.tree.node(s).parent;
            }
        }

        let outcome = match responder {
            Some(s) => {
                debug!(chart = %self.id, event = %event.name, responder = self.tree.name(s), "event handled");
                DispatchOutcome::Handled(s)
            }
            None => {
                debug!(chart = %self.id, event = %event.name, "event not handled");
                DispatchOutcome::Unhandled
            }
        };

        self.gate.dispatch_active = false;
        debug!(chart = %self.id, event = %event.name, "END dispatch");
        self.flush_pending_transitions();
        outcome
    }

    /// Offer `event` to the handler attached to `s`. A handler fault is
    /// logged and then counted per the chart's [`FaultPolicy`]. A state
    /// with no handler never claims anything.
    fn try_handle(&mut self, s: StateId, event: &Event) -> bool {
        let Some(mut handler) = self.tree.node_mut(s).handler.take() else {
            return false;
        };
        let mut sink = RequestSink::new();
        let handled = match handler.handle_event(event, &mut sink) {
            Ok(handled) => handled,
            Err(fault) => {
                warn!(
                    chart = %self.id,
                    state = self.tree.name(s),
                    event = %event.name,
                    %fault,
                    "event handler fault"
                );
                self.fault_policy == FaultPolicy::TreatHandled
            }
        };
        self.tree.node_mut(s).handler = Some(handler);
        self.process_requests(sink);
        handled
    }

    /// Dispatch the oldest queued event, provided both locks are free.
    /// Each dispatch flushes again when it finishes, so the queue drains
    /// one event at a time with transitions interleaved fairly.
    pub(crate) fn flush_pending_events(&mut self) {
        if self.gate.transition != TransitionLock::Idle || self.gate.dispatch_active {
            return;
        }
        if let Some(event) = self.gate.pending_events.pop_front() {
            self.dispatch_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_policy_defaults_to_unhandled() {
        assert_eq!(FaultPolicy::default(), FaultPolicy::TreatUnhandled);
    }
}
