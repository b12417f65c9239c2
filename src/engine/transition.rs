//! Transition planning and execution.
//!
//! A transition is computed in two phases. Planning is pure: from the
//! anchor's and the target's leaf-first ancestor chains we find the
//! pivot (the deepest state shared by both), flatten the ordered exit
//! sequence (fanning out through parallel regions), and flatten the
//! ordered enter sequence (explicit chain below the pivot, then tail
//! resolution at the target through parallel children, history, or the
//! declared initial substate). Execution then walks the plan step by
//! step, invoking hooks and maintaining the dynamic bookkeeping.
//!
//! Because the full plan exists before any hook runs, suspension is
//! just an index into it: when a hook returns
//! [`HookOutcome::Suspend`], the remaining steps stay on the chart and
//! [`Statechart::resume`] picks up exactly where execution halted.

use serde_json::Value;
use tracing::debug;

use crate::core::{HookOutcome, RequestSink, StateId};

use super::{ChartError, Statechart, TransitionLock, TransitionRequest};

/// One enter step of a flattened plan. `mark_current` is set on the
/// terminal leaves that join the current-state set.
#[derive(Clone, Copy, Debug)]
pub(crate) struct EnterStep {
    state: StateId,
    mark_current: bool,
}

#[derive(Debug)]
pub(crate) enum PlanStep {
    Exit(StateId),
    Enter(EnterStep),
    Finished,
}

/// The flattened exit and enter sequences of one transition, plus the
/// execution cursor. Kept on the chart for the whole transition so a
/// suspension can resume mid-plan.
pub(crate) struct TransitionPlan {
    exits: Vec<StateId>,
    enters: Vec<EnterStep>,
    exit_idx: usize,
    enter_idx: usize,
    context: Option<Value>,
}

impl TransitionPlan {
    fn next_step(&mut self) -> PlanStep {
        if self.exit_idx < self.exits.len() {
            let state = self.exits[self.exit_idx];
            self.exit_idx += 1;
            return PlanStep::Exit(state);
        }
        if self.enter_idx < self.enters.len() {
            let step = self.enters[self.enter_idx];
            self.enter_idx += 1;
            return PlanStep::Enter(step);
        }
        PlanStep::Finished
    }
}

impl Statechart {
    /// Acquire the transition lock, plan, and execute. Planning errors
    /// release the lock and change nothing.
    pub(crate) fn run_transition(&mut self, request: TransitionRequest) -> Result<(), ChartError> {
        self.gate.transition = TransitionLock::Active;
        match self.begin_transition(&request) {
            Ok(()) => self.advance(),
            Err(e) => {
                self.gate.transition = TransitionLock::Idle;
                Err(e)
            }
        }
    }

    fn begin_transition(&mut self, request: &TransitionRequest) -> Result<(), ChartError> {
        // Anchor selection: an explicit anchor must be current; the
        // default is the first current state (none at all only during
        // initialization, when the chart has no current states yet).
        let current = &self.tree.node(self.root).current_substates;
        let anchor = match request.from {
            Some(f) => {
                if !current.contains(&f) {
                    return Err(ChartError::NotACurrentState(self.tree.name(f).to_string()));
                }
                Some(f)
            }
            None => current.first().copied(),
        };

        debug!(
            chart = %self.id,
            target = self.tree.name(request.target),
            anchor = anchor.map(|a| self.tree.name(a)),
            "BEGIN transition"
        );

        let exit_chain = anchor.map(|a| self.tree.chain(a)).unwrap_or_default();
        let enter_chain = self.tree.chain(request.target);

        // The pivot is the first state on the exit chain (leaf-first)
        // that also lies on the enter chain.
        let pivot = exit_chain
            .iter()
            .copied()
            .find(|s| enter_chain.contains(s));
        if let Some(p) = pivot {
            if self.tree.node(p).parallel {
                return Err(ChartError::AmbiguousPivot(self.tree.name(p).to_string()));
            }
            debug!(chart = %self.id, pivot = self.tree.name(p), "pivot state");
        }

        let plan = self.build_plan(anchor, request, pivot, &exit_chain, &enter_chain);
        self.plan = Some(plan);
        Ok(())
    }

    fn build_plan(
        &self,
        anchor: Option<StateId>,
        request: &TransitionRequest,
        pivot: Option<StateId>,
        exit_chain: &[StateId],
        enter_chain: &[StateId],
    ) -> TransitionPlan {
        let mut exits = Vec::new();
        if anchor.is_some() {
            for &s in exit_chain {
                if Some(s) == pivot {
                    break;
                }
                self.expand_exit_node(s, &mut exits);
            }
        }

        let mut enters = Vec::new();
        if pivot == Some(request.target) {
            // Self-transition: exit the pivot itself, then re-enter it
            // with full tail resolution. Re-running the hooks is the
            // point; this is not a no-op.
            self.expand_exit_node(request.target, &mut exits);
            self.expand_enter_tail(request.target, request.use_history, &mut enters);
        } else {
            let below_pivot: Vec<StateId> = match pivot {
                Some(p) => {
                    let idx = enter_chain
                        .iter()
                        .position(|&s| s == p)
                        .unwrap_or(enter_chain.len());
                    enter_chain[..idx].iter().rev().copied().collect()
                }
                None => enter_chain.iter().rev().copied().collect(),
            };
            self.expand_enter_steps(&below_pivot, request.use_history, &mut enters);
        }

        TransitionPlan {
            exits,
            enters,
            exit_idx: 0,
            enter_idx: 0,
            context: request.context.clone(),
        }
    }

    /// Append the ordered exits for `s`. A state whose substates are
    /// parallel first exits each still-current branch, leaf upward, and
    /// only then exits itself.
    fn expand_exit_node(&self, s: StateId, out: &mut Vec<StateId>) {
        if out.contains(&s) {
            return;
        }
        let node = self.tree.node(s);
        if node.parallel {
            for &leaf in &node.current_substates {
                if out.contains(&leaf) {
                    continue;
                }
                for b in self.tree.chain_until(leaf, s) {
                    self.expand_exit_node(b, out);
                }
            }
        }
        out.push(s);
    }

    /// Append enters along the explicit path below the pivot. An
    /// intermediate parallel state enters the rest of the explicit path
    /// first, then fans out into its remaining regions.
    fn expand_enter_steps(&self, path: &[StateId], use_history: bool, out: &mut Vec<EnterStep>) {
        let Some((&first, rest)) = path.split_first() else {
            return;
        };
        if rest.is_empty() {
            self.expand_enter_tail(first, use_history, out);
            return;
        }
        out.push(EnterStep {
            state: first,
            mark_current: false,
        });
        if self.tree.node(first).parallel {
            let next = rest[0];
            self.expand_enter_steps(rest, use_history, out);
            for &child in &self.tree.node(first).substates {
                if child != next {
                    self.expand_enter_tail(child, use_history, out);
                }
            }
        } else {
            self.expand_enter_steps(rest, use_history, out);
        }
    }

    /// Tail resolution below the explicit path: parallel fan-out into
    /// every region, else history (when requested), else the declared
    /// initial substate, else the state is a terminal leaf and becomes
    /// current.
    fn expand_enter_tail(&self, s: StateId, use_history: bool, out: &mut Vec<EnterStep>) {
        let idx = out.len();
        out.push(EnterStep {
            state: s,
            mark_current: false,
        });
        let node = self.tree.node(s);
        if !node.has_substates() {
            out[idx].mark_current = true;
            return;
        }
        if node.parallel {
            for &child in &node.substates {
                self.expand_enter_tail(child, use_history, out);
            }
            return;
        }
        let next = if use_history {
            self.history_candidate(s)
        } else {
            node.initial
        };
        match next {
            Some(n) => self.expand_enter_tail(n, use_history, out),
            None => out[idx].mark_current = true,
        }
    }

    /// Execute plan steps until the plan finishes or a hook suspends.
    /// On completion the lock is released and queued work drains.
    pub(crate) fn advance(&mut self) -> Result<(), ChartError> {
        loop {
            let (step, context) = match self.plan.as_mut() {
                Some(plan) => {
                    let context = plan.context.clone();
                    (plan.next_step(), context)
                }
                None => return Ok(()),
            };
            // A Suspend outcome already moved the lock to Suspended
            // inside the execute step (a hook may even have resumed and
            // finished the plan reentrantly); either way this frame is
            // done.
            match step {
                PlanStep::Exit(s) => {
                    if self.execute_exit_step(s) == HookOutcome::Suspend {
                        return Ok(());
                    }
                }
                PlanStep::Enter(enter) => {
                    if self.execute_enter_step(enter, context.as_ref()) == HookOutcome::Suspend {
                        return Ok(());
                    }
                }
                PlanStep::Finished => break,
            }
        }

        self.plan = None;
        self.gate.transition = TransitionLock::Idle;
        debug!(chart = %self.id, current = ?self.current_states(), "END transition");
        self.flush_pending_transitions();
        Ok(())
    }

    fn execute_exit_step(&mut self, s: StateId) -> HookOutcome {
        // A current leaf leaves every ancestor's current set on exit.
        if self.tree.node(s).current_substates.contains(&s) {
            let mut cursor = self.tree.node(s).parent;
            while let Some(p) = cursor {
                self.tree.node_mut(p).current_substates.retain(|&x| x != s);
                cursor = self.tree.node(p).parent;
            }
        }

        debug!(chart = %self.id, state = self.tree.name(s), "exiting state");

        let mut outcome = HookOutcome::Done;
        let mut sink = RequestSink::new();
        if let Some(mut handler) = self.tree.node_mut(s).handler.take() {
            handler.will_exit();
            outcome = handler.exit(&mut sink);
            handler.did_exit();
            self.tree.node_mut(s).handler = Some(handler);
        }

        if let Some(monitor) = self.monitor.as_mut() {
            monitor.push_exited(self.tree.name(s));
        }
        self.tree.node_mut(s).current_substates.clear();

        // Mark the suspension before draining the sink, so a resume the
        // hook recorded finds the transition in the suspended state.
        if outcome == HookOutcome::Suspend {
            self.gate.transition = TransitionLock::Suspended;
            debug!(chart = %self.id, state = self.tree.name(s), "transition suspended during exit");
        }
        self.process_requests(sink);
        outcome
    }

    fn execute_enter_step(&mut self, step: EnterStep, context: Option<&Value>) -> HookOutcome {
        let s = step.state;

        // Record history on the parent, except inside parallel regions
        // where several children are active at once.
        if let Some(p) = self.tree.node(s).parent {
            if !self.tree.node(p).parallel {
                self.tree.node_mut(p).history = Some(s);
            }
        }

        debug!(chart = %self.id, state = self.tree.name(s), "entering state");

        let mut outcome = HookOutcome::Done;
        let mut sink = RequestSink::new();
        if let Some(mut handler) = self.tree.node_mut(s).handler.take() {
            handler.will_enter();
            outcome = handler.enter(context, &mut sink);
            handler.did_enter();
            self.tree.node_mut(s).handler = Some(handler);
        }

        if let Some(monitor) = self.monitor.as_mut() {
            monitor.push_entered(self.tree.name(s));
        }

        if step.mark_current {
            let mut cursor = Some(s);
            while let Some(p) = cursor {
                self.tree.node_mut(p).current_substates.push(s);
                cursor = self.tree.node(p).parent;
            }
        }

        if outcome == HookOutcome::Suspend {
            self.gate.transition = TransitionLock::Suspended;
            debug!(chart = %self.id, state = self.tree.name(s), "transition suspended during enter");
        }
        self.process_requests(sink);
        outcome
    }
}
