//! History-state resolution.
//!
//! Every non-parallel state remembers the last substate it entered.
//! `goto_history_state` consults that memory (falling back to the
//! configured history default, then to the initial substate) and
//! transitions there; the recursive form keeps consulting history at
//! every level below the target instead of stopping after one.

use tracing::debug;

use crate::core::StateId;

use super::{ChartError, Statechart, TransitionRequest};

impl Statechart {
    /// Transition into `target`'s most recently active substate.
    ///
    /// With `recursive` set (or when `target` was declared with deep
    /// history) history is followed at every level down to the leaves;
    /// otherwise only `target`'s own history is consulted and the levels
    /// below enter through their initial substates.
    ///
    /// When `target` has no history, no configured default, and no
    /// initial substate, the transition goes to `target` itself.
    pub fn goto_history_state(
        &mut self,
        target: &str,
        from: Option<&str>,
        recursive: bool,
    ) -> Result<(), ChartError> {
        if !self.initialized {
            return Err(ChartError::NotInitialized);
        }
        let target_id = self.resolve(target)?;
        let from = from.map(|f| self.resolve(f)).transpose()?;
        let recursive = recursive || self.tree.node(target_id).deep_history;

        if recursive {
            // Deep history: enter the target and chase history at each
            // level during tail expansion.
            return self.request_transition(TransitionRequest {
                target: target_id,
                from,
                use_history: true,
                context: None,
            });
        }

        // Shallow history: pick the one remembered (or default, or
        // initial) substate and make an ordinary transition there.
        let destination = self.history_candidate(target_id).unwrap_or(target_id);
        debug!(
            chart = %self.id,
            target = self.tree.name(target_id),
            destination = self.tree.name(destination),
            "history transition"
        );
        self.request_transition(TransitionRequest {
            target: destination,
            from,
            use_history: false,
            context: None,
        })
    }

    /// Name of `state`'s remembered substate, if it has one.
    pub fn history_state(&self, state: &str) -> Option<&str> {
        let id = self.registry.get(state)?;
        self.tree
            .node(*id)
            .history
            .map(|h| self.tree.name(h))
    }

    /// Where a history transition into `state` would land, without
    /// performing it. The non-recursive form answers after one level;
    /// the recursive form follows history to a fixed point.
    pub fn resolve_history_state(&self, state: &str, recursive: bool) -> Result<&str, ChartError> {
        let id = self.resolve(state)?;
        if !recursive {
            let destination = self.history_candidate(id).unwrap_or(id);
            return Ok(self.tree.name(destination));
        }

        // Cycle guard: history links always point parent to child, but
        // a walk longer than the tree means corrupted memory.
        let mut cursor = id;
        let mut hops = 0;
        while let Some(next) = self.history_candidate(cursor) {
            hops += 1;
            if hops > self.tree.len() {
                return Err(ChartError::HistoryCycle(self.tree.name(id).to_string()));
            }
            cursor = next;
        }
        Ok(self.tree.name(cursor))
    }

    /// One level of history resolution: remembered substate, else the
    /// configured default, else the initial substate.
    pub(crate) fn history_candidate(&self, s: StateId) -> Option<StateId> {
        let node = self.tree.node(s);
        node.history.or(node.default_history).or(node.initial)
    }
}
