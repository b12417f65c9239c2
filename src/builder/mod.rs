//! Declarative construction of statecharts.
//!
//! A chart is described once, up front, by a tree of [`StateTemplate`]s
//! (buildable fluently or deserialized from data), then frozen into a
//! [`Statechart`] by [`ChartBuilder::build`]. After that the tree's
//! shape never changes; there is no way to add or remove states from a
//! built chart.
//!
//! Name resolution rules follow the engine's contract: duplicate state
//! names are fatal, while an `initial` or `default_history` name that
//! does not match a substate is a build-time warning with a fallback.

pub mod error;

pub use error::BuildError;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{Node, StateHandler, StateId, Tree};
use crate::engine::{FaultPolicy, Statechart};
use crate::monitor::TransitionMonitor;

/// Name given to the implicit root state created by [`ChartBuilder::new`].
pub const ROOT_STATE_NAME: &str = "__root__";

/// Static description of one state and its subtree.
///
/// Templates are plain data: they can be assembled with the fluent
/// methods below or deserialized from JSON.
///
/// # Example
///
/// ```rust
/// use statechart::StateTemplate;
///
/// let template = StateTemplate::new("player")
///     .initial("stopped")
///     .substate(StateTemplate::new("stopped"))
///     .substate(StateTemplate::new("playing"));
///
/// let json = serde_json::to_string(&template).unwrap();
/// let back: StateTemplate = serde_json::from_str(&json).unwrap();
/// assert_eq!(back.name, "player");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateTemplate {
    /// Unique name of the state.
    pub name: String,
    /// Name of the substate entered by default. Ignored (with a warning)
    /// when `parallel` is set.
    #[serde(default)]
    pub initial: Option<String>,
    /// When true, all substates are simultaneously active orthogonal
    /// regions.
    #[serde(default)]
    pub parallel: bool,
    /// Configured history fallback: the substate history resolution
    /// yields when the state has never been entered.
    #[serde(default)]
    pub default_history: Option<String>,
    /// When true, history resolution from this state chases nested
    /// history transitively even for non-recursive requests.
    #[serde(default)]
    pub deep_history: bool,
    /// Child templates in declaration order.
    #[serde(default)]
    pub substates: Vec<StateTemplate>,
}

impl StateTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial: None,
            parallel: false,
            default_history: None,
            deep_history: false,
            substates: Vec::new(),
        }
    }

    /// Set the name of the default initial substate.
    pub fn initial(mut self, name: impl Into<String>) -> Self {
        self.initial = Some(name.into());
        self
    }

    /// Mark this state's substates as parallel (orthogonal) regions.
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Set the configured history fallback target.
    pub fn default_history(mut self, name: impl Into<String>) -> Self {
        self.default_history = Some(name.into());
        self
    }

    /// Make history resolution from this state recursive by default.
    pub fn deep_history(mut self) -> Self {
        self.deep_history = true;
        self
    }

    /// Append a child template.
    pub fn substate(mut self, template: StateTemplate) -> Self {
        self.substates.push(template);
        self
    }
}

/// Builder assembling a [`Statechart`] from a template tree, handlers,
/// and engine options.
///
/// # Example
///
/// ```rust
/// use statechart::{ChartBuilder, StateTemplate};
///
/// let mut chart = ChartBuilder::new()
///     .initial("off")
///     .substate(StateTemplate::new("off"))
///     .substate(StateTemplate::new("on"))
///     .build()
///     .unwrap();
///
/// chart.initialize().unwrap();
/// assert_eq!(chart.current_states(), vec!["off"]);
/// ```
pub struct ChartBuilder {
    root: StateTemplate,
    handlers: Vec<(String, Box<dyn StateHandler>)>,
    monitor: bool,
    fault_policy: FaultPolicy,
}

impl ChartBuilder {
    /// Start a builder with an implicit root state named
    /// [`ROOT_STATE_NAME`].
    pub fn new() -> Self {
        Self {
            root: StateTemplate::new(ROOT_STATE_NAME),
            handlers: Vec::new(),
            monitor: false,
            fault_policy: FaultPolicy::default(),
        }
    }

    /// Start a builder from a complete root template, e.g. one
    /// deserialized from configuration.
    pub fn from_template(root: StateTemplate) -> Self {
        Self {
            root,
            handlers: Vec::new(),
            monitor: false,
            fault_policy: FaultPolicy::default(),
        }
    }

    /// Set the root's default initial substate.
    pub fn initial(mut self, name: impl Into<String>) -> Self {
        self.root.initial = Some(name.into());
        self
    }

    /// Make the root's substates parallel regions.
    pub fn parallel(mut self) -> Self {
        self.root.parallel = true;
        self
    }

    /// Append a top-level state.
    pub fn substate(mut self, template: StateTemplate) -> Self {
        self.root.substates.push(template);
        self
    }

    /// Attach behavior to the named state.
    pub fn handler(mut self, state: impl Into<String>, handler: impl StateHandler + 'static) -> Self {
        self.handlers.push((state.into(), Box::new(handler)));
        self
    }

    /// Record entered/exited sequences in a [`TransitionMonitor`],
    /// retrievable via [`Statechart::monitor`].
    pub fn with_monitor(mut self) -> Self {
        self.monitor = true;
        self
    }

    /// Choose how event-handler faults count for ancestor fallback.
    pub fn fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    /// Construct the frozen statechart. The chart still needs
    /// [`Statechart::initialize`] before it can transition or dispatch.
    pub fn build(self) -> Result<Statechart, BuildError> {
        let mut tree = Tree::new();
        let mut registry = HashMap::new();
        let root = build_node(&mut tree, &mut registry, &self.root, None)?;

        for (name, handler) in self.handlers {
            let id = *registry
                .get(&name)
                .ok_or_else(|| BuildError::UnknownHandlerState(name.clone()))?;
            tree.node_mut(id).handler = Some(handler);
        }

        let monitor = self.monitor.then(TransitionMonitor::new);
        Ok(Statechart::from_parts(
            tree,
            registry,
            root,
            monitor,
            self.fault_policy,
        ))
    }
}

impl Default for ChartBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Depth-first template walk: register the node, build its subtree,
/// then resolve `initial` and history metadata against the actual
/// substates.
fn build_node(
    tree: &mut Tree,
    registry: &mut HashMap<String, StateId>,
    template: &StateTemplate,
    parent: Option<StateId>,
) -> Result<StateId, BuildError> {
    if registry.contains_key(&template.name) {
        return Err(BuildError::DuplicateStateName(template.name.clone()));
    }

    let id = tree.push(Node::new(template.name.clone(), parent));
    registry.insert(template.name.clone(), id);

    let mut substates = Vec::with_capacity(template.substates.len());
    for child in &template.substates {
        substates.push(build_node(tree, registry, child, Some(id))?);
    }

    let find_child = |name: &str| {
        substates
            .iter()
            .copied()
            .find(|&c| tree.name(c) == name)
    };

    let mut initial = None;
    if let Some(name) = &template.initial {
        initial = find_child(name);
        if initial.is_none() {
            warn!(
                state = %template.name,
                initial = %name,
                "initial substate does not match any substate; falling back"
            );
        }
    }

    if substates.is_empty() {
        if template.initial.is_some() {
            warn!(
                state = %template.name,
                "state has no substates; ignoring initial substate"
            );
        }
        initial = None;
    } else if template.parallel {
        if initial.is_some() || template.initial.is_some() {
            warn!(
                state = %template.name,
                "substates are parallel; ignoring initial substate"
            );
        }
        initial = None;
    } else if initial.is_none() {
        initial = Some(substates[0]);
        warn!(
            state = %template.name,
            fallback = %tree.name(substates[0]),
            "no initial substate defined; defaulting to first substate"
        );
    }

    let mut default_history = None;
    if let Some(name) = &template.default_history {
        if template.parallel {
            warn!(
                state = %template.name,
                "substates are parallel; ignoring history default"
            );
        } else {
            default_history = find_child(name);
            if default_history.is_none() {
                warn!(
                    state = %template.name,
                    default = %name,
                    "history default does not match any substate; ignoring"
                );
            }
        }
    }

    let node = tree.node_mut(id);
    node.substates = substates;
    node.parallel = template.parallel;
    node.initial = initial;
    node.default_history = default_history;
    node.deep_history = template.deep_history;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_fatal() {
        let result = ChartBuilder::new()
            .substate(StateTemplate::new("a"))
            .substate(StateTemplate::new("a"))
            .build();

        assert!(matches!(result, Err(BuildError::DuplicateStateName(n)) if n == "a"));
    }

    #[test]
    fn duplicate_names_across_levels_are_fatal() {
        let result = ChartBuilder::new()
            .substate(StateTemplate::new("a").substate(StateTemplate::new("b")))
            .substate(StateTemplate::new("b"))
            .build();

        assert!(matches!(result, Err(BuildError::DuplicateStateName(n)) if n == "b"));
    }

    #[test]
    fn handler_on_unknown_state_is_fatal() {
        struct Noop;
        impl crate::core::StateHandler for Noop {}

        let result = ChartBuilder::new()
            .substate(StateTemplate::new("a"))
            .handler("missing", Noop)
            .build();

        assert!(matches!(result, Err(BuildError::UnknownHandlerState(n)) if n == "missing"));
    }

    #[test]
    fn missing_initial_falls_back_to_first_substate() {
        let mut chart = ChartBuilder::new()
            .substate(StateTemplate::new("a"))
            .substate(StateTemplate::new("b"))
            .build()
            .unwrap();

        chart.initialize().unwrap();
        assert_eq!(chart.current_states(), vec!["a"]);
    }

    #[test]
    fn unresolved_initial_name_falls_back_to_first_substate() {
        let mut chart = ChartBuilder::new()
            .initial("nope")
            .substate(StateTemplate::new("a"))
            .substate(StateTemplate::new("b"))
            .build()
            .unwrap();

        chart.initialize().unwrap();
        assert_eq!(chart.current_states(), vec!["a"]);
    }

    #[test]
    fn parallel_root_ignores_initial() {
        let mut chart = ChartBuilder::new()
            .parallel()
            .initial("a")
            .substate(StateTemplate::new("a"))
            .substate(StateTemplate::new("b"))
            .build()
            .unwrap();

        chart.initialize().unwrap();
        assert_eq!(chart.current_states(), vec!["a", "b"]);
    }

    #[test]
    fn template_deserializes_from_json() {
        let json = r#"{
            "name": "root",
            "initial": "a",
            "substates": [
                {"name": "a"},
                {"name": "b", "parallel": true, "substates": [{"name": "c"}, {"name": "d"}]}
            ]
        }"#;

        let template: StateTemplate = serde_json::from_str(json).unwrap();
        let mut chart = ChartBuilder::from_template(template).build().unwrap();
        chart.initialize().unwrap();
        assert_eq!(chart.current_states(), vec!["a"]);
        assert!(chart.state("c").is_some());
    }

    #[test]
    fn built_chart_registers_every_state() {
        let chart = ChartBuilder::new()
            .initial("a")
            .substate(StateTemplate::new("a").substate(StateTemplate::new("c")))
            .substate(StateTemplate::new("b"))
            .build()
            .unwrap();

        assert!(chart.state(ROOT_STATE_NAME).is_some());
        assert!(chart.state("a").is_some());
        assert!(chart.state("b").is_some());
        assert!(chart.state("c").is_some());
        assert!(chart.state("z").is_none());
    }
}
