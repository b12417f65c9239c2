//! State tree nodes and the arena that owns them.
//!
//! A statechart's tree is built once at construction time and is frozen
//! afterwards: only the dynamic fields (`history`, `current_substates`)
//! mutate, and only inside the locked transition algorithm. Parent links
//! are plain arena indices, so the tree owns its children without any
//! reference cycles.

use crate::core::handler::StateHandler;

/// Opaque identifier of one state within a statechart's tree.
///
/// Ids are only meaningful for the chart that produced them. Resolve
/// names with [`crate::Statechart::state`] and map back with
/// [`crate::Statechart::state_name`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct StateId(pub(crate) usize);

/// One node of the static state tree.
///
/// Structural fields are immutable after the builder finishes; `history`
/// and `current_substates` are the per-node dynamic state the transition
/// engine maintains.
pub(crate) struct Node {
    /// Unique name within the owning statechart.
    pub(crate) name: String,
    /// Back-reference to the parent; `None` only for the root.
    pub(crate) parent: Option<StateId>,
    /// Immediate substates in declaration order.
    pub(crate) substates: Vec<StateId>,
    /// When true, all substates are orthogonal regions that are active
    /// simultaneously. Mutually exclusive with `initial`.
    pub(crate) parallel: bool,
    /// Default substate entered when no deeper target is given.
    pub(crate) initial: Option<StateId>,
    /// Configured fallback for history resolution when no dynamic
    /// history exists yet (the "history marker" default target).
    pub(crate) default_history: Option<StateId>,
    /// When true, history resolution from this node chases substates'
    /// own history transitively.
    pub(crate) deep_history: bool,
    /// Most recently entered non-parallel substate. Never set while the
    /// substates are parallel, since several are active at once.
    pub(crate) history: Option<StateId>,
    /// Current leaf descendants of this node. A leaf that becomes
    /// current is pushed into its own set and into every ancestor's set,
    /// and removed again on exit, so the root's set is the chart's
    /// global current-state set.
    pub(crate) current_substates: Vec<StateId>,
    /// Behavior attached to this state, if any.
    pub(crate) handler: Option<Box<dyn StateHandler>>,
}

impl Node {
    pub(crate) fn new(name: impl Into<String>, parent: Option<StateId>) -> Self {
        Self {
            name: name.into(),
            parent,
            substates: Vec::new(),
            parallel: false,
            initial: None,
            default_history: None,
            deep_history: false,
            history: None,
            current_substates: Vec::new(),
            handler: None,
        }
    }

    pub(crate) fn has_substates(&self) -> bool {
        !self.substates.is_empty()
    }
}

/// Arena holding every node of one statechart.
///
/// Nodes are never removed individually; the whole tree is dropped with
/// the statechart.
#[derive(Default)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, node: Node) -> StateId {
        let id = StateId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub(crate) fn node(&self, id: StateId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: StateId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn name(&self, id: StateId) -> &str {
        &self.nodes[id.0].name
    }

    /// Leaf-first ancestor chain `[id, id.parent, .., root]`.
    pub(crate) fn chain(&self, id: StateId) -> Vec<StateId> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(s) = cursor {
            chain.push(s);
            cursor = self.node(s).parent;
        }
        chain
    }

    /// Leaf-first chain from `id` up to, but excluding, `stop`.
    pub(crate) fn chain_until(&self, id: StateId, stop: StateId) -> Vec<StateId> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(s) = cursor {
            if s == stop {
                break;
            }
            chain.push(s);
            cursor = self.node(s).parent;
        }
        chain
    }
}
