use sb_core::ScriptKey;

/// Expansion state of a displayed script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// No children; nothing to expand.
    Leaf,
    /// Has children, shown as a single placeholder.
    Collapsed,
    /// Real children are being attached.
    Expanding,
    /// Real children are attached.
    Materialized,
}

#[derive(Debug, Clone)]
pub(crate) struct ViewNode<H> {
    pub(crate) handle: H,
    pub(crate) state: NodeState,
    pub(crate) children: Vec<(ScriptKey, H)>,
}

impl<H> ViewNode<H> {
    pub(crate) fn new(handle: H, state: NodeState) -> Self {
        Self {
            handle,
            state,
            children: Vec::new(),
        }
    }

    /// Leaf nodes hold an empty, already materialized child list.
    pub(crate) fn shows_children(&self) -> bool {
        matches!(self.state, NodeState::Leaf | NodeState::Materialized)
    }
}
