use std::collections::{BTreeMap, BTreeSet};

use sb_core::{BundleError, ErrorKind, ParentKey, ScriptKey};
use sb_forest::Forest;

use crate::node::{NodeState, ViewNode};
use crate::TreeDisplay;

/// Keeps a lazily expanded display in step with a forest.
///
/// Only expanded regions hold real display nodes; everything below a collapsed node is
/// a single placeholder until `expand` asks for it. The forest is only ever read.
pub struct ViewSynchronizer<D: TreeDisplay> {
    display: D,
    nodes: BTreeMap<ScriptKey, ViewNode<D::Handle>>,
    top: Vec<(ScriptKey, D::Handle)>,
    built: bool,
}

impl<D: TreeDisplay> ViewSynchronizer<D> {
    pub fn new(display: D) -> Self {
        Self {
            display,
            nodes: BTreeMap::new(),
            top: Vec::new(),
            built: false,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn into_display(self) -> D {
        self.display
    }

    pub fn state(&self, key: ScriptKey) -> Option<NodeState> {
        self.nodes.get(&key).map(|node| node.state)
    }

    pub fn handle(&self, key: ScriptKey) -> Option<D::Handle> {
        self.nodes.get(&key).map(|node| node.handle)
    }

    pub fn is_displayed(&self, key: ScriptKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Discards every display node and shows the top level, collapsed.
    pub fn build_from_root(&mut self, forest: &Forest) {
        self.nodes.clear();
        self.top = self.materialize(forest, ParentKey::Root, None);
        self.built = true;
        log::debug!("built display with {} top-level scripts", self.top.len());
    }

    pub fn expand(&mut self, forest: &Forest, key: ScriptKey) -> Result<(), BundleError> {
        let node = self.nodes.get_mut(&key).ok_or_else(|| not_displayed(key))?;
        if node.state != NodeState::Collapsed {
            return Ok(());
        }
        node.state = NodeState::Expanding;
        let handle = node.handle;

        let children = self.materialize(forest, ParentKey::Entry(key), Some(handle));
        if let Some(node) = self.nodes.get_mut(&key) {
            node.state = if children.is_empty() {
                NodeState::Leaf
            } else {
                NodeState::Materialized
            };
            node.children = children;
        }
        Ok(())
    }

    pub fn collapse(&mut self, key: ScriptKey) -> Result<(), BundleError> {
        let node = self.nodes.get_mut(&key).ok_or_else(|| not_displayed(key))?;
        if node.state != NodeState::Materialized {
            return Ok(());
        }
        let handle = node.handle;
        let children = std::mem::take(&mut node.children);
        node.state = NodeState::Collapsed;

        for (child, child_handle) in children {
            self.discard(child, child_handle);
        }
        self.display.insert_placeholder(handle);
        Ok(())
    }

    pub fn expand_all(&mut self, forest: &Forest) {
        let mut pending: Vec<ScriptKey> = self.top.iter().map(|(key, _)| *key).collect();
        while let Some(key) = pending.pop() {
            if self.expand(forest, key).is_err() {
                continue;
            }
            if let Some(node) = self.nodes.get(&key) {
                pending.extend(node.children.iter().map(|(child, _)| *child));
            }
        }
    }

    pub fn refresh_label(&mut self, forest: &Forest, key: ScriptKey) -> Result<(), BundleError> {
        let label = forest.lookup(key)?.display_label();
        if let Some(node) = self.nodes.get(&key) {
            self.display.set_label(node.handle, &label);
        }
        Ok(())
    }

    /// Reconciles the displayed children of `parent` with the forest after an edit.
    ///
    /// Displayed children that left the list are dropped, and the list each of them
    /// moved into is reconciled in the same pass.
    pub fn restitch(&mut self, forest: &Forest, parent: ParentKey) {
        let mut visited = BTreeSet::new();
        self.restitch_from(forest, parent, &mut visited);
    }

    /// Reconciles both ends of a move: the list `moved` left and the list it joined.
    ///
    /// The source alone is not enough when the entry was hidden under a collapsed node.
    pub fn restitch_move(&mut self, forest: &Forest, from: ParentKey, moved: ScriptKey) {
        let mut visited = BTreeSet::new();
        self.restitch_from(forest, from, &mut visited);
        if let Ok((to, _)) = forest.parent_of(moved) {
            self.restitch_from(forest, to, &mut visited);
        }
    }

    fn restitch_from(
        &mut self,
        forest: &Forest,
        parent: ParentKey,
        visited: &mut BTreeSet<ParentKey>,
    ) {
        if !visited.insert(parent) {
            return;
        }

        let (handle, displayed) = match parent {
            ParentKey::Root => {
                if !self.built {
                    return;
                }
                (None, self.top.clone())
            }
            ParentKey::Entry(key) => {
                let Some(node) = self.nodes.get(&key) else {
                    return;
                };
                if !node.shows_children() {
                    self.settle(forest, key);
                    return;
                }
                (Some(node.handle), node.children.clone())
            }
        };

        let authoritative = forest.children(parent);
        let wanted: BTreeSet<ScriptKey> = authoritative.iter().copied().collect();
        let mut kept = BTreeMap::new();
        let mut overflow = Vec::new();
        for (key, child_handle) in displayed {
            if wanted.contains(&key) {
                kept.insert(key, child_handle);
            } else {
                overflow.push((key, child_handle));
            }
        }
        for (key, child_handle) in &overflow {
            self.discard(*key, *child_handle);
        }

        let mut next = Vec::with_capacity(authoritative.len());
        let mut missing = 0usize;
        for key in authoritative {
            let current = self.nodes.get(key).map(|node| node.handle);
            let child_handle = match (kept.get(key), current) {
                (Some(shown), Some(current)) if *shown == current => {
                    self.settle(forest, *key);
                    current
                }
                _ => {
                    missing += 1;
                    self.create_node(forest, *key)
                }
            };
            next.push((*key, child_handle));
        }

        let handles: Vec<D::Handle> = next.iter().map(|(_, handle)| *handle).collect();
        self.display.set_children(handle, &handles);
        match parent {
            ParentKey::Root => self.top = next,
            ParentKey::Entry(key) => {
                if let Some(node) = self.nodes.get_mut(&key) {
                    node.state = if next.is_empty() {
                        NodeState::Leaf
                    } else {
                        NodeState::Materialized
                    };
                    node.children = next;
                }
            }
        }
        log::debug!(
            "restitched {}: {} kept, {} added, {} moved away",
            parent,
            kept.len(),
            missing,
            overflow.len()
        );

        for (key, _) in overflow {
            if let Ok((new_parent, _)) = forest.parent_of(key) {
                self.restitch_from(forest, new_parent, visited);
            }
        }
    }

    /// A collapsed node that lost all its children becomes a leaf.
    fn settle(&mut self, forest: &Forest, key: ScriptKey) {
        if let Some(node) = self.nodes.get_mut(&key) {
            if node.state == NodeState::Collapsed && !forest.has_children(key) {
                node.state = NodeState::Leaf;
                let handle = node.handle;
                self.display.set_children(Some(handle), &[]);
            }
        }
    }

    fn materialize(
        &mut self,
        forest: &Forest,
        parent: ParentKey,
        handle: Option<D::Handle>,
    ) -> Vec<(ScriptKey, D::Handle)> {
        let children: Vec<(ScriptKey, D::Handle)> = forest
            .children(parent)
            .iter()
            .map(|key| (*key, self.create_node(forest, *key)))
            .collect();
        let handles: Vec<D::Handle> = children.iter().map(|(_, handle)| *handle).collect();
        self.display.set_children(handle, &handles);
        children
    }

    fn create_node(&mut self, forest: &Forest, key: ScriptKey) -> D::Handle {
        let label = forest
            .lookup(key)
            .map(|entry| entry.display_label())
            .unwrap_or_else(|_| key.to_string());
        let handle = self.display.create_display_node(key, &label);
        let state = if forest.has_children(key) {
            self.display.insert_placeholder(handle);
            NodeState::Collapsed
        } else {
            NodeState::Leaf
        };
        if let Some(stale) = self.nodes.insert(key, ViewNode::new(handle, state)) {
            for (child, child_handle) in stale.children {
                self.discard(child, child_handle);
            }
        }
        handle
    }

    /// Forgets `key` and its displayed descendants, unless `key` has been redisplayed
    /// under a newer handle.
    fn discard(&mut self, key: ScriptKey, handle: D::Handle) {
        let current = self.nodes.get(&key).map(|node| node.handle);
        if current != Some(handle) {
            return;
        }
        if let Some(node) = self.nodes.remove(&key) {
            for (child, child_handle) in node.children {
                self.discard(child, child_handle);
            }
        }
    }
}

fn not_displayed(key: ScriptKey) -> BundleError {
    BundleError::new(
        ErrorKind::KeyNotFound,
        format!("Script {} is not displayed.", key),
    )
}
