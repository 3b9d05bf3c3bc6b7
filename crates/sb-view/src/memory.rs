use std::fmt;

use sb_core::ScriptKey;

use crate::TreeDisplay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayHandle(pub usize);

impl fmt::Display for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

#[derive(Debug, Clone)]
struct MemoryNode {
    /// `None` marks a placeholder.
    key: Option<ScriptKey>,
    label: String,
    children: Vec<DisplayHandle>,
}

/// Arena-backed display used by the command line and tests. Detached nodes stay in the
/// arena; only what is reachable from the top level is rendered.
#[derive(Debug, Default, Clone)]
pub struct MemoryDisplay {
    nodes: Vec<MemoryNode>,
    top: Vec<DisplayHandle>,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(&self, handle: DisplayHandle) -> Option<&str> {
        self.nodes.get(handle.0).map(|node| node.label.as_str())
    }

    pub fn key_of(&self, handle: DisplayHandle) -> Option<ScriptKey> {
        self.nodes.get(handle.0).and_then(|node| node.key)
    }

    pub fn children(&self, parent: Option<DisplayHandle>) -> &[DisplayHandle] {
        match parent {
            None => &self.top,
            Some(handle) => self
                .nodes
                .get(handle.0)
                .map(|node| node.children.as_slice())
                .unwrap_or(&[]),
        }
    }

    /// Indented outline of the visible tree, placeholders shown as `...`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_level(&self.top, 0, &mut out);
        out
    }

    fn render_level(&self, handles: &[DisplayHandle], depth: usize, out: &mut String) {
        for handle in handles {
            let Some(node) = self.nodes.get(handle.0) else {
                continue;
            };
            out.push_str(&"  ".repeat(depth));
            match node.key {
                Some(_) => out.push_str(&node.label),
                None => out.push_str("..."),
            }
            out.push('\n');
            self.render_level(&node.children, depth + 1, out);
        }
    }

    fn push(&mut self, key: Option<ScriptKey>, label: &str) -> DisplayHandle {
        self.nodes.push(MemoryNode {
            key,
            label: label.to_string(),
            children: Vec::new(),
        });
        DisplayHandle(self.nodes.len() - 1)
    }
}

impl TreeDisplay for MemoryDisplay {
    type Handle = DisplayHandle;

    fn create_display_node(&mut self, key: ScriptKey, label: &str) -> DisplayHandle {
        self.push(Some(key), label)
    }

    fn set_children(&mut self, parent: Option<DisplayHandle>, children: &[DisplayHandle]) {
        match parent {
            None => self.top = children.to_vec(),
            Some(handle) => {
                if let Some(node) = self.nodes.get_mut(handle.0) {
                    node.children = children.to_vec();
                }
            }
        }
    }

    fn insert_placeholder(&mut self, parent: DisplayHandle) -> DisplayHandle {
        let placeholder = self.push(None, "");
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children = vec![placeholder];
        }
        placeholder
    }

    fn is_placeholder(&self, handle: DisplayHandle) -> bool {
        self.nodes
            .get(handle.0)
            .map(|node| node.key.is_none())
            .unwrap_or(false)
    }

    fn set_label(&mut self, handle: DisplayHandle, label: &str) {
        if let Some(node) = self.nodes.get_mut(handle.0) {
            node.label = label.to_string();
        }
    }
}
