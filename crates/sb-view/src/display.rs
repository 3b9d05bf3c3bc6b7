use std::fmt;

use sb_core::ScriptKey;

/// A tree widget the synchronizer writes into. It never reads back structure.
pub trait TreeDisplay {
    type Handle: Copy + Eq + fmt::Debug;

    fn create_display_node(&mut self, key: ScriptKey, label: &str) -> Self::Handle;
    /// Replaces the children of `parent` (`None` is the top level).
    fn set_children(&mut self, parent: Option<Self::Handle>, children: &[Self::Handle]);
    /// Replaces the children of `parent` with a single placeholder node.
    fn insert_placeholder(&mut self, parent: Self::Handle) -> Self::Handle;
    fn is_placeholder(&self, handle: Self::Handle) -> bool;
    fn set_label(&mut self, handle: Self::Handle, label: &str);
}
