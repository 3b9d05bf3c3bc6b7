use sb_core::{BundleError, Entry, ErrorKind, ParentKey, ScriptKey};

use crate::codec::strip_sentinel;
use crate::Forest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertSource {
    /// A new script under a freshly allocated key.
    Named { name: String, text: String },
    /// An entry carrying its own key (paste, import).
    Existing(Entry),
}

impl InsertSource {
    pub fn named(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveMode {
    DeleteSubtree,
    /// Splice the children into the removed entry's position.
    PromoteChildren,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
    In,
    Out,
}

impl MoveDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl Forest {
    /// Places a new entry in `parent`'s list at `index` (appended when out of range).
    pub fn insert(
        &mut self,
        parent: ParentKey,
        index: usize,
        source: InsertSource,
    ) -> Result<ScriptKey, BundleError> {
        if let ParentKey::Entry(parent_key) = parent {
            if self.lookup(parent_key).is_err() {
                return Err(BundleError::new(
                    ErrorKind::ParentNotFound,
                    format!("Parent script {} not found.", parent_key),
                ));
            }
        }

        let mut entry = match source {
            InsertSource::Named { name, text } => {
                let key = self.allocate_key()?;
                Entry::new(key, strip_sentinel(&name), text)
            }
            InsertSource::Existing(mut entry) => {
                if !self.reserve_key(entry.key) {
                    return Err(BundleError::new(
                        ErrorKind::KeyCollision,
                        format!("Script key {} is already in use.", entry.key),
                    ));
                }
                entry.name = strip_sentinel(&entry.name);
                entry
            }
        };
        entry.needs_save = true;

        let key = entry.key;
        self.insert_entry(entry);
        self.attach(parent, index, key);
        log::debug!("inserted {} under {} at {}", key, parent, index);
        Ok(key)
    }

    /// Deletes `key`, returning the removed entries (`key` first).
    pub fn remove(&mut self, key: ScriptKey, mode: RemoveMode) -> Result<Vec<Entry>, BundleError> {
        self.lookup(key)?;
        let (parent, index) = self.parent_of(key)?;

        let doomed = match mode {
            RemoveMode::DeleteSubtree => self.subtree(key),
            RemoveMode::PromoteChildren => {
                let children = self.take_children(key);
                if let Some(siblings) = self.siblings_mut(parent) {
                    siblings.splice(index..=index, children);
                }
                vec![key]
            }
        };
        if mode == RemoveMode::DeleteSubtree {
            self.detach(key)?;
        } else {
            self.prune(parent);
        }

        let mut removed = Vec::with_capacity(doomed.len());
        for doomed_key in doomed {
            self.take_children(doomed_key);
            if let Some(entry) = self.take_entry(doomed_key) {
                removed.push(entry);
            }
        }
        log::debug!(
            "removed {} ({:?}, {} entries) from {}",
            key,
            mode,
            removed.len(),
            parent
        );
        Ok(removed)
    }

    /// Swaps `key` with its older sibling. Returns the parent whose list changed.
    pub fn move_up(&mut self, key: ScriptKey) -> Result<ParentKey, BundleError> {
        let (parent, index) = self.parent_of(key)?;
        if index == 0 {
            return Err(no_older_sibling(key));
        }
        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.swap(index - 1, index);
        }
        log::debug!("moved {} up within {}", key, parent);
        Ok(parent)
    }

    pub fn move_down(&mut self, key: ScriptKey) -> Result<ParentKey, BundleError> {
        let (parent, index) = self.parent_of(key)?;
        if index + 1 >= self.children(parent).len() {
            return Err(BundleError::new(
                ErrorKind::NoYoungerSibling,
                format!("Script {} is already last.", key),
            ));
        }
        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.swap(index, index + 1);
        }
        log::debug!("moved {} down within {}", key, parent);
        Ok(parent)
    }

    /// Makes `key` the first child of its older sibling. Returns the old parent.
    pub fn move_in(&mut self, key: ScriptKey) -> Result<ParentKey, BundleError> {
        let (parent, index) = self.parent_of(key)?;
        if index == 0 {
            return Err(no_older_sibling(key));
        }
        let sibling = self.children(parent)[index - 1];
        self.detach(key)?;
        self.attach(ParentKey::Entry(sibling), 0, key);
        log::debug!("moved {} into {}", key, sibling);
        Ok(parent)
    }

    /// Moves `key` to just after its parent in the grandparent's list. Returns the old parent.
    pub fn move_out(&mut self, key: ScriptKey) -> Result<ParentKey, BundleError> {
        let (parent, _) = self.parent_of(key)?;
        let parent_key = match parent {
            ParentKey::Root => {
                return Err(BundleError::new(
                    ErrorKind::AlreadyAtRoot,
                    format!("Script {} is already at the top level.", key),
                ))
            }
            ParentKey::Entry(parent_key) => parent_key,
        };
        let (grandparent, parent_index) = self.parent_of(parent_key)?;
        self.detach(key)?;
        self.attach(grandparent, parent_index + 1, key);
        log::debug!("moved {} out of {} into {}", key, parent_key, grandparent);
        Ok(parent)
    }

    pub fn move_script(
        &mut self,
        key: ScriptKey,
        direction: MoveDirection,
    ) -> Result<ParentKey, BundleError> {
        match direction {
            MoveDirection::Up => self.move_up(key),
            MoveDirection::Down => self.move_down(key),
            MoveDirection::In => self.move_in(key),
            MoveDirection::Out => self.move_out(key),
        }
    }
}

fn no_older_sibling(key: ScriptKey) -> BundleError {
    BundleError::new(
        ErrorKind::NoOlderSibling,
        format!("Script {} is already first.", key),
    )
}
