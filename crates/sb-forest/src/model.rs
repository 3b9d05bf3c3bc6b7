use std::collections::{BTreeMap, BTreeSet};

use sb_core::{sanitize_name, BundleError, Entry, ErrorKind, ParentKey, ScriptKey};

use crate::keys::{KeyGenerator, KEY_SPACE, MAX_KEY_DRAWS};

/// Ordered forest of script entries.
///
/// Entries are stored by key; tree position lives only in `relations`, one ordered child
/// list per parent. The root list always exists, every other list exists only while it
/// has at least one child.
#[derive(Debug, Clone)]
pub struct Forest {
    entries: BTreeMap<ScriptKey, Entry>,
    relations: BTreeMap<ParentKey, Vec<ScriptKey>>,
    in_use: BTreeSet<ScriptKey>,
    keys: KeyGenerator,
}

impl Default for Forest {
    fn default() -> Self {
        Self::with_seed(1)
    }
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u32) -> Self {
        let mut relations = BTreeMap::new();
        relations.insert(ParentKey::Root, Vec::new());
        Self {
            entries: BTreeMap::new(),
            relations,
            in_use: BTreeSet::new(),
            keys: KeyGenerator::new(seed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Parents that currently own a child list, root first.
    pub fn parents(&self) -> impl Iterator<Item = ParentKey> + '_ {
        self.relations.keys().copied()
    }

    pub fn lookup(&self, key: ScriptKey) -> Result<&Entry, BundleError> {
        self.entries.get(&key).ok_or_else(|| key_not_found(key))
    }

    pub fn lookup_mut(&mut self, key: ScriptKey) -> Result<&mut Entry, BundleError> {
        self.entries.get_mut(&key).ok_or_else(|| key_not_found(key))
    }

    /// Child list of `parent`. Fails for an entry that owns no list.
    pub fn children_of(&self, parent: ParentKey) -> Result<&[ScriptKey], BundleError> {
        match self.relations.get(&parent) {
            Some(children) => Ok(children),
            None => Err(BundleError::new(
                ErrorKind::KeyNotFound,
                format!("No child list for {}.", parent),
            )),
        }
    }

    /// Child list of `parent`, empty when it owns none.
    pub fn children(&self, parent: ParentKey) -> &[ScriptKey] {
        self.relations
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_children(&self, key: ScriptKey) -> bool {
        self.relations.contains_key(&ParentKey::Entry(key))
    }

    /// Owner of `key` and its index there, found by scanning every child list.
    pub fn parent_of(&self, key: ScriptKey) -> Result<(ParentKey, usize), BundleError> {
        self.relations
            .iter()
            .find_map(|(parent, children)| {
                children
                    .iter()
                    .position(|child| *child == key)
                    .map(|index| (*parent, index))
            })
            .ok_or_else(|| key_not_found(key))
    }

    pub fn exists(&self, key: ScriptKey) -> bool {
        self.in_use.contains(&key)
    }

    /// Draws an unused key and reserves it.
    pub fn allocate_key(&mut self) -> Result<ScriptKey, BundleError> {
        if self.in_use.len() >= KEY_SPACE as usize {
            return Err(exhausted());
        }
        for _ in 0..MAX_KEY_DRAWS {
            let candidate = self.keys.draw();
            if self.in_use.insert(candidate) {
                return Ok(candidate);
            }
        }
        Err(exhausted())
    }

    /// Returns a reserved key to the pool. Keys backing a live entry stay reserved.
    pub fn release_key(&mut self, key: ScriptKey) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.in_use.remove(&key)
    }

    /// Renames an entry with the engine's allowed character set; returns the stored name.
    pub fn rename(&mut self, key: ScriptKey, name: &str) -> Result<String, BundleError> {
        let entry = self.lookup_mut(key)?;
        entry.name = sanitize_name(name);
        entry.needs_save = true;
        Ok(entry.name.clone())
    }

    pub fn set_text(&mut self, key: ScriptKey, text: impl Into<String>) -> Result<(), BundleError> {
        let entry = self.lookup_mut(key)?;
        entry.text = text.into();
        entry.needs_save = true;
        Ok(())
    }

    /// Depth-first `(depth, key)` listing in display order.
    pub fn walk(&self) -> Vec<(usize, ScriptKey)> {
        let mut out = Vec::with_capacity(self.entries.len());
        let mut stack: Vec<(usize, ScriptKey)> = self
            .children(ParentKey::Root)
            .iter()
            .rev()
            .map(|key| (0, *key))
            .collect();
        while let Some((depth, key)) = stack.pop() {
            out.push((depth, key));
            stack.extend(
                self.children(ParentKey::Entry(key))
                    .iter()
                    .rev()
                    .map(|child| (depth + 1, *child)),
            );
        }
        out
    }

    /// `key` followed by all of its descendants, preorder.
    pub fn subtree(&self, key: ScriptKey) -> Vec<ScriptKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(ParentKey::Entry(next)).iter().rev().copied());
        }
        out
    }

    pub fn validate(&self) -> Result<(), BundleError> {
        if !self.relations.contains_key(&ParentKey::Root) {
            return Err(violation("root child list is missing".to_string()));
        }

        let mut owner: BTreeMap<ScriptKey, ParentKey> = BTreeMap::new();
        for (parent, children) in &self.relations {
            if let ParentKey::Entry(key) = parent {
                if children.is_empty() {
                    return Err(violation(format!("empty child list kept for {}", key)));
                }
                if !self.entries.contains_key(key) {
                    return Err(violation(format!("child list owned by missing entry {}", key)));
                }
            }
            for child in children {
                if !self.entries.contains_key(child) {
                    return Err(violation(format!("{} lists missing entry {}", parent, child)));
                }
                if let Some(previous) = owner.insert(*child, *parent) {
                    return Err(violation(format!(
                        "{} is listed under both {} and {}",
                        child, previous, parent
                    )));
                }
            }
        }

        for key in self.entries.keys() {
            if !owner.contains_key(key) {
                return Err(violation(format!("entry {} is not placed in any list", key)));
            }
            if !self.in_use.contains(key) {
                return Err(violation(format!("entry {} is not marked in use", key)));
            }
        }

        for key in self.entries.keys() {
            let mut current = ParentKey::Entry(*key);
            let mut steps = 0usize;
            while let ParentKey::Entry(at) = current {
                if steps > self.entries.len() {
                    return Err(violation(format!("{} is its own ancestor", key)));
                }
                current = owner.get(&at).copied().unwrap_or(ParentKey::Root);
                steps += 1;
            }
        }

        Ok(())
    }

    pub(crate) fn reserve_key(&mut self, key: ScriptKey) -> bool {
        self.in_use.insert(key)
    }

    pub(crate) fn insert_entry(&mut self, entry: Entry) {
        self.in_use.insert(entry.key);
        self.entries.insert(entry.key, entry);
    }

    /// Drops an entry and its key reservation; its child list is left to the caller.
    pub(crate) fn take_entry(&mut self, key: ScriptKey) -> Option<Entry> {
        let entry = self.entries.remove(&key)?;
        self.in_use.remove(&key);
        Some(entry)
    }

    pub(crate) fn take_children(&mut self, key: ScriptKey) -> Vec<ScriptKey> {
        self.relations
            .remove(&ParentKey::Entry(key))
            .unwrap_or_default()
    }

    /// Inserts into `parent`'s list at `index`, appending when out of range.
    pub(crate) fn attach(&mut self, parent: ParentKey, index: usize, key: ScriptKey) {
        let children = self.relations.entry(parent).or_default();
        let index = index.min(children.len());
        children.insert(index, key);
    }

    /// Unlinks `key` from its list, pruning the list if it empties.
    pub(crate) fn detach(&mut self, key: ScriptKey) -> Result<(ParentKey, usize), BundleError> {
        let (parent, index) = self.parent_of(key)?;
        if let Some(children) = self.relations.get_mut(&parent) {
            children.remove(index);
        }
        self.prune(parent);
        Ok((parent, index))
    }

    pub(crate) fn siblings_mut(&mut self, parent: ParentKey) -> Option<&mut Vec<ScriptKey>> {
        self.relations.get_mut(&parent)
    }

    pub(crate) fn prune(&mut self, parent: ParentKey) {
        if parent.is_root() {
            return;
        }
        if self
            .relations
            .get(&parent)
            .map(Vec::is_empty)
            .unwrap_or(false)
        {
            self.relations.remove(&parent);
        }
    }
}

fn key_not_found(key: ScriptKey) -> BundleError {
    BundleError::new(ErrorKind::KeyNotFound, format!("Script {} not found.", key))
}

fn exhausted() -> BundleError {
    BundleError::new(
        ErrorKind::KeyAllocationExhausted,
        format!("No free script key after {} draws.", MAX_KEY_DRAWS),
    )
}

fn violation(detail: String) -> BundleError {
    BundleError::new(ErrorKind::InvariantViolation, detail)
}

#[cfg(test)]
mod model_tests {
    use super::*;

    fn forest_with(keys: &[i32]) -> Forest {
        let mut forest = Forest::new();
        for (index, key) in keys.iter().enumerate() {
            forest.insert_entry(Entry::new(ScriptKey(*key), format!("S{}", key), ""));
            forest.attach(ParentKey::Root, index, ScriptKey(*key));
        }
        forest
    }

    #[test]
    fn children_of_distinguishes_root_from_leaf() {
        let forest = forest_with(&[1, 2]);
        assert_eq!(
            forest.children_of(ParentKey::Root).expect("root"),
            &[ScriptKey(1), ScriptKey(2)]
        );
        let error = forest
            .children_of(ParentKey::Entry(ScriptKey(1)))
            .expect_err("leaf has no list");
        assert_eq!(error.kind, ErrorKind::KeyNotFound);
        assert!(forest.children(ParentKey::Entry(ScriptKey(1))).is_empty());
    }

    #[test]
    fn parent_of_reports_owner_and_index() {
        let mut forest = forest_with(&[1, 2]);
        forest.insert_entry(Entry::new(ScriptKey(3), "Child", ""));
        forest.attach(ParentKey::Entry(ScriptKey(2)), 0, ScriptKey(3));
        assert_eq!(
            forest.parent_of(ScriptKey(3)).expect("placed"),
            (ParentKey::Entry(ScriptKey(2)), 0)
        );
        assert_eq!(
            forest.parent_of(ScriptKey(9)).expect_err("unknown").kind,
            ErrorKind::KeyNotFound
        );
    }

    #[test]
    fn allocate_key_never_returns_reserved_keys() {
        let mut forest = Forest::with_seed(11);
        let mut seen = BTreeSet::new();
        for _ in 0..500 {
            let key = forest.allocate_key().expect("allocate");
            assert!((0..KEY_SPACE as i32).contains(&key.0));
            assert!(seen.insert(key));
            assert!(forest.exists(key));
        }
    }

    #[test]
    fn release_key_keeps_live_entries_reserved() {
        let mut forest = forest_with(&[5]);
        assert!(!forest.release_key(ScriptKey(5)));
        assert!(forest.exists(ScriptKey(5)));

        let spare = forest.allocate_key().expect("allocate");
        assert!(forest.release_key(spare));
        assert!(!forest.exists(spare));
    }

    #[test]
    fn detach_prunes_emptied_lists_but_not_root() {
        let mut forest = forest_with(&[1]);
        forest.insert_entry(Entry::new(ScriptKey(2), "Child", ""));
        forest.attach(ParentKey::Entry(ScriptKey(1)), 0, ScriptKey(2));
        assert!(forest.has_children(ScriptKey(1)));

        forest.detach(ScriptKey(2)).expect("detach child");
        assert!(!forest.has_children(ScriptKey(1)));

        forest.detach(ScriptKey(1)).expect("detach top");
        assert!(forest.children_of(ParentKey::Root).expect("root").is_empty());
    }

    #[test]
    fn rename_sanitizes_and_marks_entry() {
        let mut forest = forest_with(&[1]);
        let stored = forest.rename(ScriptKey(1), " Scene/Title* ").expect("rename");
        assert_eq!(stored, "SceneTitle");
        assert!(forest.lookup(ScriptKey(1)).expect("entry").needs_save);
    }

    #[test]
    fn walk_lists_depth_first_in_display_order() {
        let mut forest = forest_with(&[1, 2, 4]);
        forest.insert_entry(Entry::new(ScriptKey(3), "Child", ""));
        forest.attach(ParentKey::Entry(ScriptKey(2)), 0, ScriptKey(3));
        assert_eq!(
            forest.walk(),
            vec![
                (0, ScriptKey(1)),
                (0, ScriptKey(2)),
                (1, ScriptKey(3)),
                (0, ScriptKey(4)),
            ]
        );
        assert_eq!(forest.subtree(ScriptKey(2)), vec![ScriptKey(2), ScriptKey(3)]);
    }

    #[test]
    fn validate_catches_broken_invariants() {
        let mut forest = forest_with(&[1, 2]);
        forest.validate().expect("valid");

        let mut doubled = forest.clone();
        doubled.attach(ParentKey::Entry(ScriptKey(1)), 0, ScriptKey(2));
        assert_eq!(
            doubled.validate().expect_err("listed twice").kind,
            ErrorKind::InvariantViolation
        );

        let mut cyclic = forest.clone();
        cyclic.detach(ScriptKey(1)).expect("detach");
        cyclic.detach(ScriptKey(2)).expect("detach");
        cyclic.attach(ParentKey::Entry(ScriptKey(1)), 0, ScriptKey(2));
        cyclic.attach(ParentKey::Entry(ScriptKey(2)), 0, ScriptKey(1));
        assert!(cyclic.validate().is_err());

        forest.relations.insert(ParentKey::Entry(ScriptKey(1)), Vec::new());
        assert!(forest.validate().is_err());
    }
}
