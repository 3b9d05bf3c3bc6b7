use std::collections::BTreeMap;

use crate::{BundleError, Record, ScriptKey};

/// Opaque encode/decode service for the flat record array.
pub trait RecordSerializer: Send + Sync {
    fn encode(&self, records: &[Record]) -> Result<Vec<u8>, BundleError>;
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Record>, BundleError>;
    /// A lone `[key, name, payload]` triple, the clipboard stream.
    fn encode_record(&self, record: &Record) -> Result<Vec<u8>, BundleError>;
    fn decode_record(&self, bytes: &[u8]) -> Result<Record, BundleError>;
}

/// Live text owned by the code editor; consulted only at save boundaries.
pub trait TextSurface {
    fn current_text(&self, key: ScriptKey) -> Option<String>;
    fn has_unapplied_changes(&self, key: ScriptKey) -> bool;
    /// Marks the live buffer as committed into the entry.
    fn apply(&mut self, key: ScriptKey);
}

/// A surface with no open editors.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedSurface;

impl TextSurface for DetachedSurface {
    fn current_text(&self, _key: ScriptKey) -> Option<String> {
        None
    }

    fn has_unapplied_changes(&self, _key: ScriptKey) -> bool {
        false
    }

    fn apply(&mut self, _key: ScriptKey) {}
}

#[derive(Debug, Clone)]
struct Buffer {
    text: String,
    dirty: bool,
}

/// In-memory editor buffers keyed by script.
#[derive(Debug, Default, Clone)]
pub struct BufferedSurface {
    buffers: BTreeMap<ScriptKey, Buffer>,
}

impl BufferedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edit(&mut self, key: ScriptKey, text: impl Into<String>) {
        self.buffers.insert(
            key,
            Buffer {
                text: text.into(),
                dirty: true,
            },
        );
    }

    pub fn close(&mut self, key: ScriptKey) {
        self.buffers.remove(&key);
    }

    pub fn is_open(&self, key: ScriptKey) -> bool {
        self.buffers.contains_key(&key)
    }

    pub fn has_any_unapplied(&self) -> bool {
        self.buffers.values().any(|buffer| buffer.dirty)
    }
}

impl TextSurface for BufferedSurface {
    fn current_text(&self, key: ScriptKey) -> Option<String> {
        self.buffers.get(&key).map(|buffer| buffer.text.clone())
    }

    fn has_unapplied_changes(&self, key: ScriptKey) -> bool {
        self.buffers
            .get(&key)
            .map(|buffer| buffer.dirty)
            .unwrap_or(false)
    }

    fn apply(&mut self, key: ScriptKey) {
        if let Some(buffer) = self.buffers.get_mut(&key) {
            buffer.dirty = false;
        }
    }
}
