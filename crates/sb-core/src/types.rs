use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a script entry (the engine calls it a "section").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptKey(pub i32);

impl fmt::Display for ScriptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08}", self.0)
    }
}

impl From<i32> for ScriptKey {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// Owner of a child list: the synthetic top level or a script entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "camelCase")]
pub enum ParentKey {
    Root,
    Entry(ScriptKey),
}

impl ParentKey {
    pub fn entry_key(self) -> Option<ScriptKey> {
        match self {
            Self::Root => None,
            Self::Entry(key) => Some(key),
        }
    }

    pub fn is_root(self) -> bool {
        matches!(self, Self::Root)
    }
}

impl From<ScriptKey> for ParentKey {
    fn from(key: ScriptKey) -> Self {
        Self::Entry(key)
    }
}

impl fmt::Display for ParentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("root"),
            Self::Entry(key) => key.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub key: ScriptKey,
    pub name: String,
    pub text: String,
    pub stored_compressed: bool,
    #[serde(default)]
    pub needs_save: bool,
}

impl Entry {
    pub fn new(key: ScriptKey, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            text: text.into(),
            stored_compressed: true,
            needs_save: false,
        }
    }

    pub fn is_unnamed(&self) -> bool {
        is_blank(&self.name)
    }

    pub fn is_textless(&self) -> bool {
        is_blank(&self.text)
    }

    /// Label shown in tree displays; unnamed entries fall back to their key.
    pub fn display_label(&self) -> String {
        if self.is_unnamed() {
            self.key.to_string()
        } else {
            self.name.clone()
        }
    }
}

/// One element of the flat persisted array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: i32,
    pub name: String,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn new(key: i32, name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            key,
            name: name.into(),
            payload,
        }
    }
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
