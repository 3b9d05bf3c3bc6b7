use sb_core::{is_blank, BundleError, Entry, ErrorKind, ParentKey, Record, ScriptKey, TextSurface};
use sb_marshal::zlib;

use crate::Forest;

/// Name prefix marking a record that opens a child list.
pub const NESTING_SENTINEL: &str = "\u{25bc} ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    /// Commit live editor text into the model after encoding.
    Apply,
    /// Export live text, leave the model untouched.
    Detached,
}

pub fn strip_sentinel(name: &str) -> String {
    name.replace(NESTING_SENTINEL, "").trim().to_string()
}

/// Text of a stored payload and whether it was compressed.
pub fn payload_text(payload: &[u8]) -> (String, bool) {
    if zlib::looks_like_zlib(payload) {
        match zlib::inflate(payload) {
            Ok(bytes) => return (lossy_text(bytes), true),
            Err(error) => log::debug!("payload is not a zlib stream, reading raw: {}", error),
        }
    }
    (lossy_text(payload.to_vec()), false)
}

pub fn encode_payload(text: &str, compressed: bool) -> Result<Vec<u8>, BundleError> {
    if compressed {
        zlib::deflate(text).map_err(|error| BundleError::persist(error.to_string()))
    } else {
        Ok(text.as_bytes().to_vec())
    }
}

fn lossy_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(error) => {
            log::warn!("script text is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(error.as_bytes()).into_owned()
        }
    }
}

/// Rebuilds the forest from the flat record array.
pub fn decode_forest(records: Vec<Record>, seed: u32) -> Result<Forest, BundleError> {
    let mut forest = Forest::with_seed(seed);
    let mut stack = vec![ParentKey::Root];

    for (index, record) in records.into_iter().enumerate() {
        let (text, stored_compressed) = payload_text(&record.payload);
        if is_blank(&record.name) && is_blank(&text) {
            if index == 0 {
                continue;
            }
            if stack.len() > 1 {
                stack.pop();
            } else {
                log::debug!("skipping stray terminator at record {}", index);
            }
            continue;
        }

        let key = ScriptKey(record.key);
        if forest.exists(key) {
            return Err(BundleError::new(
                ErrorKind::CorruptData,
                format!("Script key {} appears twice (record {}).", key, index),
            ));
        }
        let nested = record.name.starts_with(NESTING_SENTINEL);
        let parent = stack.last().copied().unwrap_or(ParentKey::Root);
        forest.insert_entry(Entry {
            key,
            name: strip_sentinel(&record.name),
            text,
            stored_compressed,
            needs_save: false,
        });
        forest.attach(parent, usize::MAX, key);
        if nested {
            stack.push(ParentKey::Entry(key));
        }
    }

    if stack.len() > 1 {
        log::debug!("closing {} unterminated levels", stack.len() - 1);
    }
    log::info!("decoded {} scripts", forest.len());
    Ok(forest)
}

/// Flattens the forest into records, reading text from `surface` where it has a live buffer.
pub fn encode_forest(
    forest: &mut Forest,
    surface: &mut dyn TextSurface,
    mode: EncodeMode,
) -> Result<Vec<Record>, BundleError> {
    let mut placeholders = Vec::new();
    let result = encode_records(forest, &*surface, &mut placeholders);
    for key in placeholders {
        forest.release_key(key);
    }
    let records = result?;
    if mode == EncodeMode::Apply {
        apply_live_text(forest, surface);
    }
    Ok(records)
}

/// Commits every live buffer into its entry and clears the entries' save marks.
pub fn apply_live_text(forest: &mut Forest, surface: &mut dyn TextSurface) {
    let keys: Vec<ScriptKey> = forest.entries().map(|entry| entry.key).collect();
    for key in keys {
        let live = surface.current_text(key);
        if let Ok(entry) = forest.lookup_mut(key) {
            if let Some(text) = live {
                entry.text = text;
            }
            entry.needs_save = false;
        }
        if surface.has_unapplied_changes(key) {
            surface.apply(key);
        }
    }
}

fn encode_records(
    forest: &mut Forest,
    surface: &dyn TextSurface,
    placeholders: &mut Vec<ScriptKey>,
) -> Result<Vec<Record>, BundleError> {
    let mut out = Vec::with_capacity(forest.len() + 1);
    out.push(placeholder_record(forest, placeholders)?);
    encode_level(forest, surface, ParentKey::Root, &mut out, placeholders)?;
    Ok(out)
}

fn encode_level(
    forest: &mut Forest,
    surface: &dyn TextSurface,
    parent: ParentKey,
    out: &mut Vec<Record>,
    placeholders: &mut Vec<ScriptKey>,
) -> Result<(), BundleError> {
    let children = forest.children(parent).to_vec();
    for key in children {
        let entry = forest.lookup(key)?;
        let text = surface
            .current_text(key)
            .unwrap_or_else(|| entry.text.clone());
        let nested = forest.has_children(key);
        if !nested && is_blank(&entry.name) && is_blank(&text) {
            log::debug!("omitting empty script {}", key);
            continue;
        }

        let name = if nested {
            format!("{}{}", NESTING_SENTINEL, entry.name)
        } else {
            entry.name.clone()
        };
        let payload = encode_payload(&text, entry.stored_compressed)?;
        out.push(Record::new(key.0, name, payload));

        if nested {
            encode_level(forest, surface, ParentKey::Entry(key), out, placeholders)?;
            out.push(placeholder_record(forest, placeholders)?);
        }
    }
    Ok(())
}

fn placeholder_record(
    forest: &mut Forest,
    placeholders: &mut Vec<ScriptKey>,
) -> Result<Record, BundleError> {
    let key = forest.allocate_key()?;
    placeholders.push(key);
    Ok(Record::new(key.0, "", encode_payload("", true)?))
}
