use sb_core::{BundleError, Entry, ErrorKind, ParentKey, Record, RecordSerializer, ScriptKey};

use crate::codec::{encode_payload, payload_text, strip_sentinel};
use crate::editor::{InsertSource, RemoveMode};
use crate::Forest;

const LENGTH_PREFIX: usize = 4;

/// Prefixes `bytes` with their little-endian `u32` length.
pub fn frame_payload(bytes: &[u8]) -> Result<Vec<u8>, BundleError> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| BundleError::persist("Clipboard payload is too large."))?;
    let mut out = Vec::with_capacity(LENGTH_PREFIX + bytes.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(bytes);
    Ok(out)
}

pub fn unframe_payload(bytes: &[u8]) -> Result<&[u8], BundleError> {
    let (head, body) = match bytes {
        [a, b, c, d, body @ ..] => ([*a, *b, *c, *d], body),
        _ => return Err(invalid_payload("missing length prefix".to_string())),
    };
    let len = u32::from_le_bytes(head) as usize;
    body.get(..len).ok_or_else(|| {
        invalid_payload(format!(
            "length prefix says {} bytes, found {}",
            len,
            body.len()
        ))
    })
}

impl Forest {
    /// Transfer payload for `key`. Pending editor text is taken instead of the stored
    /// text and always travels compressed.
    pub fn copy(
        &self,
        key: ScriptKey,
        live_text: Option<&str>,
        serializer: &dyn RecordSerializer,
    ) -> Result<Vec<u8>, BundleError> {
        let entry = self.lookup(key)?;
        let (text, compressed) = match live_text {
            Some(text) => (text, true),
            None => (entry.text.as_str(), entry.stored_compressed),
        };
        let record = Record::new(
            key.0,
            strip_sentinel(&entry.name),
            encode_payload(text, compressed)?,
        );
        let bytes = serializer.encode_record(&record)?;
        frame_payload(&bytes)
    }

    pub fn cut(
        &mut self,
        key: ScriptKey,
        live_text: Option<&str>,
        mode: RemoveMode,
        serializer: &dyn RecordSerializer,
    ) -> Result<(Vec<u8>, Vec<Entry>), BundleError> {
        let payload = self.copy(key, live_text, serializer)?;
        let removed = self.remove(key, mode)?;
        Ok((payload, removed))
    }

    /// Inserts the entry carried by a transfer payload under its own key.
    pub fn paste(
        &mut self,
        parent: ParentKey,
        index: usize,
        bytes: &[u8],
        serializer: &dyn RecordSerializer,
    ) -> Result<ScriptKey, BundleError> {
        let body = unframe_payload(bytes)?;
        let record = serializer
            .decode_record(body)
            .map_err(|error| invalid_payload(error.message))?;
        let (text, stored_compressed) = payload_text(&record.payload);
        let entry = Entry {
            key: ScriptKey(record.key),
            name: record.name,
            text,
            stored_compressed,
            needs_save: true,
        };
        self.insert(parent, index, InsertSource::Existing(entry))
    }
}

fn invalid_payload(detail: String) -> BundleError {
    BundleError::new(
        ErrorKind::InvalidPayload,
        format!("Clipboard payload rejected: {}.", detail),
    )
}
