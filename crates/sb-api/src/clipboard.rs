use crate::EngineFamily;

/// A named-format clipboard holding one item at a time.
pub trait ClipboardStore {
    fn set(&mut self, format: &str, bytes: Vec<u8>);
    fn get(&self, format: &str) -> Option<Vec<u8>>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    item: Option<(String, Vec<u8>)>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(&self) -> Option<&str> {
        self.item.as_ref().map(|(format, _)| format.as_str())
    }
}

impl ClipboardStore for MemoryClipboard {
    fn set(&mut self, format: &str, bytes: Vec<u8>) {
        self.item = Some((format.to_string(), bytes));
    }

    fn get(&self, format: &str) -> Option<Vec<u8>> {
        match &self.item {
            Some((stored, bytes)) if stored == format => Some(bytes.clone()),
            _ => None,
        }
    }
}

/// Script payload on the clipboard, preferring `engine`'s own format.
pub(crate) fn find_script_payload(
    clipboard: &dyn ClipboardStore,
    engine: EngineFamily,
) -> Option<Vec<u8>> {
    std::iter::once(engine)
        .chain(EngineFamily::ALL)
        .find_map(|family| clipboard.get(family.clipboard_format()))
}
