use std::path::Path;
use std::sync::Arc;

use sb_core::{
    BundleError, Entry, ErrorKind, ParentKey, RecordSerializer, ScriptKey, TextSurface,
};
use sb_forest::{
    apply_live_text, decode_forest, encode_forest, EncodeMode, Forest, InsertSource,
    MoveDirection, RemoveMode,
};
use sb_view::{TreeDisplay, ViewSynchronizer};

use crate::clipboard::find_script_payload;
use crate::recovery::rewrite_until;
use crate::{ClipboardStore, ContainerStorage, EngineFamily, SessionOptions};

/// One open script container: the forest, its display, and the last bytes known to be
/// on disk.
pub struct ScriptBundleSession<D: TreeDisplay> {
    forest: Forest,
    view: ViewSynchronizer<D>,
    options: SessionOptions,
    serializer: Arc<dyn RecordSerializer>,
    last_good: Option<Vec<u8>>,
    dirty: bool,
}

impl<D: TreeDisplay> ScriptBundleSession<D> {
    pub fn new_empty(display: D, options: SessionOptions) -> Self {
        let forest = Forest::with_seed(options.resolve_seed());
        Self::assemble(forest, display, options, None)
    }

    /// Decodes a container image. Nothing is kept when decoding fails.
    pub fn open(bytes: &[u8], display: D, options: SessionOptions) -> Result<Self, BundleError> {
        let serializer = options.resolve_serializer();
        let records = serializer.decode(bytes)?;
        let forest = decode_forest(records, options.resolve_seed())?;
        Ok(Self::assemble(
            forest,
            display,
            options,
            Some(bytes.to_vec()),
        ))
    }

    pub fn load(
        storage: &dyn ContainerStorage,
        path: &Path,
        display: D,
        options: SessionOptions,
    ) -> Result<Self, BundleError> {
        let bytes = storage.read(path)?;
        let session = Self::open(&bytes, display, options)?;
        log::info!(
            "loaded {} scripts from {}",
            session.forest.len(),
            path.display()
        );
        Ok(session)
    }

    fn assemble(
        forest: Forest,
        display: D,
        options: SessionOptions,
        last_good: Option<Vec<u8>>,
    ) -> Self {
        let mut view = ViewSynchronizer::new(display);
        view.build_from_root(&forest);
        let serializer = options.resolve_serializer();
        Self {
            forest,
            view,
            options,
            serializer,
            last_good,
            dirty: false,
        }
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn view(&self) -> &ViewSynchronizer<D> {
        &self.view
    }

    pub fn engine(&self) -> EngineFamily {
        self.options.engine
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn expand(&mut self, key: ScriptKey) -> Result<(), BundleError> {
        self.view.expand(&self.forest, key)
    }

    pub fn collapse(&mut self, key: ScriptKey) -> Result<(), BundleError> {
        self.view.collapse(key)
    }

    pub fn expand_all(&mut self) {
        self.view.expand_all(&self.forest);
    }

    pub fn insert(
        &mut self,
        parent: ParentKey,
        index: usize,
        source: InsertSource,
    ) -> Result<ScriptKey, BundleError> {
        let key = self.forest.insert(parent, index, source)?;
        self.after_edit(parent);
        Ok(key)
    }

    pub fn remove(&mut self, key: ScriptKey, mode: RemoveMode) -> Result<Vec<Entry>, BundleError> {
        let (parent, _) = self.forest.parent_of(key)?;
        let removed = self.forest.remove(key, mode)?;
        self.after_edit(parent);
        Ok(removed)
    }

    pub fn move_script(
        &mut self,
        key: ScriptKey,
        direction: MoveDirection,
    ) -> Result<(), BundleError> {
        let from = self.forest.move_script(key, direction)?;
        self.view.restitch_move(&self.forest, from, key);
        self.dirty = true;
        Ok(())
    }

    pub fn rename(&mut self, key: ScriptKey, name: &str) -> Result<String, BundleError> {
        let stored = self.forest.rename(key, name)?;
        self.view.refresh_label(&self.forest, key)?;
        self.dirty = true;
        Ok(stored)
    }

    pub fn set_text(&mut self, key: ScriptKey, text: &str) -> Result<(), BundleError> {
        self.forest.set_text(key, text)?;
        self.dirty = true;
        Ok(())
    }

    pub fn copy(
        &self,
        key: ScriptKey,
        surface: &dyn TextSurface,
        clipboard: &mut dyn ClipboardStore,
    ) -> Result<(), BundleError> {
        let bytes = self
            .forest
            .copy(key, pending_text(surface, key).as_deref(), &*self.serializer)?;
        clipboard.set(self.options.engine.clipboard_format(), bytes);
        Ok(())
    }

    pub fn cut(
        &mut self,
        key: ScriptKey,
        mode: RemoveMode,
        surface: &dyn TextSurface,
        clipboard: &mut dyn ClipboardStore,
    ) -> Result<Vec<Entry>, BundleError> {
        let (parent, _) = self.forest.parent_of(key)?;
        let live = pending_text(surface, key);
        let (bytes, removed) = self
            .forest
            .cut(key, live.as_deref(), mode, &*self.serializer)?;
        clipboard.set(self.options.engine.clipboard_format(), bytes);
        self.after_edit(parent);
        Ok(removed)
    }

    pub fn paste(
        &mut self,
        parent: ParentKey,
        index: usize,
        clipboard: &dyn ClipboardStore,
    ) -> Result<ScriptKey, BundleError> {
        let bytes = find_script_payload(clipboard, self.options.engine).ok_or_else(|| {
            BundleError::new(
                ErrorKind::InvalidPayload,
                "Clipboard does not hold a script.",
            )
        })?;
        let key = self
            .forest
            .paste(parent, index, &bytes, &*self.serializer)?;
        self.after_edit(parent);
        Ok(key)
    }

    /// Serialized image of the forest.
    pub fn encode(
        &mut self,
        surface: &mut dyn TextSurface,
        mode: EncodeMode,
    ) -> Result<Vec<u8>, BundleError> {
        let records = encode_forest(&mut self.forest, surface, mode)?;
        self.serializer.encode(&records)
    }

    /// Writes the container, committing live editor text once the write succeeded.
    pub fn save(
        &mut self,
        surface: &mut dyn TextSurface,
        storage: &mut dyn ContainerStorage,
        path: &Path,
    ) -> Result<(), BundleError> {
        let bytes = self.encode(surface, EncodeMode::Detached)?;
        storage.write(path, &bytes)?;
        apply_live_text(&mut self.forest, surface);
        self.last_good = Some(bytes);
        self.dirty = false;
        log::info!("saved {} scripts to {}", self.forest.len(), path.display());
        Ok(())
    }

    /// Writes a copy elsewhere; the session's own state is untouched.
    pub fn save_copy(
        &mut self,
        surface: &mut dyn TextSurface,
        storage: &mut dyn ContainerStorage,
        path: &Path,
    ) -> Result<(), BundleError> {
        let bytes = self.encode(surface, EncodeMode::Detached)?;
        storage.write(path, &bytes)?;
        log::info!("saved a copy to {}", path.display());
        Ok(())
    }

    pub fn needs_save(&self, surface: &dyn TextSurface) -> bool {
        self.dirty
            || self
                .forest
                .entries()
                .any(|entry| entry.needs_save || surface.has_unapplied_changes(entry.key))
    }

    pub fn last_good(&self) -> Option<&[u8]> {
        self.last_good.as_deref()
    }

    /// Puts the last good image back after something else overwrote the container.
    pub fn recover(
        &self,
        storage: &mut dyn ContainerStorage,
        path: &Path,
    ) -> Result<usize, BundleError> {
        let bytes = self.last_good.as_deref().ok_or_else(|| {
            BundleError::persist("No saved image to restore.")
        })?;
        rewrite_until(storage, path, bytes, self.options.recovery_timeout)
    }

    fn after_edit(&mut self, parent: ParentKey) {
        self.view.restitch(&self.forest, parent);
        self.dirty = true;
    }
}

fn pending_text(surface: &dyn TextSurface, key: ScriptKey) -> Option<String> {
    if surface.has_unapplied_changes(key) {
        surface.current_text(key)
    } else {
        None
    }
}
