mod clipboard;
mod config;
mod recovery;
mod session;
mod storage;

pub use clipboard::{ClipboardStore, MemoryClipboard};
pub use config::{
    load_project_config, EngineFamily, ProjectConfig, SessionOptions, DEFAULT_RECOVERY_TIMEOUT,
};
pub use recovery::rewrite_until;
pub use session::ScriptBundleSession;
pub use storage::{ContainerStorage, FileStorage, MemoryStorage};

pub use sb_core::{
    BufferedSurface, BundleError, DetachedSurface, Entry, ErrorKind, ParentKey, ScriptKey,
    TextSurface,
};
pub use sb_forest::{EncodeMode, Forest, InsertSource, MoveDirection, RemoveMode};
pub use sb_view::{DisplayHandle, MemoryDisplay, NodeState, TreeDisplay, ViewSynchronizer};
