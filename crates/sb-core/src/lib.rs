pub mod collab;
pub mod error;
pub mod name;
pub mod types;

pub use collab::{BufferedSurface, DetachedSurface, RecordSerializer, TextSurface};
pub use error::{BundleError, ErrorKind};
pub use name::{is_valid_name, sanitize_name};
pub use types::*;
