mod clipboard;
mod codec;
mod editor;
mod keys;
mod model;

pub use clipboard::{frame_payload, unframe_payload};
pub use codec::{
    apply_live_text, decode_forest, encode_forest, encode_payload, payload_text, strip_sentinel,
    EncodeMode, NESTING_SENTINEL,
};
pub use editor::{InsertSource, MoveDirection, RemoveMode};
pub use keys::{KeyGenerator, KEY_SPACE, MAX_KEY_DRAWS};
pub use model::Forest;
