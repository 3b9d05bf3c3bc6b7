mod display;
mod memory;
mod node;
mod sync;

pub use display::TreeDisplay;
pub use memory::{DisplayHandle, MemoryDisplay};
pub use node::NodeState;
pub use sync::ViewSynchronizer;
