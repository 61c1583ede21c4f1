//! The tagged-block codec layer: tags, sub-blocks, and top-level blocks.

pub mod common;
pub mod reader;
pub mod writer;

pub use common::{CrdtId, LwwValue, TagType};
pub use reader::{MainBlockInfo, ScopeGuard, SubBlockInfo, TaggedBlockReader};
pub use writer::TaggedBlockWriter;
