//! `SceneTree` (0x01): introduces a tree node, linking it under a parent.
//! Distinct from [`crate::scene::SceneTree`], the assembled in-memory tree —
//! this is the wire record that seeds one of its nodes.

use crate::error::Result;
use crate::options::WriteOptions;
use crate::tagged::common::CrdtId;
use crate::tagged::{TaggedBlockReader, TaggedBlockWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneTreeBlock {
    pub tree_id: CrdtId,
    pub node_id: CrdtId,
    pub is_update: bool,
    pub parent_id: CrdtId,
    pub extra_data: Vec<u8>,
}

impl SceneTreeBlock {
    pub const BLOCK_TYPE: u8 = 0x01;

    pub fn version_info(_options: &WriteOptions) -> (u8, u8) {
        (1, 1)
    }

    pub fn from_stream(reader: &mut TaggedBlockReader) -> Result<Self> {
        let tree_id = reader.read_id(1)?;
        let node_id = reader.read_id(2)?;
        let is_update = reader.read_bool(3)?;
        let parent_id = reader.read_subblock(4, |reader, _info| reader.read_id(1))?;
        Ok(Self {
            tree_id,
            node_id,
            is_update,
            parent_id,
            extra_data: Vec::new(),
        })
    }

    pub fn to_stream(&self, writer: &mut TaggedBlockWriter) -> Result<()> {
        writer.write_id(1, self.tree_id)?;
        writer.write_id(2, self.node_id)?;
        writer.write_bool(3, self.is_update)?;
        writer.write_subblock(4, |writer| writer.write_id(1, self.parent_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamReader;

    #[test]
    fn test_scene_tree_block_roundtrip() {
        let block = SceneTreeBlock {
            tree_id: CrdtId::new(0, 11),
            node_id: CrdtId::new(0, 0),
            is_update: true,
            parent_id: CrdtId::new(0, 1),
            extra_data: Vec::new(),
        };
        let mut w = TaggedBlockWriter::new(WriteOptions::default());
        block.to_stream(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = TaggedBlockReader::new(StreamReader::new(bytes));
        assert_eq!(SceneTreeBlock::from_stream(&mut r).unwrap(), block);
    }
}
