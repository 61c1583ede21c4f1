//! `TreeNode` (0x02): enriches an existing scene-tree node with its label,
//! visibility, and (on some documents) text-anchor metadata.

use crate::error::Result;
use crate::options::{Version, WriteOptions};
use crate::scene::items::Group;
use crate::tagged::common::CrdtId;
use crate::tagged::{TaggedBlockReader, TaggedBlockWriter};

#[derive(Debug, Clone)]
pub struct TreeNodeBlock {
    pub group: Group,
    pub extra_data: Vec<u8>,
}

impl TreeNodeBlock {
    pub const BLOCK_TYPE: u8 = 0x02;

    pub fn version_info(options: &WriteOptions) -> (u8, u8) {
        if options.version >= Version::V3_4_0 {
            (1, 2)
        } else {
            (1, 1)
        }
    }

    pub fn from_stream(reader: &mut TaggedBlockReader) -> Result<Self> {
        let node_id = reader.read_id(1)?;
        let mut group = Group::new(node_id);
        group.label = reader.read_lww_string(2)?;
        group.visible = reader.read_lww_bool(3)?;

        if reader.bytes_remaining_in_block()? > 0 {
            group.anchor_id = Some(reader.read_lww_id(7)?);
            group.anchor_type = Some(reader.read_lww_byte(8)?);
            group.anchor_threshold = Some(reader.read_lww_float(9)?);
            group.anchor_origin_x = Some(reader.read_lww_float(10)?);
        }

        Ok(Self {
            group,
            extra_data: Vec::new(),
        })
    }

    pub fn to_stream(&self, writer: &mut TaggedBlockWriter) -> Result<()> {
        let group = &self.group;
        writer.write_id(1, group.node_id)?;
        writer.write_lww_string(2, &group.label)?;
        writer.write_lww_bool(3, group.visible)?;
        if let Some(anchor_id) = group.anchor_id {
            let anchor_type = group
                .anchor_type
                .expect("anchor_type set alongside anchor_id");
            let anchor_threshold = group
                .anchor_threshold
                .expect("anchor_threshold set alongside anchor_id");
            let anchor_origin_x = group
                .anchor_origin_x
                .expect("anchor_origin_x set alongside anchor_id");
            writer.write_lww_id(7, anchor_id)?;
            writer.write_lww_byte(8, anchor_type)?;
            writer.write_lww_float(9, anchor_threshold)?;
            writer.write_lww_float(10, anchor_origin_x)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamReader;
    use crate::tagged::common::LwwValue;

    #[test]
    fn test_tree_node_roundtrip_without_anchor() {
        let mut group = Group::new(CrdtId::new(0, 11));
        group.label = LwwValue::new(CrdtId::new(0, 12), "Layer 1".to_string());
        let block = TreeNodeBlock {
            group,
            extra_data: Vec::new(),
        };
        let mut w = TaggedBlockWriter::new(WriteOptions::default());
        block.to_stream(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = TaggedBlockReader::new(StreamReader::new(bytes));
        let read_back = TreeNodeBlock::from_stream(&mut r).unwrap();
        assert_eq!(read_back.group.node_id, block.group.node_id);
        assert_eq!(read_back.group.label.value, "Layer 1");
        assert!(read_back.group.anchor_id.is_none());
    }

    #[test]
    fn test_tree_node_roundtrip_with_anchor() {
        let mut group = Group::new(CrdtId::new(0, 20));
        group.anchor_id = Some(LwwValue::new(CrdtId::new(1, 1), CrdtId::new(1, 50)));
        group.anchor_type = Some(LwwValue::new(CrdtId::new(1, 1), 1));
        group.anchor_threshold = Some(LwwValue::new(CrdtId::new(1, 1), 0.5));
        group.anchor_origin_x = Some(LwwValue::new(CrdtId::new(1, 1), 10.0));
        let block = TreeNodeBlock {
            group,
            extra_data: Vec::new(),
        };
        let mut w = TaggedBlockWriter::new(WriteOptions::default());
        block.to_stream(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = TaggedBlockReader::new(StreamReader::new(bytes));
        let read_back = TreeNodeBlock::from_stream(&mut r).unwrap();
        assert_eq!(read_back.group.anchor_id, block.group.anchor_id);
    }
}
