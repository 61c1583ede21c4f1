//! `SceneInfo` (0x0D): page-level scene settings — which layer is active,
//! background/root-document visibility, and paper size.

use crate::error::Result;
use crate::options::WriteOptions;
use crate::tagged::common::{CrdtId, LwwValue};
use crate::tagged::{TaggedBlockReader, TaggedBlockWriter};

#[derive(Debug, Clone, PartialEq)]
pub struct SceneInfoBlock {
    pub current_layer: LwwValue<CrdtId>,
    pub background_visible: Option<LwwValue<bool>>,
    pub root_document_visible: Option<LwwValue<bool>>,
    pub paper_size: Option<(u32, u32)>,
    pub extra_data: Vec<u8>,
}

impl SceneInfoBlock {
    pub const BLOCK_TYPE: u8 = 0x0D;

    pub fn version_info(_options: &WriteOptions) -> (u8, u8) {
        (0, 1)
    }

    pub fn from_stream(reader: &mut TaggedBlockReader) -> Result<Self> {
        let current_layer = reader.read_lww_id(1)?;
        let background_visible = if reader.bytes_remaining_in_block()? > 0 {
            Some(reader.read_lww_bool(2)?)
        } else {
            None
        };
        let root_document_visible = if reader.bytes_remaining_in_block()? > 0 {
            Some(reader.read_lww_bool(3)?)
        } else {
            None
        };
        let paper_size = if reader.bytes_remaining_in_block()? > 0 {
            Some(reader.read_int_pair(5)?)
        } else {
            None
        };
        Ok(Self {
            current_layer,
            background_visible,
            root_document_visible,
            paper_size,
            extra_data: Vec::new(),
        })
    }

    pub fn to_stream(&self, writer: &mut TaggedBlockWriter) -> Result<()> {
        writer.write_lww_id(1, self.current_layer)?;
        if let Some(v) = self.background_visible {
            writer.write_lww_bool(2, v)?;
        }
        if let Some(v) = self.root_document_visible {
            writer.write_lww_bool(3, v)?;
        }
        if let Some((a, b)) = self.paper_size {
            writer.write_int_pair(5, a, b)?;
        }
        Ok(())
    }
}
