//! `PageInfo` (0x0A): per-page counters maintained by the tablet's editor,
//! not interpreted by this crate beyond round-tripping.

use crate::error::Result;
use crate::options::{Version, WriteOptions};
use crate::tagged::{TaggedBlockReader, TaggedBlockWriter};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageInfoBlock {
    pub loads_count: i32,
    pub merges_count: i32,
    pub text_chars_count: i32,
    pub text_lines_count: i32,
    pub type_folio_use_count: i32,
    pub extra_data: Vec<u8>,
}

impl PageInfoBlock {
    pub const BLOCK_TYPE: u8 = 0x0A;

    pub fn version_info(_options: &WriteOptions) -> (u8, u8) {
        (0, 1)
    }

    pub fn from_stream(reader: &mut TaggedBlockReader) -> Result<Self> {
        let loads_count = reader.read_int(1)?;
        let merges_count = reader.read_int(2)?;
        let text_chars_count = reader.read_int(3)?;
        let text_lines_count = reader.read_int(4)?;
        let type_folio_use_count = if reader.bytes_remaining_in_block()? > 0 {
            reader.read_int(5)?
        } else {
            0
        };
        Ok(Self {
            loads_count,
            merges_count,
            text_chars_count,
            text_lines_count,
            type_folio_use_count,
            extra_data: Vec::new(),
        })
    }

    pub fn to_stream(&self, writer: &mut TaggedBlockWriter) -> Result<()> {
        writer.write_int(1, self.loads_count)?;
        writer.write_int(2, self.merges_count)?;
        writer.write_int(3, self.text_chars_count)?;
        writer.write_int(4, self.text_lines_count)?;
        if writer.options.version >= Version::V3_2_2 {
            writer.write_int(5, self.type_folio_use_count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamReader;

    #[test]
    fn test_page_info_roundtrip() {
        let block = PageInfoBlock {
            loads_count: 1,
            merges_count: 0,
            text_chars_count: 5,
            text_lines_count: 1,
            type_folio_use_count: 2,
            extra_data: Vec::new(),
        };
        let mut options = WriteOptions::default();
        options.version = Version::V3_2_2;
        let mut w = TaggedBlockWriter::new(options);
        block.to_stream(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = TaggedBlockReader::new(StreamReader::new(bytes));
        assert_eq!(PageInfoBlock::from_stream(&mut r).unwrap(), block);
    }
}
