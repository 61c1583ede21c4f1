//! `MigrationInfo` (0x00): marks the CrdtId namespace a file (or a device
//! session merged into it) was migrated under.

use crate::error::Result;
use crate::options::{Version, WriteOptions};
use crate::tagged::common::CrdtId;
use crate::tagged::{TaggedBlockReader, TaggedBlockWriter};

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationInfoBlock {
    pub migration_id: CrdtId,
    pub is_device: bool,
    /// Meaning undocumented upstream; present only from reMarkable 3.2.2 on.
    pub unknown: bool,
    pub extra_data: Vec<u8>,
}

impl MigrationInfoBlock {
    pub const BLOCK_TYPE: u8 = 0x00;

    pub fn version_info(_options: &WriteOptions) -> (u8, u8) {
        (1, 1)
    }

    pub fn from_stream(reader: &mut TaggedBlockReader) -> Result<Self> {
        let migration_id = reader.read_id(1)?;
        let is_device = reader.read_bool(2)?;
        let unknown = if reader.bytes_remaining_in_block()? > 0 {
            reader.read_bool(3)?
        } else {
            false
        };
        Ok(Self {
            migration_id,
            is_device,
            unknown,
            extra_data: Vec::new(),
        })
    }

    pub fn to_stream(&self, writer: &mut TaggedBlockWriter) -> Result<()> {
        writer.write_id(1, self.migration_id)?;
        writer.write_bool(2, self.is_device)?;
        if writer.options.version >= Version::V3_2_2 {
            writer.write_bool(3, self.unknown)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamReader;

    #[test]
    fn test_migration_info_roundtrip_with_unknown_field() {
        let block = MigrationInfoBlock {
            migration_id: CrdtId::new(1, 1),
            is_device: true,
            unknown: true,
            extra_data: Vec::new(),
        };
        let mut options = WriteOptions::default();
        options.version = Version::V3_2_2;
        let mut w = TaggedBlockWriter::new(options);
        block.to_stream(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = TaggedBlockReader::new(StreamReader::new(bytes));
        let read_back = MigrationInfoBlock::from_stream(&mut r).unwrap();
        assert_eq!(read_back, block);
    }

    #[test]
    fn test_migration_info_pre_3_2_2_omits_unknown() {
        let block = MigrationInfoBlock {
            migration_id: CrdtId::new(1, 1),
            is_device: true,
            unknown: false,
            extra_data: Vec::new(),
        };
        let mut w = TaggedBlockWriter::new(WriteOptions::for_version(Version(3, 1, 0)));
        block.to_stream(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = TaggedBlockReader::new(StreamReader::new(bytes));
        let read_back = MigrationInfoBlock::from_stream(&mut r).unwrap();
        assert!(!read_back.unknown);
    }
}
