//! `AuthorIds` (0x09): the table mapping a file's small per-author wire ids
//! to the stable UUIDs collaborating devices use to identify themselves.
//!
//! Predates the tagged-field convention: contents are a positional count
//! followed by untagged sub-blocks, not a sequence of `read_tag`-guarded
//! fields.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::options::WriteOptions;
use crate::tagged::{TaggedBlockReader, TaggedBlockWriter};

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorIdsBlock {
    pub author_uuids: IndexMap<u16, Uuid>,
    pub extra_data: Vec<u8>,
}

impl AuthorIdsBlock {
    pub const BLOCK_TYPE: u8 = 0x09;

    pub fn version_info(_options: &WriteOptions) -> (u8, u8) {
        (1, 1)
    }

    pub fn from_stream(reader: &mut TaggedBlockReader) -> Result<Self> {
        let count = reader.read_raw_varuint()?;
        let mut author_uuids = IndexMap::new();
        for _ in 0..count {
            reader.read_subblock(0, |reader, _info| {
                let uuid_length = reader.read_raw_varuint()?;
                if uuid_length != 16 {
                    return Err(Error::Value(format!(
                        "expected UUID length 16, got {}",
                        uuid_length
                    )));
                }
                let bytes = reader.read_raw_bytes(16)?;
                let author_id = reader.read_raw_u16()?;
                let mut le_bytes = [0u8; 16];
                le_bytes.copy_from_slice(&bytes);
                author_uuids.insert(author_id, Uuid::from_bytes_le(le_bytes));
                Ok(())
            })?;
        }
        Ok(Self {
            author_uuids,
            extra_data: Vec::new(),
        })
    }

    pub fn to_stream(&self, writer: &mut TaggedBlockWriter) -> Result<()> {
        writer.write_raw_varuint(self.author_uuids.len() as u64)?;
        for (author_id, uuid) in &self.author_uuids {
            writer.write_subblock(0, |writer| {
                let le_bytes = uuid.to_bytes_le();
                writer.write_raw_varuint(le_bytes.len() as u64)?;
                writer.write_raw_bytes(&le_bytes)?;
                writer.write_raw_u16(*author_id)
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamReader;

    #[test]
    fn test_author_ids_roundtrip() {
        let mut author_uuids = IndexMap::new();
        author_uuids.insert(1, Uuid::from_u128(0x0123456789abcdef0123456789abcdef));
        author_uuids.insert(2, Uuid::nil());
        let block = AuthorIdsBlock {
            author_uuids,
            extra_data: Vec::new(),
        };
        let mut w = TaggedBlockWriter::new(WriteOptions::default());
        block.to_stream(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = TaggedBlockReader::new(StreamReader::new(bytes));
        let read_back = AuthorIdsBlock::from_stream(&mut r).unwrap();
        assert_eq!(read_back, block);
    }

    #[test]
    fn test_author_ids_rejects_wrong_uuid_length() {
        let mut w = crate::stream::StreamWriter::new();
        w.write_varuint(1).unwrap();
        w.write_varuint(crate::tagged::common::pack_tag(
            0,
            crate::tagged::common::TagType::Length4,
        ))
        .unwrap();
        let mut inner = crate::stream::StreamWriter::new();
        inner.write_varuint(8).unwrap();
        inner.write_bytes(&[0u8; 8]).unwrap();
        inner.write_u16(1).unwrap();
        let body = inner.into_inner();
        w.write_u32(body.len() as u32).unwrap();
        w.write_bytes(&body).unwrap();
        let mut r = TaggedBlockReader::new(StreamReader::new(w.into_inner()));
        assert!(AuthorIdsBlock::from_stream(&mut r).is_err());
    }
}
