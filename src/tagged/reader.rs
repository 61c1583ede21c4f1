//! Layer B: tagged-block reading on top of the raw stream.
//!
//! Every value in the format is preceded by a tag (a packed field index and
//! type). Blocks and sub-blocks are length-prefixed scopes: a reader enters
//! one knowing its byte length up front, and on leaving it must land exactly
//! at the end, either because every field inside was consumed or because the
//! scope harvests whatever is left over as "extra data" so position stays in
//! sync for the next sibling. See [`TaggedBlockReader::read_subblock`] and
//! [`TaggedBlockReader::end_block`] for where that bookkeeping happens.

use crate::diagnostics::{NotificationCollection, NotificationType};
use crate::error::{Error, Result};
use crate::stream::StreamReader;
use crate::tagged::common::{pack_tag, unpack_tag, CrdtId, LwwValue, TagType};

/// Header fields of a top-level block, valid for the duration of its scope.
#[derive(Debug, Clone)]
pub struct MainBlockInfo {
    pub offset: u64,
    pub size: u32,
    pub block_type: u8,
    pub min_version: u8,
    pub current_version: u8,
    pub extra_data: Vec<u8>,
}

/// Header fields of a sub-block, valid for the duration of its scope.
#[derive(Debug, Clone)]
pub struct SubBlockInfo {
    pub offset: u64,
    pub size: u32,
    pub extra_data: Vec<u8>,
}

/// Reads tagged values, sub-blocks, and top-level blocks off a [`StreamReader`].
pub struct TaggedBlockReader {
    stream: StreamReader,
    current_block: Option<(u64, u64)>,
    diagnostics: NotificationCollection,
    warned_extra_data: bool,
}

impl TaggedBlockReader {
    pub fn new(stream: StreamReader) -> Self {
        Self {
            stream,
            current_block: None,
            diagnostics: NotificationCollection::new(),
            warned_extra_data: false,
        }
    }

    pub fn diagnostics(&self) -> &NotificationCollection {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> NotificationCollection {
        self.diagnostics
    }

    pub fn position(&self) -> u64 {
        self.stream.position()
    }

    pub fn seek_to(&mut self, pos: u64) {
        self.stream.set_position(pos);
    }

    pub fn read_raw_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.stream.read_bytes(n)
    }

    /// Untagged reads, for the handful of block kinds (author ids, legacy
    /// page-info fields) that predate the tagged-field convention and lay
    /// their contents out positionally instead.
    pub fn read_raw_u8(&mut self) -> Result<u8> {
        self.stream.read_u8()
    }

    pub fn read_raw_u16(&mut self) -> Result<u16> {
        self.stream.read_u16()
    }

    pub fn read_raw_u32(&mut self) -> Result<u32> {
        self.stream.read_u32()
    }

    pub fn read_raw_f32(&mut self) -> Result<f32> {
        self.stream.read_f32()
    }

    pub fn read_raw_f64(&mut self) -> Result<f64> {
        self.stream.read_f64()
    }

    pub fn read_raw_varuint(&mut self) -> Result<u64> {
        self.stream.read_varuint()
    }

    /// A `CrdtId` with no tag of its own, used as a text-format item's map
    /// key rather than a normal tagged field.
    pub fn read_raw_crdt_id(&mut self) -> Result<CrdtId> {
        self.stream.read_crdt_id()
    }

    pub fn read_raw_string(&mut self) -> Result<String> {
        let len = self.stream.read_varuint()? as usize;
        let bytes = self.stream.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|e| Error::Value(format!("invalid UTF-8: {}", e)))
    }

    pub fn at_eof(&self) -> bool {
        self.stream.at_eof()
    }

    /// Bytes left in the innermost open block/sub-block scope.
    pub fn bytes_remaining_in_block(&self) -> Result<i64> {
        let (offset, size) = self
            .current_block
            .ok_or_else(|| Error::Value("not inside a block".into()))?;
        Ok((offset + size) as i64 - self.stream.position() as i64)
    }

    // -- tag primitives -----------------------------------------------

    fn read_tag_values(&mut self) -> Result<(u32, TagType)> {
        let tag = self.stream.read_varuint()?;
        unpack_tag(tag)
    }

    /// Peek whether the next tag matches `(index, ty)`, restoring position
    /// either way.
    pub fn check_tag(&mut self, index: u32, ty: TagType) -> bool {
        let pos = self.stream.position();
        let result = self.read_tag_values();
        self.stream.set_position(pos);
        matches!(result, Ok((i, t)) if i == index && t == ty)
    }

    /// Consume a tag, requiring it match `(index, ty)`. Restores position on
    /// mismatch so the caller can try a different field or treat it as absent.
    pub fn read_tag(&mut self, index: u32, ty: TagType) -> Result<()> {
        let pos = self.stream.position();
        match self.read_tag_values() {
            Ok((i, t)) if i == index && t == ty => Ok(()),
            Ok((i, t)) => {
                self.stream.set_position(pos);
                Err(Error::UnexpectedBlock(format!(
                    "expected index {} type {:?}, got index {} type {:?}",
                    index, ty, i, t
                )))
            }
            Err(e) => {
                self.stream.set_position(pos);
                Err(e)
            }
        }
    }

    /// Whether a sub-block tagged `index` follows, without consuming it.
    /// Returns `false` at the end of the enclosing block even if the bytes
    /// there happen to look like a matching tag.
    pub fn has_subblock(&mut self, index: u32) -> bool {
        if let Some((offset, size)) = self.current_block {
            let remaining = (offset + size) as i64 - self.stream.position() as i64;
            if remaining <= 0 {
                return false;
            }
        }
        self.check_tag(index, TagType::Length4)
    }

    // -- typed reads ----------------------------------------------------

    pub fn read_id(&mut self, index: u32) -> Result<CrdtId> {
        self.read_tag(index, TagType::Id)?;
        self.stream.read_crdt_id()
    }

    pub fn read_id_optional(&mut self, index: u32, default: CrdtId) -> Result<CrdtId> {
        if self.check_tag(index, TagType::Id) {
            self.read_id(index)
        } else {
            Ok(default)
        }
    }

    pub fn read_bool(&mut self, index: u32) -> Result<bool> {
        self.read_tag(index, TagType::Byte1)?;
        self.stream.read_bool()
    }

    pub fn read_bool_optional(&mut self, index: u32, default: bool) -> Result<bool> {
        if self.check_tag(index, TagType::Byte1) {
            self.read_bool(index)
        } else {
            Ok(default)
        }
    }

    pub fn read_byte(&mut self, index: u32) -> Result<u8> {
        self.read_tag(index, TagType::Byte1)?;
        self.stream.read_u8()
    }

    pub fn read_byte_optional(&mut self, index: u32, default: u8) -> Result<u8> {
        if self.check_tag(index, TagType::Byte1) {
            self.read_byte(index)
        } else {
            Ok(default)
        }
    }

    pub fn read_int(&mut self, index: u32) -> Result<i32> {
        self.read_tag(index, TagType::Byte4)?;
        self.stream.read_i32()
    }

    pub fn read_int_optional(&mut self, index: u32, default: i32) -> Result<i32> {
        if self.check_tag(index, TagType::Byte4) {
            self.read_int(index)
        } else {
            Ok(default)
        }
    }

    pub fn read_uint(&mut self, index: u32) -> Result<u32> {
        self.read_tag(index, TagType::Byte4)?;
        self.stream.read_u32()
    }

    pub fn read_float(&mut self, index: u32) -> Result<f32> {
        self.read_tag(index, TagType::Byte4)?;
        self.stream.read_f32()
    }

    pub fn read_float_optional(&mut self, index: u32, default: f32) -> Result<f32> {
        if self.check_tag(index, TagType::Byte4) {
            self.read_float(index)
        } else {
            Ok(default)
        }
    }

    pub fn read_double(&mut self, index: u32) -> Result<f64> {
        self.read_tag(index, TagType::Byte8)?;
        self.stream.read_f64()
    }

    pub fn read_long(&mut self, index: u32) -> Result<u64> {
        self.read_tag(index, TagType::Byte8)?;
        self.stream.read_u64()
    }

    /// A pair of `u32`s packed into a single `Byte8` field (used by a couple
    /// of legacy fields that predate the tagged sub-block convention).
    pub fn read_int_pair(&mut self, index: u32) -> Result<(u32, u32)> {
        self.read_tag(index, TagType::Byte8)?;
        let a = self.stream.read_u32()?;
        let b = self.stream.read_u32()?;
        Ok((a, b))
    }

    /// A length-prefixed UTF-8 string inside sub-block `index`.
    pub fn read_string(&mut self, index: u32) -> Result<String> {
        Ok(self.read_string_with_format(index)?.0)
    }

    /// Like [`Self::read_string`], but also checks for a trailing `int@2`
    /// field: a text item's payload uses this slot to carry an inline
    /// formatting marker instead of string content (see
    /// [`crate::blocks::root_text`]).
    pub fn read_string_with_format(&mut self, index: u32) -> Result<(String, Option<i32>)> {
        self.read_subblock(index, |reader, _info| {
            let len = reader.stream.read_varuint()? as usize;
            let is_ascii = reader.stream.read_u8()?;
            if is_ascii != 1 {
                reader.diagnostics.notify(
                    NotificationType::UnknownFormatCode,
                    format!("string is_ascii byte {} is not 1", is_ascii),
                );
            }
            let bytes = reader.stream.read_bytes(len)?;
            let text = String::from_utf8(bytes)
                .map_err(|e| Error::Value(format!("invalid UTF-8 in string: {}", e)))?;
            let format = if reader.check_tag(2, TagType::Byte4) {
                Some(reader.read_int(2)?)
            } else {
                None
            };
            Ok((text, format))
        })
    }

    // -- LWW registers ----------------------------------------------------

    pub fn read_lww_bool(&mut self, index: u32) -> Result<LwwValue<bool>> {
        self.read_subblock(index, |reader, _info| {
            let timestamp = reader.read_id(1)?;
            let value = reader.read_bool(2)?;
            Ok(LwwValue::new(timestamp, value))
        })
    }

    pub fn read_lww_byte(&mut self, index: u32) -> Result<LwwValue<u8>> {
        self.read_subblock(index, |reader, _info| {
            let timestamp = reader.read_id(1)?;
            let value = reader.read_byte(2)?;
            Ok(LwwValue::new(timestamp, value))
        })
    }

    pub fn read_lww_float(&mut self, index: u32) -> Result<LwwValue<f32>> {
        self.read_subblock(index, |reader, _info| {
            let timestamp = reader.read_id(1)?;
            let value = reader.read_float(2)?;
            Ok(LwwValue::new(timestamp, value))
        })
    }

    pub fn read_lww_id(&mut self, index: u32) -> Result<LwwValue<CrdtId>> {
        self.read_subblock(index, |reader, _info| {
            let timestamp = reader.read_id(1)?;
            let value = reader.read_id(2)?;
            Ok(LwwValue::new(timestamp, value))
        })
    }

    pub fn read_lww_string(&mut self, index: u32) -> Result<LwwValue<String>> {
        self.read_subblock(index, |reader, _info| {
            let timestamp = reader.read_id(1)?;
            let value = reader.read_string(2)?;
            Ok(LwwValue::new(timestamp, value))
        })
    }

    // -- scoped acquisition -----------------------------------------------

    /// Enter a sub-block tagged `index`, run `f` against its contents, then
    /// always resynchronize position to the sub-block's declared end
    /// (harvesting unread bytes as extra data) before `f`'s result is
    /// returned to the caller. This runs even when `f` errors: a malformed
    /// field inside a sub-block still leaves its *enclosing* scope able to
    /// continue reading its own siblings correctly.
    pub fn read_subblock<F, T>(&mut self, index: u32, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self, &SubBlockInfo) -> Result<T>,
    {
        Ok(self.read_subblock_with_extra(index, f)?.0)
    }

    /// Like [`Self::read_subblock`], but also returns the bytes harvested as
    /// unread "extra data" at the end of the scope, for callers that need to
    /// preserve them verbatim (e.g. a scene-item payload's trailing bytes).
    pub fn read_subblock_with_extra<F, T>(&mut self, index: u32, f: F) -> Result<(T, Vec<u8>)>
    where
        F: FnOnce(&mut Self, &SubBlockInfo) -> Result<T>,
    {
        self.read_tag(index, TagType::Length4)?;
        let length = self.stream.read_u32()?;
        let offset = self.stream.position();
        let outer = self.current_block;
        self.current_block = Some((offset, length as u64));
        let info = SubBlockInfo {
            offset,
            size: length,
            extra_data: Vec::new(),
        };
        let result = f(self, &info);
        let check = self.close_scope(offset, length as u64);
        self.current_block = outer;
        match (result, check) {
            (Ok(v), Ok(extra)) => Ok((v, extra)),
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
        }
    }

    /// Begin a top-level block: read its 8-byte header and return its info,
    /// or `None` at a clean end of stream. Must be paired with [`Self::end_block`].
    pub fn begin_block(&mut self) -> Result<Option<MainBlockInfo>> {
        if self.stream.at_eof() {
            return Ok(None);
        }
        let length = match self.stream.read_u32() {
            Ok(v) => v,
            Err(Error::Eof) => return Ok(None),
            Err(e) => return Err(e),
        };
        let reserved = self.stream.read_u8()?;
        if reserved != 0 {
            return Err(Error::Value(format!(
                "block header reserved byte must be 0, got {}",
                reserved
            )));
        }
        let min_version = self.stream.read_u8()?;
        let current_version = self.stream.read_u8()?;
        if min_version > current_version {
            return Err(Error::Value(format!(
                "block min_version {} exceeds current_version {}",
                min_version, current_version
            )));
        }
        let block_type = self.stream.read_u8()?;
        let offset = self.stream.position();
        self.current_block = Some((offset, length as u64));
        Ok(Some(MainBlockInfo {
            offset,
            size: length,
            block_type,
            min_version,
            current_version,
            extra_data: Vec::new(),
        }))
    }

    /// Close a block scope opened with [`Self::begin_block`], harvesting
    /// extra data into `info.extra_data`. Always call this, including after
    /// a recovery that manually slurped the block's raw bytes.
    pub fn end_block(&mut self, info: &mut MainBlockInfo) -> Result<()> {
        let result = self.close_scope(info.offset, info.size as u64);
        self.current_block = None;
        match result {
            Ok(extra) => {
                info.extra_data = extra;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Resync position to `offset + size`. If we're short, the remaining
    /// bytes are read off and returned as extra data (with a one-time
    /// warning per reader instance, per the format's tolerant-reader
    /// design). If we overshot, that's a hard error: something read past
    /// its bounds into a sibling's data.
    fn close_scope(&mut self, offset: u64, size: u64) -> Result<Vec<u8>> {
        let end = offset + size;
        let pos = self.stream.position();
        if pos > end {
            return Err(Error::BlockOverflow(format!(
                "read {} bytes past end of scope at offset {}",
                pos - end,
                offset
            )));
        }
        if pos < end {
            let extra = self.stream.read_bytes((end - pos) as usize)?;
            if !self.warned_extra_data {
                self.diagnostics.notify(
                    NotificationType::ExtraData,
                    format!("{} unread byte(s) at offset {}", extra.len(), offset),
                );
                self.warned_extra_data = true;
            }
            return Ok(extra);
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamWriter;

    fn reader_from(bytes: Vec<u8>) -> TaggedBlockReader {
        TaggedBlockReader::new(StreamReader::new(bytes))
    }

    #[test]
    fn test_read_tag_mismatch_restores_position() {
        let mut w = StreamWriter::new();
        w.write_varuint(pack_tag(2, TagType::Byte1)).unwrap();
        w.write_u8(5).unwrap();
        let bytes = w.into_inner();
        let mut r = reader_from(bytes);
        let pos0 = r.position();
        assert!(r.read_tag(1, TagType::Byte1).is_err());
        assert_eq!(r.position(), pos0);
        // a correctly-matched read still works afterward
        assert_eq!(r.read_byte(2).unwrap(), 5);
    }

    #[test]
    fn test_subblock_harvests_extra_data() {
        // sub-block tagged 3, length 4, containing unread byte(4) as field 1
        // plus a trailing byte the reader for field 1 never consumes.
        let mut w = StreamWriter::new();
        w.write_varuint(pack_tag(3, TagType::Length4)).unwrap();
        w.write_u32(3).unwrap();
        w.write_varuint(pack_tag(1, TagType::Byte1)).unwrap();
        w.write_u8(9).unwrap();
        w.write_u8(0xFF).unwrap(); // extra trailing byte inside the sub-block
        let mut r = reader_from(w.into_inner());
        let value = r
            .read_subblock(3, |reader, _info| reader.read_byte(1))
            .unwrap();
        assert_eq!(value, 9);
        assert_eq!(r.diagnostics().len(), 1);
    }

    #[test]
    fn test_has_subblock_checks_end_of_block() {
        let mut w = StreamWriter::new();
        w.write_varuint(pack_tag(1, TagType::Byte1)).unwrap();
        w.write_u8(1).unwrap();
        let bytes = w.into_inner();
        let len = bytes.len();
        let mut r = reader_from(bytes);
        r.current_block = Some((0, len as u64));
        assert!(r.read_bool(1).unwrap());
        // at exactly the end of the block now; has_subblock must say no
        // even though there is nothing left to mismatch against.
        assert!(!r.has_subblock(2));
    }

    #[test]
    fn test_lww_bool_roundtrip() {
        let mut w = StreamWriter::new();
        w.write_varuint(pack_tag(5, TagType::Length4)).unwrap();
        let mut inner = StreamWriter::new();
        inner.write_varuint(pack_tag(1, TagType::Id)).unwrap();
        inner.write_crdt_id(CrdtId::new(1, 7)).unwrap();
        inner.write_varuint(pack_tag(2, TagType::Byte1)).unwrap();
        inner.write_bool(true).unwrap();
        let body = inner.into_inner();
        w.write_u32(body.len() as u32).unwrap();
        w.write_bytes(&body).unwrap();
        let mut r = reader_from(w.into_inner());
        let lww = r.read_lww_bool(5).unwrap();
        assert_eq!(lww.timestamp, CrdtId::new(1, 7));
        assert!(lww.value);
    }

    #[test]
    fn test_begin_block_eof_returns_none() {
        let mut r = reader_from(Vec::new());
        assert!(r.begin_block().unwrap().is_none());
    }
}
