//! Layer B: tagged-block writing on top of the raw stream.
//!
//! Blocks and sub-blocks are length-prefixed, but the length has to be
//! written *before* the body. Rather than seek-and-patch, nested scopes
//! buffer their body into a `Vec<u8>` on a stack and splice it into the
//! parent once its length is known; [`Self::write_block`] and
//! [`Self::write_subblock`] pop the stack unconditionally so an error
//! partway through a body never leaves the stack unbalanced.

use crate::error::Result;
use crate::options::WriteOptions;
use crate::stream::StreamWriter;
use crate::tagged::common::{pack_tag, CrdtId, LwwValue, TagType};

pub struct TaggedBlockWriter {
    sink: StreamWriter,
    buffers: Vec<Vec<u8>>,
    pub options: WriteOptions,
}

impl TaggedBlockWriter {
    pub fn new(options: WriteOptions) -> Self {
        Self {
            sink: StreamWriter::new(),
            buffers: Vec::new(),
            options,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.sink.into_inner()
    }

    pub fn write_header(&mut self) -> Result<()> {
        self.emit(|s| s.write_header())
    }

    fn emit<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut RawSink) -> Result<()>,
    {
        match self.buffers.last_mut() {
            Some(buf) => {
                let mut raw = RawSink::Buf(buf);
                f(&mut raw)
            }
            None => {
                let mut raw = RawSink::Stream(&mut self.sink);
                f(&mut raw)
            }
        }
    }

    pub fn write_tag(&mut self, index: u32, ty: TagType) -> Result<()> {
        let tag = pack_tag(index, ty);
        self.emit(|s| s.write_varuint(tag))
    }

    pub fn write_id(&mut self, index: u32, value: CrdtId) -> Result<()> {
        self.write_tag(index, TagType::Id)?;
        self.emit(|s| s.write_crdt_id(value))
    }

    pub fn write_bool(&mut self, index: u32, value: bool) -> Result<()> {
        self.write_tag(index, TagType::Byte1)?;
        self.emit(|s| s.write_bool(value))
    }

    pub fn write_byte(&mut self, index: u32, value: u8) -> Result<()> {
        self.write_tag(index, TagType::Byte1)?;
        self.emit(|s| s.write_u8(value))
    }

    pub fn write_int(&mut self, index: u32, value: i32) -> Result<()> {
        self.write_tag(index, TagType::Byte4)?;
        self.emit(|s| s.write_i32(value))
    }

    pub fn write_uint(&mut self, index: u32, value: u32) -> Result<()> {
        self.write_tag(index, TagType::Byte4)?;
        self.emit(|s| s.write_u32(value))
    }

    pub fn write_float(&mut self, index: u32, value: f32) -> Result<()> {
        self.write_tag(index, TagType::Byte4)?;
        self.emit(|s| s.write_f32(value))
    }

    pub fn write_double(&mut self, index: u32, value: f64) -> Result<()> {
        self.write_tag(index, TagType::Byte8)?;
        self.emit(|s| s.write_f64(value))
    }

    pub fn write_long(&mut self, index: u32, value: u64) -> Result<()> {
        self.write_tag(index, TagType::Byte8)?;
        self.emit(|s| s.write_u64(value))
    }

    pub fn write_int_pair(&mut self, index: u32, a: u32, b: u32) -> Result<()> {
        self.write_tag(index, TagType::Byte8)?;
        self.emit(|s| s.write_u32(a))?;
        self.emit(|s| s.write_u32(b))
    }

    pub fn write_string(&mut self, index: u32, value: &str) -> Result<()> {
        self.write_subblock(index, |w| {
            w.emit(|s| s.write_varuint(value.len() as u64))?;
            w.emit(|s| s.write_u8(1))?; // is_ascii, always written true
            w.emit(|s| s.write_bytes(value.as_bytes()))
        })
    }

    /// Like [`Self::write_string`], but also writes a trailing `int@2` field
    /// when `fmt` is `Some`; see
    /// [`super::reader::TaggedBlockReader::read_string_with_format`].
    pub fn write_string_with_format(
        &mut self,
        index: u32,
        value: &str,
        fmt: Option<i32>,
    ) -> Result<()> {
        self.write_subblock(index, |w| {
            w.emit(|s| s.write_varuint(value.len() as u64))?;
            w.emit(|s| s.write_u8(1))?;
            w.emit(|s| s.write_bytes(value.as_bytes()))?;
            if let Some(f) = fmt {
                w.write_int(2, f)?;
            }
            Ok(())
        })
    }

    pub fn write_lww_bool(&mut self, index: u32, lww: LwwValue<bool>) -> Result<()> {
        self.write_subblock(index, |w| {
            w.write_id(1, lww.timestamp)?;
            w.write_bool(2, lww.value)
        })
    }

    pub fn write_lww_byte(&mut self, index: u32, lww: LwwValue<u8>) -> Result<()> {
        self.write_subblock(index, |w| {
            w.write_id(1, lww.timestamp)?;
            w.write_byte(2, lww.value)
        })
    }

    pub fn write_lww_float(&mut self, index: u32, lww: LwwValue<f32>) -> Result<()> {
        self.write_subblock(index, |w| {
            w.write_id(1, lww.timestamp)?;
            w.write_float(2, lww.value)
        })
    }

    pub fn write_lww_id(&mut self, index: u32, lww: LwwValue<CrdtId>) -> Result<()> {
        self.write_subblock(index, |w| {
            w.write_id(1, lww.timestamp)?;
            w.write_id(2, lww.value)
        })
    }

    pub fn write_lww_string(&mut self, index: u32, lww: &LwwValue<String>) -> Result<()> {
        self.write_subblock(index, |w| {
            w.write_id(1, lww.timestamp)?;
            w.write_string(2, &lww.value)
        })
    }

    pub fn write_subblock<F>(&mut self, index: u32, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.write_tag(index, TagType::Length4)?;
        self.buffers.push(Vec::new());
        let result = f(self);
        let body = self.buffers.pop().expect("pushed above");
        result?;
        self.emit(|s| s.write_u32(body.len() as u32))?;
        self.emit(|s| s.write_bytes(&body))
    }

    pub fn write_extra_data(&mut self, extra: &[u8]) -> Result<()> {
        self.emit(|s| s.write_bytes(extra))
    }

    /// Untagged writes, mirroring [`super::reader::TaggedBlockReader`]'s
    /// `read_raw_*` for the block kinds with positional (non-tagged) layout.
    pub fn write_raw_u8(&mut self, v: u8) -> Result<()> {
        self.emit(|s| s.write_u8(v))
    }

    pub fn write_raw_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.emit(|s| s.write_bytes(bytes))
    }

    pub fn write_raw_u16(&mut self, v: u16) -> Result<()> {
        self.emit(|s| s.write_bytes(&v.to_le_bytes()))
    }

    pub fn write_raw_u32(&mut self, v: u32) -> Result<()> {
        self.emit(|s| s.write_u32(v))
    }

    pub fn write_raw_f32(&mut self, v: f32) -> Result<()> {
        self.emit(|s| s.write_f32(v))
    }

    pub fn write_raw_f64(&mut self, v: f64) -> Result<()> {
        self.emit(|s| s.write_f64(v))
    }

    pub fn write_raw_varuint(&mut self, v: u64) -> Result<()> {
        self.emit(|s| s.write_varuint(v))
    }

    /// A `CrdtId` with no tag of its own; see
    /// [`super::reader::TaggedBlockReader::read_raw_crdt_id`].
    pub fn write_raw_crdt_id(&mut self, id: CrdtId) -> Result<()> {
        self.emit(|s| s.write_crdt_id(id))
    }

    pub fn write_raw_string(&mut self, value: &str) -> Result<()> {
        self.emit(|s| s.write_varuint(value.len() as u64))?;
        self.emit(|s| s.write_bytes(value.as_bytes()))
    }

    /// Write a complete top-level block: `f` writes the body, then this
    /// writes the 8-byte header with the body's length in front of it.
    pub fn write_block<F>(
        &mut self,
        block_type: u8,
        min_version: u8,
        current_version: u8,
        f: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.buffers.push(Vec::new());
        let result = f(self);
        let body = self.buffers.pop().expect("pushed above");
        result?;
        self.emit(|s| s.write_u32(body.len() as u32))?;
        self.emit(|s| s.write_u8(0))?;
        self.emit(|s| s.write_u8(min_version))?;
        self.emit(|s| s.write_u8(current_version))?;
        self.emit(|s| s.write_u8(block_type))?;
        self.emit(|s| s.write_bytes(&body))
    }
}

/// Either the final output stream or the top buffer on the nesting stack;
/// lets the small `write_*` helpers above stay oblivious to nesting depth.
enum RawSink<'a> {
    Stream(&'a mut StreamWriter),
    Buf(&'a mut Vec<u8>),
}

impl<'a> RawSink<'a> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            RawSink::Stream(s) => s.write_bytes(bytes),
            RawSink::Buf(b) => {
                b.extend_from_slice(bytes);
                Ok(())
            }
        }
    }
    fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_bytes(&[v])
    }
    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(v as u8)
    }
    fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }
    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }
    fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }
    fn write_f32(&mut self, v: f32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }
    fn write_f64(&mut self, v: f64) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }
    fn write_varuint(&mut self, mut v: u64) -> Result<()> {
        loop {
            let mut byte = (v & 0x7F) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.write_u8(byte)?;
            if v == 0 {
                break;
            }
        }
        Ok(())
    }
    fn write_crdt_id(&mut self, id: CrdtId) -> Result<()> {
        self.write_u8(id.author())?;
        self.write_varuint(id.counter())
    }
    fn write_header(&mut self) -> Result<()> {
        self.write_bytes(crate::stream::HEADER_V6)
    }
}
