//! Layer A: the raw byte stream underneath tagged blocks.
//!
//! A [`StreamReader`] knows nothing about tags or blocks; it only knows how
//! to pull fixed-width little-endian primitives, varuints, and length-
//! prefixed byte runs off a cursor, and how to push the mirror-image writes.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use crate::error::{Error, Result};
use crate::tagged::common::CrdtId;

/// The literal bytes that open every v6 lines file.
pub const HEADER_V6: &[u8] = b"reMarkable .lines file, version=6          ";

fn map_eof(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::Eof
    } else {
        Error::Io(e)
    }
}

/// Reads primitives off an in-memory buffer.
pub struct StreamReader {
    cursor: Cursor<Vec<u8>>,
}

impl StreamReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn set_position(&mut self, pos: u64) {
        self.cursor.set_position(pos);
    }

    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position())
    }

    pub fn at_eof(&self) -> bool {
        self.position() >= self.len()
    }

    /// Read the fixed 43-byte file header and check it matches exactly.
    pub fn read_header(&mut self) -> Result<()> {
        let mut buf = vec![0u8; HEADER_V6.len()];
        self.cursor.read_exact(&mut buf).map_err(map_eof)?;
        if buf != HEADER_V6 {
            return Err(Error::InvalidHeader(format!(
                "expected {:?}, got {:?}",
                String::from_utf8_lossy(HEADER_V6),
                String::from_utf8_lossy(&buf)
            )));
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.cursor.read_exact(&mut buf).map_err(map_eof)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(map_eof)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.cursor.read_u16::<LittleEndian>().map_err(map_eof)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.cursor.read_u32::<LittleEndian>().map_err(map_eof)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.cursor.read_i32::<LittleEndian>().map_err(map_eof)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.cursor.read_u64::<LittleEndian>().map_err(map_eof)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.cursor.read_f32::<LittleEndian>().map_err(map_eof)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.cursor.read_f64::<LittleEndian>().map_err(map_eof)
    }

    /// LEB128-style unsigned varint: 7 data bits per byte, LSB first, high
    /// bit of each byte set while more bytes follow.
    pub fn read_varuint(&mut self) -> Result<u64> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 64 {
                return Err(Error::Value("varuint too long".into()));
            }
        }
    }

    /// A `CrdtId` on the wire: an author byte followed by a varuint counter.
    /// It carries no tag of its own; callers read it inline after a tag.
    pub fn read_crdt_id(&mut self) -> Result<CrdtId> {
        let author = self.read_u8()?;
        let counter = self.read_varuint()?;
        Ok(CrdtId::new(author, counter))
    }
}

/// Writes primitives into an in-memory buffer.
pub struct StreamWriter {
    buf: Vec<u8>,
}

impl StreamWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_header(&mut self) -> Result<()> {
        self.buf.extend_from_slice(HEADER_V6);
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.buf.write_u8(v).map_err(Error::from)
    }

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(v as u8)
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.buf.write_u16::<LittleEndian>(v).map_err(Error::from)
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.buf.write_u32::<LittleEndian>(v).map_err(Error::from)
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.buf.write_i32::<LittleEndian>(v).map_err(Error::from)
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.buf.write_u64::<LittleEndian>(v).map_err(Error::from)
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.buf.write_f32::<LittleEndian>(v).map_err(Error::from)
    }

    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        self.buf.write_f64::<LittleEndian>(v).map_err(Error::from)
    }

    pub fn write_varuint(&mut self, mut v: u64) -> Result<()> {
        loop {
            let mut byte = (v & 0x7F) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.buf.write_u8(byte)?;
            if v == 0 {
                break;
            }
        }
        Ok(())
    }

    pub fn write_crdt_id(&mut self, id: CrdtId) -> Result<()> {
        self.write_u8(id.author())?;
        self.write_varuint(id.counter())
    }
}

impl Default for StreamWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes a finished top-level buffer straight to any [`Write`] sink.
pub fn flush_to<W: Write>(writer: StreamWriter, mut sink: W) -> Result<()> {
    sink.write_all(&writer.into_inner()).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varuint_roundtrip_small() {
        for v in [0u64, 1, 63, 64, 127, 128, 16383, 16384] {
            let mut w = StreamWriter::new();
            w.write_varuint(v).unwrap();
            let mut r = StreamReader::new(w.into_inner());
            assert_eq!(r.read_varuint().unwrap(), v);
        }
    }

    #[test]
    fn test_varuint_wire_bytes() {
        // 300 = 0b1_0010_1100 -> low 7 bits 0101100 with continuation, then 10
        let mut w = StreamWriter::new();
        w.write_varuint(300).unwrap();
        assert_eq!(w.into_inner(), vec![0xAC, 0x02]);
    }

    #[test]
    fn test_header_roundtrip() {
        let mut w = StreamWriter::new();
        w.write_header().unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), 43);
        let mut r = StreamReader::new(bytes);
        r.read_header().unwrap();
    }

    #[test]
    fn test_header_rejects_garbage() {
        let mut r = StreamReader::new(vec![0u8; 43]);
        assert!(r.read_header().is_err());
    }

    #[test]
    fn test_crdt_id_wire_format() {
        let id = CrdtId::new(3, 128);
        let mut w = StreamWriter::new();
        w.write_crdt_id(id).unwrap();
        let mut r = StreamReader::new(w.into_inner());
        assert_eq!(r.read_crdt_id().unwrap(), id);
    }

    #[test]
    fn test_eof_on_short_read() {
        let mut r = StreamReader::new(vec![1, 2]);
        r.read_u32().unwrap_err();
    }
}
