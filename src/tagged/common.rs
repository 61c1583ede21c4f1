//! Shared types used by both the tagged-block reader and writer.

use std::fmt;

use crate::error::{Error, Result};

/// Identifies an item created by a particular author, in creation order.
///
/// On the wire this is a single author byte followed by a varuint counter,
/// with no tag of its own (see [`crate::stream::StreamReader::read_crdt_id`]).
/// Ordering is lexicographic on `(author, counter)`, which the CRDT sequence
/// model uses to break ties between concurrently-inserted items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrdtId {
    author: u8,
    counter: u64,
}

impl CrdtId {
    pub const fn new(author: u8, counter: u64) -> Self {
        Self { author, counter }
    }

    /// The id of the scene tree's root group.
    pub const ROOT: CrdtId = CrdtId::new(0, 1);

    pub const fn author(&self) -> u8 {
        self.author
    }

    pub const fn counter(&self) -> u64 {
        self.counter
    }

    pub const fn is_zero(&self) -> bool {
        self.author == 0 && self.counter == 0
    }
}

impl fmt::Display for CrdtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.author, self.counter)
    }
}

/// A tagged-block field type code, packed into the low nibble of a tag
/// varuint (the high bits hold the field index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    /// A nested, length-prefixed sub-block.
    Length4,
    /// A `CrdtId` (author byte + varuint counter).
    Id,
    /// An 8-byte value: `f64` or `u64`.
    Byte8,
    /// A 4-byte value: `f32`, `u32`, or `i32`.
    Byte4,
    /// A 1-byte value: `u8` or `bool`.
    Byte1,
}

impl TagType {
    pub const fn code(self) -> u8 {
        match self {
            TagType::Id => 0xF,
            TagType::Length4 => 0xC,
            TagType::Byte8 => 0x8,
            TagType::Byte4 => 0x4,
            TagType::Byte1 => 0x1,
        }
    }
}

impl TryFrom<u8> for TagType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0xF => Ok(TagType::Id),
            0xC => Ok(TagType::Length4),
            0x8 => Ok(TagType::Byte8),
            0x4 => Ok(TagType::Byte4),
            0x1 => Ok(TagType::Byte1),
            other => Err(Error::Value(format!("unknown tag type code {:#x}", other))),
        }
    }
}

/// Pack a field index and tag type into the varuint written before a value.
pub fn pack_tag(index: u32, ty: TagType) -> u64 {
    ((index as u64) << 4) | ty.code() as u64
}

/// Unpack a tag varuint into its field index and tag type.
pub fn unpack_tag(tag: u64) -> Result<(u32, TagType)> {
    let index = (tag >> 4) as u32;
    let ty = TagType::try_from((tag & 0xF) as u8)?;
    Ok((index, ty))
}

/// A last-writer-wins register: a timestamp (`CrdtId` of the write that set
/// it) paired with the value it holds. Two concurrent writes are ordered by
/// comparing timestamps, not by wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LwwValue<T> {
    pub timestamp: CrdtId,
    pub value: T,
}

impl<T> LwwValue<T> {
    pub const fn new(timestamp: CrdtId, value: T) -> Self {
        Self { timestamp, value }
    }
}
