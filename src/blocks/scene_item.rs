//! The shared outer frame of the `SceneGlyphItem`/`SceneGroupItem`/
//! `SceneLineItem`/`SceneTextItem`/`SceneTombstoneItem` block family
//! (0x03-0x06, 0x08): one record layout, dispatched on the block's own
//! wire type to pick the payload parser.

use crate::crdt::CrdtSequenceItem;
use crate::error::Result;
use crate::tagged::common::CrdtId;
use crate::tagged::{TaggedBlockReader, TaggedBlockWriter};

pub const ITEM_TYPE_GLYPH: u8 = 0x01;
pub const ITEM_TYPE_GROUP: u8 = 0x02;
pub const ITEM_TYPE_LINE: u8 = 0x03;
pub const ITEM_TYPE_TEXT: u8 = 0x05;
/// `SceneTombstoneItem` never overrides the base class's item-type constant,
/// so it inherits the default of 0 rather than joining the 0x01-0x05 range
/// the other kinds use.
pub const ITEM_TYPE_TOMBSTONE: u8 = 0x00;

/// `left_id`/`right_id` are wire `CrdtId`s where `(0, 0)` means "no
/// neighbour on this side" (the sequence's start or end); this crate models
/// that as `Option<CrdtId>` rather than overloading the zero id.
pub(crate) fn id_to_neighbor(id: CrdtId) -> Option<CrdtId> {
    if id.is_zero() {
        None
    } else {
        Some(id)
    }
}

pub(crate) fn neighbor_to_id(neighbor: Option<CrdtId>) -> CrdtId {
    neighbor.unwrap_or(CrdtId::new(0, 0))
}

/// One record in the scene-item block family: a CRDT sequence item plus the
/// parent group it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneItemRecord<V> {
    pub parent_id: CrdtId,
    pub item: CrdtSequenceItem<Option<V>>,
    /// Bytes left unread inside the payload sub-block (after the kind's own
    /// fields), preserved for lossless round-trip.
    pub extra_value_data: Vec<u8>,
    pub extra_data: Vec<u8>,
}

impl<V> SceneItemRecord<V> {
    /// Read the shared frame, then `value_from_stream` for the payload
    /// (if a payload sub-block is present at all).
    pub fn from_stream(
        reader: &mut TaggedBlockReader,
        item_type: u8,
        value_from_stream: impl FnOnce(&mut TaggedBlockReader) -> Result<V>,
    ) -> Result<Self> {
        let parent_id = reader.read_id(1)?;
        let item_id = reader.read_id(2)?;
        let left_id = reader.read_id(3)?;
        let right_id = reader.read_id(4)?;
        let deleted_length = reader.read_int(5)? as u32;

        let (value, extra_value_data) = if reader.has_subblock(6) {
            let (value, extra) = reader.read_subblock_with_extra(6, |reader, _info| {
                let actual_item_type = reader.read_raw_u8()?;
                if actual_item_type != item_type {
                    return Err(crate::error::Error::Value(format!(
                        "scene item payload type {} does not match block's own type {}",
                        actual_item_type, item_type
                    )));
                }
                value_from_stream(reader)
            })?;
            (Some(value), extra)
        } else {
            (None, Vec::new())
        };

        Ok(Self {
            parent_id,
            item: CrdtSequenceItem {
                item_id,
                left_id: id_to_neighbor(left_id),
                right_id: id_to_neighbor(right_id),
                deleted_length,
                value,
            },
            extra_value_data,
            extra_data: Vec::new(),
        })
    }

    pub fn to_stream(
        &self,
        writer: &mut TaggedBlockWriter,
        item_type: u8,
        value_to_stream: impl FnOnce(&mut TaggedBlockWriter, &V) -> Result<()>,
    ) -> Result<()> {
        writer.write_id(1, self.parent_id)?;
        writer.write_id(2, self.item.item_id)?;
        writer.write_id(3, neighbor_to_id(self.item.left_id))?;
        writer.write_id(4, neighbor_to_id(self.item.right_id))?;
        writer.write_int(5, self.item.deleted_length as i32)?;

        if let Some(value) = &self.item.value {
            writer.write_subblock(6, |writer| {
                writer.write_raw_u8(item_type)?;
                value_to_stream(writer, value)?;
                writer.write_raw_bytes(&self.extra_value_data)
            })?;
        }
        Ok(())
    }
}
