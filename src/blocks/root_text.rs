//! `RootText` (0x07): the page's body text as a CRDT sequence of characters
//! plus per-character paragraph-style overrides.

use std::collections::HashMap;

use crate::blocks::scene_item::{id_to_neighbor, neighbor_to_id};
use crate::crdt::{CrdtSequence, CrdtSequenceItem};
use crate::error::Result;
use crate::options::WriteOptions;
use crate::scene::items::ParagraphStyle;
use crate::tagged::common::{CrdtId, LwwValue};
use crate::tagged::{TaggedBlockReader, TaggedBlockWriter};

/// One character (or run, pre-expansion) in the root text sequence: either
/// literal text or an inline formatting marker. See
/// [`crate::text::expand_text_item`] for how a multi-character run becomes
/// per-character items.
#[derive(Debug, Clone, PartialEq)]
pub enum TextItemValue {
    Text(String),
    FormatCode(i32),
}

/// The page's body text: a CRDT sequence of characters plus a map from
/// paragraph-start id to that paragraph's style.
#[derive(Debug, Clone)]
pub struct Text {
    pub items: CrdtSequence<TextItemValue>,
    pub styles: HashMap<CrdtId, LwwValue<ParagraphStyle>>,
    pub pos_x: f64,
    pub pos_y: f64,
    pub width: f32,
}

#[derive(Debug, Clone)]
pub struct RootTextBlock {
    pub block_id: CrdtId,
    pub value: Text,
    pub extra_data: Vec<u8>,
}

fn text_item_from_stream(reader: &mut TaggedBlockReader) -> Result<CrdtSequenceItem<TextItemValue>> {
    reader.read_subblock(0, |reader, _info| {
        let item_id = reader.read_id(2)?;
        let left_id = reader.read_id(3)?;
        let right_id = reader.read_id(4)?;
        let deleted_length = reader.read_int(5)? as u32;

        let value = if reader.has_subblock(6) {
            let (text, fmt) = reader.read_string_with_format(6)?;
            match fmt {
                Some(code) => TextItemValue::FormatCode(code),
                None => TextItemValue::Text(text),
            }
        } else {
            TextItemValue::Text(String::new())
        };

        Ok(CrdtSequenceItem {
            item_id,
            left_id: id_to_neighbor(left_id),
            right_id: id_to_neighbor(right_id),
            deleted_length,
            value,
        })
    })
}

fn text_item_to_stream(
    writer: &mut TaggedBlockWriter,
    item: &CrdtSequenceItem<TextItemValue>,
) -> Result<()> {
    writer.write_subblock(0, |writer| {
        writer.write_id(2, item.item_id)?;
        writer.write_id(3, neighbor_to_id(item.left_id))?;
        writer.write_id(4, neighbor_to_id(item.right_id))?;
        writer.write_int(5, item.deleted_length as i32)?;
        match &item.value {
            TextItemValue::Text(text) if !text.is_empty() => {
                writer.write_string_with_format(6, text, None)?;
            }
            TextItemValue::FormatCode(code) => {
                writer.write_string_with_format(6, "", Some(*code))?;
            }
            TextItemValue::Text(_) => {}
        }
        Ok(())
    })
}

fn text_format_from_stream(
    reader: &mut TaggedBlockReader,
) -> Result<(CrdtId, LwwValue<ParagraphStyle>)> {
    let char_id = reader.read_raw_crdt_id()?;
    let timestamp = reader.read_id(1)?;
    let style = reader.read_subblock(2, |reader, _info| {
        let marker = reader.read_raw_u8()?;
        if marker != 17 {
            return Err(crate::error::Error::Value(format!(
                "text format sub-block marker {} is not 17",
                marker
            )));
        }
        let code = reader.read_raw_u8()?;
        Ok(ParagraphStyle::from_code(code as u32))
    })?;
    Ok((char_id, LwwValue::new(timestamp, style)))
}

fn text_format_to_stream(
    writer: &mut TaggedBlockWriter,
    char_id: CrdtId,
    value: &LwwValue<ParagraphStyle>,
) -> Result<()> {
    writer.write_raw_crdt_id(char_id)?;
    writer.write_id(1, value.timestamp)?;
    writer.write_subblock(2, |writer| {
        writer.write_raw_u8(17)?;
        writer.write_raw_u8(value.value.code() as u8)
    })
}

impl RootTextBlock {
    pub const BLOCK_TYPE: u8 = 0x07;

    pub fn version_info(_options: &WriteOptions) -> (u8, u8) {
        (0, 1)
    }

    pub fn from_stream(reader: &mut TaggedBlockReader) -> Result<Self> {
        let block_id = reader.read_id(1)?;
        if block_id != CrdtId::new(0, 0) {
            return Err(crate::error::Error::Value(format!(
                "RootText block_id expected to be the end-marker, got {}",
                block_id
            )));
        }

        let (items, styles) = reader.read_subblock(2, |reader, _info| {
            let items = reader.read_subblock(1, |reader, _info| {
                reader.read_subblock(1, |reader, _info| {
                    let count = reader.read_raw_varuint()?;
                    let mut seq = CrdtSequence::new();
                    for _ in 0..count {
                        seq.insert(text_item_from_stream(reader)?);
                    }
                    Ok(seq)
                })
            })?;
            let styles = reader.read_subblock(2, |reader, _info| {
                reader.read_subblock(1, |reader, _info| {
                    let count = reader.read_raw_varuint()?;
                    let mut map = HashMap::new();
                    for _ in 0..count {
                        let (id, style) = text_format_from_stream(reader)?;
                        map.insert(id, style);
                    }
                    Ok(map)
                })
            })?;
            Ok((items, styles))
        })?;

        let (pos_x, pos_y) = reader.read_subblock(3, |reader, _info| {
            let pos_x = reader.read_raw_f64()?;
            let pos_y = reader.read_raw_f64()?;
            Ok((pos_x, pos_y))
        })?;
        let width = reader.read_float(4)?;

        Ok(Self {
            block_id,
            value: Text {
                items,
                styles,
                pos_x,
                pos_y,
                width,
            },
            extra_data: Vec::new(),
        })
    }

    pub fn to_stream(&self, writer: &mut TaggedBlockWriter) -> Result<()> {
        writer.write_id(1, self.block_id)?;

        writer.write_subblock(2, |writer| {
            let text_items: Vec<&CrdtSequenceItem<TextItemValue>> =
                self.value.items.iter().collect();
            writer.write_subblock(1, |writer| {
                writer.write_subblock(1, |writer| {
                    writer.write_raw_varuint(text_items.len() as u64)?;
                    for item in &text_items {
                        text_item_to_stream(writer, item)?;
                    }
                    Ok(())
                })
            })?;
            writer.write_subblock(2, |writer| {
                writer.write_subblock(1, |writer| {
                    writer.write_raw_varuint(self.value.styles.len() as u64)?;
                    for (id, style) in &self.value.styles {
                        text_format_to_stream(writer, *id, style)?;
                    }
                    Ok(())
                })
            })
        })?;

        writer.write_subblock(3, |writer| {
            writer.write_raw_f64(self.value.pos_x)?;
            writer.write_raw_f64(self.value.pos_y)
        })?;
        writer.write_float(4, self.value.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamReader;

    fn sample_block() -> RootTextBlock {
        let mut items = CrdtSequence::new();
        items.insert(CrdtSequenceItem {
            item_id: CrdtId::new(1, 1),
            left_id: None,
            right_id: None,
            deleted_length: 0,
            value: TextItemValue::Text("hi".to_string()),
        });
        let mut styles = HashMap::new();
        styles.insert(
            CrdtId::new(1, 1),
            LwwValue::new(CrdtId::new(1, 2), ParagraphStyle::Bold),
        );
        RootTextBlock {
            block_id: CrdtId::new(0, 0),
            value: Text {
                items,
                styles,
                pos_x: -10.0,
                pos_y: 5.0,
                width: 400.0,
            },
            extra_data: Vec::new(),
        }
    }

    #[test]
    fn test_root_text_roundtrip() {
        let block = sample_block();
        let mut w = TaggedBlockWriter::new(WriteOptions::default());
        block.to_stream(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = TaggedBlockReader::new(StreamReader::new(bytes));
        let read_back = RootTextBlock::from_stream(&mut r).unwrap();
        assert_eq!(read_back.block_id, block.block_id);
        assert_eq!(read_back.value.items.len(), 1);
        assert_eq!(
            read_back.value.items.get(CrdtId::new(1, 1)).unwrap().value,
            TextItemValue::Text("hi".to_string())
        );
        assert_eq!(read_back.value.styles.len(), 1);
        assert_eq!(read_back.value.pos_x, -10.0);
        assert_eq!(read_back.value.width, 400.0);
    }

    #[test]
    fn test_root_text_rejects_non_end_marker_block_id() {
        let mut block = sample_block();
        block.block_id = CrdtId::new(1, 5);
        let mut w = TaggedBlockWriter::new(WriteOptions::default());
        block.to_stream(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = TaggedBlockReader::new(StreamReader::new(bytes));
        assert!(RootTextBlock::from_stream(&mut r).is_err());
    }
}
