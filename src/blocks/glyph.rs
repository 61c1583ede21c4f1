//! `SceneGlyphItem` (0x03) payload: a highlighter range anchored to text
//! rather than freehand points.

use crate::error::Result;
use crate::scene::items::{GlyphRange, PenColor, Rectangle};
use crate::tagged::common::TagType;
use crate::tagged::{TaggedBlockReader, TaggedBlockWriter};

pub fn value_from_stream(reader: &mut TaggedBlockReader) -> Result<GlyphRange> {
    // Since reMarkable 3.6, start/length are omitted and derived from the
    // text itself.
    let start = if reader.check_tag(2, TagType::Byte4) {
        Some(reader.read_int(2)?)
    } else {
        None
    };
    let length = if reader.check_tag(3, TagType::Byte4) {
        Some(reader.read_int(3)?)
    } else {
        None
    };

    let color = PenColor::from_code(reader.read_int(4)?);
    let text = reader.read_string(5)?;
    let length = length.unwrap_or(text.chars().count() as i32);

    let rectangles = reader.read_subblock(6, |reader, _info| {
        let count = reader.read_raw_varuint()?;
        (0..count)
            .map(|_| {
                Ok(Rectangle {
                    x: reader.read_raw_f64()? as f32,
                    y: reader.read_raw_f64()? as f32,
                    w: reader.read_raw_f64()? as f32,
                    h: reader.read_raw_f64()? as f32,
                })
            })
            .collect::<Result<Vec<_>>>()
    })?;

    Ok(GlyphRange {
        start,
        length,
        text,
        color,
        rectangles,
    })
}

pub fn value_to_stream(writer: &mut TaggedBlockWriter, glyph: &GlyphRange) -> Result<()> {
    if let Some(start) = glyph.start {
        writer.write_int(2, start)?;
        writer.write_int(3, glyph.length)?;
    }
    writer.write_int(4, glyph.color.code())?;
    writer.write_string(5, &glyph.text)?;
    writer.write_subblock(6, |writer| {
        writer.write_raw_varuint(glyph.rectangles.len() as u64)?;
        for rect in &glyph.rectangles {
            writer.write_raw_f64(rect.x as f64)?;
            writer.write_raw_f64(rect.y as f64)?;
            writer.write_raw_f64(rect.w as f64)?;
            writer.write_raw_f64(rect.h as f64)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::WriteOptions;
    use crate::stream::StreamReader;

    fn roundtrip_through_block(glyph: &GlyphRange) -> GlyphRange {
        let mut w = TaggedBlockWriter::new(WriteOptions::default());
        w.write_block(0x03, 1, 1, |w| value_to_stream(w, glyph)).unwrap();
        let bytes = w.into_bytes();
        let mut r = TaggedBlockReader::new(StreamReader::new(bytes));
        let mut info = r.begin_block().unwrap().unwrap();
        let read_back = value_from_stream(&mut r).unwrap();
        r.end_block(&mut info).unwrap();
        read_back
    }

    #[test]
    fn test_glyph_range_roundtrip_with_start() {
        let glyph = GlyphRange {
            start: Some(3),
            length: 5,
            text: "hello".to_string(),
            color: PenColor::Highlight,
            rectangles: vec![Rectangle {
                x: 1.0,
                y: 2.0,
                w: 3.0,
                h: 4.0,
            }],
        };
        let read_back = roundtrip_through_block(&glyph);
        assert_eq!(read_back, glyph);
    }

    #[test]
    fn test_glyph_range_without_start_derives_length_from_text() {
        let glyph = GlyphRange {
            start: None,
            length: 3,
            text: "abc".to_string(),
            color: PenColor::Yellow,
            rectangles: vec![],
        };
        let read_back = roundtrip_through_block(&glyph);
        assert_eq!(read_back.start, None);
        assert_eq!(read_back.length, 3);
        assert_eq!(read_back.text, "abc");
    }
}
