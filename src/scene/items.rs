//! Leaf content of the scene tree: strokes, highlighter glyph ranges, and
//! the markers that stand in for groups and text in a group's children
//! sequence.

/// One sampled point along a stroke.
///
/// `width` is always stored as a rounded value (both wire encodings commit
/// to an integer-valued pixel width); `speed`, `direction`, and `pressure`
/// are full precision in the newer (v2) point encoding and rounded in the
/// pre-3.0 (v1) encoding read off disk. See [`crate::blocks::line`] for the
/// two wire layouts this is decoded from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub direction: f32,
    pub width: f32,
    pub pressure: f32,
}

/// A drawing tool, as recorded per-stroke. Unknown numeric codes (future
/// tools, or codes from a newer software version) round-trip through
/// `Other` rather than being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pen {
    Paintbrush1,
    Pencil1,
    Ballpoint1,
    Marker1,
    Fineliner1,
    Highlighter1,
    Eraser,
    MechanicalPencil1,
    EraserArea,
    Paintbrush2,
    MechanicalPencil2,
    Pencil2,
    Ballpoint2,
    Marker2,
    Fineliner2,
    Highlighter2,
    Calligraphy,
    Shader,
    Other(i32),
}

impl Pen {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Pen::Paintbrush1,
            1 => Pen::Pencil1,
            2 => Pen::Ballpoint1,
            3 => Pen::Marker1,
            4 => Pen::Fineliner1,
            5 => Pen::Highlighter1,
            6 => Pen::Eraser,
            7 => Pen::MechanicalPencil1,
            8 => Pen::EraserArea,
            12 => Pen::Paintbrush2,
            13 => Pen::MechanicalPencil2,
            14 => Pen::Pencil2,
            15 => Pen::Ballpoint2,
            16 => Pen::Marker2,
            17 => Pen::Fineliner2,
            18 => Pen::Highlighter2,
            21 => Pen::Calligraphy,
            23 => Pen::Shader,
            other => Pen::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Pen::Paintbrush1 => 0,
            Pen::Pencil1 => 1,
            Pen::Ballpoint1 => 2,
            Pen::Marker1 => 3,
            Pen::Fineliner1 => 4,
            Pen::Highlighter1 => 5,
            Pen::Eraser => 6,
            Pen::MechanicalPencil1 => 7,
            Pen::EraserArea => 8,
            Pen::Paintbrush2 => 12,
            Pen::MechanicalPencil2 => 13,
            Pen::Pencil2 => 14,
            Pen::Ballpoint2 => 15,
            Pen::Marker2 => 16,
            Pen::Fineliner2 => 17,
            Pen::Highlighter2 => 18,
            Pen::Calligraphy => 21,
            Pen::Shader => 23,
            Pen::Other(v) => v,
        }
    }

    pub fn is_highlighter(self) -> bool {
        matches!(self, Pen::Highlighter1 | Pen::Highlighter2)
    }
}

/// A stroke's color. `Other` preserves any numeric code not in the known
/// palette so round-tripping never lossily clamps an unfamiliar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenColor {
    Black,
    Gray,
    White,
    Yellow,
    Green,
    Pink,
    Blue,
    Red,
    GrayOverlap,
    /// All highlight colors share this wire value; any further color
    /// information lives in extra data the block layer preserves but
    /// doesn't interpret.
    Highlight,
    Green2,
    Cyan,
    Magenta,
    Yellow2,
    Other(i32),
}

impl PenColor {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => PenColor::Black,
            1 => PenColor::Gray,
            2 => PenColor::White,
            3 => PenColor::Yellow,
            4 => PenColor::Green,
            5 => PenColor::Pink,
            6 => PenColor::Blue,
            7 => PenColor::Red,
            8 => PenColor::GrayOverlap,
            9 => PenColor::Highlight,
            10 => PenColor::Green2,
            11 => PenColor::Cyan,
            12 => PenColor::Magenta,
            13 => PenColor::Yellow2,
            other => PenColor::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            PenColor::Black => 0,
            PenColor::Gray => 1,
            PenColor::White => 2,
            PenColor::Yellow => 3,
            PenColor::Green => 4,
            PenColor::Pink => 5,
            PenColor::Blue => 6,
            PenColor::Red => 7,
            PenColor::GrayOverlap => 8,
            PenColor::Highlight => 9,
            PenColor::Green2 => 10,
            PenColor::Cyan => 11,
            PenColor::Magenta => 12,
            PenColor::Yellow2 => 13,
            PenColor::Other(v) => v,
        }
    }
}

/// A complete stroke: metadata plus its sampled points.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub color: PenColor,
    pub tool: Pen,
    pub points: Vec<Point>,
    pub thickness_scale: f64,
    pub starting_length: f32,
    /// Present when this stroke is the result of a "move" edit rather than
    /// a fresh draw; names the id of the stroke it was moved from.
    pub move_id: Option<crate::tagged::common::CrdtId>,
}

/// A run of highlighted text, expressed as the rectangles it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// A highlighter stroke anchored to a text range rather than freehand points.
///
/// `start`/`length` are absent in files from reMarkable ≥3.6, where the
/// range's length is derived from `text` instead of stored explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRange {
    pub start: Option<i32>,
    pub length: i32,
    pub text: String,
    pub color: PenColor,
    pub rectangles: Vec<Rectangle>,
}

/// The inline style resolved for a paragraph of the root text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParagraphStyle {
    Basic,
    #[default]
    Plain,
    Heading,
    Bold,
    Bullet,
    Bullet2,
    Checkbox,
    CheckboxChecked,
}

impl ParagraphStyle {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => ParagraphStyle::Basic,
            1 => ParagraphStyle::Plain,
            2 => ParagraphStyle::Heading,
            3 => ParagraphStyle::Bold,
            4 => ParagraphStyle::Bullet,
            5 => ParagraphStyle::Bullet2,
            6 => ParagraphStyle::Checkbox,
            7 => ParagraphStyle::CheckboxChecked,
            _ => ParagraphStyle::Basic,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            ParagraphStyle::Basic => 0,
            ParagraphStyle::Plain => 1,
            ParagraphStyle::Heading => 2,
            ParagraphStyle::Bold => 3,
            ParagraphStyle::Bullet => 4,
            ParagraphStyle::Bullet2 => 5,
            ParagraphStyle::Checkbox => 6,
            ParagraphStyle::CheckboxChecked => 7,
        }
    }
}

/// The leaf content a scene tree's CRDT sequence of children can hold.
///
/// A `GroupRef` stands in for a nested [`crate::scene::tree::Group`]; the
/// tree itself owns groups in a flat id-keyed map (see
/// [`crate::scene::tree::SceneTree`]) so walking the tree is a lookup
/// rather than a shared, mutable, doubly-owned structure.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneItem {
    GroupRef(crate::tagged::common::CrdtId),
    Line(Line),
    Glyph(GlyphRange),
    Text,
    Tombstone,
}

/// A node in the scene tree. Child subgroups are referenced by id
/// ([`SceneItem::GroupRef`]) rather than owned inline, so the tree's flat
/// `SceneTree::nodes` map is the single owner of every group.
#[derive(Debug, Clone)]
pub struct Group {
    pub node_id: crate::tagged::common::CrdtId,
    pub children: crate::crdt::CrdtSequence<SceneItem>,
    pub label: crate::tagged::common::LwwValue<String>,
    pub visible: crate::tagged::common::LwwValue<bool>,
    pub anchor_id: Option<crate::tagged::common::LwwValue<crate::tagged::common::CrdtId>>,
    pub anchor_type: Option<crate::tagged::common::LwwValue<u8>>,
    pub anchor_threshold: Option<crate::tagged::common::LwwValue<f32>>,
    pub anchor_origin_x: Option<crate::tagged::common::LwwValue<f32>>,
}

impl Group {
    pub fn new(node_id: crate::tagged::common::CrdtId) -> Self {
        use crate::tagged::common::{CrdtId, LwwValue};
        Self {
            node_id,
            children: crate::crdt::CrdtSequence::new(),
            label: LwwValue::new(CrdtId::new(0, 0), String::new()),
            visible: LwwValue::new(CrdtId::new(0, 0), true),
            anchor_id: None,
            anchor_type: None,
            anchor_threshold: None,
            anchor_origin_x: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pen_roundtrip_known_codes() {
        for code in [0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 13, 14, 15, 16, 17, 18, 21, 23] {
            let pen = Pen::from_code(code);
            assert_eq!(pen.code(), code);
        }
    }

    #[test]
    fn test_pen_unknown_code_preserved() {
        let pen = Pen::from_code(999);
        assert_eq!(pen, Pen::Other(999));
        assert_eq!(pen.code(), 999);
    }

    #[test]
    fn test_highlighter_pens() {
        assert!(Pen::from_code(5).is_highlighter());
        assert!(Pen::from_code(18).is_highlighter());
        assert!(!Pen::from_code(1).is_highlighter());
    }

    #[test]
    fn test_pen_color_roundtrip() {
        for code in 0..14 {
            assert_eq!(PenColor::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_pen_color_unknown_preserved() {
        assert_eq!(PenColor::from_code(42), PenColor::Other(42));
    }
}
