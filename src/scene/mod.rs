//! The scene tree and its leaf content (strokes, glyph ranges, groups).

pub mod items;
pub mod tree;

pub use items::{Group, GlyphRange, Line, ParagraphStyle, Pen, PenColor, Point, Rectangle, SceneItem};
pub use tree::{build_tree, SceneTree};
