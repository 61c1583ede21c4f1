//! # rmlines
//!
//! A pure Rust library for reading and writing reMarkable tablet `.rm`
//! (lines file format version 6) files.
//!
//! The format is a tagged, length-prefixed binary container: a fixed
//! 43-byte header, followed by a flat sequence of top-level blocks, each
//! itself built from tagged fields and nested sub-blocks. Individual
//! strokes, highlighter ranges, and the page's body text are all reached
//! by first decoding this block sequence and then reconstructing the CRDT
//! sequences (scene tree children, text characters) they describe.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use rmlines::read_tree;
//!
//! let data = std::fs::read("page.rm")?;
//! let tree = read_tree(data)?;
//! # Ok::<(), rmlines::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`stream`] / [`tagged`] - the varuint/tag codec and top-level block
//!   framing (layers A and B of the format).
//! - [`blocks`] - the block layer: one struct per `block_type`, dispatched
//!   through the [`blocks::Block`] enum.
//! - [`crdt`] - the sequence-CRDT reconstruction shared by the scene tree
//!   and the text model.
//! - [`scene`] - the scene tree and its leaf content (strokes, glyph
//!   ranges, groups).
//! - [`text`] - turning the root text block's character sequence into lines,
//!   and building a minimal plain-text document.
//! - [`diagnostics`] - non-fatal recoverable conditions collected during a
//!   read, in place of logging to stderr.

#![allow(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod blocks;
pub mod crdt;
pub mod diagnostics;
pub mod error;
pub mod options;
pub mod scene;
pub mod stream;
pub mod tagged;
pub mod text;

pub use blocks::{read_blocks, write_blocks, Block};
pub use error::{Error, Result};
pub use options::{Version, WriteOptions};
pub use scene::{build_tree, GlyphRange, Group, Line, ParagraphStyle, Pen, PenColor, Point, SceneItem, SceneTree};
pub use tagged::{CrdtId, LwwValue, TaggedBlockReader, TaggedBlockWriter};
pub use text::{
    expand_text_item, extract_text_lines, simple_text_document, CrdtStr, FontStyle, FontWeight,
    Paragraph, TextDocument, TextLine, TextProperties,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse a complete lines file: check the header, then decode every block
/// and reconstruct the scene tree.
pub fn read_tree(data: Vec<u8>) -> Result<SceneTree> {
    let mut stream = stream::StreamReader::new(data);
    stream.read_header()?;
    let mut reader = tagged::TaggedBlockReader::new(stream);
    let blocks = read_blocks(&mut reader)?;
    build_tree(&blocks)
}

/// Serialize a block sequence back into a complete lines file, including the
/// fixed header.
pub fn write_file(blocks: &[Block], options: WriteOptions) -> Result<Vec<u8>> {
    let mut writer = tagged::TaggedBlockWriter::new(options);
    writer.write_header()?;
    write_blocks(&mut writer, blocks)?;
    Ok(writer.into_bytes())
}
