//! Layer C: the block layer. A lines file's body is a flat sequence of
//! tagged top-level blocks; this module dispatches each one by its
//! `block_type` byte to the matching struct, and falls back to
//! [`unreadable::UnreadableBlock`] — raw bytes plus the error that defeated
//! parsing — for anything that doesn't parse or isn't recognised, so a
//! round-trip never loses a block it can't understand.

pub mod author_ids;
pub mod glyph;
pub mod line;
pub mod migration_info;
pub mod page_info;
pub mod root_text;
pub mod scene_info;
pub mod scene_item;
pub mod scene_tree_block;
pub mod tree_node;
pub mod unreadable;

use crate::error::Result;
use crate::options::WriteOptions;
use crate::scene::items::{GlyphRange, Line};
use crate::tagged::common::CrdtId;
use crate::tagged::{TaggedBlockReader, TaggedBlockWriter};

pub use author_ids::AuthorIdsBlock;
pub use migration_info::MigrationInfoBlock;
pub use page_info::PageInfoBlock;
pub use root_text::RootTextBlock;
pub use scene_info::SceneInfoBlock;
pub use scene_item::SceneItemRecord;
pub use scene_tree_block::SceneTreeBlock;
pub use tree_node::TreeNodeBlock;
pub use unreadable::UnreadableBlock;

pub const BLOCK_TYPE_MIGRATION_INFO: u8 = 0x00;
pub const BLOCK_TYPE_SCENE_TREE: u8 = 0x01;
pub const BLOCK_TYPE_TREE_NODE: u8 = 0x02;
pub const BLOCK_TYPE_SCENE_GLYPH_ITEM: u8 = 0x03;
pub const BLOCK_TYPE_SCENE_GROUP_ITEM: u8 = 0x04;
pub const BLOCK_TYPE_SCENE_LINE_ITEM: u8 = 0x05;
pub const BLOCK_TYPE_SCENE_TEXT_ITEM: u8 = 0x06;
pub const BLOCK_TYPE_ROOT_TEXT: u8 = 0x07;
pub const BLOCK_TYPE_SCENE_TOMBSTONE_ITEM: u8 = 0x08;
pub const BLOCK_TYPE_AUTHOR_IDS: u8 = 0x09;
pub const BLOCK_TYPE_PAGE_INFO: u8 = 0x0A;
pub const BLOCK_TYPE_SCENE_INFO: u8 = 0x0D;

/// One top-level block, decoded to its specific kind where recognised.
#[derive(Debug, Clone)]
pub enum Block {
    MigrationInfo(MigrationInfoBlock),
    SceneTree(SceneTreeBlock),
    TreeNode(TreeNodeBlock),
    SceneGlyphItem(SceneItemRecord<GlyphRange>),
    SceneGroupItem(SceneItemRecord<CrdtId>),
    SceneLineItem(SceneItemRecord<Line>),
    SceneTextItem(SceneItemRecord<()>),
    RootText(RootTextBlock),
    SceneTombstoneItem(SceneItemRecord<()>),
    AuthorIds(AuthorIdsBlock),
    PageInfo(PageInfoBlock),
    SceneInfo(SceneInfoBlock),
    Unreadable(UnreadableBlock),
}

impl Block {
    pub fn block_type(&self) -> u8 {
        match self {
            Block::MigrationInfo(_) => BLOCK_TYPE_MIGRATION_INFO,
            Block::SceneTree(_) => BLOCK_TYPE_SCENE_TREE,
            Block::TreeNode(_) => BLOCK_TYPE_TREE_NODE,
            Block::SceneGlyphItem(_) => BLOCK_TYPE_SCENE_GLYPH_ITEM,
            Block::SceneGroupItem(_) => BLOCK_TYPE_SCENE_GROUP_ITEM,
            Block::SceneLineItem(_) => BLOCK_TYPE_SCENE_LINE_ITEM,
            Block::SceneTextItem(_) => BLOCK_TYPE_SCENE_TEXT_ITEM,
            Block::RootText(_) => BLOCK_TYPE_ROOT_TEXT,
            Block::SceneTombstoneItem(_) => BLOCK_TYPE_SCENE_TOMBSTONE_ITEM,
            Block::AuthorIds(_) => BLOCK_TYPE_AUTHOR_IDS,
            Block::PageInfo(_) => BLOCK_TYPE_PAGE_INFO,
            Block::SceneInfo(_) => BLOCK_TYPE_SCENE_INFO,
            Block::Unreadable(b) => b.block_type,
        }
    }

    /// Bytes left unread at the end of this block's top-level scope, to be
    /// reproduced verbatim after the block's own fields on write. An
    /// [`UnreadableBlock`] already keeps its whole body in `data`, so it has
    /// none of its own.
    pub fn extra_data(&self) -> &[u8] {
        match self {
            Block::MigrationInfo(b) => &b.extra_data,
            Block::SceneTree(b) => &b.extra_data,
            Block::TreeNode(b) => &b.extra_data,
            Block::SceneGlyphItem(record) => &record.extra_data,
            Block::SceneGroupItem(record) => &record.extra_data,
            Block::SceneLineItem(record) => &record.extra_data,
            Block::SceneTextItem(record) => &record.extra_data,
            Block::RootText(b) => &b.extra_data,
            Block::SceneTombstoneItem(record) => &record.extra_data,
            Block::AuthorIds(b) => &b.extra_data,
            Block::PageInfo(b) => &b.extra_data,
            Block::SceneInfo(b) => &b.extra_data,
            Block::Unreadable(_) => &[],
        }
    }

    fn set_extra_data(&mut self, data: Vec<u8>) {
        match self {
            Block::MigrationInfo(b) => b.extra_data = data,
            Block::SceneTree(b) => b.extra_data = data,
            Block::TreeNode(b) => b.extra_data = data,
            Block::SceneGlyphItem(record) => record.extra_data = data,
            Block::SceneGroupItem(record) => record.extra_data = data,
            Block::SceneLineItem(record) => record.extra_data = data,
            Block::SceneTextItem(record) => record.extra_data = data,
            Block::RootText(b) => b.extra_data = data,
            Block::SceneTombstoneItem(record) => record.extra_data = data,
            Block::AuthorIds(b) => b.extra_data = data,
            Block::PageInfo(b) => b.extra_data = data,
            Block::SceneInfo(b) => b.extra_data = data,
            Block::Unreadable(_) => {}
        }
    }
}

fn dispatch_from_stream(
    reader: &mut TaggedBlockReader,
    block_type: u8,
    current_version: u8,
) -> Result<Block> {
    match block_type {
        BLOCK_TYPE_MIGRATION_INFO => {
            Ok(Block::MigrationInfo(MigrationInfoBlock::from_stream(reader)?))
        }
        BLOCK_TYPE_SCENE_TREE => Ok(Block::SceneTree(SceneTreeBlock::from_stream(reader)?)),
        BLOCK_TYPE_TREE_NODE => Ok(Block::TreeNode(TreeNodeBlock::from_stream(reader)?)),
        BLOCK_TYPE_SCENE_GLYPH_ITEM => Ok(Block::SceneGlyphItem(SceneItemRecord::from_stream(
            reader,
            scene_item::ITEM_TYPE_GLYPH,
            glyph::value_from_stream,
        )?)),
        BLOCK_TYPE_SCENE_GROUP_ITEM => Ok(Block::SceneGroupItem(SceneItemRecord::from_stream(
            reader,
            scene_item::ITEM_TYPE_GROUP,
            |reader| reader.read_id(2),
        )?)),
        BLOCK_TYPE_SCENE_LINE_ITEM => {
            let point_version = line::PointVersion::from_block_version(current_version)?;
            Ok(Block::SceneLineItem(SceneItemRecord::from_stream(
                reader,
                scene_item::ITEM_TYPE_LINE,
                |reader| line::value_from_stream(reader, point_version),
            )?))
        }
        BLOCK_TYPE_SCENE_TEXT_ITEM => Ok(Block::SceneTextItem(SceneItemRecord::from_stream(
            reader,
            scene_item::ITEM_TYPE_TEXT,
            |_reader| Ok(()),
        )?)),
        BLOCK_TYPE_ROOT_TEXT => Ok(Block::RootText(RootTextBlock::from_stream(reader)?)),
        BLOCK_TYPE_SCENE_TOMBSTONE_ITEM => Ok(Block::SceneTombstoneItem(SceneItemRecord::from_stream(
            reader,
            scene_item::ITEM_TYPE_TOMBSTONE,
            |_reader| Ok(()),
        )?)),
        BLOCK_TYPE_AUTHOR_IDS => Ok(Block::AuthorIds(AuthorIdsBlock::from_stream(reader)?)),
        BLOCK_TYPE_PAGE_INFO => Ok(Block::PageInfo(PageInfoBlock::from_stream(reader)?)),
        BLOCK_TYPE_SCENE_INFO => Ok(Block::SceneInfo(SceneInfoBlock::from_stream(reader)?)),
        other => Err(crate::error::Error::Value(format!(
            "unknown block type {}",
            other
        ))),
    }
}

/// Read every top-level block from `reader` until clean end of stream.
///
/// A block whose type is unrecognised, or whose body fails to parse, is
/// recovered as an [`UnreadableBlock`] rather than aborting the whole read:
/// position is rewound to the block's start and its raw bytes are kept
/// verbatim, so a subsequent write reproduces the file byte-for-byte even
/// for content this crate doesn't understand.
pub fn read_blocks(reader: &mut TaggedBlockReader) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    while let Some(mut info) = reader.begin_block()? {
        let result = dispatch_from_stream(reader, info.block_type, info.current_version);
        let mut block = match result {
            Ok(block) => block,
            Err(e) => {
                reader.seek_to(info.offset);
                let data = reader.read_raw_bytes(info.size as usize)?;
                Block::Unreadable(UnreadableBlock {
                    block_type: info.block_type,
                    min_version: info.min_version,
                    current_version: info.current_version,
                    data,
                    error: e.to_string(),
                })
            }
        };
        reader.end_block(&mut info)?;
        block.set_extra_data(info.extra_data);
        blocks.push(block);
    }
    Ok(blocks)
}

fn write_block_body(writer: &mut TaggedBlockWriter, block: &Block) -> Result<()> {
    match block {
        Block::MigrationInfo(b) => b.to_stream(writer),
        Block::SceneTree(b) => b.to_stream(writer),
        Block::TreeNode(b) => b.to_stream(writer),
        Block::SceneGlyphItem(record) => {
            record.to_stream(writer, scene_item::ITEM_TYPE_GLYPH, glyph::value_to_stream)
        }
        Block::SceneGroupItem(record) => record.to_stream(
            writer,
            scene_item::ITEM_TYPE_GROUP,
            |writer, value| writer.write_id(2, *value),
        ),
        Block::SceneLineItem(record) => {
            let point_version = line::point_version_for_write(&writer.options);
            record.to_stream(writer, scene_item::ITEM_TYPE_LINE, |writer, value| {
                line::value_to_stream(writer, value, point_version)
            })
        }
        Block::SceneTextItem(record) => {
            record.to_stream(writer, scene_item::ITEM_TYPE_TEXT, |_writer, _value| Ok(()))
        }
        Block::RootText(b) => b.to_stream(writer),
        Block::SceneTombstoneItem(record) => {
            record.to_stream(writer, scene_item::ITEM_TYPE_TOMBSTONE, |_writer, _value| Ok(()))
        }
        Block::AuthorIds(b) => b.to_stream(writer),
        Block::PageInfo(b) => b.to_stream(writer),
        Block::SceneInfo(b) => b.to_stream(writer),
        Block::Unreadable(b) => writer.write_raw_bytes(&b.data),
    }
}

fn version_info_for(block: &Block, options: &WriteOptions) -> (u8, u8) {
    match block {
        Block::MigrationInfo(_) => MigrationInfoBlock::version_info(options),
        Block::SceneTree(_) => SceneTreeBlock::version_info(options),
        Block::TreeNode(_) => TreeNodeBlock::version_info(options),
        Block::SceneGlyphItem(_) => (1, 1),
        Block::SceneGroupItem(_) => (1, 1),
        Block::SceneLineItem(_) => line::version_info(options),
        Block::SceneTextItem(_) => (1, 1),
        Block::RootText(_) => RootTextBlock::version_info(options),
        Block::SceneTombstoneItem(_) => (1, 1),
        Block::AuthorIds(_) => AuthorIdsBlock::version_info(options),
        Block::PageInfo(_) => PageInfoBlock::version_info(options),
        Block::SceneInfo(_) => SceneInfoBlock::version_info(options),
        Block::Unreadable(b) => (b.min_version, b.current_version),
    }
}

/// Write every block in `blocks` in order, each as its own length-prefixed
/// top-level block frame. Any bytes the block carried as unread "extra data"
/// from when it was read are appended after its own fields, so a read-then-
/// write round-trips the block's declared length exactly.
pub fn write_blocks(writer: &mut TaggedBlockWriter, blocks: &[Block]) -> Result<()> {
    for block in blocks {
        let (min_version, current_version) = version_info_for(block, &writer.options);
        let block_type = block.block_type();
        writer.write_block(block_type, min_version, current_version, |writer| {
            write_block_body(writer, block)?;
            writer.write_extra_data(block.extra_data())
        })?;
    }
    Ok(())
}
