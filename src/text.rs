//! Turning a [`RootTextBlock`]'s raw CRDT character sequence into lines of
//! text, and building the minimal set of blocks needed to represent plain
//! text as a lines file.

use std::collections::HashMap;

use crate::blocks::root_text::{RootTextBlock, Text, TextItemValue};
use crate::blocks::{
    AuthorIdsBlock, Block, MigrationInfoBlock, PageInfoBlock, SceneItemRecord, SceneTreeBlock,
    TreeNodeBlock,
};
use crate::crdt::{CrdtSequence, CrdtSequenceItem};
use crate::diagnostics::{NotificationCollection, NotificationType};
use crate::error::Result;
use crate::scene::items::{Group, ParagraphStyle};
use crate::tagged::common::{CrdtId, LwwValue};

/// Inline text format codes embedded as zero-width items in the character
/// sequence, rather than as a separate style layer.
const START_BOLD: i32 = 1;
const END_BOLD: i32 = 2;
const START_ITALIC: i32 = 3;
const END_ITALIC: i32 = 4;

/// Wire identity for "no neighbor"/"end of sequence", reused here as the
/// fallback paragraph style lookup key for the page's very first paragraph.
const END_MARKER: CrdtId = CrdtId::new(0, 0);

/// Expand one (possibly multi-character) text item into single-character
/// items, each with an explicit id.
///
/// Only the first character of a run keeps its item's own id; the wire
/// format leaves the rest implicit, one counter tick apart, so this
/// reconstructs them the same way a `CrdtSequence` walk expects ids to
/// chain. A [`TextItemValue::FormatCode`] item carries no characters and is
/// returned unchanged.
pub fn expand_text_item(
    item: &CrdtSequenceItem<TextItemValue>,
) -> Vec<CrdtSequenceItem<TextItemValue>> {
    match &item.value {
        TextItemValue::FormatCode(_) => vec![item.clone()],
        TextItemValue::Text(text) if item.deleted_length > 0 => {
            debug_assert!(text.is_empty());
            expand_chars(item, vec![String::new(); item.deleted_length as usize], 1)
        }
        TextItemValue::Text(text) => {
            let chars: Vec<String> = text.chars().map(|c| c.to_string()).collect();
            if chars.is_empty() {
                return vec![item.clone()];
            }
            expand_chars(item, chars, 0)
        }
    }
}

fn expand_chars(
    item: &CrdtSequenceItem<TextItemValue>,
    chars: Vec<String>,
    deleted_length: u32,
) -> Vec<CrdtSequenceItem<TextItemValue>> {
    let mut out = Vec::with_capacity(chars.len());
    let mut item_id = item.item_id;
    let mut left_id = item.left_id;
    let last = chars.len() - 1;
    for c in &chars[..last] {
        let right_id = Some(CrdtId::new(item_id.author(), item_id.counter() + 1));
        out.push(CrdtSequenceItem {
            item_id,
            left_id,
            right_id,
            deleted_length,
            value: TextItemValue::Text(c.clone()),
        });
        left_id = Some(item_id);
        item_id = right_id.unwrap();
    }
    out.push(CrdtSequenceItem {
        item_id,
        left_id,
        right_id: item.right_id,
        deleted_length,
        value: TextItemValue::Text(chars[last].clone()),
    });
    out
}

/// Expand every item in a root text sequence into a per-character sequence.
pub fn expand_text_items(items: &CrdtSequence<TextItemValue>) -> CrdtSequence<TextItemValue> {
    let mut expanded = CrdtSequence::new();
    for item in items.iter() {
        for piece in expand_text_item(item) {
            expanded.insert(piece);
        }
    }
    expanded
}

/// One line of the page's body text, together with the paragraph style that
/// applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub style: ParagraphStyle,
    pub text: String,
}

/// Split a [`Text`] value into lines, applying each line's paragraph style.
///
/// A style recorded against a character id takes effect starting at that
/// character; per the wire format this is only meant to apply at the start
/// of a line; a style landing mid-line is kept (it becomes the new
/// "current" style) but would not reproduce through the reMarkable app.
pub fn extract_text_lines(text: &Text) -> crate::error::Result<Vec<TextLine>> {
    let default_style = text
        .styles
        .get(&END_MARKER)
        .map(|lww| lww.value)
        .unwrap_or_default();

    let expanded = expand_text_items(&text.items);
    let mut lines = Vec::new();
    let mut current_style = default_style;
    let mut current_line = String::new();

    for id in expanded.ordered_ids()? {
        let item = match expanded.get(id) {
            Some(item) => item,
            None => continue,
        };
        let ch = match &item.value {
            TextItemValue::Text(s) => s.as_str(),
            TextItemValue::FormatCode(_) => "",
        };
        if ch == "\n" {
            lines.push(TextLine {
                style: current_style,
                text: std::mem::take(&mut current_line),
            });
            current_style = ParagraphStyle::default();
        } else {
            current_line.push_str(ch);
        }
        if let Some(lww) = text.styles.get(&id) {
            current_style = lww.value;
        }
    }
    lines.push(TextLine {
        style: current_style,
        text: current_line,
    });
    Ok(lines)
}

/// Whether inline text is bold, tracked by a pair of zero-width markers
/// bracketing the affected run rather than a per-character flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Whether inline text is italic, tracked the same way as [`FontWeight`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// The inline formatting state in effect at some point in the character
/// sequence: both axes default to normal and are toggled independently by
/// `START_BOLD`/`END_BOLD`/`START_ITALIC`/`END_ITALIC` marker items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextProperties {
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
}

impl TextProperties {
    fn apply_format_code(&mut self, code: i32, diagnostics: &mut NotificationCollection) {
        match code {
            START_BOLD => self.font_weight = FontWeight::Bold,
            END_BOLD => self.font_weight = FontWeight::Normal,
            START_ITALIC => self.font_style = FontStyle::Italic,
            END_ITALIC => self.font_style = FontStyle::Normal,
            // Unrecognised codes are ignored rather than rejected, same
            // tolerance the block layer gives unknown block types.
            other => {
                diagnostics.notify(
                    NotificationType::UnknownFormatCode,
                    format!("unrecognised inline format code {}", other),
                );
            }
        }
    }
}

/// A maximal run of characters sharing the same [`TextProperties`], with the
/// id of each contributing character kept so the run can be mapped back to
/// positions in the original CRDT sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct CrdtStr {
    pub text: String,
    pub ids: Vec<CrdtId>,
    pub properties: TextProperties,
}

/// One paragraph of body text: the runs making it up, and the id marking
/// where it starts (the previous newline's id, or the end-marker for the
/// document's first paragraph) — the same id [`Text::styles`] keys its
/// per-paragraph [`ParagraphStyle`] overrides by.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub contents: Vec<CrdtStr>,
    pub start_id: CrdtId,
}

/// The page's body text, reconstructed as paragraphs of formatted runs
/// rather than the flat CRDT sequence it's stored as on the wire.
#[derive(Debug, Clone)]
pub struct TextDocument {
    pub contents: Vec<Paragraph>,
    styles: HashMap<CrdtId, LwwValue<ParagraphStyle>>,
    diagnostics: NotificationCollection,
}

impl TextDocument {
    /// Notifications recorded while the document was built, e.g. an
    /// unrecognised inline format code.
    pub fn diagnostics(&self) -> &NotificationCollection {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> NotificationCollection {
        self.diagnostics
    }

    /// Expand and walk a root text value's character sequence, grouping runs
    /// by inline formatting and splitting on newlines into paragraphs.
    pub fn from_scene_item(text: &Text) -> Result<Self> {
        let expanded = expand_text_items(&text.items);
        let ordered_ids = expanded.ordered_ids()?;

        let mut paragraphs = Vec::new();
        let mut current_start_id = END_MARKER;
        let mut current_contents: Vec<CrdtStr> = Vec::new();
        let mut current_run: Option<CrdtStr> = None;
        let mut properties = TextProperties::default();
        let mut diagnostics = NotificationCollection::new();

        fn flush_run(current_run: &mut Option<CrdtStr>, contents: &mut Vec<CrdtStr>) {
            if let Some(run) = current_run.take() {
                if !run.text.is_empty() {
                    contents.push(run);
                }
            }
        }

        for id in ordered_ids {
            let item = match expanded.get(id) {
                Some(item) => item,
                None => continue,
            };
            match &item.value {
                TextItemValue::FormatCode(code) => {
                    properties.apply_format_code(*code, &mut diagnostics);
                    flush_run(&mut current_run, &mut current_contents);
                }
                TextItemValue::Text(s) if s == "\n" => {
                    flush_run(&mut current_run, &mut current_contents);
                    paragraphs.push(Paragraph {
                        contents: std::mem::take(&mut current_contents),
                        start_id: current_start_id,
                    });
                    current_start_id = id;
                }
                TextItemValue::Text(s) => {
                    if s.is_empty() {
                        continue;
                    }
                    match &mut current_run {
                        Some(run) if run.properties == properties => {
                            run.text.push_str(s);
                            run.ids.push(id);
                        }
                        _ => {
                            flush_run(&mut current_run, &mut current_contents);
                            current_run = Some(CrdtStr {
                                text: s.clone(),
                                ids: vec![id],
                                properties,
                            });
                        }
                    }
                }
            }
        }
        flush_run(&mut current_run, &mut current_contents);
        paragraphs.push(Paragraph {
            contents: current_contents,
            start_id: current_start_id,
        });

        Ok(Self {
            contents: paragraphs,
            styles: text.styles.clone(),
            diagnostics,
        })
    }

    /// Flatten each paragraph to its plain text, paired with its resolved
    /// paragraph style (falling back to [`ParagraphStyle::Plain`] when no
    /// override is recorded for that paragraph's start id).
    pub fn lines(&self) -> Vec<(ParagraphStyle, String)> {
        self.contents
            .iter()
            .map(|p| {
                let style = self
                    .styles
                    .get(&p.start_id)
                    .map(|lww| lww.value)
                    .unwrap_or_default();
                let text = p.contents.iter().map(|r| r.text.as_str()).collect();
                (style, text)
            })
            .collect()
    }
}

/// Build the minimal set of blocks needed to represent `text` as a single
/// unstyled page of plain text: author table, migration marker, page
/// counters, an empty layer group, and the body text itself.
pub fn simple_text_document(text: &str, author_uuid: uuid::Uuid) -> Vec<Block> {
    let mut author_uuids = indexmap::IndexMap::new();
    author_uuids.insert(1u16, author_uuid);

    let mut blocks = vec![
        Block::AuthorIds(AuthorIdsBlock {
            author_uuids,
            extra_data: Vec::new(),
        }),
        Block::MigrationInfo(MigrationInfoBlock {
            migration_id: CrdtId::new(1, 1),
            is_device: true,
            unknown: false,
            extra_data: Vec::new(),
        }),
        Block::PageInfo(PageInfoBlock {
            loads_count: 1,
            merges_count: 0,
            text_chars_count: text.chars().count() as i32 + 1,
            text_lines_count: text.matches('\n').count() as i32 + 1,
            type_folio_use_count: 0,
            extra_data: Vec::new(),
        }),
        Block::SceneTree(SceneTreeBlock {
            tree_id: CrdtId::new(0, 11),
            node_id: CrdtId::new(0, 0),
            is_update: true,
            parent_id: CrdtId::new(0, 1),
            extra_data: Vec::new(),
        }),
    ];

    let mut items = CrdtSequence::new();
    items.insert(CrdtSequenceItem {
        item_id: CrdtId::new(1, 16),
        left_id: None,
        right_id: None,
        deleted_length: 0,
        value: TextItemValue::Text(text.to_string()),
    });
    let mut styles = std::collections::HashMap::new();
    styles.insert(
        END_MARKER,
        LwwValue::new(CrdtId::new(1, 15), ParagraphStyle::Plain),
    );
    blocks.push(Block::RootText(RootTextBlock {
        block_id: END_MARKER,
        value: Text {
            items,
            styles,
            pos_x: -468.0,
            pos_y: 234.0,
            width: 936.0,
        },
        extra_data: Vec::new(),
    }));

    let mut root_group = Group::new(CrdtId::new(0, 1));
    root_group.label = LwwValue::new(END_MARKER, String::new());
    blocks.push(Block::TreeNode(TreeNodeBlock {
        group: root_group,
        extra_data: Vec::new(),
    }));

    let mut layer_group = Group::new(CrdtId::new(0, 11));
    layer_group.label = LwwValue::new(CrdtId::new(0, 12), "Layer 1".to_string());
    blocks.push(Block::TreeNode(TreeNodeBlock {
        group: layer_group,
        extra_data: Vec::new(),
    }));

    blocks.push(Block::SceneGroupItem(SceneItemRecord {
        parent_id: CrdtId::new(0, 1),
        item: CrdtSequenceItem {
            item_id: CrdtId::new(0, 13),
            left_id: None,
            right_id: None,
            deleted_length: 0,
            value: Some(CrdtId::new(0, 11)),
        },
        extra_value_data: Vec::new(),
        extra_data: Vec::new(),
    }));

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_item(
        author: u8,
        counter: u64,
        left: Option<(u8, u64)>,
        right: Option<(u8, u64)>,
        value: &str,
    ) -> CrdtSequenceItem<TextItemValue> {
        CrdtSequenceItem {
            item_id: CrdtId::new(author, counter),
            left_id: left.map(|(a, c)| CrdtId::new(a, c)),
            right_id: right.map(|(a, c)| CrdtId::new(a, c)),
            deleted_length: 0,
            value: TextItemValue::Text(value.to_string()),
        }
    }

    #[test]
    fn test_expand_multi_char_item_chains_ids() {
        let item = text_item(1, 16, None, None, "ab");
        let expanded = expand_text_item(&item);
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].item_id, CrdtId::new(1, 16));
        assert_eq!(expanded[0].right_id, Some(CrdtId::new(1, 17)));
        assert_eq!(expanded[1].item_id, CrdtId::new(1, 17));
        assert_eq!(expanded[1].left_id, Some(CrdtId::new(1, 16)));
        assert_eq!(expanded[1].right_id, None);
    }

    #[test]
    fn test_expand_deleted_run_produces_empty_chars() {
        let mut item = text_item(1, 1, None, None, "");
        item.deleted_length = 3;
        let expanded = expand_text_item(&item);
        assert_eq!(expanded.len(), 3);
        assert!(expanded.iter().all(|i| i.deleted_length == 1));
    }

    #[test]
    fn test_extract_lines_splits_on_newline_and_applies_style() {
        let mut items = CrdtSequence::new();
        items.insert(text_item(1, 1, None, None, "ab\ncd"));
        let mut styles = std::collections::HashMap::new();
        styles.insert(
            CrdtId::new(1, 4),
            LwwValue::new(CrdtId::new(1, 100), ParagraphStyle::Heading),
        );
        let text = Text {
            items,
            styles,
            pos_x: 0.0,
            pos_y: 0.0,
            width: 100.0,
        };
        let lines = extract_text_lines(&text).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "ab");
        assert_eq!(lines[0].style, ParagraphStyle::Plain);
        assert_eq!(lines[1].text, "cd");
        assert_eq!(lines[1].style, ParagraphStyle::Heading);
    }

    #[test]
    fn test_simple_text_document_roundtrips_through_writer() {
        use crate::options::WriteOptions;
        use crate::stream::StreamReader;
        use crate::tagged::{TaggedBlockReader, TaggedBlockWriter};

        let author = uuid::Uuid::new_v4();
        let blocks = simple_text_document("hello\nworld", author);
        assert_eq!(blocks.len(), 7);

        let mut w = TaggedBlockWriter::new(WriteOptions::default());
        crate::blocks::write_blocks(&mut w, &blocks).unwrap();
        let bytes = w.into_bytes();
        let mut r = TaggedBlockReader::new(StreamReader::new(bytes));
        let read_back = crate::blocks::read_blocks(&mut r).unwrap();
        assert_eq!(read_back.len(), blocks.len());
    }

    fn format_item(id: u64, left: u64, right: u64, code: i32) -> CrdtSequenceItem<TextItemValue> {
        CrdtSequenceItem {
            item_id: CrdtId::new(1, id),
            left_id: Some(CrdtId::new(1, left)).filter(|_| left != 0),
            right_id: Some(CrdtId::new(1, right)).filter(|_| right != 0),
            deleted_length: 0,
            value: TextItemValue::FormatCode(code),
        }
    }

    #[test]
    fn test_text_document_bold_italic_interleaved_over_paragraphs() {
        let mut items = CrdtSequence::new();
        items.insert(text_item(1, 20, None, None, "ABC\nDEF"));
        items.insert(format_item(30, 20, 21, START_ITALIC));
        items.insert(format_item(31, 21, 22, START_BOLD));
        items.insert(format_item(32, 24, 25, END_ITALIC));
        items.insert(format_item(33, 25, 26, END_BOLD));

        let text = Text {
            items,
            styles: HashMap::new(),
            pos_x: 0.0,
            pos_y: 0.0,
            width: 0.0,
        };
        let doc = TextDocument::from_scene_item(&text).unwrap();

        assert_eq!(doc.contents.len(), 2);

        let p1 = &doc.contents[0];
        assert_eq!(p1.start_id, CrdtId::new(0, 0));
        assert_eq!(
            p1.contents,
            vec![
                CrdtStr {
                    text: "A".into(),
                    ids: vec![CrdtId::new(1, 20)],
                    properties: TextProperties::default(),
                },
                CrdtStr {
                    text: "B".into(),
                    ids: vec![CrdtId::new(1, 21)],
                    properties: TextProperties {
                        font_weight: FontWeight::Normal,
                        font_style: FontStyle::Italic,
                    },
                },
                CrdtStr {
                    text: "C".into(),
                    ids: vec![CrdtId::new(1, 22)],
                    properties: TextProperties {
                        font_weight: FontWeight::Bold,
                        font_style: FontStyle::Italic,
                    },
                },
            ]
        );

        let p2 = &doc.contents[1];
        assert_eq!(p2.start_id, CrdtId::new(1, 23));
        assert_eq!(
            p2.contents,
            vec![
                CrdtStr {
                    text: "D".into(),
                    ids: vec![CrdtId::new(1, 24)],
                    properties: TextProperties {
                        font_weight: FontWeight::Bold,
                        font_style: FontStyle::Italic,
                    },
                },
                CrdtStr {
                    text: "E".into(),
                    ids: vec![CrdtId::new(1, 25)],
                    properties: TextProperties {
                        font_weight: FontWeight::Bold,
                        font_style: FontStyle::Normal,
                    },
                },
                CrdtStr {
                    text: "F".into(),
                    ids: vec![CrdtId::new(1, 26)],
                    properties: TextProperties::default(),
                },
            ]
        );
    }

    #[test]
    fn test_text_document_lines_resolves_paragraph_style() {
        let mut items = CrdtSequence::new();
        items.insert(text_item(1, 1, None, None, "ab\ncd"));
        let mut styles = HashMap::new();
        // CrdtId(1, 3) is the "\n" character's own id (a=1, b=2, \n=3); a
        // paragraph's start_id is always the id of the newline before it.
        styles.insert(
            CrdtId::new(1, 3),
            LwwValue::new(CrdtId::new(1, 100), ParagraphStyle::Heading),
        );
        let text = Text {
            items,
            styles,
            pos_x: 0.0,
            pos_y: 0.0,
            width: 0.0,
        };
        let doc = TextDocument::from_scene_item(&text).unwrap();
        let lines = doc.lines();
        assert_eq!(
            lines,
            vec![
                (ParagraphStyle::Plain, "ab".to_string()),
                (ParagraphStyle::Heading, "cd".to_string()),
            ]
        );
    }

    #[test]
    fn test_unrecognised_format_code_is_notified_not_rejected() {
        use crate::diagnostics::NotificationType;

        let mut items = CrdtSequence::new();
        items.insert(text_item(1, 1, None, None, "a"));
        items.insert(format_item(2, 1, 0, 99));
        let text = Text {
            items,
            styles: HashMap::new(),
            pos_x: 0.0,
            pos_y: 0.0,
            width: 0.0,
        };
        let doc = TextDocument::from_scene_item(&text).unwrap();
        assert!(doc.diagnostics().has_type(NotificationType::UnknownFormatCode));
        assert_eq!(doc.contents[0].contents[0].text, "a");
    }
}
