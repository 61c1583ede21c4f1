//! The scene tree: a forest of groups rooted at a well-known id, whose
//! leaves are the strokes, highlighter ranges, and text markers making up
//! one page.

use indexmap::IndexMap;

use crate::blocks::Block;
use crate::crdt::CrdtSequenceItem;
use crate::diagnostics::{NotificationCollection, NotificationType};
use crate::error::{Error, Result};
use crate::scene::items::{Group, SceneItem};
use crate::tagged::common::CrdtId;

/// The complete scene for one page.
#[derive(Debug, Clone)]
pub struct SceneTree {
    pub nodes: IndexMap<CrdtId, Group>,
    pub root_text: Option<crate::blocks::root_text::RootTextBlock>,
    diagnostics: NotificationCollection,
}

impl SceneTree {
    pub const ROOT_ID: CrdtId = CrdtId::ROOT;

    pub fn new() -> Self {
        let mut nodes = IndexMap::new();
        nodes.insert(Self::ROOT_ID, Group::new(Self::ROOT_ID));
        Self {
            nodes,
            root_text: None,
            diagnostics: NotificationCollection::new(),
        }
    }

    /// Notifications recorded while the tree was built, e.g. a child item
    /// whose `right_id` names a neighbor that was never synced.
    pub fn diagnostics(&self) -> &NotificationCollection {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> NotificationCollection {
        self.diagnostics
    }

    pub fn root(&self) -> &Group {
        self.nodes.get(&Self::ROOT_ID).expect("root always present")
    }

    pub fn add_node(&mut self, node_id: CrdtId) {
        self.nodes.entry(node_id).or_insert_with(|| Group::new(node_id));
    }

    pub fn add_item(
        &mut self,
        parent_id: CrdtId,
        item: CrdtSequenceItem<SceneItem>,
    ) -> Result<()> {
        self.add_node(parent_id);
        self.nodes
            .get_mut(&parent_id)
            .expect("just inserted")
            .children
            .insert(item);
        Ok(())
    }

    /// Walk every leaf item in tree order (children in each group's CRDT
    /// order, recursing into subgroups depth-first), yielding
    /// `(owning_group_id, item)` pairs. Deleted items are skipped.
    pub fn walk(&self) -> Result<Vec<(CrdtId, &SceneItem)>> {
        let mut out = Vec::new();
        self.walk_group(Self::ROOT_ID, &mut out)?;
        Ok(out)
    }

    fn walk_group<'a>(
        &'a self,
        group_id: CrdtId,
        out: &mut Vec<(CrdtId, &'a SceneItem)>,
    ) -> Result<()> {
        let group = self
            .nodes
            .get(&group_id)
            .ok_or_else(|| Error::NotFound(format!("group {} not in tree", group_id)))?;
        for item in group.children.values_in_order()? {
            match item {
                SceneItem::GroupRef(child_id) => self.walk_group(*child_id, out)?,
                other => out.push((group_id, other)),
            }
        }
        Ok(())
    }
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble a [`SceneTree`] from a flat block stream, attaching every scene
/// item block to its parent group and resolving subgroup references.
pub fn build_tree(blocks: &[Block]) -> Result<SceneTree> {
    let mut tree = SceneTree::new();

    for block in blocks {
        if let Block::TreeNode(node) = block {
            tree.add_node(node.group.node_id);
            tree.nodes.insert(node.group.node_id, node.group.clone());
        }
    }

    for block in blocks {
        match block {
            Block::SceneGroupItem(record) => {
                let item = record
                    .item
                    .clone()
                    .map_value(|v| v.map(SceneItem::GroupRef).unwrap_or(SceneItem::Tombstone));
                tree.add_item(record.parent_id, item)?;
            }
            Block::SceneLineItem(record) => {
                let item = record
                    .item
                    .clone()
                    .map_value(|v| v.map(SceneItem::Line).unwrap_or(SceneItem::Tombstone));
                tree.add_item(record.parent_id, item)?;
            }
            Block::SceneGlyphItem(record) => {
                let item = record
                    .item
                    .clone()
                    .map_value(|v| v.map(SceneItem::Glyph).unwrap_or(SceneItem::Tombstone));
                tree.add_item(record.parent_id, item)?;
            }
            Block::SceneTextItem(record) => {
                let item = record.item.clone().map_value(|_| SceneItem::Text);
                tree.add_item(record.parent_id, item)?;
            }
            Block::SceneTombstoneItem(record) => {
                let item = record.item.clone().map_value(|_| SceneItem::Tombstone);
                tree.add_item(record.parent_id, item)?;
            }
            Block::RootText(root_text) => {
                tree.root_text = Some(root_text.clone());
            }
            _ => {}
        }
    }

    for (group_id, group) in &tree.nodes {
        for dangling in group.children.dangling_right_ids() {
            tree.diagnostics.notify(
                NotificationType::DanglingSequenceLink,
                format!(
                    "item in group {} names right neighbor {} which was never synced",
                    group_id, dangling
                ),
            );
        }
    }

    Ok(tree)
}
