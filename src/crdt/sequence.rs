//! The CRDT sequence model: reconstructing a total order for concurrently
//! inserted items from pairwise left/right neighbor hints.
//!
//! Each item in the sequence names the item it thinks comes immediately
//! before it (`left_id`) and after it (`right_id`). Because inserts can
//! happen concurrently on different devices before a sync, these hints
//! don't always agree with each other; the order is reconstructed by
//! topologically sorting the hints (`left -> item -> right` edges), with
//! ties between items that could go in either order broken by comparing
//! `CrdtId`s directly. This mirrors the Logoot/RGA family of sequence CRDTs.

use std::collections::{BTreeSet, HashMap};

use crate::error::{Error, Result};
use crate::tagged::common::CrdtId;

/// One item in a CRDT sequence, as stored on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct CrdtSequenceItem<V> {
    pub item_id: CrdtId,
    /// The item this one was inserted after, or `None` for the sequence start.
    pub left_id: Option<CrdtId>,
    /// The item this one was inserted before, or `None` for the sequence end.
    pub right_id: Option<CrdtId>,
    /// Non-zero marks this item (and the `deleted_length - 1` items after
    /// it, for run-length-encoded tombstones) as removed.
    pub deleted_length: u32,
    pub value: V,
}

impl<V> CrdtSequenceItem<V> {
    pub fn is_deleted(&self) -> bool {
        self.deleted_length > 0
    }

    /// Map the value, keeping id/neighbor/deletion metadata unchanged.
    pub fn map_value<W>(self, f: impl FnOnce(V) -> W) -> CrdtSequenceItem<W> {
        CrdtSequenceItem {
            item_id: self.item_id,
            left_id: self.left_id,
            right_id: self.right_id,
            deleted_length: self.deleted_length,
            value: f(self.value),
        }
    }
}

/// A node in the dependency graph used to order items: either a real item,
/// or one of the two sentinels for "before everything" / "after everything".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NodeKey {
    Start,
    Id(CrdtId),
    End,
}

impl PartialOrd for NodeKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering::*;
        use NodeKey::*;
        match (self, other) {
            (Start, Start) => Equal,
            (Start, _) => Less,
            (_, Start) => Greater,
            (End, End) => Equal,
            (End, _) => Greater,
            (_, End) => Less,
            (Id(a), Id(b)) => a.cmp(b),
        }
    }
}

/// Topologically sort `items` by their left/right hints and return the ids
/// in sequence order. A `right_id` that names an id outside `items` (the
/// referenced item was deleted or never synced) is tolerated without any
/// special case: it becomes an extra graph node that the final filter to
/// `items`' own ids drops silently.
pub fn toposort<V>(items: &[CrdtSequenceItem<V>]) -> Result<Vec<CrdtId>> {
    let item_ids: std::collections::HashSet<CrdtId> =
        items.iter().map(|i| i.item_id).collect();

    let mut successors: HashMap<NodeKey, BTreeSet<NodeKey>> = HashMap::new();
    let mut indegree: HashMap<NodeKey, usize> = HashMap::new();

    let touch = |indegree: &mut HashMap<NodeKey, usize>, k: NodeKey| {
        indegree.entry(k).or_insert(0);
    };
    touch(&mut indegree, NodeKey::Start);
    touch(&mut indegree, NodeKey::End);

    let add_edge = |successors: &mut HashMap<NodeKey, BTreeSet<NodeKey>>,
                    indegree: &mut HashMap<NodeKey, usize>,
                    from: NodeKey,
                    to: NodeKey| {
        indegree.entry(from).or_insert(0);
        indegree.entry(to).or_insert(0);
        if successors.entry(from).or_default().insert(to) {
            *indegree.entry(to).or_insert(0) += 1;
        }
    };

    for item in items {
        let this = NodeKey::Id(item.item_id);
        let left = item.left_id.map(NodeKey::Id).unwrap_or(NodeKey::Start);
        let right = item.right_id.map(NodeKey::Id).unwrap_or(NodeKey::End);
        touch(&mut indegree, this);
        add_edge(&mut successors, &mut indegree, left, this);
        add_edge(&mut successors, &mut indegree, this, right);
    }

    let total_nodes = indegree.len();
    let mut remaining = indegree;
    let mut layer: Vec<NodeKey> = remaining
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(k, _)| *k)
        .collect();

    // Process one full zero-indegree layer at a time, sorting ties within the
    // layer before emitting it, and only then decrementing successors for the
    // *whole* layer to compute the next one. A single-pop Kahn's algorithm
    // would let an item becoming ready mid-layer (because its own left
    // neighbor was just emitted) jump ahead of a sibling still waiting in the
    // same layer, which disagrees with concurrent-insert ordering.
    let mut order = Vec::with_capacity(total_nodes);
    while !layer.is_empty() {
        layer.sort_unstable();
        let mut decrements: HashMap<NodeKey, usize> = HashMap::new();
        for &node in &layer {
            order.push(node);
            if let Some(succs) = successors.get(&node) {
                for &s in succs {
                    *decrements.entry(s).or_insert(0) += 1;
                }
            }
        }
        let mut next_layer = Vec::new();
        for (node, dec) in decrements {
            if let Some(d) = remaining.get_mut(&node) {
                *d -= dec;
                if *d == 0 {
                    next_layer.push(node);
                }
            }
        }
        layer = next_layer;
    }

    if order.len() != total_nodes {
        return Err(Error::Cyclic(
            "left/right neighbor hints form a cycle instead of a sequence".into(),
        ));
    }

    Ok(order
        .into_iter()
        .filter_map(|k| match k {
            NodeKey::Id(id) if item_ids.contains(&id) => Some(id),
            _ => None,
        })
        .collect())
}

/// An ordered, author-mergeable sequence: the wire-order items plus the
/// total order reconstructed from their hints.
#[derive(Debug, Clone, Default)]
pub struct CrdtSequence<V> {
    items: HashMap<CrdtId, CrdtSequenceItem<V>>,
}

impl<V> CrdtSequence<V> {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    pub fn insert(&mut self, item: CrdtSequenceItem<V>) {
        self.items.insert(item.item_id, item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: CrdtId) -> Option<&CrdtSequenceItem<V>> {
        self.items.get(&id)
    }

    /// Ids in reconstructed sequence order, including deleted ones.
    pub fn ordered_ids(&self) -> Result<Vec<CrdtId>> {
        let items: Vec<&CrdtSequenceItem<V>> = self.items.values().collect();
        let refs: Vec<CrdtSequenceItemRef> = items
            .iter()
            .map(|i| CrdtSequenceItemRef {
                item_id: i.item_id,
                left_id: i.left_id,
                right_id: i.right_id,
            })
            .collect();
        toposort_refs(&refs)
    }

    /// Non-deleted values, in sequence order.
    pub fn values_in_order(&self) -> Result<Vec<&V>> {
        Ok(self
            .ordered_ids()?
            .into_iter()
            .filter_map(|id| self.items.get(&id))
            .filter(|item| !item.is_deleted())
            .map(|item| &item.value)
            .collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CrdtSequenceItem<V>> {
        self.items.values()
    }

    /// `right_id`s that name an id not present in this sequence — a neighbor
    /// that was never synced or has since been dropped. `toposort` tolerates
    /// these silently when reconstructing order; this lets a caller that
    /// wants to report them find out which ids they were.
    pub fn dangling_right_ids(&self) -> Vec<CrdtId> {
        self.items
            .values()
            .filter_map(|item| item.right_id)
            .filter(|id| !self.items.contains_key(id))
            .collect()
    }
}

// `toposort` is generic over the item's value type, but `ordered_ids` only
// needs the id/left/right triple; this lightweight shadow avoids requiring
// `V: Clone` just to compute an order.
struct CrdtSequenceItemRef {
    item_id: CrdtId,
    left_id: Option<CrdtId>,
    right_id: Option<CrdtId>,
}

fn toposort_refs(items: &[CrdtSequenceItemRef]) -> Result<Vec<CrdtId>> {
    let wrapped: Vec<CrdtSequenceItem<()>> = items
        .iter()
        .map(|i| CrdtSequenceItem {
            item_id: i.item_id,
            left_id: i.left_id,
            right_id: i.right_id,
            deleted_length: 0,
            value: (),
        })
        .collect();
    toposort(&wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64, left: Option<u64>, right: Option<u64>) -> CrdtSequenceItem<char> {
        CrdtSequenceItem {
            item_id: CrdtId::new(1, id),
            left_id: left.map(|v| CrdtId::new(1, v)),
            right_id: right.map(|v| CrdtId::new(1, v)),
            deleted_length: 0,
            value: 'x',
        }
    }

    #[test]
    fn test_linear_chain_orders_in_sequence() {
        let items = vec![
            item(1, None, Some(2)),
            item(2, Some(1), Some(3)),
            item(3, Some(2), None),
        ];
        let order = toposort(&items).unwrap();
        assert_eq!(
            order,
            vec![CrdtId::new(1, 1), CrdtId::new(1, 2), CrdtId::new(1, 3)]
        );
    }

    #[test]
    fn test_dangling_right_id_is_tolerated() {
        let items = vec![item(1, None, Some(99)), item(2, Some(1), None)];
        let order = toposort(&items).unwrap();
        assert_eq!(order, vec![CrdtId::new(1, 1), CrdtId::new(1, 2)]);
    }

    #[test]
    fn test_concurrent_inserts_break_ties_by_id() {
        // both items claim to be right after the start with no right hint;
        // the lower CrdtId wins the tie.
        let items = vec![item(5, None, None), item(2, None, None)];
        let order = toposort(&items).unwrap();
        assert_eq!(order, vec![CrdtId::new(1, 2), CrdtId::new(1, 5)]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let items = vec![item(1, Some(2), None), item(2, Some(1), None)];
        assert!(toposort(&items).is_err());
    }

    #[test]
    fn test_sequence_values_in_order_skip_deleted() {
        let mut seq = CrdtSequence::new();
        seq.insert(item(1, None, Some(2)));
        let mut middle = item(2, Some(1), Some(3));
        middle.deleted_length = 1;
        seq.insert(middle);
        seq.insert(item(3, Some(2), None));
        let values = seq.values_in_order().unwrap();
        assert_eq!(values, vec![&'x', &'x']);
    }
}
