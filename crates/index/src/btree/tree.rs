//! B+Tree implementation.

use super::node::{Node, NodeId};
use crate::traits::{Index, KeyRange, RangeIndex};
use alloc::vec::Vec;
use tabula_core::RowId;

/// Default order (branching factor) for the B+Tree.
/// Sized for L1 cache (64 keys * 8 bytes = 512 bytes per node).
pub const DEFAULT_ORDER: usize = 64;

/// Smallest order for which borrow and merge keep every leaf non-empty.
const MIN_ORDER: usize = 4;

/// A non-unique B+Tree index from field value to row ids.
#[derive(Clone, Debug)]
pub struct BTreeIndex<K> {
    /// Arena of all nodes. Nodes unlinked by merges stay allocated until `clear`.
    arena: Vec<Node<K>>,
    root: NodeId,
    /// Maximum number of keys per node.
    order: usize,
    /// Number of (key, row) entries.
    len: usize,
}

impl<K: Clone + Ord> Default for BTreeIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Ord> BTreeIndex<K> {
    /// Creates an empty index with the default order.
    pub fn new() -> Self {
        Self::with_order(DEFAULT_ORDER)
    }

    /// Creates an empty index with the given order (at least 4).
    pub fn with_order(order: usize) -> Self {
        let mut arena = Vec::new();
        let root = Self::alloc_node(&mut arena, Node::new_leaf());
        Self {
            arena,
            root,
            order: order.max(MIN_ORDER),
            len: 0,
        }
    }

    /// Returns the order of this tree.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Inserts many entries, sorting them by key first so each leaf is
    /// filled left to right. Rows sharing a key keep their input order.
    pub fn bulk_insert<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, RowId)>,
    {
        let mut entries: Vec<(K, RowId)> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, row) in entries {
            self.insert_entry(key, row);
        }
    }

    /// Returns the rows for every key in `range`, ascending by key.
    pub fn search_range(&self, range: &KeyRange<K>) -> Vec<RowId> {
        self.get_range(Some(range), false, None, 0)
    }

    /// Iterates `(key, rows)` entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[RowId])> + '_ {
        let mut current = Some(self.leftmost_leaf()).filter(|&id| !self.arena[id].is_empty());
        let mut pos = 0;
        core::iter::from_fn(move || {
            let node_id = current?;
            let node = &self.arena[node_id];
            let item = (&node.keys[pos], node.values[pos].as_slice());
            pos += 1;
            if pos >= node.key_count() {
                current = node.next;
                pos = 0;
            }
            Some(item)
        })
    }

    /// Returns the height of the tree (1 for a lone leaf).
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while !self.arena[current].is_leaf {
            current = self.arena[current].children[0];
            height += 1;
        }
        height
    }

    fn alloc_node(arena: &mut Vec<Node<K>>, node: Node<K>) -> NodeId {
        let id = arena.len();
        arena.push(node);
        id
    }

    /// Finds the leaf that holds (or would hold) `key`.
    fn find_leaf(&self, key: &K) -> NodeId {
        let mut current = self.root;
        loop {
            let node = &self.arena[current];
            if node.is_leaf {
                return current;
            }
            current = node.children[Self::child_position(node, key)];
        }
    }

    /// Child to descend into: keys equal to a separator live on its right.
    #[inline]
    fn child_position(node: &Node<K>, key: &K) -> usize {
        node.upper_position(key)
            .min(node.children.len().saturating_sub(1))
    }

    fn insert_entry(&mut self, key: K, row: RowId) {
        let leaf_id = self.find_leaf(&key);
        let pos = self.arena[leaf_id].lower_position(&key);
        self.arena[leaf_id].insert_at(pos, key, row);
        self.len += 1;

        if self.arena[leaf_id].key_count() >= self.order {
            self.split_leaf(leaf_id);
        }
    }

    fn split_leaf(&mut self, leaf_id: NodeId) {
        let mid = self.arena[leaf_id].key_count() / 2;

        let mut new_leaf = Node::new_leaf();
        new_leaf.keys = self.arena[leaf_id].keys.split_off(mid);
        new_leaf.values = self.arena[leaf_id].values.split_off(mid);
        new_leaf.next = self.arena[leaf_id].next;
        new_leaf.prev = Some(leaf_id);
        new_leaf.parent = self.arena[leaf_id].parent;
        let promote_key = new_leaf.keys[0].clone();

        let new_leaf_id = Self::alloc_node(&mut self.arena, new_leaf);
        if let Some(next_id) = self.arena[leaf_id].next {
            self.arena[next_id].prev = Some(new_leaf_id);
        }
        self.arena[leaf_id].next = Some(new_leaf_id);

        self.insert_into_parent(leaf_id, promote_key, new_leaf_id);
    }

    fn insert_into_parent(&mut self, left_id: NodeId, key: K, right_id: NodeId) {
        let Some(parent_id) = self.arena[left_id].parent else {
            let mut new_root = Node::new_internal();
            new_root.children.push(left_id);
            new_root.children.push(right_id);
            new_root.keys.push(key);

            let new_root_id = Self::alloc_node(&mut self.arena, new_root);
            self.arena[left_id].parent = Some(new_root_id);
            self.arena[right_id].parent = Some(new_root_id);
            self.root = new_root_id;
            return;
        };

        let pos = self.child_index(parent_id, left_id);
        self.arena[parent_id].keys.insert(pos, key);
        self.arena[parent_id].children.insert(pos + 1, right_id);
        self.arena[right_id].parent = Some(parent_id);

        if self.arena[parent_id].key_count() >= self.order {
            self.split_internal(parent_id);
        }
    }

    fn split_internal(&mut self, node_id: NodeId) {
        let mid = self.arena[node_id].key_count() / 2;
        let promote_key = self.arena[node_id].keys[mid].clone();

        let mut new_node = Node::new_internal();
        new_node.keys = self.arena[node_id].keys.split_off(mid + 1);
        new_node.children = self.arena[node_id].children.split_off(mid + 1);
        new_node.parent = self.arena[node_id].parent;
        // drop the promoted key from the left half
        self.arena[node_id].keys.pop();

        let new_node_id = Self::alloc_node(&mut self.arena, new_node);
        for i in 0..self.arena[new_node_id].children.len() {
            let child_id = self.arena[new_node_id].children[i];
            self.arena[child_id].parent = Some(new_node_id);
        }

        self.insert_into_parent(node_id, promote_key, new_node_id);
    }

    /// Index of `child_id` among its parent's children.
    fn child_index(&self, parent_id: NodeId, child_id: NodeId) -> usize {
        self.arena[parent_id]
            .children
            .iter()
            .position(|&c| c == child_id)
            .unwrap_or(0)
    }

    fn delete(&mut self, key: &K, row: Option<RowId>) -> usize {
        let leaf_id = self.find_leaf(key);
        let Some(pos) = self.arena[leaf_id].find_key(key) else {
            return 0;
        };

        let removed = self.arena[leaf_id].remove_at(pos, row);
        self.len -= removed;

        if self.arena[leaf_id].is_empty() && leaf_id != self.root {
            self.handle_underflow(leaf_id);
        }
        removed
    }

    /// Rebalances an emptied leaf or an underfull internal node by borrowing
    /// from a sibling, or merging with one when neither can spare a key.
    fn handle_underflow(&mut self, node_id: NodeId) {
        let Some(parent_id) = self.arena[node_id].parent else {
            return;
        };

        let min_keys = (self.order - 1) / 2;
        if self.arena[node_id].key_count() >= min_keys {
            return;
        }

        let pos = self.child_index(parent_id, node_id);
        let sibling_count = self.arena[parent_id].children.len();

        if pos > 0 {
            let left_id = self.arena[parent_id].children[pos - 1];
            if self.arena[left_id].key_count() > min_keys {
                self.borrow_from_left(node_id, left_id, parent_id, pos);
                return;
            }
        }

        if pos + 1 < sibling_count {
            let right_id = self.arena[parent_id].children[pos + 1];
            if self.arena[right_id].key_count() > min_keys {
                self.borrow_from_right(node_id, right_id, parent_id, pos);
                return;
            }
        }

        if pos > 0 {
            let left_id = self.arena[parent_id].children[pos - 1];
            self.merge_nodes(left_id, node_id, parent_id, pos - 1);
        } else if pos + 1 < sibling_count {
            let right_id = self.arena[parent_id].children[pos + 1];
            self.merge_nodes(node_id, right_id, parent_id, pos);
        }
    }

    fn borrow_from_left(&mut self, node_id: NodeId, left_id: NodeId, parent_id: NodeId, pos: usize) {
        if self.arena[node_id].is_leaf {
            let (Some(key), Some(rows)) = (
                self.arena[left_id].keys.pop(),
                self.arena[left_id].values.pop(),
            ) else {
                return;
            };
            self.arena[node_id].keys.insert(0, key.clone());
            self.arena[node_id].values.insert(0, rows);
            self.arena[parent_id].keys[pos - 1] = key;
        } else {
            let (Some(left_key), Some(left_child)) = (
                self.arena[left_id].keys.pop(),
                self.arena[left_id].children.pop(),
            ) else {
                return;
            };
            let parent_key = core::mem::replace(&mut self.arena[parent_id].keys[pos - 1], left_key);
            self.arena[node_id].keys.insert(0, parent_key);
            self.arena[node_id].children.insert(0, left_child);
            self.arena[left_child].parent = Some(node_id);
        }
    }

    fn borrow_from_right(&mut self, node_id: NodeId, right_id: NodeId, parent_id: NodeId, pos: usize) {
        if self.arena[node_id].is_leaf {
            let key = self.arena[right_id].keys.remove(0);
            let rows = self.arena[right_id].values.remove(0);
            self.arena[node_id].keys.push(key);
            self.arena[node_id].values.push(rows);
            self.arena[parent_id].keys[pos] = self.arena[right_id].keys[0].clone();
        } else {
            let right_key = self.arena[right_id].keys.remove(0);
            let right_child = self.arena[right_id].children.remove(0);
            let parent_key = core::mem::replace(&mut self.arena[parent_id].keys[pos], right_key);
            self.arena[node_id].keys.push(parent_key);
            self.arena[node_id].children.push(right_child);
            self.arena[right_child].parent = Some(node_id);
        }
    }

    /// Merges `right_id` into `left_id`; `pos` is the separator between them.
    fn merge_nodes(&mut self, left_id: NodeId, right_id: NodeId, parent_id: NodeId, pos: usize) {
        if self.arena[left_id].is_leaf {
            let right_keys = core::mem::take(&mut self.arena[right_id].keys);
            let right_values = core::mem::take(&mut self.arena[right_id].values);
            self.arena[left_id].keys.extend(right_keys);
            self.arena[left_id].values.extend(right_values);

            let next = self.arena[right_id].next;
            self.arena[left_id].next = next;
            if let Some(next_id) = next {
                self.arena[next_id].prev = Some(left_id);
            }
        } else {
            let separator = self.arena[parent_id].keys[pos].clone();
            let right_keys = core::mem::take(&mut self.arena[right_id].keys);
            let right_children = core::mem::take(&mut self.arena[right_id].children);
            for &child_id in &right_children {
                self.arena[child_id].parent = Some(left_id);
            }
            self.arena[left_id].keys.push(separator);
            self.arena[left_id].keys.extend(right_keys);
            self.arena[left_id].children.extend(right_children);
        }

        self.arena[parent_id].keys.remove(pos);
        self.arena[parent_id].children.remove(pos + 1);

        if parent_id == self.root {
            if self.arena[parent_id].keys.is_empty() {
                self.root = left_id;
                self.arena[left_id].parent = None;
            }
        } else {
            self.handle_underflow(parent_id);
        }
    }

    fn leftmost_leaf(&self) -> NodeId {
        let mut current = self.root;
        while !self.arena[current].is_leaf {
            current = self.arena[current].children[0];
        }
        current
    }

    fn rightmost_leaf(&self) -> NodeId {
        let mut current = self.root;
        while !self.arena[current].is_leaf {
            let children = &self.arena[current].children;
            current = children[children.len() - 1];
        }
        current
    }

    /// First (leaf, pos) at or after the lower end of `range`.
    fn forward_start(&self, range: &KeyRange<K>) -> Option<(NodeId, usize)> {
        let (leaf, pos) = match range.lower() {
            None => (self.leftmost_leaf(), 0),
            Some(key) => {
                let leaf = self.find_leaf(key);
                (leaf, self.arena[leaf].lower_position(key))
            }
        };
        let node = &self.arena[leaf];
        if pos < node.key_count() {
            Some((leaf, pos))
        } else {
            node.next.map(|next| (next, 0))
        }
    }

    /// Last (leaf, pos) at or before the upper end of `range`.
    fn reverse_start(&self, range: &KeyRange<K>) -> Option<(NodeId, usize)> {
        let (leaf, pos) = match range.upper() {
            None => {
                let leaf = self.rightmost_leaf();
                (leaf, self.arena[leaf].key_count())
            }
            Some(key) => {
                let leaf = self.find_leaf(key);
                (leaf, self.arena[leaf].upper_position(key))
            }
        };
        if pos > 0 {
            return Some((leaf, pos - 1));
        }
        let prev = self.arena[leaf].prev?;
        let count = self.arena[prev].key_count();
        (count > 0).then(|| (prev, count - 1))
    }
}

impl<K: Clone + Ord> Index<K> for BTreeIndex<K> {
    fn insert(&mut self, key: K, row: RowId) {
        self.insert_entry(key, row);
    }

    fn search(&self, key: &K) -> Vec<RowId> {
        let leaf = &self.arena[self.find_leaf(key)];
        leaf.find_key(key)
            .map(|pos| leaf.values[pos].clone())
            .unwrap_or_default()
    }

    fn remove(&mut self, key: &K, row: Option<RowId>) -> usize {
        self.delete(key, row)
    }

    fn contains_key(&self, key: &K) -> bool {
        self.arena[self.find_leaf(key)].find_key(key).is_some()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.arena.clear();
        self.root = Self::alloc_node(&mut self.arena, Node::new_leaf());
        self.len = 0;
    }

    fn min(&self) -> Option<(&K, Vec<RowId>)> {
        let leaf = &self.arena[self.leftmost_leaf()];
        let key = leaf.keys.first()?;
        Some((key, leaf.values[0].clone()))
    }

    fn max(&self) -> Option<(&K, Vec<RowId>)> {
        let leaf = &self.arena[self.rightmost_leaf()];
        let key = leaf.keys.last()?;
        Some((key, leaf.values[leaf.key_count() - 1].clone()))
    }
}

impl<K: Clone + Ord> RangeIndex<K> for BTreeIndex<K> {
    fn get_range(
        &self,
        range: Option<&KeyRange<K>>,
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Vec<RowId> {
        let all = KeyRange::All;
        let range = range.unwrap_or(&all);

        let start = if reverse {
            self.reverse_start(range)
        } else {
            self.forward_start(range)
        };
        let Some((mut node_id, mut pos)) = start else {
            return Vec::new();
        };

        let mut result = Vec::new();
        let mut skipped = 0;

        loop {
            let node = &self.arena[node_id];
            if node.is_empty() {
                break;
            }

            let key = &node.keys[pos];
            if range.contains(key) {
                let rows = &node.values[pos];
                for i in 0..rows.len() {
                    let row = if reverse { rows[rows.len() - 1 - i] } else { rows[i] };
                    if skipped < skip {
                        skipped += 1;
                        continue;
                    }
                    if limit.is_some_and(|lim| result.len() >= lim) {
                        return result;
                    }
                    result.push(row);
                }
            } else if (reverse && range.is_before(key)) || (!reverse && range.is_past(key)) {
                break;
            }

            if reverse {
                if pos > 0 {
                    pos -= 1;
                } else {
                    match node.prev {
                        Some(prev) if !self.arena[prev].is_empty() => {
                            node_id = prev;
                            pos = self.arena[prev].key_count() - 1;
                        }
                        _ => break,
                    }
                }
            } else {
                pos += 1;
                if pos >= node.key_count() {
                    match node.next {
                        Some(next) => {
                            node_id = next;
                            pos = 0;
                        }
                        None => break,
                    }
                }
            }
        }

        result
    }
}
