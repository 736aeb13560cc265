//! B+Tree node definitions.

use alloc::vec::Vec;
use tabula_core::RowId;

/// Node identifier in the B+Tree arena.
pub type NodeId = usize;

/// A node in the B+Tree.
///
/// Leaves hold one entry per distinct key; duplicate keys append to that
/// entry's row list in insertion order.
#[derive(Clone, Debug)]
pub struct Node<K> {
    /// Keys stored in this node.
    pub keys: Vec<K>,
    /// Leaf only: row ids per key.
    pub values: Vec<Vec<RowId>>,
    /// Internal only: child node ids, one more than `keys`.
    pub children: Vec<NodeId>,
    /// Leaf only: next leaf in key order.
    pub next: Option<NodeId>,
    /// Leaf only: previous leaf in key order.
    pub prev: Option<NodeId>,
    pub is_leaf: bool,
    pub parent: Option<NodeId>,
}

impl<K: Ord> Node<K> {
    /// Creates a new leaf node.
    pub fn new_leaf() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
            next: None,
            prev: None,
            is_leaf: true,
            parent: None,
        }
    }

    /// Creates a new internal node.
    pub fn new_internal() -> Self {
        Self {
            is_leaf: false,
            ..Self::new_leaf()
        }
    }

    #[inline]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Position of the first key not less than `key`.
    pub fn lower_position(&self, key: &K) -> usize {
        self.keys.partition_point(|k| k < key)
    }

    /// Position of the first key greater than `key`.
    pub fn upper_position(&self, key: &K) -> usize {
        self.keys.partition_point(|k| k <= key)
    }

    /// Exact position of a key.
    pub fn find_key(&self, key: &K) -> Option<usize> {
        let pos = self.lower_position(key);
        (pos < self.keys.len() && &self.keys[pos] == key).then_some(pos)
    }

    /// Inserts a row under `key` in a leaf, appending to an existing entry.
    pub fn insert_at(&mut self, pos: usize, key: K, row: RowId) {
        debug_assert!(self.is_leaf);
        if pos < self.keys.len() && self.keys[pos] == key {
            self.values[pos].push(row);
        } else {
            self.keys.insert(pos, key);
            self.values.insert(pos, alloc::vec![row]);
        }
    }

    /// Removes one row (or every row when `row` is None) from the entry at
    /// `pos`, dropping the key once its row list is empty. Returns the number
    /// of rows removed.
    pub fn remove_at(&mut self, pos: usize, row: Option<RowId>) -> usize {
        debug_assert!(self.is_leaf);
        let removed = match row {
            Some(row) => {
                let rows = &mut self.values[pos];
                let before = rows.len();
                rows.retain(|&r| r != row);
                before - rows.len()
            }
            None => self.values[pos].len(),
        };
        if row.is_none() || self.values[pos].is_empty() {
            self.keys.remove(pos);
            self.values.remove(pos);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_insert_groups_duplicates() {
        let mut leaf: Node<i32> = Node::new_leaf();
        leaf.insert_at(0, 5, 1);
        let pos = leaf.lower_position(&5);
        leaf.insert_at(pos, 5, 2);
        let pos = leaf.lower_position(&3);
        leaf.insert_at(pos, 3, 3);
        assert_eq!(leaf.keys, alloc::vec![3, 5]);
        assert_eq!(leaf.values[1], alloc::vec![1, 2]);
    }

    #[test]
    fn test_positions() {
        let mut leaf: Node<i32> = Node::new_leaf();
        for (i, k) in [1, 3, 5].into_iter().enumerate() {
            leaf.insert_at(i, k, i as RowId);
        }
        assert_eq!(leaf.lower_position(&3), 1);
        assert_eq!(leaf.upper_position(&3), 2);
        assert_eq!(leaf.find_key(&4), None);
        assert_eq!(leaf.find_key(&5), Some(2));
    }

    #[test]
    fn test_remove_at() {
        let mut leaf: Node<i32> = Node::new_leaf();
        leaf.insert_at(0, 7, 1);
        leaf.insert_at(0, 7, 2);
        assert_eq!(leaf.remove_at(0, Some(9)), 0);
        assert_eq!(leaf.remove_at(0, Some(1)), 1);
        assert_eq!(leaf.key_count(), 1);
        assert_eq!(leaf.remove_at(0, Some(2)), 1);
        assert!(leaf.is_empty());

        leaf.insert_at(0, 7, 1);
        leaf.insert_at(0, 7, 2);
        assert_eq!(leaf.remove_at(0, None), 2);
        assert!(leaf.is_empty());
    }
}
