//! Index trait definitions for Tabula.

use alloc::vec::Vec;
use tabula_core::RowId;

/// A key range for index queries.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyRange<K> {
    /// All keys
    All,
    /// A single key (equality)
    Only(K),
    /// Keys above a lower bound
    LowerBound { value: K, exclusive: bool },
    /// Keys below an upper bound
    UpperBound { value: K, exclusive: bool },
    /// Keys between lower and upper bounds
    Bound {
        lower: K,
        upper: K,
        lower_exclusive: bool,
        upper_exclusive: bool,
    },
}

impl<K: Ord> KeyRange<K> {
    /// Creates a range for all keys.
    pub fn all() -> Self {
        KeyRange::All
    }

    /// Creates a range for a single key.
    pub fn only(key: K) -> Self {
        KeyRange::Only(key)
    }

    /// Creates a range with a lower bound.
    pub fn lower_bound(value: K, exclusive: bool) -> Self {
        KeyRange::LowerBound { value, exclusive }
    }

    /// Creates a range with an upper bound.
    pub fn upper_bound(value: K, exclusive: bool) -> Self {
        KeyRange::UpperBound { value, exclusive }
    }

    /// Creates a range with both bounds.
    pub fn bound(lower: K, upper: K, lower_exclusive: bool, upper_exclusive: bool) -> Self {
        KeyRange::Bound {
            lower,
            upper,
            lower_exclusive,
            upper_exclusive,
        }
    }

    pub fn is_only(&self) -> bool {
        matches!(self, KeyRange::Only(_))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, KeyRange::All)
    }

    /// The lower end of the range, if bounded below.
    pub fn lower(&self) -> Option<&K> {
        match self {
            KeyRange::Only(k) | KeyRange::LowerBound { value: k, .. } => Some(k),
            KeyRange::Bound { lower, .. } => Some(lower),
            KeyRange::All | KeyRange::UpperBound { .. } => None,
        }
    }

    /// The upper end of the range, if bounded above.
    pub fn upper(&self) -> Option<&K> {
        match self {
            KeyRange::Only(k) | KeyRange::UpperBound { value: k, .. } => Some(k),
            KeyRange::Bound { upper, .. } => Some(upper),
            KeyRange::All | KeyRange::LowerBound { .. } => None,
        }
    }

    /// Returns true if `key` lies above the range.
    pub fn is_past(&self, key: &K) -> bool {
        match self {
            KeyRange::Only(k) => key > k,
            KeyRange::UpperBound { value, exclusive }
            | KeyRange::Bound {
                upper: value,
                upper_exclusive: exclusive,
                ..
            } => {
                if *exclusive {
                    key >= value
                } else {
                    key > value
                }
            }
            KeyRange::All | KeyRange::LowerBound { .. } => false,
        }
    }

    /// Returns true if `key` lies below the range.
    pub fn is_before(&self, key: &K) -> bool {
        match self {
            KeyRange::Only(k) => key < k,
            KeyRange::LowerBound { value, exclusive }
            | KeyRange::Bound {
                lower: value,
                lower_exclusive: exclusive,
                ..
            } => {
                if *exclusive {
                    key <= value
                } else {
                    key < value
                }
            }
            KeyRange::All | KeyRange::UpperBound { .. } => false,
        }
    }

    /// Checks if a key is within this range.
    pub fn contains(&self, key: &K) -> bool {
        !self.is_before(key) && !self.is_past(key)
    }
}

/// Core trait for secondary indexes. Keys may repeat; each key maps to the
/// row ids inserted under it, in insertion order.
pub trait Index<K> {
    /// Adds a row under `key`.
    fn insert(&mut self, key: K, row: RowId);

    /// Gets all row ids stored under `key`.
    fn search(&self, key: &K) -> Vec<RowId>;

    /// Removes one row from `key`, or every row when `row` is None.
    /// Returns the number of rows removed.
    fn remove(&mut self, key: &K, row: Option<RowId>) -> usize;

    /// Checks if the index contains the given key.
    fn contains_key(&self, key: &K) -> bool;

    /// Returns the number of (key, row) entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    /// Returns the smallest key and its rows.
    fn min(&self) -> Option<(&K, Vec<RowId>)>;

    /// Returns the largest key and its rows.
    fn max(&self) -> Option<(&K, Vec<RowId>)>;
}

/// Trait for indexes that support range queries.
pub trait RangeIndex<K>: Index<K> {
    /// Gets row ids for keys within `range` (all keys when None), ascending
    /// by key or descending when `reverse`, after skipping `skip` rows.
    fn get_range(
        &self,
        range: Option<&KeyRange<K>>,
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Vec<RowId>;
}
