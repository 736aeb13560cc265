//! Tabula Index - Secondary index implementations for the Tabula table store.
//!
//! - `BTreeIndex`: non-unique B+Tree supporting point and range lookups
//! - `KeyRange`: bounds for range lookups
//! - `Index` / `RangeIndex`: the traits indexes implement
//!
//! # Example
//!
//! ```rust
//! use tabula_index::{BTreeIndex, Index, KeyRange, RangeIndex};
//!
//! let mut btree: BTreeIndex<i32> = BTreeIndex::new();
//! btree.insert(10, 100);
//! btree.insert(20, 200);
//! btree.insert(5, 50);
//! btree.insert(10, 101);
//!
//! // Point query: rows under a key keep insertion order
//! assert_eq!(btree.search(&10), vec![100, 101]);
//!
//! // Range query
//! let range = KeyRange::lower_bound(10, false);
//! assert_eq!(btree.get_range(Some(&range), false, None, 0), vec![100, 101, 200]);
//! ```

#![no_std]

extern crate alloc;

pub mod btree;
pub mod traits;

pub use btree::BTreeIndex;
pub use traits::{Index, KeyRange, RangeIndex};
