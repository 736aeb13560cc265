//! B+Tree index implementation for Tabula.
//!
//! An arena-allocated B+Tree with linked leaves, used for point and range
//! lookups on a single record field.

mod node;
mod tree;

pub use node::{Node, NodeId};
pub use tree::{BTreeIndex, DEFAULT_ORDER};
