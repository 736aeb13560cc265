//! Tabula Query - Query evaluation for the Tabula table store.
//!
//! This crate provides:
//!
//! - `condition`: where-clause operators and search terms
//! - `builder`: `QueryState`, the chainable accumulation of a query
//! - `cursor`: execution of a `QueryState` against a `RowStore` (index
//!   selection, filtering, sorting, slicing, pagination)
//! - `aggregate`: `sum`, `avg`, `min`, `max`, `group_by`, `distinct`
//! - `join`: flattened two-table joins
//!
//! # Example
//!
//! ```rust
//! use tabula_core::Record;
//! use tabula_query::{Cursor, CursorOptions, Direction, QueryState};
//! use tabula_storage::RowStore;
//!
//! let mut table = RowStore::new("p");
//! for (id, price) in [(1, 10), (2, 50), (3, 90)] {
//!     table.insert(Record::new().with("id", id).with("price", price)).unwrap();
//! }
//!
//! let mut query = QueryState::new();
//! query.where_operator("price", ">", 20).order_by("price", Direction::Desc);
//! let rows = Cursor::new(&table, query.take(), CursorOptions::default())
//!     .get()
//!     .unwrap();
//!
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[0].value("id").as_i64(), Some(3));
//! assert!(query.is_empty());
//! ```

pub mod aggregate;
pub mod builder;
pub mod condition;
pub mod cursor;
pub mod join;

pub use builder::{Direction, OrderKey, QueryState};
pub use condition::{matches, matches_search, Condition, Connective, Operator, SearchTerm};
pub use cursor::{Access, Cursor, CursorOptions, Page, Pagination};
pub use join::{join, JoinSide};
