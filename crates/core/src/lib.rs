//! Tabula Core - Core types and schema definitions for the Tabula table store.
//!
//! This crate provides the foundational types shared by every Tabula crate:
//!
//! - `Value`: Dynamic field values (null, boolean, number, string, array, object)
//! - `Record`: An open map of field name to value
//! - `schema`: Field rules and record validation
//! - `pattern_match`: `LIKE`, search and regex matching
//! - `Error`: Error types for table store operations
//!
//! # Example
//!
//! ```rust
//! use tabula_core::{Record, Value};
//! use tabula_core::schema::{FieldRule, Schema};
//!
//! let schema = Schema::new()
//!     .field("name", FieldRule::string().required())
//!     .field("age", FieldRule::number().min(0.0));
//!
//! let record = Record::new().with("name", "Alice").with("age", 30);
//! assert!(schema.validate(&record).is_ok());
//! assert_eq!(record.value("name"), &Value::from("Alice"));
//!
//! let missing = Record::new().with("age", 30);
//! assert!(schema.validate(&missing).is_err());
//! ```

mod error;
pub mod pattern_match;
mod record;
pub mod schema;
mod value;

pub use error::{Error, Result};
pub use record::{Record, RowId, AUTO_INCREMENT, CREATED_AT, DELETED_AT, ID_FIELD, UPDATED_AT};
pub use value::Value;
