//! Schema module for Tabula.
//!
//! A schema is an ordered set of per-field rules. Validation checks rules in
//! declaration order and reports the first failing field.

mod rule;
mod table;

pub use rule::{FieldRule, FieldType, ValidationFailure};
pub use table::{validate, validate_all, Schema};
