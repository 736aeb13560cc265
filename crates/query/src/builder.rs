//! Accumulated query state.
//!
//! `QueryState` collects conditions, search terms, ordering and slicing from
//! chained calls. A terminal operation takes the whole state with
//! `std::mem::take`, so nothing carries over into the next query.

use crate::condition::{Condition, Connective, Operator, SearchTerm};
use core::str::FromStr;
use tabula_core::{Error, Result, Value};

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            _ => Err(Error::invalid_input(format!("unknown sort direction {s:?}"))),
        }
    }
}

/// One `order_by` key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderKey {
    pub column: String,
    pub direction: Direction,
}

/// Query builder state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryState {
    pub conditions: Vec<Condition>,
    pub search: Vec<SearchTerm>,
    pub order: Vec<OrderKey>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub with_trashed: bool,
    /// First malformed builder call, reported by the next terminal operation.
    pub pending_error: Option<String>,
}

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Adds `field = value`.
    pub fn where_eq(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.push(Condition::eq(field, value))
    }

    /// Adds `field <op> value`, parsing the operator from text.
    pub fn where_operator(&mut self, field: &str, op: &str, value: impl Into<Value>) -> &mut Self {
        match op.parse::<Operator>() {
            Ok(op) => self.where_op(field, op, value),
            Err(err) => self.fail(err.to_string()),
        }
    }

    /// Adds `field <op> value`.
    pub fn where_op(&mut self, field: &str, op: Operator, value: impl Into<Value>) -> &mut Self {
        self.push(Condition::new(field, op, value))
    }

    /// Adds `field IN values`. `values` must be an array.
    pub fn where_in(&mut self, field: &str, values: impl Into<Value>) -> &mut Self {
        let values = values.into();
        if values.as_array().is_none() {
            return self.fail(format!(
                "where_in on {field} expects an array, got {}",
                values.type_name()
            ));
        }
        self.push(Condition::new(field, Operator::In, values))
    }

    /// Adds `field LIKE pattern`.
    pub fn where_like(&mut self, field: &str, pattern: &str) -> &mut Self {
        self.push(Condition::new(field, Operator::Like, pattern))
    }

    /// Adds `field = value` tagged as OR. The clause is still evaluated with
    /// AND.
    pub fn or_where(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.push(Condition::eq(field, value).or())
    }

    /// Adds a case-insensitive search for `term` in any of `columns`.
    pub fn search(&mut self, columns: &[&str], term: &str) -> &mut Self {
        self.search.extend(columns.iter().map(|column| SearchTerm {
            column: (*column).to_string(),
            term: term.to_string(),
        }));
        self
    }

    /// Adds a sort key. Later keys break ties of earlier ones.
    pub fn order_by(&mut self, column: &str, direction: Direction) -> &mut Self {
        self.order.push(OrderKey {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn limit(&mut self, limit: usize, offset: usize) -> &mut Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    /// Includes soft-deleted records in the next query.
    pub fn with_trashed(&mut self) -> &mut Self {
        self.with_trashed = true;
        self
    }

    /// Returns true if any condition was added with `or_where`.
    pub fn has_or(&self) -> bool {
        self.conditions.iter().any(|c| c.connective == Connective::Or)
    }

    /// Takes the accumulated state, leaving an empty builder.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Fails with the recorded builder error, if any.
    pub fn check(&self) -> Result<()> {
        match &self.pending_error {
            Some(message) => Err(Error::invalid_input(message.clone())),
            None => Ok(()),
        }
    }

    fn push(&mut self, condition: Condition) -> &mut Self {
        self.conditions.push(condition);
        self
    }

    fn fail(&mut self, message: String) -> &mut Self {
        self.pending_error.get_or_insert(message);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chaining() {
        let mut q = QueryState::new();
        q.where_eq("status", "active")
            .where_operator("age", ">=", 18)
            .or_where("role", "admin")
            .search(&["name", "email"], "ann")
            .order_by("age", Direction::Desc)
            .limit(10, 5);

        assert_eq!(q.conditions.len(), 3);
        assert_eq!(q.conditions[1].operator, Operator::Ge);
        assert!(q.has_or());
        assert_eq!(q.search.len(), 2);
        assert_eq!(q.limit, Some(10));
        assert_eq!(q.offset, 5);
        assert!(q.check().is_ok());
    }

    #[test]
    fn test_take_resets() {
        let mut q = QueryState::new();
        q.where_eq("a", 1).with_trashed();
        let taken = q.take();
        assert_eq!(taken.conditions.len(), 1);
        assert!(taken.with_trashed);
        assert!(q.is_empty());
    }

    #[test]
    fn test_pending_errors() {
        let mut q = QueryState::new();
        q.where_in("id", 5);
        assert!(q.conditions.is_empty());
        assert!(matches!(q.check(), Err(Error::InvalidInput { .. })));

        let mut q = QueryState::new();
        q.where_operator("a", "~=", 1).where_in("b", "x");
        let err = q.check().unwrap_err().to_string();
        assert!(err.contains("~="));
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("desc".parse::<Direction>().unwrap(), Direction::Desc);
        assert_eq!("ASC".parse::<Direction>().unwrap(), Direction::Asc);
        assert!("up".parse::<Direction>().is_err());
    }
}
