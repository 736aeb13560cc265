//! Query builder delegation and terminal read operations.
//!
//! Builder calls return `&mut Database` so they chain into a terminal
//! operation. Every terminal operation takes the pending state up front, so
//! the builder is empty afterwards even when the operation fails.

use crate::database::Database;
use std::collections::BTreeMap;
use std::rc::Rc;
use tabula_core::{Error, Record, Result, Value};
use tabula_query::aggregate;
use tabula_query::{Cursor, Direction, JoinSide, Operator, Page, QueryState};

impl Database {
    // ---- builder ----

    pub fn where_eq(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.query.where_eq(field, value);
        self
    }

    /// Adds a condition with a textual operator (`=`, `!=`, `>`, `<`, `>=`,
    /// `<=`, `IN`, `LIKE`). An unknown operator fails the next terminal
    /// operation.
    pub fn where_operator(&mut self, field: &str, op: &str, value: impl Into<Value>) -> &mut Self {
        self.query.where_operator(field, op, value);
        self
    }

    pub fn where_op(&mut self, field: &str, op: Operator, value: impl Into<Value>) -> &mut Self {
        self.query.where_op(field, op, value);
        self
    }

    /// Adds `field IN values`. A non-array `values` fails the next terminal
    /// operation.
    pub fn where_in(&mut self, field: &str, values: impl Into<Value>) -> &mut Self {
        self.query.where_in(field, values);
        self
    }

    /// Adds a `LIKE` condition. `%` is ignored and the rest of the pattern
    /// must occur somewhere in the field's text.
    pub fn where_like(&mut self, field: &str, pattern: &str) -> &mut Self {
        self.query.where_like(field, pattern);
        self
    }

    /// Adds an equality tagged as OR. Every condition is still combined with
    /// AND.
    pub fn or_where(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.query.or_where(field, value);
        self
    }

    pub fn search(&mut self, columns: &[&str], term: &str) -> &mut Self {
        self.query.search(columns, term);
        self
    }

    pub fn order_by(&mut self, column: &str, direction: Direction) -> &mut Self {
        self.query.order_by(column, direction);
        self
    }

    pub fn limit(&mut self, limit: usize, offset: usize) -> &mut Self {
        self.query.limit(limit, offset);
        self
    }

    pub fn with_trashed(&mut self) -> &mut Self {
        self.query.with_trashed();
        self
    }

    /// The accumulated, not yet consumed, query.
    pub fn pending_query(&self) -> &QueryState {
        &self.query
    }

    /// Discards the accumulated query.
    pub fn reset_query(&mut self) {
        self.query = QueryState::new();
    }

    // ---- terminal operations ----

    /// Records matching the accumulated query, sorted and sliced.
    pub fn get(&mut self, table: &str) -> Result<Vec<Record>> {
        self.with_cursor(table, |cursor| cursor.get())
    }

    pub fn get_one(&mut self, table: &str) -> Result<Option<Record>> {
        self.with_cursor(table, |cursor| cursor.get_one())
    }

    /// Number of matching records. Ordering and slicing are ignored.
    pub fn count(&mut self, table: &str) -> Result<usize> {
        self.with_cursor(table, |cursor| cursor.count())
    }

    /// One page of matching records. `page` starts at 1. Any `limit` is
    /// ignored.
    pub fn paginate(&mut self, table: &str, page: usize, per_page: usize) -> Result<Page> {
        self.with_cursor(table, |cursor| cursor.paginate(page, per_page))
    }

    /// Sum of the numeric values of `column` over the matching records.
    pub fn sum(&mut self, table: &str, column: &str) -> Result<f64> {
        self.aggregate(table, |rows| aggregate::sum(rows, column))
    }

    pub fn avg(&mut self, table: &str, column: &str) -> Result<Option<f64>> {
        self.aggregate(table, |rows| aggregate::avg(rows, column))
    }

    pub fn min(&mut self, table: &str, column: &str) -> Result<Option<Value>> {
        self.aggregate(table, |rows| aggregate::min(rows, column))
    }

    pub fn max(&mut self, table: &str, column: &str) -> Result<Option<Value>> {
        self.aggregate(table, |rows| aggregate::max(rows, column))
    }

    pub fn group_by(&mut self, table: &str, column: &str) -> Result<BTreeMap<Value, Vec<Record>>> {
        self.aggregate(table, |rows| aggregate::group_by(rows, column))
    }

    /// Distinct values of `column`, in the order they first appear.
    pub fn distinct(&mut self, table: &str, column: &str) -> Result<Vec<Value>> {
        self.aggregate(table, |rows| aggregate::distinct(rows, column))
    }

    /// Joins every active record of `left` with the first record of `right`
    /// whose `right_key` equals its `left_key`. Matches are flattened into
    /// `"<table>_<field>"` keys; unmatched left records are returned as is.
    /// Null keys never match.
    pub fn join(&mut self, left: &str, right: &str, left_key: &str, right_key: &str) -> Result<Vec<Record>> {
        self.query = QueryState::new();
        let left_rows = self.active_rows(left)?;
        let right_rows = self.active_rows(right)?;
        Ok(tabula_query::join(
            JoinSide::new(left, left_key),
            left_rows.iter().map(|r| r.as_ref()),
            JoinSide::new(right, right_key),
            right_rows.iter().map(|r| r.as_ref()),
        ))
    }

    /// Joins `left` to `right` through the relationship declared on `left`.
    pub fn join_related(&mut self, left: &str, right: &str) -> Result<Vec<Record>> {
        let relationship = self
            .store
            .table(left)?
            .relationships()
            .iter()
            .find(|r| r.target == right)
            .cloned()
            .ok_or_else(|| Error::invalid_input(format!("no relationship from {left} to {right}")))?;
        let (left_key, right_key) = relationship.join_keys();
        self.join(left, right, left_key, right_key)
    }

    fn with_cursor<T>(&mut self, table: &str, run: impl FnOnce(&Cursor<'_>) -> Result<T>) -> Result<T> {
        let state = self.query.take();
        let options = self.cursor_options();
        let cursor = Cursor::new(self.store.table(table)?, state, options);
        self.logger.debug(|| format!("query on {table} via {:?}", cursor.access()));
        run(&cursor)
    }

    fn aggregate<T>(&mut self, table: &str, reduce: impl FnOnce(Vec<&Record>) -> T) -> Result<T> {
        let rows = self.with_cursor(table, |cursor| cursor.rows())?;
        Ok(reduce(rows.iter().map(|r| r.as_ref()).collect()))
    }

    fn active_rows(&self, table: &str) -> Result<Vec<Rc<Record>>> {
        Cursor::new(self.store.table(table)?, QueryState::new(), self.cursor_options()).rows()
    }
}
