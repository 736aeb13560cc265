//! Query execution against one table.
//!
//! The pipeline is:
//!
//! 1. base rows: an index lookup on the first condition when possible, a
//!    full scan otherwise
//! 2. every condition (the first one is re-checked)
//! 3. search terms
//! 4. soft-delete filter
//! 5. stable sort
//! 6. offset and limit
//!
//! `select` stops after step 4 and is what update and delete use.

use crate::builder::{Direction, OrderKey, QueryState};
use crate::condition::{matches, matches_search, Condition, Operator};
use core::cmp::Ordering;
use hashbrown::HashSet;
use std::rc::Rc;
use tabula_core::{Error, Record, Result, RowId};
use tabula_index::{Index, KeyRange};
use tabula_storage::RowStore;

/// Execution switches supplied by the database configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorOptions {
    /// Serve the first condition from an index when one exists.
    pub use_index: bool,
    /// Hide records carrying `deleted_at`.
    pub soft_delete: bool,
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self {
            use_index: true,
            soft_delete: false,
        }
    }
}

/// How the base rows were found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Index,
    Scan,
}

/// One page of results.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub data: Vec<Record>,
    pub pagination: Pagination,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub total: usize,
    pub per_page: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    /// Computes page metadata for a 1-based `page`.
    pub fn new(total: usize, per_page: usize, current_page: usize) -> Self {
        let total_pages = total.div_ceil(per_page.max(1));
        Self {
            total,
            per_page,
            current_page,
            total_pages,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1,
        }
    }
}

/// Runs a `QueryState` against a table.
pub struct Cursor<'a> {
    table: &'a RowStore,
    state: QueryState,
    options: CursorOptions,
}

impl<'a> Cursor<'a> {
    pub fn new(table: &'a RowStore, state: QueryState, options: CursorOptions) -> Self {
        Self {
            table,
            state,
            options,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Reports whether the base rows will come from an index.
    pub fn access(&self) -> Access {
        if self.index_candidates().is_some() {
            Access::Index
        } else {
            Access::Scan
        }
    }

    /// Filtered rows in insertion order, ignoring ordering and slicing.
    pub fn select(&self) -> Result<Vec<(RowId, Rc<Record>)>> {
        self.state.check()?;
        let conditions = &self.state.conditions;
        let search = &self.state.search;
        let hide_trashed = self.options.soft_delete && !self.state.with_trashed;
        let keep = |record: &Record| {
            matches(record, conditions)
                && matches_search(record, search)
                && !(hide_trashed && record.is_soft_deleted())
        };

        let rows = match self.index_candidates() {
            Some(row_ids) => row_ids
                .into_iter()
                .filter_map(|row_id| self.table.get(row_id).map(|r| (row_id, r)))
                .filter(|(_, record)| keep(record))
                .map(|(row_id, record)| (row_id, Rc::clone(record)))
                .collect(),
            None => self
                .table
                .iter()
                .filter(|(_, record)| keep(record))
                .map(|(row_id, record)| (row_id, Rc::clone(record)))
                .collect(),
        };
        Ok(rows)
    }

    /// Number of rows matching the filters.
    pub fn count(&self) -> Result<usize> {
        Ok(self.select()?.len())
    }

    /// Matching rows, sorted and sliced.
    pub fn rows(&self) -> Result<Vec<Rc<Record>>> {
        let mut rows: Vec<Rc<Record>> = self.select()?.into_iter().map(|(_, r)| r).collect();
        sort_records(&mut rows, &self.state.order);
        Ok(slice(rows, self.state.offset, self.state.limit))
    }

    /// Matching records, sorted and sliced.
    pub fn get(&self) -> Result<Vec<Record>> {
        Ok(self.rows()?.iter().map(|r| Record::clone(r)).collect())
    }

    /// First matching record after sorting and slicing.
    pub fn get_one(&self) -> Result<Option<Record>> {
        Ok(self.rows()?.first().map(|r| Record::clone(r)))
    }

    /// Sorts the filtered rows and returns page `page` (1-based). Any
    /// `limit` on the state is ignored.
    pub fn paginate(&self, page: usize, per_page: usize) -> Result<Page> {
        if page == 0 || per_page == 0 {
            return Err(Error::invalid_input(format!(
                "page and per_page must be at least 1 (got {page}, {per_page})"
            )));
        }
        let mut rows: Vec<Rc<Record>> = self.select()?.into_iter().map(|(_, r)| r).collect();
        sort_records(&mut rows, &self.state.order);

        let pagination = Pagination::new(rows.len(), per_page, page);
        let start = (page - 1).saturating_mul(per_page);
        let data = rows
            .iter()
            .skip(start)
            .take(per_page)
            .map(|r| Record::clone(r))
            .collect();
        Ok(Page { data, pagination })
    }

    /// Row ids from an index lookup on the first condition, in insertion
    /// order. `None` means the table must be scanned.
    fn index_candidates(&self) -> Option<Vec<RowId>> {
        if !self.options.use_index || self.table.pending_len() > 0 {
            return None;
        }
        let first = self.state.conditions.first()?;
        let mut row_ids = lookup(self.table, first)?;
        row_ids.sort_unstable();
        row_ids.dedup();
        Some(row_ids)
    }
}

fn lookup(table: &RowStore, condition: &Condition) -> Option<Vec<RowId>> {
    let index = table.index(&condition.field)?;
    let value = &condition.value;
    let row_ids = match condition.operator {
        Operator::Eq => index.search(value),
        Operator::Gt => index.search_range(&KeyRange::lower_bound(value.clone(), true)),
        Operator::Ge => index.search_range(&KeyRange::lower_bound(value.clone(), false)),
        Operator::Lt => index.search_range(&KeyRange::upper_bound(value.clone(), true)),
        Operator::Le => index.search_range(&KeyRange::upper_bound(value.clone(), false)),
        Operator::In => {
            let mut seen = HashSet::new();
            value
                .as_array()
                .unwrap_or_default()
                .iter()
                .filter(|item| seen.insert(*item))
                .flat_map(|item| index.search(item))
                .collect()
        }
        Operator::Ne | Operator::Like => return None,
    };
    Some(row_ids)
}

/// Stable sort by the order keys using the total order of `Value`.
pub fn sort_records(rows: &mut [Rc<Record>], order: &[OrderKey]) {
    if order.is_empty() {
        return;
    }
    rows.sort_by(|a, b| compare_records(a, b, order));
}

fn compare_records(a: &Record, b: &Record, order: &[OrderKey]) -> Ordering {
    for key in order {
        let cmp = a.value(&key.column).cmp(b.value(&key.column));
        if cmp != Ordering::Equal {
            return match key.direction {
                Direction::Asc => cmp,
                Direction::Desc => cmp.reverse(),
            };
        }
    }
    Ordering::Equal
}

fn slice<T>(mut rows: Vec<T>, offset: usize, limit: Option<usize>) -> Vec<T> {
    let len = rows.len();
    let start = offset.min(len);
    let end = match limit {
        Some(limit) => start.saturating_add(limit).min(len),
        None => len,
    };
    rows.truncate(end);
    if start > 0 {
        rows.drain(..start);
    }
    rows
}
