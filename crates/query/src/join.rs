//! Two-table join.
//!
//! For each left record the first right record with an equal key is found
//! through a hash table built over the right side. A matched pair becomes one
//! flat record whose keys are `"<table>_<field>"`; an unmatched left record is
//! returned as it is.

use hashbrown::HashMap;
use tabula_core::{Record, Value};

/// One side of a join.
#[derive(Clone, Copy, Debug)]
pub struct JoinSide<'a> {
    pub table: &'a str,
    pub key: &'a str,
}

impl<'a> JoinSide<'a> {
    pub fn new(table: &'a str, key: &'a str) -> Self {
        Self { table, key }
    }
}

/// Joins `left` to the first matching record of `right`.
pub fn join<'a, L, R>(left: JoinSide<'_>, left_rows: L, right: JoinSide<'_>, right_rows: R) -> Vec<Record>
where
    L: IntoIterator<Item = &'a Record>,
    R: IntoIterator<Item = &'a Record>,
{
    // Build phase: first record per key wins.
    let mut lookup: HashMap<&Value, &Record> = HashMap::new();
    for record in right_rows {
        let key = record.value(right.key);
        if !key.is_null() {
            lookup.entry(key).or_insert(record);
        }
    }

    left_rows
        .into_iter()
        .map(|record| match lookup.get(record.value(left.key)) {
            Some(matched) => flatten(left.table, record, right.table, matched),
            None => record.clone(),
        })
        .collect()
}

/// Merges a matched pair into one record with table-prefixed keys.
pub fn flatten(left_table: &str, left: &Record, right_table: &str, right: &Record) -> Record {
    let prefixed = |table: &str, record: &Record| {
        record
            .iter()
            .map(|(field, value)| (format!("{table}_{field}"), value.clone()))
            .collect::<Vec<_>>()
    };
    prefixed(left_table, left)
        .into_iter()
        .chain(prefixed(right_table, right))
        .collect()
}
