//! Column aggregates over a record set.

use hashbrown::HashSet;
use std::collections::BTreeMap;
use tabula_core::{Record, Value};

/// Sum of the numeric values in `column`; 0 when there are none.
pub fn sum<'a>(records: impl IntoIterator<Item = &'a Record>, column: &str) -> f64 {
    numbers(records, column).iter().sum()
}

/// Mean of the numeric values in `column`.
pub fn avg<'a>(records: impl IntoIterator<Item = &'a Record>, column: &str) -> Option<f64> {
    let values = numbers(records, column);
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Smallest non-null value in `column`.
pub fn min<'a>(records: impl IntoIterator<Item = &'a Record>, column: &str) -> Option<Value> {
    non_null(records, column).into_iter().min().cloned()
}

/// Largest non-null value in `column`.
pub fn max<'a>(records: impl IntoIterator<Item = &'a Record>, column: &str) -> Option<Value> {
    non_null(records, column).into_iter().max().cloned()
}

/// Groups records by their value in `column`. Records lacking the column
/// land in the `Null` group. Each group keeps input order.
pub fn group_by<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    column: &str,
) -> BTreeMap<Value, Vec<Record>> {
    let mut groups: BTreeMap<Value, Vec<Record>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.value(column).clone())
            .or_default()
            .push(record.clone());
    }
    groups
}

/// Distinct values of `column` in first-seen order.
pub fn distinct<'a>(records: impl IntoIterator<Item = &'a Record>, column: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for record in records {
        let value = record.value(column);
        if seen.insert(value) {
            values.push(value.clone());
        }
    }
    values
}

fn numbers<'a>(records: impl IntoIterator<Item = &'a Record>, column: &str) -> Vec<f64> {
    records
        .into_iter()
        .map(|r| r.value(column))
        .filter_map(Value::as_f64)
        .collect()
}

fn non_null<'a>(records: impl IntoIterator<Item = &'a Record>, column: &str) -> Vec<&'a Value> {
    records
        .into_iter()
        .map(|r| r.value(column))
        .filter(|v| !v.is_null())
        .collect()
}
