//! Property-based tests for query execution.
//!
//! Index-assisted execution must return exactly what a full scan returns, and
//! sorting must be stable.

use proptest::prelude::*;
use tabula_core::{Record, Value};
use tabula_query::{matches, Condition, Cursor, CursorOptions, Direction, Operator, QueryState};
use tabula_storage::RowStore;

/// Field values mixing numbers, strings and nulls so cross-type comparisons
/// are exercised.
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => (-20i64..20).prop_map(Value::Int64),
        1 => (-20i64..20).prop_map(|v| Value::Float64(v as f64 + 0.5)),
        1 => "[a-c]{1,2}".prop_map(Value::String),
        1 => Just(Value::Null),
    ]
}

fn operator_strategy() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::Eq),
        Just(Operator::Ne),
        Just(Operator::Gt),
        Just(Operator::Ge),
        Just(Operator::Lt),
        Just(Operator::Le),
        Just(Operator::Like),
    ]
}

fn build_table(values: &[(Value, i64)], indexed: bool) -> RowStore {
    let mut table = RowStore::new("t");
    if indexed {
        table.create_index("f");
    }
    for (i, (f, g)) in values.iter().enumerate() {
        let record = Record::new()
            .with("id", i)
            .with("f", f.clone())
            .with("g", *g);
        table.insert(record).unwrap();
    }
    table
}

proptest! {
    #[test]
    fn prop_indexed_equals_scan(
        values in prop::collection::vec((value_strategy(), 0i64..4), 0..60),
        op in operator_strategy(),
        operand in value_strategy(),
        g in 0i64..4,
    ) {
        let indexed = build_table(&values, true);
        let plain = build_table(&values, false);

        let mut q = QueryState::new();
        q.where_op("f", op, operand.clone()).where_eq("g", g);

        let via_index = Cursor::new(&indexed, q.clone(), CursorOptions::default()).get().unwrap();
        let via_scan = Cursor::new(&plain, q, CursorOptions::default()).get().unwrap();
        prop_assert_eq!(&via_index, &via_scan);

        let conditions = [Condition::new("f", op, operand), Condition::eq("g", g)];
        let expected: Vec<Record> = plain
            .records()
            .filter(|r| matches(r, &conditions))
            .cloned()
            .collect();
        prop_assert_eq!(via_scan, expected);
    }

    #[test]
    fn prop_in_lookup_equals_scan(
        values in prop::collection::vec((value_strategy(), 0i64..4), 0..60),
        items in prop::collection::vec(value_strategy(), 0..5),
    ) {
        let indexed = build_table(&values, true);
        let plain = build_table(&values, false);

        let mut q = QueryState::new();
        q.where_in("f", items);
        let via_index = Cursor::new(&indexed, q.clone(), CursorOptions::default()).get().unwrap();
        let via_scan = Cursor::new(&plain, q, CursorOptions::default()).get().unwrap();
        prop_assert_eq!(via_index, via_scan);
    }

    #[test]
    fn prop_sort_is_stable(
        values in prop::collection::vec((value_strategy(), 0i64..4), 0..60),
        desc in any::<bool>(),
    ) {
        let table = build_table(&values, false);
        let direction = if desc { Direction::Desc } else { Direction::Asc };
        let mut q = QueryState::new();
        q.order_by("g", direction);
        let rows = Cursor::new(&table, q, CursorOptions::default()).get().unwrap();

        prop_assert_eq!(rows.len(), values.len());
        for pair in rows.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let (ga, gb) = (a.value("g"), b.value("g"));
            if ga == gb {
                // equal keys keep insertion order
                prop_assert!(a.value("id") < b.value("id"));
            } else if desc {
                prop_assert!(ga > gb);
            } else {
                prop_assert!(ga < gb);
            }
        }
    }

    #[test]
    fn prop_limit_offset_slices(
        values in prop::collection::vec((value_strategy(), 0i64..4), 0..40),
        limit in 0usize..10,
        offset in 0usize..50,
    ) {
        let table = build_table(&values, false);
        let all = Cursor::new(&table, QueryState::new(), CursorOptions::default()).get().unwrap();

        let mut q = QueryState::new();
        q.limit(limit, offset);
        let sliced = Cursor::new(&table, q, CursorOptions::default()).get().unwrap();
        let expected: Vec<Record> = all.into_iter().skip(offset).take(limit).collect();
        prop_assert_eq!(sliced, expected);
    }
}
