//! Property-based tests for tabula-index using proptest.
//!
//! Every property checks the B+Tree against a `BTreeMap<key, Vec<row>>` model.

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::ops::Bound;
use tabula_index::{BTreeIndex, Index, KeyRange, RangeIndex};

#[derive(Clone, Debug)]
enum Op {
    Insert(i64),
    RemoveRow(i64, u64),
    RemoveKey(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0i64..200).prop_map(Op::Insert),
        2 => (0i64..200, 0u64..400).prop_map(|(k, r)| Op::RemoveRow(k, r)),
        1 => (0i64..200).prop_map(Op::RemoveKey),
    ]
}

type Model = BTreeMap<i64, Vec<u64>>;

fn model_range(model: &Model, lower: Bound<i64>, upper: Bound<i64>) -> Vec<u64> {
    model
        .range((lower, upper))
        .flat_map(|(_, rows)| rows.iter().copied())
        .collect()
}

fn build(order: usize, keys: &[i64]) -> (BTreeIndex<i64>, Model) {
    let mut tree = BTreeIndex::with_order(order);
    let mut model = Model::new();
    for (row, &key) in keys.iter().enumerate() {
        tree.insert(key, row as u64);
        model.entry(key).or_default().push(row as u64);
    }
    (tree, model)
}

proptest! {
    /// Point lookups return every row inserted under a key, in insertion order.
    #[test]
    fn btree_search_matches_model(order in 4usize..12, keys in prop::collection::vec(0i64..300, 1..400)) {
        let (tree, model) = build(order, &keys);
        for (key, rows) in &model {
            prop_assert_eq!(&tree.search(key), rows);
        }
        prop_assert_eq!(tree.len(), keys.len());
        prop_assert!(tree.search(&-1).is_empty());
    }

    /// A full scan visits keys in ascending order.
    #[test]
    fn btree_scan_sorted(order in 4usize..12, keys in prop::collection::vec(-5000i64..5000, 1..300)) {
        let (tree, model) = build(order, &keys);
        let scanned: Vec<i64> = tree.iter().map(|(k, _)| *k).collect();
        let expected: Vec<i64> = model.keys().copied().collect();
        prop_assert_eq!(scanned, expected);
        prop_assert_eq!(
            tree.get_range(None, false, None, 0),
            model_range(&model, Bound::Unbounded, Bound::Unbounded)
        );
    }

    /// Range queries agree with the model for every bound shape.
    #[test]
    fn btree_range_bounds(
        keys in prop::collection::vec(0i64..500, 1..300),
        a in 0i64..500,
        b in 0i64..500,
        lower_ex in any::<bool>(),
        upper_ex in any::<bool>(),
    ) {
        let (tree, model) = build(6, &keys);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let bound = |v: i64, ex: bool| if ex { Bound::Excluded(v) } else { Bound::Included(v) };

        prop_assert_eq!(
            tree.search_range(&KeyRange::lower_bound(lo, lower_ex)),
            model_range(&model, bound(lo, lower_ex), Bound::Unbounded)
        );
        prop_assert_eq!(
            tree.search_range(&KeyRange::upper_bound(hi, upper_ex)),
            model_range(&model, Bound::Unbounded, bound(hi, upper_ex))
        );
        if !(lo == hi && (lower_ex || upper_ex)) {
            prop_assert_eq!(
                tree.search_range(&KeyRange::bound(lo, hi, lower_ex, upper_ex)),
                model_range(&model, bound(lo, lower_ex), bound(hi, upper_ex))
            );
        }
    }

    /// Reverse scans are the forward scan read backwards.
    #[test]
    fn btree_reverse_is_mirror(keys in prop::collection::vec(0i64..100, 1..200), hi in 0i64..100) {
        let (tree, _) = build(5, &keys);
        let range = KeyRange::upper_bound(hi, false);
        let mut forward = tree.get_range(Some(&range), false, None, 0);
        forward.reverse();
        prop_assert_eq!(tree.get_range(Some(&range), true, None, 0), forward);
    }

    /// Skip and limit slice the full result.
    #[test]
    fn btree_skip_limit(keys in prop::collection::vec(0i64..100, 0..200), skip in 0usize..50, limit in 0usize..50) {
        let (tree, _) = build(8, &keys);
        let all = tree.get_range(None, false, None, 0);
        let expected: Vec<u64> = all.iter().copied().skip(skip).take(limit).collect();
        prop_assert_eq!(tree.get_range(None, false, Some(limit), skip), expected);
    }

    /// Mixed inserts and removals keep the tree equal to the model.
    #[test]
    fn btree_ops_match_model(order in 4usize..8, ops in prop::collection::vec(op_strategy(), 1..600)) {
        let mut tree = BTreeIndex::with_order(order);
        let mut model = Model::new();
        let mut next_row = 0u64;

        for op in ops {
            match op {
                Op::Insert(key) => {
                    tree.insert(key, next_row);
                    model.entry(key).or_default().push(next_row);
                    next_row += 1;
                }
                Op::RemoveRow(key, row) => {
                    let expected = model.get_mut(&key).map_or(0, |rows| {
                        let before = rows.len();
                        rows.retain(|&r| r != row);
                        before - rows.len()
                    });
                    if model.get(&key).is_some_and(|rows| rows.is_empty()) {
                        model.remove(&key);
                    }
                    prop_assert_eq!(tree.remove(&key, Some(row)), expected);
                }
                Op::RemoveKey(key) => {
                    let expected = model.remove(&key).map_or(0, |rows| rows.len());
                    prop_assert_eq!(tree.remove(&key, None), expected);
                }
            }
        }

        let entries: Vec<(i64, Vec<u64>)> = tree.iter().map(|(k, rows)| (*k, rows.to_vec())).collect();
        let expected: Vec<(i64, Vec<u64>)> = model.iter().map(|(k, rows)| (*k, rows.clone())).collect();
        prop_assert_eq!(entries, expected);
        prop_assert_eq!(tree.len(), model.values().map(Vec::len).sum::<usize>());
        prop_assert_eq!(tree.min().map(|(k, _)| *k), model.keys().next().copied());
        prop_assert_eq!(tree.max().map(|(k, _)| *k), model.keys().next_back().copied());
    }

    /// Bulk insert produces the same index as sorted one-by-one insertion.
    #[test]
    fn btree_bulk_insert_matches_model(keys in prop::collection::vec(0i64..100, 0..300)) {
        let mut tree = BTreeIndex::with_order(6);
        tree.bulk_insert(keys.iter().enumerate().map(|(row, &k)| (k, row as u64)));
        let (_, model) = build(6, &keys);
        for (key, rows) in &model {
            prop_assert_eq!(&tree.search(key), rows);
        }
        prop_assert_eq!(tree.len(), keys.len());
    }

    /// Clearing leaves an empty, reusable tree.
    #[test]
    fn btree_clear_makes_empty(keys in prop::collection::vec(0i64..1000, 1..100)) {
        let (mut tree, _) = build(4, &keys);
        tree.clear();
        prop_assert!(tree.is_empty());
        prop_assert!(tree.min().is_none());
        tree.insert(1, 1);
        prop_assert_eq!(tree.search(&1), vec![1]);
    }
}
