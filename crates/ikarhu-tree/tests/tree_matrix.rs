use ikarhu_tree::{codec, merge_deep, patch_order, Change, ChangeTree, Shape};
use proptest::prelude::*;
use serde_json::json;

fn tree(value: serde_json::Value) -> ChangeTree {
    codec::from_json(&value).expect("fixture must be a tree")
}

#[test]
fn merge_accumulates_a_burst_of_root_and_nested_writes() {
    let mut batch = ChangeTree::new();
    for step in [
        json!({"a": 1}),
        json!({"b": {"c": 2}}),
        json!({"b": {"d": "__deleted__"}}),
        json!({"a": "__null__"}),
    ] {
        merge_deep(&mut batch, tree(step));
    }
    assert_eq!(
        codec::to_json(&batch),
        json!({"a": "__null__", "b": {"c": 2, "d": "__deleted__"}})
    );
}

#[test]
fn codec_round_trips_sentinels_and_nesting() {
    let src = json!({"x": {"y": ["__deleted__", 2]}, "z": "__null__"});
    let decoded = tree(src.clone());
    let y = decoded
        .get("x")
        .and_then(Change::as_tree)
        .and_then(|x| x.get("y"))
        .and_then(Change::as_tree)
        .unwrap();
    assert_eq!(y.shape(), Shape::Sequence);
    assert_eq!(y.get("0"), Some(&Change::Deleted));
    assert_eq!(codec::to_json(&decoded), src);
}

#[test]
fn structure_after_a_deletion_is_kept_as_a_replacement() {
    let mut batch = ChangeTree::new();
    for step in [
        json!({"n": {"a": "__deleted__"}}),
        json!({"n": "__deleted__"}),
        json!({"n": {"x": 1}}),
        json!({"n": {"y": [true]}}),
    ] {
        merge_deep(&mut batch, tree(step));
    }
    let encoded = codec::to_json(&batch);
    assert_eq!(encoded, json!({"n": {"__replace__": {"x": 1, "y": [true]}}}));
    assert!(batch.get("n").is_some_and(Change::is_replace));
    assert_eq!(tree(encoded), batch);
}

proptest! {
    #[test]
    fn patch_order_puts_higher_indices_first(indices in prop::collection::btree_set(0usize..10_000, 1..40)) {
        let keys: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
        let ordered = patch_order(&keys);
        let numeric: Vec<usize> = ordered.iter().map(|k| k.parse().unwrap()).collect();
        let mut expected: Vec<usize> = indices.into_iter().collect();
        expected.reverse();
        prop_assert_eq!(numeric, expected);
    }

    #[test]
    fn merging_distinct_keys_keeps_them_all(keys in prop::collection::btree_set("[a-z]{1,6}", 1..20)) {
        let mut batch = ChangeTree::new();
        for (i, key) in keys.iter().enumerate() {
            merge_deep(&mut batch, ChangeTree::single(key.clone(), Change::Value(json!(i))));
        }
        prop_assert_eq!(batch.len(), keys.len());
        for key in &keys {
            prop_assert!(batch.contains_key(key));
        }
    }

    #[test]
    fn merge_is_last_writer_wins_for_scalars(values in prop::collection::vec(any::<i64>(), 1..20)) {
        let mut batch = ChangeTree::new();
        for v in &values {
            merge_deep(&mut batch, ChangeTree::single("k", Change::Value(json!(v))));
        }
        prop_assert_eq!(batch.get("k"), Some(&Change::Value(json!(values[values.len() - 1]))));
    }
}
