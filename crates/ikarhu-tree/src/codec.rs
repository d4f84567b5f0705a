//! JSON encoding of change trees.
//!
//! Sentinels are spelled as the strings in [`crate::sentinel`]; a
//! replacement is an object whose only key is [`REPLACE`]. A sequence tree
//! whose keys are exactly `0..n` encodes as an array; every other tree
//! encodes as an object.

use serde_json::{Map, Value};

use crate::change::{Change, ChangeTree, Shape};
use crate::order::key_cmp;
use crate::sentinel::{DELETED, NULL_MARKER, REPLACE};
use crate::TreeError;

// ── Encode ────────────────────────────────────────────────────────────────

pub fn to_json(tree: &ChangeTree) -> Value {
    if tree.shape().is_sequence() && is_dense(tree) {
        let mut keys: Vec<&String> = tree.keys().collect();
        keys.sort_by(|a, b| key_cmp(a, b));
        let arr = keys
            .into_iter()
            .filter_map(|k| tree.get(k))
            .map(change_to_json)
            .collect();
        return Value::Array(arr);
    }
    let mut map = Map::new();
    for (key, change) in tree {
        map.insert(key.clone(), change_to_json(change));
    }
    Value::Object(map)
}

pub fn change_to_json(change: &Change) -> Value {
    match change {
        Change::Deleted => Value::String(DELETED.to_string()),
        Change::Null => Value::String(NULL_MARKER.to_string()),
        Change::Value(v) => v.clone(),
        Change::Tree(t) => to_json(t),
        Change::Replace(t) => {
            let mut wrapper = Map::new();
            wrapper.insert(REPLACE.to_string(), to_json(t));
            Value::Object(wrapper)
        }
    }
}

fn is_dense(tree: &ChangeTree) -> bool {
    (0..tree.len()).all(|i| tree.contains_key(&i.to_string()))
}

// ── Decode ────────────────────────────────────────────────────────────────

/// Decodes a change tree. The top level must be an object or an array.
pub fn from_json(value: &Value) -> Result<ChangeTree, TreeError> {
    match change_from_json(value) {
        Change::Tree(tree) | Change::Replace(tree) => Ok(tree),
        _ => Err(TreeError::NotATree(type_name(value))),
    }
}

pub fn change_from_json(value: &Value) -> Change {
    match value {
        Value::String(s) if s == DELETED => Change::Deleted,
        Value::String(s) if s == NULL_MARKER => Change::Null,
        Value::Object(map) if map.len() == 1 => match map.get(REPLACE) {
            Some(inner @ (Value::Object(_) | Value::Array(_))) => match change_from_json(inner) {
                Change::Tree(tree) | Change::Replace(tree) => Change::Replace(tree),
                other => other,
            },
            _ => Change::Tree(
                map.iter()
                    .map(|(k, v)| (k.clone(), change_from_json(v)))
                    .collect(),
            ),
        },
        Value::Object(map) => Change::Tree(
            map.iter()
                .map(|(k, v)| (k.clone(), change_from_json(v)))
                .collect(),
        ),
        Value::Array(arr) => {
            let mut tree = ChangeTree::with_shape(Shape::Sequence);
            for (i, v) in arr.iter().enumerate() {
                tree.insert(i.to_string(), change_from_json(v));
            }
            Change::Tree(tree)
        }
        scalar => Change::Value(scalar.clone()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
