//! Raw structured nodes of an observed graph.
//!
//! A [`Node`] is a shared handle: cloning it clones the reference, not the
//! contents. Writes through a node are not observed; go through a view for
//! that. A write fails on the node's own policy (a frozen node, a read-only
//! key, a key that is not a valid sequence index) or when the value would
//! make the node contain itself.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use ikarhu_tree::{is_index, key_cmp, Change, ChangeTree, Shape};
use indexmap::IndexMap;
use thiserror::Error;

use crate::value::Value;

/// Address-based identity of a node, stable while the node is alive.
pub type NodeId = usize;

// ── Error ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("cannot write key '{0}': node is frozen")]
    Frozen(String),
    #[error("cannot write key '{0}': key is read-only")]
    ReadOnly(String),
    #[error("'{0}' is not a valid sequence index")]
    InvalidIndex(String),
    #[error("cannot append to a mapping")]
    NotASequence,
    #[error("cannot write key '{0}': the value contains this node")]
    Cycle(String),
}

// ── Node ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

struct NodeData {
    body: Body,
    frozen: bool,
    read_only: HashSet<String>,
}

enum Body {
    Mapping(IndexMap<String, Value>),
    Sequence(Vec<Value>),
}

impl NodeData {
    fn new(body: Body) -> Self {
        Self {
            body,
            frozen: false,
            read_only: HashSet::new(),
        }
    }

    fn check_writable(&self, key: &str) -> Result<(), NodeError> {
        if self.frozen {
            return Err(NodeError::Frozen(key.to_string()));
        }
        if self.read_only.contains(key) {
            return Err(NodeError::ReadOnly(key.to_string()));
        }
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        match &self.body {
            Body::Mapping(map) => map.contains_key(key),
            Body::Sequence(seq) => parse_index(key).is_ok_and(|i| i < seq.len()),
        }
    }
}

/// Canonical decimal index only: `"01"` is not an index.
fn parse_index(key: &str) -> Result<usize, NodeError> {
    key.parse::<usize>()
        .ok()
        .filter(|i| is_index(key) && i.to_string() == key)
        .ok_or_else(|| NodeError::InvalidIndex(key.to_string()))
}

impl Node {
    pub fn mapping() -> Self {
        Self::with_body(Body::Mapping(IndexMap::new()))
    }

    pub fn sequence() -> Self {
        Self::with_body(Body::Sequence(Vec::new()))
    }

    fn with_body(body: Body) -> Self {
        Node(Rc::new(RefCell::new(NodeData::new(body))))
    }

    pub fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Self {
        let entries = map.into_iter().map(|(k, v)| (k, Value::from(v))).collect();
        Self::with_body(Body::Mapping(entries))
    }

    pub fn from_vec(arr: Vec<serde_json::Value>) -> Self {
        Self::with_body(Body::Sequence(arr.into_iter().map(Value::from).collect()))
    }

    /// Builds a node from JSON. Scalars have no node form.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(Self::from_map(map)),
            serde_json::Value::Array(arr) => Some(Self::from_vec(arr)),
            _ => None,
        }
    }

    /// Materializes the values a change tree assigns. Deleted entries are
    /// skipped; sequence trees are laid out by index.
    pub fn from_tree(tree: &ChangeTree) -> Self {
        match tree.shape() {
            Shape::Mapping => {
                let entries = tree
                    .iter()
                    .filter_map(|(k, c)| Value::from_change(c).map(|v| (k.clone(), v)))
                    .collect();
                Self::with_body(Body::Mapping(entries))
            }
            Shape::Sequence => {
                let mut entries: Vec<(&String, &Change)> =
                    tree.iter().filter(|(k, _)| parse_index(k).is_ok()).collect();
                entries.sort_by(|a, b| key_cmp(a.0, b.0));
                let mut seq: Vec<Value> = Vec::with_capacity(entries.len());
                for (key, change) in entries {
                    let (Ok(idx), Some(value)) = (parse_index(key), Value::from_change(change)) else {
                        continue;
                    };
                    if idx >= seq.len() {
                        seq.resize(idx, Value::Null);
                        seq.push(value);
                    } else {
                        seq[idx] = value;
                    }
                }
                Self::with_body(Body::Sequence(seq))
            }
        }
    }

    pub fn id(&self) -> NodeId {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn shape(&self) -> Shape {
        match self.0.borrow().body {
            Body::Mapping(_) => Shape::Mapping,
            Body::Sequence(_) => Shape::Sequence,
        }
    }

    pub fn len(&self) -> usize {
        match &self.0.borrow().body {
            Body::Mapping(map) => map.len(),
            Body::Sequence(seq) => seq.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains(key)
    }

    /// Own keys in order: insertion order for mappings, `0..len` for sequences.
    pub fn keys(&self) -> Vec<String> {
        match &self.0.borrow().body {
            Body::Mapping(map) => map.keys().cloned().collect(),
            Body::Sequence(seq) => (0..seq.len()).map(|i| i.to_string()).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        match &self.0.borrow().body {
            Body::Mapping(map) => map.get(key).cloned(),
            Body::Sequence(seq) => parse_index(key).ok().and_then(|i| seq.get(i).cloned()),
        }
    }

    /// Stores `value` at `key` and returns what was there before.
    ///
    /// Writing a sequence index past the end pads the gap with `Null`. A
    /// value from which this node can be reached is rejected, so the graph
    /// stays acyclic.
    pub fn set(&self, key: &str, value: Value) -> Result<Option<Value>, NodeError> {
        if let Value::Node(child) = &value {
            if child.reaches(self) {
                return Err(NodeError::Cycle(key.to_string()));
            }
        }
        let mut data = self.0.borrow_mut();
        data.check_writable(key)?;
        match &mut data.body {
            Body::Mapping(map) => Ok(map.insert(key.to_string(), value)),
            Body::Sequence(seq) => {
                let idx = parse_index(key)?;
                if idx < seq.len() {
                    Ok(Some(std::mem::replace(&mut seq[idx], value)))
                } else {
                    seq.resize(idx, Value::Null);
                    seq.push(value);
                    Ok(None)
                }
            }
        }
    }

    /// Removes `key` and returns the removed value. Removing a sequence index
    /// splices the element out. Removing an absent key is not a write and
    /// succeeds with `None` even on a frozen node.
    pub fn remove(&self, key: &str) -> Result<Option<Value>, NodeError> {
        let mut data = self.0.borrow_mut();
        if !data.contains(key) {
            return Ok(None);
        }
        data.check_writable(key)?;
        match &mut data.body {
            Body::Mapping(map) => Ok(map.shift_remove(key)),
            Body::Sequence(seq) => {
                let idx = parse_index(key)?;
                Ok(Some(seq.remove(idx)))
            }
        }
    }

    /// Whether `target` is this node or sits anywhere below it.
    fn reaches(&self, target: &Node) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            if node.ptr_eq(target) {
                return true;
            }
            if !seen.insert(node.id()) {
                continue;
            }
            match &node.0.borrow().body {
                Body::Mapping(map) => stack.extend(map.values().filter_map(Value::as_node).cloned()),
                Body::Sequence(seq) => stack.extend(seq.iter().filter_map(Value::as_node).cloned()),
            }
        }
        false
    }

    /// Rejects every further write or delete.
    pub fn freeze(&self) {
        self.0.borrow_mut().frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.0.borrow().frozen
    }

    /// Rejects further writes and deletes of `key`.
    pub fn set_read_only(&self, key: impl Into<String>) {
        self.0.borrow_mut().read_only.insert(key.into());
    }

    pub fn is_read_only(&self, key: &str) -> bool {
        self.0.borrow().read_only.contains(key)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match &self.0.borrow().body {
            Body::Mapping(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Body::Sequence(seq) => serde_json::Value::Array(seq.iter().map(Value::to_json).collect()),
        }
    }

    /// Snapshot of the whole node as a change tree of the same shape.
    pub fn to_change_tree(&self) -> ChangeTree {
        let mut tree = ChangeTree::with_shape(self.shape());
        for key in self.keys() {
            if let Some(value) = self.get(&key) {
                tree.insert(key, value.to_change());
            }
        }
        tree
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("shape", &self.shape())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: serde_json::Value) -> Node {
        Node::from_json(value).unwrap()
    }

    #[test]
    fn sequence_set_past_end_pads_with_null() {
        let n = node(json!([1]));
        assert_eq!(n.set("3", Value::from(4)), Ok(None));
        assert_eq!(n.to_json(), json!([1, null, null, 4]));
    }

    #[test]
    fn sequence_remove_splices() {
        let n = node(json!(["x", "y", "z"]));
        let removed = n.remove("1").unwrap();
        assert_eq!(removed.and_then(|v| v.as_str().map(str::to_string)), Some("y".to_string()));
        assert_eq!(n.to_json(), json!(["x", "z"]));
    }

    #[test]
    fn non_canonical_index_is_rejected() {
        let n = node(json!([1, 2]));
        assert_eq!(n.set("01", Value::Null), Err(NodeError::InvalidIndex("01".into())));
        assert_eq!(n.set("a", Value::Null), Err(NodeError::InvalidIndex("a".into())));
        assert!(n.get("01").is_none());
    }

    #[test]
    fn frozen_and_read_only_reject_writes() {
        let n = node(json!({"a": 1, "b": 2}));
        n.set_read_only("a");
        assert_eq!(n.set("a", Value::from(5)), Err(NodeError::ReadOnly("a".into())));
        assert_eq!(n.remove("a"), Err(NodeError::ReadOnly("a".into())));
        assert!(n.set("b", Value::from(3)).is_ok());

        n.freeze();
        assert_eq!(n.set("b", Value::from(4)), Err(NodeError::Frozen("b".into())));
        assert_eq!(n.remove("missing"), Ok(None));
        assert_eq!(n.to_json(), json!({"a": 1, "b": 3}));
    }

    #[test]
    fn mapping_remove_keeps_order() {
        let n = node(json!({"a": 1, "b": 2, "c": 3}));
        n.remove("b").unwrap();
        assert_eq!(n.keys(), vec!["a", "c"]);
    }

    #[test]
    fn from_tree_lays_out_sequence_by_index() {
        let mut tree = ChangeTree::with_shape(Shape::Sequence);
        tree.insert("1", Change::Value(json!("b")));
        tree.insert("0", Change::Value(json!("a")));
        tree.insert("2", Change::Deleted);
        assert_eq!(Node::from_tree(&tree).to_json(), json!(["a", "b"]));
    }

    #[test]
    fn self_containing_writes_are_rejected() {
        let outer = node(json!({"inner": {"leaf": []}}));
        let leaf = outer.get("inner").and_then(|v| v.as_node().cloned()).unwrap();
        let leaf = leaf.get("leaf").and_then(|v| v.as_node().cloned()).unwrap();

        assert_eq!(outer.set("me", Value::from(&outer)), Err(NodeError::Cycle("me".into())));
        assert_eq!(leaf.set("0", Value::from(&outer)), Err(NodeError::Cycle("0".into())));
        assert_eq!(outer.to_json(), json!({"inner": {"leaf": []}}));

        // Sharing a node in two places is not a cycle.
        assert!(outer.set("alias", Value::from(&leaf)).is_ok());
        assert_eq!(outer.to_json(), json!({"inner": {"leaf": []}, "alias": []}));
    }

    #[test]
    fn identity_follows_the_handle() {
        let a = node(json!({}));
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.id(), b.id());
        assert!(!a.ptr_eq(&node(json!({}))));
    }
}
