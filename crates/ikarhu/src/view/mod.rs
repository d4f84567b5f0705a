//! Intercepting views over a raw graph.
//!
//! [`Observed`] wraps the root node and owns the listeners; a [`Relay`] wraps
//! a nested node and forwards its reports to the root, folded under the path
//! at which it was reached. Both share the helpers below, which perform one
//! mutation on a raw node and describe it as `{key: change}` reports.

pub mod relay;
pub mod root;

use std::rc::Weak;

use ikarhu_tree::{Change, ChangeTree, Shape};

use crate::node::{Node, NodeError};
use crate::value::Value;

pub use relay::Relay;
pub use root::Observed;

use root::RootInner;

// ── Field ─────────────────────────────────────────────────────────────────

/// What a read through a view returns: scalars as they are, structured
/// children wrapped in the relay cached for them.
#[derive(Debug, Clone)]
pub enum Field {
    Value(Value),
    View(Relay),
}

impl Field {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(v) => Some(v),
            Field::View(_) => None,
        }
    }

    pub fn as_view(&self) -> Option<&Relay> {
        match self {
            Field::View(r) => Some(r),
            Field::Value(_) => None,
        }
    }

    pub fn into_view(self) -> Option<Relay> {
        match self {
            Field::View(r) => Some(r),
            Field::Value(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    pub fn is_null(&self) -> bool {
        self.as_value().is_some_and(Value::is_null)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Field::Value(v) => v.to_json(),
            Field::View(r) => r.to_json(),
        }
    }
}

// ── Route ─────────────────────────────────────────────────────────────────

/// Where a relay was last reached from: the root key it hangs under and the
/// keys below that, innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Route {
    top: String,
    ancestors: Vec<String>,
}

impl Route {
    pub(crate) fn top(key: &str) -> Self {
        Self {
            top: key.to_string(),
            ancestors: Vec::new(),
        }
    }

    pub(crate) fn child(&self, key: &str) -> Self {
        let mut ancestors = Vec::with_capacity(self.ancestors.len() + 1);
        ancestors.push(key.to_string());
        ancestors.extend(self.ancestors.iter().cloned());
        Self {
            top: self.top.clone(),
            ancestors,
        }
    }

    pub(crate) fn top_key(&self) -> &str {
        &self.top
    }

    /// Keys from the root down to the relay's node.
    pub(crate) fn path(&self) -> Vec<String> {
        let mut path = Vec::with_capacity(self.ancestors.len() + 1);
        path.push(self.top.clone());
        path.extend(self.ancestors.iter().rev().cloned());
        path
    }

    /// Wraps a `{key: change}` report made at this route so it can be merged
    /// under the top key.
    pub(crate) fn fold(&self, key: &str, change: Change) -> Change {
        Change::Tree(ChangeTree::fold(&self.ancestors, key, change))
    }
}

// ── Shared mutation helpers ───────────────────────────────────────────────

/// One intercepted mutation, described relative to the node it hit.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Report {
    pub(crate) key: String,
    pub(crate) change: Change,
    pub(crate) prior: Option<Change>,
}

pub(crate) fn read(
    root: &Weak<RootInner>,
    node: &Node,
    key: &str,
    route: impl FnOnce() -> Route,
) -> Option<Field> {
    match node.get(key)? {
        Value::Node(child) => Some(Field::View(relay_for(root, child, route()))),
        scalar => Some(Field::Value(scalar)),
    }
}

fn relay_for(root: &Weak<RootInner>, node: Node, route: Route) -> Relay {
    match root.upgrade() {
        Some(inner) => inner.relays.borrow_mut().resolve(node, route, root),
        None => Relay::new(node, route, Weak::new()),
    }
}

/// Describes `value` taking the place of `prior`.
///
/// Applying a tree over an existing structure recurses into it, so a
/// structure replacing one of the same shape is described as the difference:
/// keys only the old one had are marked deleted, shared children are left
/// out. A structure replacing one of the other shape is wrapped as a
/// [`Change::Replace`]. Applied over `prior`, the result is exactly `value`.
fn replacement(prior: Option<&Value>, value: &Value) -> Change {
    match (prior, value) {
        (Some(Value::Node(old)), Value::Node(new)) if old.shape() == new.shape() => {
            let mut tree = ChangeTree::with_shape(new.shape());
            for key in old.keys() {
                if !new.contains_key(&key) {
                    tree.insert(key, Change::Deleted);
                }
            }
            for key in new.keys() {
                let (before, Some(after)) = (old.get(&key), new.get(&key)) else {
                    continue;
                };
                if before.as_ref() != Some(&after) {
                    tree.insert(key, replacement(before.as_ref(), &after));
                }
            }
            Change::Tree(tree)
        }
        (Some(Value::Node(_)), Value::Node(new)) => Change::Replace(new.to_change_tree()),
        _ => value.to_change(),
    }
}

/// Assigns `value` unless the key already holds an equal one.
pub(crate) fn write(node: &Node, key: &str, value: Value) -> Result<Option<Report>, NodeError> {
    let current = node.get(key);
    if current.as_ref() == Some(&value) {
        return Ok(None);
    }
    let change = replacement(current.as_ref(), &value);
    let prior = node.set(key, value)?;
    Ok(Some(Report {
        key: key.to_string(),
        change,
        prior: prior.as_ref().map(Value::to_change),
    }))
}

/// Removes `key`. On a sequence the removal splices, so every later index
/// is reported with the value that moved into it and the old last index as
/// deleted; positions whose value did not change are left out.
pub(crate) fn delete(node: &Node, key: &str) -> Result<Vec<Report>, NodeError> {
    if !node.contains_key(key) {
        return Ok(Vec::new());
    }
    match node.shape() {
        Shape::Mapping => {
            let prior = node.remove(key)?;
            Ok(vec![Report {
                key: key.to_string(),
                change: Change::Deleted,
                prior: prior.as_ref().map(Value::to_change),
            }])
        }
        Shape::Sequence => {
            let Ok(start) = key.parse::<usize>() else {
                return Ok(Vec::new());
            };
            let before: Vec<Value> = (start..node.len())
                .filter_map(|i| node.get(&i.to_string()))
                .collect();
            node.remove(key)?;

            let mut reports = Vec::with_capacity(before.len());
            for (offset, prior) in before.into_iter().enumerate() {
                let index = (start + offset).to_string();
                let change = match node.get(&index) {
                    Some(now) if now == prior => continue,
                    Some(now) => replacement(Some(&prior), &now),
                    None => Change::Deleted,
                };
                reports.push(Report {
                    key: index,
                    change,
                    prior: Some(prior.to_change()),
                });
            }
            Ok(reports)
        }
    }
}

/// Appends to a sequence, returning the new element's index.
pub(crate) fn push(node: &Node, value: Value) -> Result<(usize, Option<Report>), NodeError> {
    if !node.shape().is_sequence() {
        return Err(NodeError::NotASequence);
    }
    let index = node.len();
    let report = write(node, &index.to_string(), value)?;
    Ok((index, report))
}

/// Follows `path` from `start` through nested views.
pub(crate) fn walk(start: Option<Field>, path: &[String]) -> Option<Field> {
    let mut field = start?;
    for key in path {
        field = field.as_view()?.get(key)?;
    }
    Some(field)
}
