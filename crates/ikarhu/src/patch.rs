//! Applying change trees to a raw graph.
//!
//! Keys are applied in [`patch_order`] (descending), so deleting several
//! sequence indices in one tree removes the intended elements. Entries that
//! change nothing are pruned from the tree, which afterwards describes
//! exactly what was applied.
//!
//! With [`PatchOptions::delete_missing`] the tree is read as a full
//! document (diff mode): keys present in the target but absent from the
//! tree are deleted, nulls are marked as [`Change::Null`], and every level
//! of the resulting tree is a mapping, since sequence positions no longer
//! line up once elements are removed.
//!
//! A tree only recurses into an existing node it can edit in place. Over a
//! node of the other shape (or any node, for a [`Change::Replace`]) it is
//! assigned as a fresh structure, and the applied tree records that as a
//! replacement.

use ikarhu_tree::{is_index, patch_order, Change, ChangeTree, Shape};

use crate::error::ObserveError;
use crate::node::{Node, NodeError};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOptions {
    /// Delete keys the change tree does not mention.
    pub delete_missing: bool,
}

/// Outcome of [`apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchReport {
    /// The input tree with no-op and failed entries pruned.
    pub applied: ChangeTree,
    /// Previous values of applied keys that existed before.
    pub priors: ChangeTree,
    /// For each failed key, the value it held (or [`Change::Deleted`] if it
    /// did not exist).
    pub rollback: ChangeTree,
    pub errors: Vec<String>,
}

impl PatchReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<ChangeTree, ObserveError> {
        if self.errors.is_empty() {
            return Ok(self.applied);
        }
        Err(ObserveError::PatchPartialFailure {
            errors: self.errors,
            rollback: self.rollback,
            applied: self.applied,
        })
    }
}

pub fn patch(target: &Node, changes: ChangeTree) -> PatchReport {
    apply(target, changes, PatchOptions::default())
}

pub fn diff(target: &Node, changes: ChangeTree) -> PatchReport {
    apply(target, changes, PatchOptions { delete_missing: true })
}

/// Applies `changes` to `target` without notifying anyone.
pub fn apply(target: &Node, mut changes: ChangeTree, options: PatchOptions) -> PatchReport {
    let mut report = PatchReport::default();
    apply_node(
        target,
        &mut changes,
        &mut report.priors,
        &mut report.rollback,
        &mut report.errors,
        options,
    );
    report.applied = changes;
    report
}

enum Step {
    Keep(Option<Change>),
    Prune,
    Failed { previous: Change, error: NodeError },
}

fn apply_node(
    target: &Node,
    changes: &mut ChangeTree,
    priors: &mut ChangeTree,
    rollback: &mut ChangeTree,
    errors: &mut Vec<String>,
    options: PatchOptions,
) {
    if options.delete_missing {
        mark_missing(target, changes);
    }

    for key in patch_order(changes.keys()) {
        let current = target.get(&key);
        let step = match (current.as_ref(), changes.get_mut(&key)) {
            (_, None) => continue,
            (Some(Value::Node(child)), Some(Change::Tree(sub))) if edits_in_place(child, sub, options) => {
                let mut sub_priors = ChangeTree::new();
                let mut sub_rollback = ChangeTree::new();
                apply_node(child, sub, &mut sub_priors, &mut sub_rollback, errors, options);
                if !sub_rollback.is_empty() {
                    rollback.insert(key.clone(), Change::Tree(sub_rollback));
                }
                if sub.is_empty() {
                    Step::Prune
                } else {
                    Step::Keep((!sub_priors.is_empty()).then_some(Change::Tree(sub_priors)))
                }
            }
            (_, Some(change)) => match apply_leaf(target, &key, current.as_ref(), change) {
                Ok(Leaf::Unchanged) => Step::Prune,
                Ok(Leaf::Applied(prior)) => {
                    if let (Some(Value::Node(_)), Change::Tree(sub)) = (&prior, &mut *change) {
                        *change = Change::Replace(std::mem::take(sub));
                    }
                    Step::Keep(prior.as_ref().map(Value::to_change))
                }
                Err(error) => Step::Failed {
                    previous: current.as_ref().map_or(Change::Deleted, Value::to_change),
                    error,
                },
            },
        };

        match step {
            Step::Keep(prior) => {
                if let Some(prior) = prior {
                    priors.insert(key, prior);
                }
            }
            Step::Prune => {
                changes.remove(&key);
            }
            Step::Failed { previous, error } => {
                tracing::debug!(key = %key, %error, "change rejected");
                changes.remove(&key);
                rollback.insert(key, previous);
                errors.push(error.to_string());
            }
        }
    }

    if options.delete_missing && changes.shape().is_sequence() {
        changes.set_shape(Shape::Mapping);
    }
}

/// Whether `tree` describes edits to `node` rather than a new structure.
///
/// Same shapes always edit in place. Outside diff mode a mapping of index
/// keys also edits a sequence, which is how folded sequence edits arrive.
fn edits_in_place(node: &Node, tree: &ChangeTree, options: PatchOptions) -> bool {
    match (node.shape(), tree.shape()) {
        (ours, theirs) if ours == theirs => true,
        (Shape::Sequence, Shape::Mapping) => !options.delete_missing && tree.keys().all(|k| is_index(k)),
        _ => false,
    }
}

enum Leaf {
    Unchanged,
    Applied(Option<Value>),
}

fn apply_leaf(
    target: &Node,
    key: &str,
    current: Option<&Value>,
    change: &Change,
) -> Result<Leaf, NodeError> {
    let value = match change {
        Change::Deleted if current.is_none() => return Ok(Leaf::Unchanged),
        Change::Deleted => return target.remove(key).map(Leaf::Applied),
        other => match Value::from_change(other) {
            Some(value) => value,
            None => return Ok(Leaf::Unchanged),
        },
    };
    // A fresh node from a tree never equals an existing one, so replacing a
    // scalar with a structure always applies.
    if current == Some(&value) {
        return Ok(Leaf::Unchanged);
    }
    target.set(key, value).map(Leaf::Applied)
}

/// Diff-mode preparation of one level: absent keys become deletions and
/// nulls that would change something become explicit markers.
fn mark_missing(target: &Node, changes: &mut ChangeTree) {
    for key in target.keys() {
        if !changes.contains_key(&key) {
            changes.insert(key, Change::Deleted);
        }
    }
    let nulls: Vec<String> = changes
        .iter()
        .filter(|(_, change)| matches!(change, Change::Value(serde_json::Value::Null)))
        .map(|(key, _)| key.clone())
        .collect();
    for key in nulls {
        changes.insert(key, Change::Null);
    }
}
