//! Deep merge of change trees, used to accumulate a batch.

use crate::change::{Change, ChangeTree};

/// Merges `source` into `target`.
///
/// Nested trees combine key by key; anything else overwrites what `target`
/// held for that key. A tree arriving over a deletion or a scalar describes a
/// structure that did not exist before, so it is kept as a
/// [`Change::Replace`]; later trees for that key merge into the replacement.
pub fn merge_deep(target: &mut ChangeTree, source: ChangeTree) {
    for (key, change) in source {
        let sub = match change {
            Change::Tree(sub) => sub,
            other => {
                target.insert(key, other);
                continue;
            }
        };
        match target.get_mut(&key) {
            None => {
                target.insert(key, Change::Tree(sub));
            }
            Some(Change::Tree(existing) | Change::Replace(existing)) => merge_deep(existing, sub),
            Some(slot) => *slot = Change::Replace(sub),
        }
    }
}

/// Merges a single `{key: change}` entry into `target`.
pub fn merge_entry(target: &mut ChangeTree, key: impl Into<String>, change: Change) {
    merge_deep(target, ChangeTree::single(key, change));
}
