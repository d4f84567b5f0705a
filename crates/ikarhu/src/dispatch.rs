//! Per-root batch accumulation.
//!
//! Every intercepted mutation merges into the pending batch and pushes the
//! flush back (debounce): at most one flush is scheduled per root, and a
//! steady stream of mutations keeps postponing it.

use ikarhu_tree::{merge_entry, Change, ChangeTree};

use crate::scheduler::TaskHandle;

#[derive(Debug, Default)]
pub(crate) struct Dispatcher {
    changes: ChangeTree,
    priors: ChangeTree,
    timer: Option<TaskHandle>,
}

impl Dispatcher {
    /// Merges one `{key: change}` entry (and its prior value, if the key
    /// existed) into the pending batch.
    pub(crate) fn accumulate(&mut self, key: &str, change: Change, prior: Option<Change>) {
        tracing::trace!(key, "accumulating change");
        merge_entry(&mut self.changes, key, change);
        if let Some(prior) = prior {
            merge_entry(&mut self.priors, key, prior);
        }
    }

    /// Records the newly scheduled flush. The caller cancels the previous one
    /// first, via [`Dispatcher::take_timer`].
    pub(crate) fn set_timer(&mut self, handle: TaskHandle) {
        self.timer = Some(handle);
    }

    pub(crate) fn take_timer(&mut self) -> Option<TaskHandle> {
        self.timer.take()
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Hands out the batch and resets the accumulators to empty.
    pub(crate) fn take(&mut self) -> (ChangeTree, ChangeTree) {
        self.timer = None;
        (std::mem::take(&mut self.changes), std::mem::take(&mut self.priors))
    }
}
