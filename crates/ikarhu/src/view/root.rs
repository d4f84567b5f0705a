//! The root view: listeners, batching and the patch/diff entry points.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ikarhu_tree::{parse_pointer, Change, ChangeTree, Shape};

use super::{Field, Report, Route};
use crate::dispatch::Dispatcher;
use crate::error::ObserveError;
use crate::identity::IdentityCache;
use crate::listeners::{self, ListenerId, ListenerRegistry};
use crate::node::{Node, NodeError};
use crate::patch::{self, PatchOptions};
use crate::scheduler::{Scheduler, TaskQueue};
use crate::value::Value;

/// An observed graph.
///
/// Writes through this view (or through any [`crate::Relay`] read from it)
/// are merged into one pending change tree per root. The batch is delivered
/// to every listener once the scheduler runs the deferred flush; each new
/// write pushes that flush back. With no listeners registered, writes still
/// apply but nothing is recorded.
///
/// Cloning an `Observed` yields another handle to the same root.
#[derive(Clone)]
pub struct Observed {
    inner: Rc<RootInner>,
}

pub(crate) struct RootInner {
    node: Node,
    listeners: RefCell<ListenerRegistry>,
    dispatcher: RefCell<Dispatcher>,
    pub(crate) relays: RefCell<IdentityCache>,
    scheduler: Rc<dyn Scheduler>,
}

impl RootInner {
    /// Records `{key: change}` into the pending batch and reschedules the
    /// flush.
    pub(crate) fn dispatch(self: &Rc<Self>, key: &str, change: Change, prior: Option<Change>) {
        if self.listeners.borrow().is_empty() {
            tracing::trace!(key, "no listeners; change not recorded");
            return;
        }
        let previous = self.dispatcher.borrow_mut().take_timer();
        if let Some(handle) = previous {
            self.scheduler.cancel(handle);
        }
        self.dispatcher.borrow_mut().accumulate(key, change, prior);

        let weak = Rc::downgrade(self);
        let handle = self.scheduler.schedule(Box::new(move || {
            if let Some(root) = weak.upgrade() {
                root.flush();
            }
        }));
        self.dispatcher.borrow_mut().set_timer(handle);
    }

    fn report(self: &Rc<Self>, reports: Vec<Report>) {
        for Report { key, change, prior } in reports {
            self.dispatch(&key, change, prior);
        }
    }

    /// Delivers the pending batch, if any.
    fn flush(&self) -> bool {
        let (changes, priors) = self.dispatcher.borrow_mut().take();
        if changes.is_empty() {
            return false;
        }
        self.notify_now(&changes, &priors);
        true
    }

    fn notify_now(&self, changes: &ChangeTree, priors: &ChangeTree) {
        if changes.is_empty() {
            return;
        }
        let snapshot = self.listeners.borrow().snapshot();
        tracing::debug!(keys = changes.len(), listeners = snapshot.len(), "notifying listeners");
        listeners::notify(&snapshot, changes, priors);
    }
}

impl Observed {
    /// Observes a mapping or sequence, flushing through the calling thread's
    /// default [`TaskQueue`].
    pub fn wrap(value: impl Into<Value>) -> Result<Self, ObserveError> {
        Self::with_scheduler(value, Rc::new(TaskQueue::current()))
    }

    /// Observes a plain JSON object or array.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ObserveError> {
        Self::wrap(value)
    }

    pub fn with_scheduler(
        value: impl Into<Value>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Result<Self, ObserveError> {
        let node = match value.into() {
            Value::Node(node) => node,
            scalar => {
                return Err(ObserveError::Argument(format!(
                    "only a mapping or a sequence can be observed, got {}",
                    scalar.to_json()
                )))
            }
        };
        tracing::trace!(node = ?node, "observing");
        Ok(Self {
            inner: Rc::new(RootInner {
                node,
                listeners: RefCell::new(ListenerRegistry::default()),
                dispatcher: RefCell::new(Dispatcher::default()),
                relays: RefCell::new(IdentityCache::default()),
                scheduler,
            }),
        })
    }

    fn weak(&self) -> Weak<RootInner> {
        Rc::downgrade(&self.inner)
    }

    // ── Listeners ─────────────────────────────────────────────────────────

    /// Registers `listener`, called with `(changes, priors)` for every
    /// delivered batch. `priors` holds the replaced values of keys that
    /// existed before.
    pub fn listen<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&ChangeTree, &ChangeTree) + 'static,
    {
        self.inner.listeners.borrow_mut().add(listener)
    }

    /// Removes one listener, or all of them with `None`. Removing an
    /// unknown id does nothing.
    pub fn unlisten(&self, id: Option<ListenerId>) -> &Self {
        let mut registry = self.inner.listeners.borrow_mut();
        match id {
            Some(id) => {
                if !registry.remove(id) {
                    tracing::trace!(?id, "unlisten: unknown listener");
                }
            }
            None => registry.clear(),
        }
        self
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Delivers the pending batch now instead of waiting for the scheduler.
    /// Returns whether anything was delivered.
    pub fn flush(&self) -> bool {
        let timer = self.inner.dispatcher.borrow_mut().take_timer();
        if let Some(handle) = timer {
            self.inner.scheduler.cancel(handle);
        }
        self.inner.flush()
    }

    pub fn has_pending(&self) -> bool {
        self.inner.dispatcher.borrow().has_pending()
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    /// Reads `key`. Structured values come back as the relay cached for
    /// that node.
    pub fn get(&self, key: &str) -> Option<Field> {
        super::read(&self.weak(), &self.inner.node, key, || Route::top(key))
    }

    pub fn at_ptr(&self, pointer: &str) -> Option<Field> {
        let path = parse_pointer(pointer);
        let (first, rest) = path.split_first()?;
        super::walk(self.get(first), rest)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.node.keys()
    }

    pub fn len(&self) -> usize {
        self.inner.node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.node.contains_key(key)
    }

    pub fn shape(&self) -> Shape {
        self.inner.node.shape()
    }

    /// Plain JSON snapshot of the whole graph.
    pub fn to_json(&self) -> serde_json::Value {
        self.inner.node.to_json()
    }

    /// The raw root node. Writes to it are not reported.
    pub fn node(&self) -> &Node {
        &self.inner.node
    }

    pub fn ptr_eq(&self, other: &Observed) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Writes ────────────────────────────────────────────────────────────

    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<bool, NodeError> {
        let report = super::write(&self.inner.node, key, value.into())?;
        let changed = report.is_some();
        self.inner.report(report.into_iter().collect());
        Ok(changed)
    }

    pub fn delete(&self, key: &str) -> Result<bool, NodeError> {
        let existed = self.inner.node.contains_key(key);
        let reports = super::delete(&self.inner.node, key)?;
        self.inner.report(reports);
        Ok(existed)
    }

    pub fn push(&self, value: impl Into<Value>) -> Result<usize, NodeError> {
        let (index, report) = super::push(&self.inner.node, value.into())?;
        self.inner.report(report.into_iter().collect());
        Ok(index)
    }

    // ── Patch / diff ──────────────────────────────────────────────────────

    /// Applies `changes` to the raw graph and notifies listeners right away
    /// with what was applied. Writes made by a patch bypass the batch.
    ///
    /// Keys that cannot be written are dropped from the result; if any were,
    /// listeners still hear about the rest before the error is returned.
    pub fn patch(&self, changes: ChangeTree) -> Result<ChangeTree, ObserveError> {
        let report = patch::apply(&self.inner.node, changes, PatchOptions::default());
        self.inner.notify_now(&report.applied, &report.priors);
        report.into_result()
    }

    /// Makes the graph equal to `changes` read as a full document: keys it
    /// does not mention are deleted. Returns the tree actually applied, with
    /// null values marked, sequence levels turned into mappings, and a
    /// structure that replaced one of the other shape wrapped as a
    /// replacement.
    ///
    /// Keys that cannot be written are logged and left out.
    pub fn diff(&self, changes: ChangeTree) -> ChangeTree {
        let report = patch::apply(&self.inner.node, changes, PatchOptions { delete_missing: true });
        for error in &report.errors {
            tracing::warn!(%error, "diff left a key unapplied");
        }
        self.inner.notify_now(&report.applied, &report.priors);
        report.applied
    }

    #[cfg(test)]
    pub(crate) fn live_relays(&self) -> usize {
        self.inner.relays.borrow().live()
    }
}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observed")
            .field("node", &self.inner.node)
            .field("listeners", &self.listener_count())
            .field("pending", &self.has_pending())
            .finish()
    }
}

/// Assigning an observed root stores the raw root node.
impl From<&Observed> for Value {
    fn from(observed: &Observed) -> Self {
        Value::Node(observed.inner.node.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observed(value: serde_json::Value) -> (Observed, TaskQueue) {
        let queue = TaskQueue::new();
        let root = Observed::with_scheduler(value, Rc::new(queue.clone())).unwrap();
        (root, queue)
    }

    fn recorder(root: &Observed) -> Rc<RefCell<Vec<(serde_json::Value, serde_json::Value)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        root.listen(move |changes, priors| {
            sink.borrow_mut()
                .push((ikarhu_tree::codec::to_json(changes), ikarhu_tree::codec::to_json(priors)));
        });
        log
    }

    #[test]
    fn wrapping_a_scalar_is_rejected() {
        let err = Observed::wrap(3).unwrap_err();
        assert!(matches!(err, ObserveError::Argument(_)));
    }

    #[test]
    fn at_most_one_flush_is_pending() {
        let (root, queue) = observed(json!({}));
        let _log = recorder(&root);
        root.set("a", 1).unwrap();
        root.set("b", 2).unwrap();
        root.set("c", 3).unwrap();
        assert_eq!(queue.len(), 1);
        assert!(root.has_pending());
    }

    #[test]
    fn without_listeners_nothing_is_recorded() {
        let (root, queue) = observed(json!({}));
        root.set("a", 1).unwrap();
        assert!(queue.is_empty());
        assert!(!root.has_pending());
        assert_eq!(root.to_json(), json!({"a": 1}));
    }

    #[test]
    fn manual_flush_cancels_the_scheduled_one() {
        let (root, queue) = observed(json!({}));
        let log = recorder(&root);
        root.set("a", 1).unwrap();
        assert!(root.flush());
        assert!(queue.is_empty());
        assert!(!root.flush());
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn relay_cache_is_weak() {
        let (root, _queue) = observed(json!({"a": {"b": 1}}));
        let relay = root.get("a").and_then(Field::into_view).unwrap();
        assert_eq!(root.live_relays(), 1);
        drop(relay);
        assert_eq!(root.live_relays(), 0);
    }

    #[test]
    fn pending_flush_is_dropped_with_the_root() {
        let (root, queue) = observed(json!({}));
        let log = recorder(&root);
        root.set("a", 1).unwrap();
        drop(root);
        assert_eq!(queue.run_pending(), 1);
        assert!(log.borrow().is_empty());
    }
}
