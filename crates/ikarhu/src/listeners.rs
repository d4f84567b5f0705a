use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use ikarhu_tree::ChangeTree;

/// Returned by [`crate::Observed::listen`]; pass it to `unlisten` to remove
/// that one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

type Callback = Rc<RefCell<dyn FnMut(&ChangeTree, &ChangeTree)>>;

/// Subscriptions of one root, notified in registration order.
pub(crate) struct ListenerRegistry {
    next_id: u64,
    listeners: BTreeMap<u64, Callback>,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self {
            next_id: 1,
            listeners: BTreeMap::new(),
        }
    }
}

impl ListenerRegistry {
    pub(crate) fn add<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ChangeTree, &ChangeTree) + 'static,
    {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.listeners.insert(id, Rc::new(RefCell::new(listener)));
        ListenerId(id)
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id.0).is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.listeners.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Copies the current subscriptions so they can be called without holding
    /// the registry borrowed; listeners may subscribe or unsubscribe while
    /// being notified.
    pub(crate) fn snapshot(&self) -> Vec<Callback> {
        self.listeners.values().cloned().collect()
    }
}

/// Calls each listener once. A listener that is already running further up
/// the stack (it triggered this notification itself) is skipped.
pub(crate) fn notify(listeners: &[Callback], changes: &ChangeTree, priors: &ChangeTree) {
    for listener in listeners {
        match listener.try_borrow_mut() {
            Ok(mut callback) => (&mut *callback)(changes, priors),
            Err(_) => tracing::warn!(keys = changes.len(), "listener re-entered during its own notification; skipped"),
        }
    }
}
