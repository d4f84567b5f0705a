//! Views over nested nodes.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ikarhu_tree::{format_pointer, parse_pointer, Shape};

use super::root::RootInner;
use super::{Field, Report, Route};
use crate::node::{Node, NodeError};
use crate::value::Value;

/// A view over a node nested somewhere under an observed root.
///
/// Mutations through a relay are reported to the root as a tree folded
/// under the relay's path, e.g. setting `c` on the relay for `a.b` reports
/// `{a: {b: {c: …}}}`. Reading the same node again through the same root
/// returns this same relay for as long as it is held; the path is refreshed
/// on every such read, so a relay reached from a new place reports under its
/// new path.
///
/// A relay outliving its root still reads and writes the node but reports
/// nothing.
#[derive(Clone)]
pub struct Relay {
    inner: Rc<RelayInner>,
}

pub(crate) struct RelayInner {
    node: Node,
    root: Weak<RootInner>,
    route: RefCell<Route>,
}

impl Relay {
    pub(crate) fn new(node: Node, route: Route, root: Weak<RootInner>) -> Self {
        Self {
            inner: Rc::new(RelayInner {
                node,
                root,
                route: RefCell::new(route),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<RelayInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<RelayInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn reroute(&self, route: Route) {
        let mut current = self.inner.route.borrow_mut();
        if *current != route {
            tracing::trace!(from = ?current.path(), to = ?route.path(), "relay reached from a new path");
            *current = route;
        }
    }

    fn report(&self, reports: Vec<Report>) {
        if reports.is_empty() {
            return;
        }
        let Some(root) = self.inner.root.upgrade() else {
            tracing::trace!("relay outlived its root; change not reported");
            return;
        };
        let route = self.inner.route.borrow().clone();
        for Report { key, change, prior } in reports {
            let prior = prior.map(|p| route.fold(&key, p));
            root.dispatch(route.top_key(), route.fold(&key, change), prior);
        }
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    pub fn get(&self, key: &str) -> Option<Field> {
        super::read(&self.inner.root, &self.inner.node, key, || {
            self.inner.route.borrow().child(key)
        })
    }

    /// Resolves a JSON pointer relative to this relay.
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

    pub fn to_json(&self) -> serde_json::Value {
        self.inner.node.to_json()
    }

    /// The raw node behind this view. Writes to it are not reported.
    pub fn node(&self) -> &Node {
        &self.inner.node
    }

    /// Keys from the root down to this relay's node, as last reached.
    pub fn path(&self) -> Vec<String> {
        self.inner.route.borrow().path()
    }

    pub fn pointer(&self) -> String {
        format_pointer(&self.path())
    }

    pub fn ptr_eq(&self, other: &Relay) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Writes ────────────────────────────────────────────────────────────

    /// Assigns `key`. Returns whether anything changed; assigning a value
    /// equal to the current one is not reported.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<bool, NodeError> {
        let report = super::write(&self.inner.node, key, value.into())?;
        let changed = report.is_some();
        self.report(report.into_iter().collect());
        Ok(changed)
    }

    /// Removes `key`. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool, NodeError> {
        let existed = self.inner.node.contains_key(key);
        let reports = super::delete(&self.inner.node, key)?;
        self.report(reports);
        Ok(existed)
    }

    /// Appends to a sequence, returning the new index.
    pub fn push(&self, value: impl Into<Value>) -> Result<usize, NodeError> {
        let (index, report) = super::push(&self.inner.node, value.into())?;
        self.report(report.into_iter().collect());
        Ok(index)
    }
}

impl fmt::Debug for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("path", &self.path())
            .field("node", &self.inner.node)
            .finish()
    }
}

/// Assigning a relay stores the node it wraps.
impl From<&Relay> for Value {
    fn from(relay: &Relay) -> Self {
        Value::Node(relay.inner.node.clone())
    }
}

impl From<Relay> for Value {
    fn from(relay: Relay) -> Self {
        Value::from(&relay)
    }
}
