//! One relay per raw node, per root.

use std::collections::HashMap;
use std::rc::Weak;

use crate::node::{Node, NodeId};
use crate::view::relay::{Relay, RelayInner};
use crate::view::root::RootInner;
use crate::view::Route;

const MIN_SWEEP: usize = 64;

/// Maps a raw node to the relay that currently wraps it under one root.
///
/// Entries are weak: a relay lives as long as someone holds it, and two
/// reads of the same node while the first relay is still held return the
/// same relay. A live relay holds its node, so a node address cannot be
/// reused while the entry is live. Dead entries are swept as the map grows.
pub(crate) struct IdentityCache {
    relays: HashMap<NodeId, Weak<RelayInner>>,
    sweep_at: usize,
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self {
            relays: HashMap::new(),
            sweep_at: MIN_SWEEP,
        }
    }
}

impl IdentityCache {
    /// Returns the cached relay for `node`, re-pointed at `route`, or creates
    /// and caches a new one.
    pub(crate) fn resolve(&mut self, node: Node, route: Route, root: &Weak<RootInner>) -> Relay {
        let id = node.id();
        if let Some(relay) = self.relays.get(&id).and_then(Weak::upgrade).map(Relay::from_inner) {
            relay.reroute(route);
            return relay;
        }
        let relay = Relay::new(node, route, root.clone());
        self.relays.insert(id, relay.downgrade());
        if self.relays.len() > self.sweep_at {
            self.sweep();
        }
        relay
    }

    fn sweep(&mut self) {
        self.relays.retain(|_, relay| relay.strong_count() > 0);
        self.sweep_at = (self.relays.len() * 2).max(MIN_SWEEP);
    }

    #[cfg(test)]
    /// Number of relays still alive.
    pub(crate) fn live(&self) -> usize {
        self.relays.values().filter(|r| r.strong_count() > 0).count()
    }
}
