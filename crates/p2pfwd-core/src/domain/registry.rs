//! Registry of everything the session currently holds open.
//!
//! The [`Registry`] is the single source of truth for "what is open right
//! now".  It keeps three independent mappings:
//!
//! ```text
//! tcp   : port    -> CancelHandle
//! udp   : port    -> CancelHandle
//! peers : peer id -> PeerConnection { listen_addr, CancelHandle }
//! ```
//!
//! The mappings are plain bookkeeping.  They never block, never fail, and
//! perform no validation; whether a duplicate `open` or `connect` is allowed
//! is decided by the command dispatcher before anything is inserted.
//!
//! Entries own their [`CancelHandle`].  Removing an entry hands the handle
//! back to the caller, which then invokes it.  Since `cancel` consumes the
//! handle, an entry that has been removed and cancelled cannot be released
//! a second time through the registry.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

use crate::domain::protocol::Protocol;
use crate::forwarder::CancelHandle;

/// An active connection to a remote peer.
#[derive(Debug)]
pub struct PeerConnection {
    /// Local address on which the peer's exposed ports are reachable.
    /// Informational only.
    pub listen_addr: String,
    /// Tears the connection down.
    pub cancel: CancelHandle,
}

/// One key → value mapping of the registry.
#[derive(Debug)]
pub struct ResourceMap<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for ResourceMap<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> ResourceMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`.
    ///
    /// An existing entry is replaced and returned to the caller untouched;
    /// in particular its cancellation handle is **not** invoked.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Removes the entry for `key` and returns it.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key)
    }

    /// Visits every entry.  Iteration order is unspecified.
    pub fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        for (key, value) in &self.entries {
            f(key, value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns every entry, leaving the map empty.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        self.entries.drain().collect()
    }
}

/// The session's open ports and peer connections.
#[derive(Debug, Default)]
pub struct Registry {
    pub tcp: ResourceMap<u16, CancelHandle>,
    pub udp: ResourceMap<u16, CancelHandle>,
    pub peers: ResourceMap<String, PeerConnection>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The port mapping for `protocol`.
    pub fn ports(&self, protocol: Protocol) -> &ResourceMap<u16, CancelHandle> {
        match protocol {
            Protocol::Tcp => &self.tcp,
            Protocol::Udp => &self.udp,
        }
    }

    /// Mutable access to the port mapping for `protocol`.
    pub fn ports_mut(&mut self, protocol: Protocol) -> &mut ResourceMap<u16, CancelHandle> {
        match protocol {
            Protocol::Tcp => &mut self.tcp,
            Protocol::Udp => &mut self.udp,
        }
    }

    /// `true` when nothing is open.
    pub fn is_empty(&self) -> bool {
        self.tcp.is_empty() && self.udp.is_empty() && self.peers.is_empty()
    }

    /// Cancels every registered resource and empties all three mappings.
    ///
    /// Peer connections are released first, then TCP bindings, then UDP
    /// bindings.  Each handle is invoked exactly once.  Returns the number
    /// of handles invoked.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;

        for (peer_id, conn) in self.peers.drain() {
            debug!("releasing connection to {peer_id}");
            conn.cancel.cancel();
            released += 1;
        }
        for (protocol, map) in [(Protocol::Tcp, &mut self.tcp), (Protocol::Udp, &mut self.udp)] {
            for (port, cancel) in map.drain() {
                debug!("releasing {protocol}:{port}");
                cancel.cancel();
                released += 1;
            }
        }

        released
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
