//! The boundary between the session and the peer-to-peer transport.
//!
//! The session never touches sockets itself.  It asks a [`Forwarder`] to
//! expose a local port or to dial a peer, and gets back a [`CancelHandle`]
//! that releases whatever the forwarder set up.  How the forwarder reaches
//! peers (NAT traversal, relays, discovery) is entirely its own business.
//!
//! # Event hooks
//!
//! Forwarders report asynchronous happenings (a peer dropped, a relay
//! failed) as [`ForwarderEvent`]s on a channel handed out when the forwarder
//! is constructed.  The binary drains that channel into the log.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::protocol::Protocol;

/// A one-shot action that releases a resource acquired from a [`Forwarder`].
///
/// Calling [`cancel`](CancelHandle::cancel) consumes the handle, so a given
/// capability can be invoked at most once.  Dropping a handle without
/// cancelling it does **not** release the resource.
pub struct CancelHandle {
    release: Box<dyn FnOnce() + Send + 'static>,
}

impl CancelHandle {
    /// Wraps `release` as a cancellation capability.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Box::new(release),
        }
    }

    /// A handle whose cancellation does nothing.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Releases the resource.
    pub fn cancel(self) {
        (self.release)()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CancelHandle")
    }
}

/// Errors a [`Forwarder`] may return from `open_port` or `connect`.
#[derive(Debug, Error)]
pub enum ForwarderError {
    #[error("invalid port {0}")]
    InvalidPort(u16),
    #[error("peer {0} is unreachable")]
    PeerUnreachable(String),
    #[error("forwarder has been stopped")]
    Stopped,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Asynchronous notification emitted by a forwarder outside any call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwarderEvent {
    Info(String),
    Error(String),
}

/// Operations the session consumes from the transport.
///
/// Implementations may do network setup asynchronously; the session awaits
/// each call to completion before handling the next command.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Identity of this process as seen by peers.  Stable for the lifetime
    /// of the forwarder.
    fn id(&self) -> String;

    /// Exposes local `port` over `protocol` to connected peers.
    async fn open_port(&self, protocol: Protocol, port: u16)
        -> Result<CancelHandle, ForwarderError>;

    /// Connects to `peer_id`.  On success returns the local address on which
    /// the peer's exposed ports are reachable, plus the handle that tears the
    /// connection down.
    async fn connect(&self, peer_id: &str) -> Result<(String, CancelHandle), ForwarderError>;
}
