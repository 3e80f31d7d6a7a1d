//! LoopbackForwarder: the forwarder bundled with the binary.
//!
//! The real peer-to-peer transport (NAT traversal, relays, peer discovery)
//! lives outside this repository.  Until one is plugged in, the binary runs
//! against this single-host stand-in:
//!
//! - `open_port` marks `(protocol, port)` as exposed.  Port 0 is rejected.
//!   Opening the same key twice is allowed at this layer.
//! - `connect` succeeds only for the forwarder's own identity and reports
//!   `127.0.0.1`, where its own exposed ports are already reachable.  Any
//!   other identity is unreachable.
//! - Once the global cancel has run, every call fails with
//!   [`ForwarderError::Stopped`].
//!
//! Every state change is reported on the event channel returned by
//! [`LoopbackForwarder::start`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use p2pfwd_core::{CancelHandle, Forwarder, ForwarderError, ForwarderEvent, Protocol};

/// Address at which a loopback "peer" exposes its ports.
pub const LOOPBACK_LISTEN_ADDR: &str = "127.0.0.1";

/// A started forwarder: handle, global teardown, and event stream.
pub type Started = (
    Arc<LoopbackForwarder>,
    CancelHandle,
    mpsc::UnboundedReceiver<ForwarderEvent>,
);

#[derive(Debug)]
struct Shared {
    id: String,
    stopped: AtomicBool,
    /// Reference count per exposed key, so a duplicate open followed by a
    /// single close keeps the port exposed.
    exposed: Mutex<HashMap<(Protocol, u16), usize>>,
    events: mpsc::UnboundedSender<ForwarderEvent>,
}

impl Shared {
    fn emit(&self, event: ForwarderEvent) {
        // Nobody listening is not an error for the forwarder.
        let _ = self.events.send(event);
    }

    fn ensure_running(&self) -> Result<(), ForwarderError> {
        if self.stopped.load(Ordering::Acquire) {
            Err(ForwarderError::Stopped)
        } else {
            Ok(())
        }
    }
}

/// Single-host forwarder.  See the module docs for its semantics.
#[derive(Debug, Clone)]
pub struct LoopbackForwarder {
    shared: Arc<Shared>,
}

impl LoopbackForwarder {
    /// Starts a forwarder with a fresh random identity.
    ///
    /// # Errors
    ///
    /// Infallible today; the signature mirrors transports whose start-up
    /// can fail (binding sockets, reaching a relay).
    pub fn start() -> Result<Started, ForwarderError> {
        Ok(Self::with_id(Uuid::new_v4().simple().to_string()))
    }

    /// Like [`start`](Self::start) but with a caller-chosen identity.
    pub fn with_id(id: impl Into<String>) -> Started {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            id: id.into(),
            stopped: AtomicBool::new(false),
            exposed: Mutex::new(HashMap::new()),
            events: tx,
        });

        let global = Arc::clone(&shared);
        let global_cancel = CancelHandle::new(move || {
            if !global.stopped.swap(true, Ordering::AcqRel) {
                global
                    .exposed
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clear();
                global.emit(ForwarderEvent::Info("forwarder stopped".to_string()));
            }
        });

        (Arc::new(Self { shared }), global_cancel, rx)
    }

    /// `true` while at least one open of `protocol:port` is outstanding.
    pub fn is_exposed(&self, protocol: Protocol, port: u16) -> bool {
        self.shared
            .exposed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&(protocol, port))
    }
}

#[async_trait]
impl Forwarder for LoopbackForwarder {
    fn id(&self) -> String {
        self.shared.id.clone()
    }

    async fn open_port(
        &self,
        protocol: Protocol,
        port: u16,
    ) -> Result<CancelHandle, ForwarderError> {
        self.shared.ensure_running()?;
        if port == 0 {
            return Err(ForwarderError::InvalidPort(port));
        }

        *self
            .shared
            .exposed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((protocol, port))
            .or_insert(0) += 1;
        self.shared.emit(ForwarderEvent::Info(format!(
            "{protocol}:{port} is exposed to peers"
        )));

        let shared = Arc::clone(&self.shared);
        Ok(CancelHandle::new(move || {
            let mut exposed = shared
                .exposed
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(count) = exposed.get_mut(&(protocol, port)) {
                *count -= 1;
                if *count == 0 {
                    exposed.remove(&(protocol, port));
                }
            }
            drop(exposed);
            shared.emit(ForwarderEvent::Info(format!(
                "{protocol}:{port} is no longer exposed"
            )));
        }))
    }

    async fn connect(&self, peer_id: &str) -> Result<(String, CancelHandle), ForwarderError> {
        self.shared.ensure_running()?;
        if peer_id != self.shared.id {
            return Err(ForwarderError::PeerUnreachable(peer_id.to_string()));
        }

        self.shared.emit(ForwarderEvent::Info(format!(
            "loopback connection to {peer_id} established"
        )));

        let shared = Arc::clone(&self.shared);
        let peer = peer_id.to_string();
        let cancel = CancelHandle::new(move || {
            shared.emit(ForwarderEvent::Info(format!(
                "loopback connection to {peer} closed"
            )));
        });

        Ok((LOOPBACK_LISTEN_ADDR.to_string(), cancel))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
