//! Forwarder event pump.
//!
//! Forwarders report things that happen outside any call (a relay dropped,
//! a peer went away) as [`ForwarderEvent`]s.  This task drains that channel
//! into the log for the lifetime of the process.

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use p2pfwd_core::ForwarderEvent;

/// Logs every event until the forwarder drops its sender.
pub async fn pump_forwarder_events(mut rx: mpsc::UnboundedReceiver<ForwarderEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            ForwarderEvent::Info(msg) => info!("{msg}"),
            ForwarderEvent::Error(msg) => error!("{msg}"),
        }
    }
    debug!("forwarder event stream closed");
}
