//! Application layer: the session and its command dispatcher.
//!
//! Nothing here touches stdin, signals, or sockets.  The session receives
//! operator lines over a channel and a shutdown future, and talks to the
//! transport only through the [`p2pfwd_core::Forwarder`] trait, so every
//! use case can be driven from tests with a stub forwarder.
//!
//! - **`dispatch`** – Parses one command line and applies it to the
//!   registry (`connect`, `disconnect`, `open`, `close`, help).
//! - **`session`** – Owns the registry, runs best-effort startup, the
//!   `select!` event loop, and ordered teardown.

pub mod dispatch;
pub mod session;
