//! p2pfwd library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! The binary is an interactive front end for a peer-to-peer port
//! forwarder.  It keeps track of which local ports are exposed and which
//! peers are connected, accepts `connect` / `disconnect` / `open` / `close`
//! commands on stdin, and releases everything it opened when it receives
//! SIGINT or SIGTERM.

/// Application layer: session loop and command dispatch.
pub mod application;

/// Infrastructure layer: stdin, signals, config, logging, and the bundled
/// loopback forwarder.
pub mod infrastructure;
