//! Domain types for the session manager.
//!
//! Everything in here is plain in-memory bookkeeping: no sockets, no
//! threads, no async.  The session loop in the `p2pfwd` crate owns the
//! values and is the only code that mutates them.

/// Splits one operator line into a fixed number of arguments.
pub mod args;

/// Transport protocol of a port binding (`tcp` or `udp`).
pub mod protocol;

/// Key → cancellation-handle mappings for open ports and peer connections.
pub mod registry;
