//! Infrastructure layer for the p2pfwd binary.
//!
//! OS-facing adapters that feed the application layer: the stdin reader
//! thread, the termination-signal future, configuration loading, logging
//! setup, and the bundled [`loopback::LoopbackForwarder`].
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `p2pfwd_core`, but MUST NOT be imported by the `application` layer.

pub mod config;
pub mod events;
pub mod input;
pub mod logging;
pub mod loopback;
pub mod signal;
