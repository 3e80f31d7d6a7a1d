//! # p2pfwd-core
//!
//! Shared foundation for the p2pfwd session manager: the pieces of the
//! interactive client that have no dependency on the terminal, the async
//! runtime, or the actual peer-to-peer transport.
//!
//! - **`domain`** – The command tokenizer, the `Protocol` type, and the
//!   [`Registry`] that records every listener and peer connection the
//!   session currently holds open.
//!
//! - **`forwarder`** – The boundary to the transport that actually opens
//!   ports and dials peers.  The session only ever sees the [`Forwarder`]
//!   trait and the [`CancelHandle`]s it hands back.

pub mod domain;
pub mod forwarder;

pub use domain::args::tokenize;
pub use domain::protocol::{Protocol, ProtocolParseError};
pub use domain::registry::{PeerConnection, Registry, ResourceMap};
pub use forwarder::{CancelHandle, Forwarder, ForwarderError, ForwarderEvent};
