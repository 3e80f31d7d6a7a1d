//! CommandDispatcher: interprets one operator line against the registry.
//!
//! Each line is split into `{command, arg1, arg2}` with
//! [`p2pfwd_core::tokenize`] and matched case-insensitively:
//!
//! | command      | args          | effect                                    |
//! |--------------|---------------|-------------------------------------------|
//! | `connect`    | `id`          | dial peer, register `id -> connection`    |
//! | `disconnect` | `id`          | cancel + unregister the connection        |
//! | `open`       | `proto port`  | expose port, register in tcp/udp mapping  |
//! | `close`      | `proto port`  | cancel + unregister from tcp/udp mapping  |
//! | anything else|               | help banner                               |
//!
//! The dispatcher holds no state of its own.  The session passes in the
//! [`Registry`] it owns for the duration of a single call, so every registry
//! mutation happens inside the session's execution context.
//!
//! # Failure policy
//!
//! A failed command never changes the registry: the forwarder is called
//! first and an entry is inserted only after it succeeds.  On the release
//! side the entry is removed before its handle is invoked, so a handle can
//! never be fired twice from the registry.

use std::fmt;
use std::num::ParseIntError;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use p2pfwd_core::{
    tokenize, Forwarder, ForwarderError, PeerConnection, Protocol, ProtocolParseError, Registry,
};

/// Lines of the help banner printed for empty or unknown input.
pub const HELP_BANNER: &[&str] = &[
    "",
    "Cli commands list:",
    "connect [ID_HERE]",
    "disconnect [ID_HERE]",
    "open [TCP_OR_UDP_HERE] [PORT_NUMBER_HERE]",
    "close [TCP_OR_UDP_HERE] [PORT_NUMBER_HERE]",
    "",
];

/// Why a command was aborted.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid port number {input:?}: {source}")]
    InvalidPort {
        input: String,
        #[source]
        source: ParseIntError,
    },
    #[error(transparent)]
    InvalidProtocol(#[from] ProtocolParseError),
    #[error("You are not connected to {0}")]
    NotConnected(String),
    #[error("Port {0}:{1} is not opened")]
    NotOpened(Protocol, u16),
    #[error("Already connected to {0}; disconnect first")]
    AlreadyConnected(String),
    #[error("Port {0}:{1} is already opened; close it first")]
    AlreadyOpened(Protocol, u16),
    #[error(transparent)]
    Forwarder(#[from] ForwarderError),
}

/// What a successful command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Connected { peer_id: String, listen_addr: String },
    Disconnected { peer_id: String },
    Opened { protocol: Protocol, port: u16 },
    Closed { protocol: Protocol, port: u16 },
    Help,
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Connected {
                peer_id,
                listen_addr,
            } => write!(
                f,
                "Connections to {peer_id}'s ports are listened on {listen_addr}"
            ),
            CommandOutcome::Disconnected { peer_id } => write!(f, "Disconnected from {peer_id}"),
            CommandOutcome::Opened { protocol, port } => write!(f, "Opened {protocol}:{port}"),
            CommandOutcome::Closed { protocol, port } => write!(f, "Closed {protocol}:{port}"),
            CommandOutcome::Help => f.write_str(&HELP_BANNER.join("\n")),
        }
    }
}

/// Executes operator commands against a forwarder and a registry.
pub struct CommandDispatcher<F: Forwarder + ?Sized> {
    forwarder: Arc<F>,
}

impl<F: Forwarder + ?Sized> CommandDispatcher<F> {
    pub fn new(forwarder: Arc<F>) -> Self {
        Self { forwarder }
    }

    /// Parses and runs one command line.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] when the command is malformed, refers to a
    /// resource that is not registered (or already is), or the forwarder
    /// fails.  The registry is unchanged in every error case.
    pub async fn execute(
        &self,
        registry: &mut Registry,
        line: &str,
    ) -> Result<CommandOutcome, CommandError> {
        let args = tokenize(line, 3);
        let command = args[0].to_lowercase();

        match command.as_str() {
            "connect" => self.connect(registry, require(&args[1], "peer id")?).await,
            "disconnect" => disconnect(registry, require(&args[1], "peer id")?),
            "open" => {
                let (protocol, port) = parse_port_args(&args[1], &args[2])?;
                self.open(registry, protocol, port).await
            }
            "close" => {
                let (protocol, port) = parse_port_args(&args[1], &args[2])?;
                close(registry, protocol, port)
            }
            _ => Ok(CommandOutcome::Help),
        }
    }

    /// Connects to `peer_id` and registers the connection.
    pub async fn connect(
        &self,
        registry: &mut Registry,
        peer_id: &str,
    ) -> Result<CommandOutcome, CommandError> {
        if registry.peers.contains(peer_id) {
            return Err(CommandError::AlreadyConnected(peer_id.to_string()));
        }

        info!("Connecting to {peer_id}");
        let (listen_addr, cancel) = self.forwarder.connect(peer_id).await?;

        registry.peers.put(
            peer_id.to_string(),
            PeerConnection {
                listen_addr: listen_addr.clone(),
                cancel,
            },
        );

        Ok(CommandOutcome::Connected {
            peer_id: peer_id.to_string(),
            listen_addr,
        })
    }

    /// Exposes `protocol:port` and registers the binding.
    pub async fn open(
        &self,
        registry: &mut Registry,
        protocol: Protocol,
        port: u16,
    ) -> Result<CommandOutcome, CommandError> {
        if registry.ports(protocol).contains(&port) {
            return Err(CommandError::AlreadyOpened(protocol, port));
        }

        info!("Opening {protocol}:{port}");
        let cancel = self.forwarder.open_port(protocol, port).await?;
        registry.ports_mut(protocol).put(port, cancel);

        Ok(CommandOutcome::Opened { protocol, port })
    }
}

fn disconnect(registry: &mut Registry, peer_id: &str) -> Result<CommandOutcome, CommandError> {
    let conn = registry
        .peers
        .remove(peer_id)
        .ok_or_else(|| CommandError::NotConnected(peer_id.to_string()))?;

    info!("Disconnecting from {peer_id}");
    conn.cancel.cancel();

    Ok(CommandOutcome::Disconnected {
        peer_id: peer_id.to_string(),
    })
}

fn close(
    registry: &mut Registry,
    protocol: Protocol,
    port: u16,
) -> Result<CommandOutcome, CommandError> {
    let cancel = registry
        .ports_mut(protocol)
        .remove(&port)
        .ok_or(CommandError::NotOpened(protocol, port))?;

    info!("Closing {protocol}:{port}");
    cancel.cancel();

    Ok(CommandOutcome::Closed { protocol, port })
}

fn require<'a>(arg: &'a str, name: &'static str) -> Result<&'a str, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument(name))
    } else {
        Ok(arg)
    }
}

/// Parses the `<tcp|udp> <port>` argument pair shared by `open` and `close`.
pub fn parse_port_args(protocol: &str, port: &str) -> Result<(Protocol, u16), CommandError> {
    let protocol: Protocol = require(protocol, "protocol")?.parse()?;
    let port_str = require(port, "port")?;
    let port = port_str
        .parse::<u16>()
        .map_err(|source| CommandError::InvalidPort {
            input: port_str.to_string(),
            source,
        })?;
    Ok((protocol, port))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use p2pfwd_core::CancelHandle;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        pub Fwd {}

        #[async_trait]
        impl Forwarder for Fwd {
            fn id(&self) -> String;
            async fn open_port(&self, protocol: Protocol, port: u16)
                -> Result<CancelHandle, ForwarderError>;
            async fn connect(&self, peer_id: &str)
                -> Result<(String, CancelHandle), ForwarderError>;
        }
    }

    fn counting_handle(counter: &Arc<AtomicUsize>) -> CancelHandle {
        let counter = Arc::clone(counter);
        CancelHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn dispatcher(mock: MockFwd) -> CommandDispatcher<MockFwd> {
        CommandDispatcher::new(Arc::new(mock))
    }

    // ── connect ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_connect_registers_peer_and_reports_listen_address() {
        // Arrange
        let mut mock = MockFwd::new();
        mock.expect_connect()
            .withf(|peer_id| peer_id == "peerX")
            .times(1)
            .returning(|_| Ok(("127.0.89.1".to_string(), CancelHandle::noop())));
        let dispatcher = dispatcher(mock);
        let mut registry = Registry::new();

        // Act
        let outcome = dispatcher
            .execute(&mut registry, "connect peerX")
            .await
            .expect("connect must succeed");

        // Assert
        assert_eq!(registry.peers.len(), 1);
        assert_eq!(registry.peers.get("peerX").unwrap().listen_addr, "127.0.89.1");
        assert!(outcome.to_string().contains("127.0.89.1"));
    }

    #[tokio::test]
    async fn test_connect_forwarder_failure_leaves_registry_unchanged() {
        let mut mock = MockFwd::new();
        mock.expect_connect()
            .returning(|id| Err(ForwarderError::PeerUnreachable(id.to_string())));
        let dispatcher = dispatcher(mock);
        let mut registry = Registry::new();

        let result = dispatcher.execute(&mut registry, "connect peerX").await;

        assert!(matches!(
            result,
            Err(CommandError::Forwarder(ForwarderError::PeerUnreachable(_)))
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_connect_without_id_is_missing_argument() {
        let mut mock = MockFwd::new();
        mock.expect_connect().never();
        let dispatcher = dispatcher(mock);
        let mut registry = Registry::new();

        let result = dispatcher.execute(&mut registry, "connect").await;

        assert!(matches!(result, Err(CommandError::MissingArgument(_))));
    }

    #[tokio::test]
    async fn test_connect_twice_is_rejected_without_second_forwarder_call() {
        // Arrange
        let calls = Arc::new(AtomicUsize::new(0));
        let handle_calls = Arc::clone(&calls);
        let mut mock = MockFwd::new();
        mock.expect_connect()
            .times(1)
            .returning(move |_| Ok(("127.0.0.1".to_string(), counting_handle(&handle_calls))));
        let dispatcher = dispatcher(mock);
        let mut registry = Registry::new();
        dispatcher
            .execute(&mut registry, "connect peerA")
            .await
            .expect("first connect");

        // Act
        let result = dispatcher.execute(&mut registry, "connect peerA").await;

        // Assert: original connection kept, nothing cancelled
        assert!(matches!(result, Err(CommandError::AlreadyConnected(id)) if id == "peerA"));
        assert_eq!(registry.peers.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_command_word_is_case_insensitive() {
        let mut mock = MockFwd::new();
        mock.expect_connect()
            .returning(|_| Ok(("127.0.0.1".to_string(), CancelHandle::noop())));
        let dispatcher = dispatcher(mock);
        let mut registry = Registry::new();

        dispatcher
            .execute(&mut registry, "CoNNeCt peerA")
            .await
            .expect("connect");

        assert!(registry.peers.contains("peerA"));
    }

    // ── disconnect ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_disconnect_unknown_peer_reports_error_without_mutation() {
        let dispatcher = dispatcher(MockFwd::new());
        let mut registry = Registry::new();

        let result = dispatcher.execute(&mut registry, "disconnect unknownPeer").await;

        assert!(matches!(result, Err(CommandError::NotConnected(id)) if id == "unknownPeer"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_cancels_and_removes_connection() {
        // Arrange
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher(MockFwd::new());
        let mut registry = Registry::new();
        registry.peers.put(
            "peerA".to_string(),
            PeerConnection {
                listen_addr: "127.0.0.1".to_string(),
                cancel: counting_handle(&calls),
            },
        );

        // Act
        let outcome = dispatcher
            .execute(&mut registry, "disconnect peerA")
            .await
            .expect("disconnect");

        // Assert
        assert_eq!(
            outcome,
            CommandOutcome::Disconnected {
                peer_id: "peerA".to_string()
            }
        );
        assert!(!registry.peers.contains("peerA"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // ── open / close ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_open_then_close_invokes_cancel_exactly_once() {
        // Arrange
        let calls = Arc::new(AtomicUsize::new(0));
        let handle_calls = Arc::clone(&calls);
        let mut mock = MockFwd::new();
        mock.expect_open_port()
            .withf(|protocol, port| *protocol == Protocol::Tcp && *port == 8080)
            .times(1)
            .returning(move |_, _| Ok(counting_handle(&handle_calls)));
        let dispatcher = dispatcher(mock);
        let mut registry = Registry::new();

        // Act
        dispatcher
            .execute(&mut registry, "open tcp 8080")
            .await
            .expect("open");
        assert!(registry.tcp.contains(&8080));
        dispatcher
            .execute(&mut registry, "close tcp 8080")
            .await
            .expect("close");

        // Assert
        assert!(!registry.tcp.contains(&8080));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A second close finds nothing and fires nothing.
        let again = dispatcher.execute(&mut registry, "close tcp 8080").await;
        assert!(matches!(again, Err(CommandError::NotOpened(Protocol::Tcp, 8080))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_udp_registers_in_udp_mapping_only() {
        let mut mock = MockFwd::new();
        mock.expect_open_port()
            .returning(|_, _| Ok(CancelHandle::noop()));
        let dispatcher = dispatcher(mock);
        let mut registry = Registry::new();

        dispatcher
            .execute(&mut registry, "open UDP 53")
            .await
            .expect("open");

        assert!(registry.udp.contains(&53));
        assert!(registry.tcp.is_empty());
    }

    #[tokio::test]
    async fn test_close_udp_removes_from_udp_mapping() {
        // Arrange: the same port open on both protocols
        let tcp_calls = Arc::new(AtomicUsize::new(0));
        let udp_calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher(MockFwd::new());
        let mut registry = Registry::new();
        registry.tcp.put(53, counting_handle(&tcp_calls));
        registry.udp.put(53, counting_handle(&udp_calls));

        // Act
        dispatcher
            .execute(&mut registry, "close udp 53")
            .await
            .expect("close");

        // Assert: only the UDP binding is touched
        assert!(registry.tcp.contains(&53));
        assert!(!registry.udp.contains(&53));
        assert_eq!(tcp_calls.load(Ordering::SeqCst), 0);
        assert_eq!(udp_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_invalid_port_aborts_before_forwarder_call() {
        let mut mock = MockFwd::new();
        mock.expect_open_port().never();
        let dispatcher = dispatcher(mock);
        let mut registry = Registry::new();

        for line in ["open tcp 70000", "open tcp -1", "open tcp http", "open tcp"] {
            let result = dispatcher.execute(&mut registry, line).await;
            assert!(
                matches!(
                    result,
                    Err(CommandError::InvalidPort { .. } | CommandError::MissingArgument(_))
                ),
                "line {line:?} gave {result:?}"
            );
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_open_unknown_protocol_is_rejected() {
        let mut mock = MockFwd::new();
        mock.expect_open_port().never();
        let dispatcher = dispatcher(mock);
        let mut registry = Registry::new();

        let result = dispatcher.execute(&mut registry, "open sctp 80").await;

        assert!(matches!(result, Err(CommandError::InvalidProtocol(_))));
    }

    #[tokio::test]
    async fn test_open_forwarder_failure_leaves_registry_unchanged() {
        let mut mock = MockFwd::new();
        mock.expect_open_port()
            .returning(|_, port| Err(ForwarderError::InvalidPort(port)));
        let dispatcher = dispatcher(mock);
        let mut registry = Registry::new();

        let result = dispatcher.execute(&mut registry, "open tcp 0").await;

        assert!(matches!(
            result,
            Err(CommandError::Forwarder(ForwarderError::InvalidPort(0)))
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_open_already_open_port_is_rejected() {
        let mut mock = MockFwd::new();
        mock.expect_open_port().never();
        let dispatcher = dispatcher(mock);
        let mut registry = Registry::new();
        registry.tcp.put(80, CancelHandle::noop());

        let result = dispatcher.execute(&mut registry, "open tcp 80").await;

        assert!(matches!(result, Err(CommandError::AlreadyOpened(Protocol::Tcp, 80))));
    }

    // ── help ──────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_empty_and_unknown_input_prints_help() {
        let dispatcher = dispatcher(MockFwd::new());
        let mut registry = Registry::new();

        for line in ["", "   ", "help", "list ports"] {
            let outcome = dispatcher.execute(&mut registry, line).await.expect("help");
            assert_eq!(outcome, CommandOutcome::Help);
        }
    }

    #[test]
    fn test_help_banner_lists_every_command() {
        let text = CommandOutcome::Help.to_string();
        for command in ["connect", "disconnect", "open", "close"] {
            assert!(text.contains(&format!("{command} [")), "missing {command}");
        }
    }

    #[test]
    fn test_parse_port_args_accepts_bounds() {
        assert_eq!(parse_port_args("tcp", "0").unwrap(), (Protocol::Tcp, 0));
        assert_eq!(parse_port_args("udp", "65535").unwrap(), (Protocol::Udp, 65535));
    }
}
