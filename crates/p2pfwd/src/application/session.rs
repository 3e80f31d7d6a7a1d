//! Session: the single actor that owns the registry and runs the event loop.
//!
//! # Lifecycle
//!
//! ```text
//! Initializing ──► Running ──► ShuttingDown ──► Terminated
//!      │              │
//!      │              └─ select! { operator line | shutdown signal }
//!      └─ open pre-configured ports, connect pre-configured peers,
//!         print the help banner (all best-effort)
//! ```
//!
//! # Concurrency model
//!
//! The [`Session`] is the only owner of the [`Registry`].  Operator lines
//! arrive over an `mpsc` channel fed by a separate producer, and the
//! shutdown signal is an arbitrary future.  [`Session::run`] waits on both
//! with `tokio::select!` and handles exactly one event at a time: a command
//! is dispatched to completion before the loop waits again.  Registry
//! mutation is therefore serialised by construction and needs no lock.
//!
//! When a line and the shutdown signal are ready at the same moment,
//! `select!` picks one at random.  Nothing depends on which.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use p2pfwd_core::{CancelHandle, Forwarder, Protocol, Registry};

use crate::application::dispatch::{CommandDispatcher, CommandError, CommandOutcome, HELP_BANNER};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Running,
    ShuttingDown,
    Terminated,
}

/// Ports and peers to set up before the first operator command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub connect: Vec<String>,
    pub tcp_ports: Vec<u16>,
    pub udp_ports: Vec<u16>,
}

/// One running instance of the session manager.
pub struct Session<F: Forwarder + ?Sized> {
    identity: String,
    dispatcher: CommandDispatcher<F>,
    registry: Registry,
    global_cancel: Option<CancelHandle>,
    state: SessionState,
}

impl<F: Forwarder + ?Sized> Session<F> {
    /// Creates a session around an already started forwarder.
    ///
    /// `global_cancel` is the forwarder's process-wide teardown; it runs
    /// first during [`shutdown`](Self::shutdown).
    pub fn new(forwarder: Arc<F>, global_cancel: CancelHandle) -> Self {
        let identity = forwarder.id();
        info!("Your id: {identity}");

        Self {
            identity,
            dispatcher: CommandDispatcher::new(forwarder),
            registry: Registry::new(),
            global_cancel: Some(global_cancel),
            state: SessionState::Initializing,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Opens every pre-configured port and connects every pre-configured
    /// peer, then prints the help banner and moves to `Running`.
    ///
    /// Individual failures are logged and skipped; they never abort startup.
    pub async fn initialize(&mut self, config: &SessionConfig) {
        let ports = config
            .tcp_ports
            .iter()
            .map(|&port| (Protocol::Tcp, port))
            .chain(config.udp_ports.iter().map(|&port| (Protocol::Udp, port)));

        for (protocol, port) in ports {
            let result = self.dispatcher.open(&mut self.registry, protocol, port).await;
            log_result(result);
        }

        for peer_id in &config.connect {
            let result = self.dispatcher.connect(&mut self.registry, peer_id).await;
            log_result(result);
        }

        info!("Initialization completed");
        self.execute("").await;
        self.state = SessionState::Running;
    }

    /// Dispatches one operator line and logs the outcome.
    pub async fn execute(&mut self, line: &str) {
        let result = self.dispatcher.execute(&mut self.registry, line).await;
        log_result(result);
    }

    /// Runs the event loop until `shutdown` resolves, then tears down.
    ///
    /// A closed `commands` channel (operator input hit EOF) stops command
    /// handling but not the session; only `shutdown` ends the loop.
    pub async fn run<S>(&mut self, mut commands: mpsc::Receiver<String>, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        self.state = SessionState::Running;
        tokio::pin!(shutdown);

        let mut input_open = true;
        loop {
            tokio::select! {
                line = commands.recv(), if input_open => match line {
                    Some(line) => self.execute(&line).await,
                    None => {
                        debug!("command channel closed; waiting for shutdown signal");
                        input_open = false;
                    }
                },
                () = &mut shutdown => break,
            }
        }

        self.shutdown();
    }

    /// Releases everything: the forwarder's global teardown first, then
    /// peer connections, TCP bindings and UDP bindings.
    ///
    /// Calling it again after the first time does nothing.
    pub fn shutdown(&mut self) {
        if self.state == SessionState::Terminated {
            return;
        }
        self.state = SessionState::ShuttingDown;
        info!("Shutdown...");

        if let Some(cancel) = self.global_cancel.take() {
            cancel.cancel();
        }
        let released = self.registry.release_all();
        debug!("released {released} resource(s)");

        self.state = SessionState::Terminated;
    }
}

fn log_result(result: Result<CommandOutcome, CommandError>) {
    match result {
        Ok(CommandOutcome::Help) => {
            for line in HELP_BANNER {
                info!("{line}");
            }
        }
        Ok(outcome) => info!("{outcome}"),
        Err(e) => error!("{e}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
