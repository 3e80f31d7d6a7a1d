//! p2pfwd: interactive session manager for a peer-to-peer port forwarder.
//!
//! Wires the forwarder, the stdin reader thread, and the termination signal
//! into a [`Session`] and runs it until SIGINT/SIGTERM.
//!
//! # Usage
//!
//! ```text
//! p2pfwd [OPTIONS]
//!
//! Options:
//!   --connect <ID>       Peer id to connect to (repeatable)
//!   --tcp <PORT>         TCP port to open (repeatable)
//!   --udp <PORT>         UDP port to open (repeatable)
//!   --config <PATH>      TOML config file            [env: P2PFWD_CONFIG]
//!   --log-level <LEVEL>  tracing filter directive    [env: P2PFWD_LOG_LEVEL]
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config, init logging
//!  └─ LoopbackForwarder::start()   -- identity, global cancel, events
//!       └─ event pump task          -- forwarder info/error -> log
//!  └─ Session::initialize()         -- pre-configured ports and peers
//!  └─ command-reader thread         -- stdin lines -> mpsc
//!  └─ Session::run()                -- select! { line | shutdown signal }
//! ```

use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use p2pfwd::application::session::Session;
use p2pfwd::infrastructure::config::{load_optional, CliOverrides};
use p2pfwd::infrastructure::events::pump_forwarder_events;
use p2pfwd::infrastructure::input::{spawn_line_reader, COMMAND_QUEUE_CAPACITY};
use p2pfwd::infrastructure::logging::init_logging;
use p2pfwd::infrastructure::loopback::LoopbackForwarder;
use p2pfwd::infrastructure::signal::shutdown_signal;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Interactive session manager for the p2pfwd port forwarder.
#[derive(Debug, Parser)]
#[command(name = "p2pfwd", version)]
struct Cli {
    /// Peer id to connect to at startup (can be used multiple times).
    #[arg(long = "connect", value_name = "ID")]
    connect: Vec<String>,

    /// TCP port to open at startup (can be used multiple times).
    #[arg(long = "tcp", value_name = "PORT")]
    tcp: Vec<u16>,

    /// UDP port to open at startup (can be used multiple times).
    #[arg(long = "udp", value_name = "PORT")]
    udp: Vec<u16>,

    /// Optional TOML config file.  CLI lists are appended to the file's.
    #[arg(long, env = "P2PFWD_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `info` or `p2pfwd=debug`.
    /// Overrides the config file; `RUST_LOG` overrides both.
    #[arg(long, env = "P2PFWD_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Splits off the config path and turns the remaining flags into
    /// overrides for the config file.
    fn into_parts(self) -> (Option<PathBuf>, CliOverrides) {
        (
            self.config,
            CliOverrides {
                connect: self.connect,
                tcp: self.tcp,
                udp: self.udp,
                log_level: self.log_level,
            },
        )
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config_path, overrides) = Cli::parse().into_parts();
    let settings = load_optional(config_path.as_deref())
        .context("failed to load configuration")?
        .merge(overrides);

    init_logging(&settings.log_level);

    info!("Initialization...");

    let (forwarder, global_cancel, events) =
        LoopbackForwarder::start().context("failed to start forwarder")?;
    tokio::spawn(pump_forwarder_events(events));

    let mut session = Session::new(forwarder, global_cancel);
    session.initialize(&settings.session).await;

    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    spawn_line_reader(BufReader::new(std::io::stdin()), tx)
        .context("failed to start command reader")?;

    session.run(rx, shutdown_signal()).await;

    info!("Shutdown completed");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
