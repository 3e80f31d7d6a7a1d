//! TOML configuration file for the p2pfwd binary.
//!
//! The file is optional and only read when `--config <PATH>` (or
//! `P2PFWD_CONFIG`) names one.  Every field has a default, so a file may
//! specify as little as it likes:
//!
//! ```toml
//! [session]
//! connect = ["9f2c4c0e5d2b4a7f8e1d3c6b5a4f3e2d"]
//! tcp = [8080, 8443]
//! udp = [53]
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Command-line flags are merged on top: repeated `--connect`, `--tcp`
//! and `--udp` values are appended to the file's lists, and `--log-level`
//! replaces the file's level.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::session::SessionConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Resources to set up at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSection {
    /// Peer identities to connect to.
    #[serde(default)]
    pub connect: Vec<String>,
    /// TCP ports to expose.
    #[serde(default)]
    pub tcp: Vec<u16>,
    /// UDP ports to expose.
    #[serde(default)]
    pub udp: Vec<u16>,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingSection {
    /// `tracing` filter directive, e.g. `"info"` or `"p2pfwd=debug"`.
    /// `RUST_LOG` still takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Flags given on the command line, already parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub connect: Vec<String>,
    pub tcp: Vec<u16>,
    pub udp: Vec<u16>,
    pub log_level: Option<String>,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub session: SessionConfig,
    pub log_level: String,
}

impl AppConfig {
    /// Merges command-line flags on top of the file contents.
    pub fn merge(self, cli: CliOverrides) -> Settings {
        let mut connect = self.session.connect;
        connect.extend(cli.connect);
        let mut tcp_ports = self.session.tcp;
        tcp_ports.extend(cli.tcp);
        let mut udp_ports = self.session.udp;
        udp_ports.extend(cli.udp);

        Settings {
            session: SessionConfig {
                connect,
                tcp_ports,
                udp_ports,
            },
            log_level: cli.log_level.unwrap_or(self.logging.level),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Reads and parses the config file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (including when it
/// does not exist, since it was named explicitly) and [`ConfigError::Parse`]
/// if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parses config TOML from a string.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Loads the file if one was named, otherwise returns defaults.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_optional(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(AppConfig::default()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
