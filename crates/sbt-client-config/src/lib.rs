//! Layered configuration for the sbt client.
//!
//! Values resolve from built-in defaults, an optional TOML file supplied via
//! `--config-path` or `SBTC_CONFIG_PATH`, `SBTC_*` environment variables, and
//! command-line flags, with later layers taking precedence.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SERVER_COMMAND,
    DEFAULT_STARTUP_TIMEOUT_SECS, DESCRIPTOR_RELATIVE_PATH, default_log_filter,
    default_log_filter_string, default_log_format, default_server_command_string,
    default_wire_framing,
};
pub use logging::LogFormat;
pub use sbt_client_protocol::WireFraming;

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SBTC")]
pub struct Config {
    /// Tracing filter expression, for example `debug` or `sbt_client=trace`.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for diagnostic logging.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Executable launched when no server is running.
    #[ortho_config(default = default_server_command_string())]
    pub server_command: String,
    /// Seconds to wait for a server to publish its descriptor.
    #[ortho_config(default = DEFAULT_STARTUP_TIMEOUT_SECS)]
    pub startup_timeout_secs: u64,
    /// Milliseconds between descriptor polls.
    #[ortho_config(default = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,
    /// Framing used for the outgoing request.
    #[ortho_config(default = default_wire_framing())]
    pub wire_framing: WireFraming,
    /// Optional bound on each read while a request is in flight.
    pub read_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            server_command: default_server_command_string(),
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            wire_framing: default_wire_framing(),
            read_timeout_secs: None,
        }
    }
}

impl Config {
    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Logging output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Executable launched when no server is running.
    #[must_use]
    pub fn server_command(&self) -> &str {
        &self.server_command
    }

    /// Upper bound on waiting for the server descriptor.
    #[must_use]
    pub const fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    /// Constant interval between descriptor polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Request framing.
    #[must_use]
    pub const fn wire_framing(&self) -> WireFraming {
        self.wire_framing
    }

    /// Per-read deadline while a request is in flight, if any. Zero means
    /// no deadline, as sockets reject a zero timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
