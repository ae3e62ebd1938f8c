use sbt_client_protocol::WireFraming;

use crate::logging::LogFormat;

/// Default log filter expression used by the client binary.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Executable started when no server is running for the project.
pub const DEFAULT_SERVER_COMMAND: &str = "sbt";

/// Seconds to wait for a freshly launched server to publish its descriptor.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 60;

/// Interval between descriptor polls while waiting for readiness.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Location of the server descriptor relative to the project root.
pub const DESCRIPTOR_RELATIVE_PATH: &str = "project/target/active.json";

/// Default log filter expression used by the client binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the client binary.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Owned server command used where allocation is required.
pub fn default_server_command_string() -> String {
    DEFAULT_SERVER_COMMAND.to_owned()
}

/// Default request framing.
pub fn default_wire_framing() -> WireFraming {
    WireFraming::Bare
}
