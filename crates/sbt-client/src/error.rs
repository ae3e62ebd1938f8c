//! Error taxonomy for server discovery and session handling.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use sbt_client_protocol::DecodeError;
use thiserror::Error;

/// Errors raised while locating, launching or talking to the sbt server.
///
/// Absence of a running server is not an error: the locator reports it as
/// `Ok(None)`. Every variant here is terminal for the current invocation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{path:?} is not an sbt project (expected a project/ directory and build.sbt)")]
    NotAProject { path: PathBuf },
    #[error("failed to read server descriptor {path:?}: {source}")]
    ReadDescriptor {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("server descriptor {path:?} is present but unusable: {reason}")]
    CorruptState { path: PathBuf, reason: String },
    #[error("failed to launch sbt server with '{command}': {source}")]
    LaunchFailure {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("timed out after {timeout_ms} ms waiting for server descriptor {path:?}")]
    Timeout { path: PathBuf, timeout_ms: u64 },
    #[error("sbt server at {endpoint} refused the connection: {source}")]
    ConnectionRefused {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to connect to sbt server at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to apply a read timeout of {} ms: {source}", timeout.as_millis())]
    SetReadTimeout {
        timeout: Duration,
        #[source]
        source: io::Error,
    },
    #[error("failed to send request to sbt server: {source}")]
    SendRequest {
        #[source]
        source: io::Error,
    },
    #[error("connection to sbt server lost before the command completed")]
    ConnectionLost {
        #[source]
        source: Option<io::Error>,
    },
    #[error("sbt server did not respond within {} ms", timeout.as_millis())]
    ResponseTimeout { timeout: Duration },
    #[error("protocol error: {source}")]
    Protocol {
        #[from]
        source: DecodeError,
    },
}

/// Coarse classification of [`ClientError`] for callers deciding on a
/// retry policy outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotAProject,
    CorruptState,
    Io,
    LaunchFailure,
    Timeout,
    ConnectionRefused,
    ConnectionLost,
    Protocol,
}

impl ClientError {
    /// Returns the coarse kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAProject { .. } => ErrorKind::NotAProject,
            Self::CorruptState { .. } => ErrorKind::CorruptState,
            Self::ReadDescriptor { .. }
            | Self::Connect { .. }
            | Self::SetReadTimeout { .. }
            | Self::SendRequest { .. } => ErrorKind::Io,
            Self::LaunchFailure { .. } => ErrorKind::LaunchFailure,
            Self::Timeout { .. } | Self::ResponseTimeout { .. } => ErrorKind::Timeout,
            Self::ConnectionRefused { .. } => ErrorKind::ConnectionRefused,
            Self::ConnectionLost { .. } => ErrorKind::ConnectionLost,
            Self::Protocol { .. } => ErrorKind::Protocol,
        }
    }

    /// Remedy worth suggesting to the user, if one is known.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::NotAProject => Some("run sbtc from the directory that contains build.sbt"),
            ErrorKind::LaunchFailure => {
                Some("point --server-command or SBTC_SERVER_COMMAND at the sbt executable")
            }
            ErrorKind::Timeout => Some(
                "the server may still be starting; raise --startup-timeout-secs or --read-timeout-secs",
            ),
            ErrorKind::ConnectionRefused => Some(
                "the server descriptor may be stale; remove project/target/active.json if no sbt server is running",
            ),
            ErrorKind::CorruptState
            | ErrorKind::Io
            | ErrorKind::ConnectionLost
            | ErrorKind::Protocol => None,
        }
    }

    pub(crate) fn corrupt_state(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptState {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
