//! Server notifications and the terminal build status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity attached to log messages and diagnostics.
///
/// The numeric encoding follows the LSP `MessageType` and
/// `DiagnosticSeverity` values emitted by the sbt server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MessageLevel {
    /// Compilation or task failure.
    Error,
    /// Non-fatal warning.
    Warning,
    /// Regular progress output.
    Info,
    /// Verbose output hidden by default.
    Debug,
}

impl TryFrom<u8> for MessageLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            1 => Ok(MessageLevel::Error),
            2 => Ok(MessageLevel::Warning),
            3 => Ok(MessageLevel::Info),
            // LSP 3.18 adds `Debug = 5`; older servers use `Log = 4`.
            4 | 5 => Ok(MessageLevel::Debug),
            other => Err(format!("unknown message level {other}")),
        }
    }
}

impl From<MessageLevel> for u8 {
    fn from(level: MessageLevel) -> Self {
        match level {
            MessageLevel::Error => 1,
            MessageLevel::Warning => 2,
            MessageLevel::Info => 3,
            MessageLevel::Debug => 4,
        }
    }
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageLevel::Error => formatter.write_str("error"),
            MessageLevel::Warning => formatter.write_str("warning"),
            MessageLevel::Info => formatter.write_str("info"),
            MessageLevel::Debug => formatter.write_str("debug"),
        }
    }
}

/// Zero-based line and character offset inside a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DiagnosticPosition {
    pub line: u32,
    pub character: u32,
}

/// Span covered by a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DiagnosticRange {
    pub start: DiagnosticPosition,
    pub end: DiagnosticPosition,
}

/// A single compiler diagnostic reported for a file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Diagnostic {
    pub range: DiagnosticRange,
    #[serde(default = "default_severity")]
    pub severity: MessageLevel,
    pub message: String,
}

const fn default_severity() -> MessageLevel {
    MessageLevel::Error
}

/// An unsolicited notification received while a request is outstanding.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// `window/logMessage`: a line of build output.
    LogMessage {
        level: MessageLevel,
        message: String,
    },
    /// `textDocument/publishDiagnostics`: compiler problems for one file.
    Diagnostics {
        uri: String,
        diagnostics: Vec<Diagnostic>,
    },
    /// Any other notification, kept verbatim.
    Notification {
        method: String,
        params: serde_json::Value,
    },
}

impl ServerEvent {
    /// Returns the notification method this event was decoded from.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::LogMessage { .. } => "window/logMessage",
            Self::Diagnostics { .. } => "textDocument/publishDiagnostics",
            Self::Notification { method, .. } => method,
        }
    }
}

/// Final outcome of an executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// The server reported the command as done with a zero exit code.
    Success,
    /// The server reported an error or a non-zero exit code.
    Failure {
        code: Option<i64>,
        message: Option<String>,
    },
}

impl BuildStatus {
    /// Returns `true` for [`BuildStatus::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => formatter.write_str("success"),
            Self::Failure {
                code: Some(code),
                message: Some(message),
            } => write!(formatter, "failure ({code}): {message}"),
            Self::Failure {
                code: Some(code),
                message: None,
            } => write!(formatter, "failure ({code})"),
            Self::Failure {
                code: None,
                message: Some(message),
            } => write!(formatter, "failure: {message}"),
            Self::Failure {
                code: None,
                message: None,
            } => formatter.write_str("failure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, MessageLevel::Error)]
    #[case(2, MessageLevel::Warning)]
    #[case(3, MessageLevel::Info)]
    #[case(4, MessageLevel::Debug)]
    #[case(5, MessageLevel::Debug)]
    fn decodes_message_levels(#[case] raw: u8, #[case] expected: MessageLevel) {
        assert_eq!(MessageLevel::try_from(raw), Ok(expected));
    }

    #[test]
    fn rejects_unknown_message_level() {
        assert!(MessageLevel::try_from(9_u8).is_err());
    }

    #[test]
    fn diagnostic_severity_defaults_to_error() {
        let diagnostic: Diagnostic = serde_json::from_str(
            r#"{"range":{"start":{"line":1,"character":2},"end":{"line":1,"character":4}},"message":"boom"}"#,
        )
        .expect("diagnostic parses");
        assert_eq!(diagnostic.severity, MessageLevel::Error);
    }

    #[test]
    fn failure_status_displays_code_and_message() {
        let status = BuildStatus::Failure {
            code: Some(-33000),
            message: Some(String::from("Compilation failed")),
        };
        assert_eq!(status.to_string(), "failure (-33000): Compilation failed");
        assert!(!status.is_success());
    }
}
