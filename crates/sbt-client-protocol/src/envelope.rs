//! Request construction and classification of incoming envelopes.
//!
//! Every value received from the server is either a response correlated with
//! a request id or a notification identified by its `method`. Known
//! notifications are decoded into typed [`ServerEvent`] variants; anything
//! else is preserved verbatim so callers can still observe it in order.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decoder::DecodeError;
use crate::event::{BuildStatus, Diagnostic, MessageLevel, ServerEvent};

const JSONRPC_VERSION: &str = "2.0";
const EXEC_METHOD: &str = "sbt/exec";
const DONE_STATUS: &str = "Done";

/// Correlation id of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Parameters of the `sbt/exec` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecParams {
    pub command_line: String,
}

/// The single request the client sends per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    pub params: ExecParams,
}

impl RpcRequest {
    /// Builds an `sbt/exec` request for an already extracted command.
    #[must_use]
    pub fn exec(id: RequestId, command: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            method: EXEC_METHOD.to_owned(),
            params: ExecParams {
                command_line: command.into(),
            },
        }
    }
}

/// Error payload of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
}

/// Outcome carried by a response envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    Result(Value),
    Error(ResponseError),
}

impl ResponseOutcome {
    /// Interprets the outcome as the final build status.
    ///
    /// A result is successful when it reports `status: "Done"` (or omits the
    /// status) and a zero or absent `exitCode`.
    #[must_use]
    pub fn build_status(&self) -> BuildStatus {
        match self {
            Self::Error(error) => BuildStatus::Failure {
                code: Some(error.code),
                message: Some(error.message.clone()),
            },
            Self::Result(result) => {
                let status = result.get("status").and_then(Value::as_str);
                let exit_code = result.get("exitCode").and_then(Value::as_i64);
                match (status, exit_code) {
                    (None | Some(DONE_STATUS), None | Some(0)) => BuildStatus::Success,
                    (Some(status), None | Some(0)) => BuildStatus::Failure {
                        code: None,
                        message: Some(format!("server reported status {status}")),
                    },
                    (_, Some(code)) => BuildStatus::Failure {
                        code: Some(code),
                        message: None,
                    },
                }
            }
        }
    }
}

/// A classified incoming envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Response to a request. `id` is `None` when the server sent a
    /// non-numeric or null id, which can never match an outstanding request.
    Response {
        id: Option<RequestId>,
        outcome: ResponseOutcome,
    },
    /// Unsolicited notification.
    Event(ServerEvent),
}

#[derive(Deserialize)]
struct LogMessageParams {
    #[serde(rename = "type")]
    level: MessageLevel,
    message: String,
}

#[derive(Deserialize)]
struct DiagnosticParams {
    uri: String,
    #[serde(default)]
    diagnostics: Vec<Diagnostic>,
}

/// Classifies a decoded JSON value as a response or an event.
///
/// # Errors
///
/// Returns [`DecodeError::Envelope`] when the value is not an object, carries
/// neither `method` nor `result`/`error`, or when the parameters of a known
/// notification do not match their schema.
pub fn classify(value: Value) -> Result<Incoming, DecodeError> {
    let Value::Object(mut object) = value else {
        return Err(DecodeError::envelope("envelope is not a JSON object"));
    };

    if let Some(method) = object.remove("method") {
        let Value::String(method) = method else {
            return Err(DecodeError::envelope("notification method is not a string"));
        };
        let params = object.remove("params").unwrap_or(Value::Null);
        return decode_event(method, params).map(Incoming::Event);
    }

    let id = object.get("id").and_then(Value::as_u64).map(RequestId);
    if let Some(error) = object.remove("error") {
        let error: ResponseError = serde_json::from_value(error)
            .map_err(|source| DecodeError::envelope(format!("invalid error payload: {source}")))?;
        return Ok(Incoming::Response {
            id,
            outcome: ResponseOutcome::Error(error),
        });
    }
    if let Some(result) = object.remove("result") {
        return Ok(Incoming::Response {
            id,
            outcome: ResponseOutcome::Result(result),
        });
    }

    Err(DecodeError::envelope(
        "envelope has neither a method nor a result or error",
    ))
}

fn decode_event(method: String, params: Value) -> Result<ServerEvent, DecodeError> {
    match method.as_str() {
        "window/logMessage" => {
            let params: LogMessageParams = serde_json::from_value(params).map_err(|source| {
                DecodeError::envelope(format!("invalid {method} params: {source}"))
            })?;
            Ok(ServerEvent::LogMessage {
                level: params.level,
                message: params.message,
            })
        }
        "textDocument/publishDiagnostics" | "build/publishDiagnostics" => {
            let params: DiagnosticParams = serde_json::from_value(params).map_err(|source| {
                DecodeError::envelope(format!("invalid {method} params: {source}"))
            })?;
            Ok(ServerEvent::Diagnostics {
                uri: params.uri,
                diagnostics: params.diagnostics,
            })
        }
        _ => Ok(ServerEvent::Notification { method, params }),
    }
}

/// Extracts the command the server will execute from a command line.
///
/// Only the first `;`-separated command is honoured; chained commands after
/// it are dropped. Leading empty segments (`;compile;test`) are skipped.
#[must_use]
pub fn first_command(command_line: &str) -> &str {
    command_line
        .split(';')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("compile", "compile")]
    #[case("compile; test", "compile")]
    #[case(";compile;test", "compile")]
    #[case("  testOnly example.Spec  ", "testOnly example.Spec")]
    #[case("", "")]
    #[case(" ; ", "")]
    fn extracts_first_command(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(first_command(input), expected);
    }

    #[test]
    fn exec_request_serialises_as_json_rpc() {
        let request = RpcRequest::exec(RequestId(1), "compile");
        let value = serde_json::to_value(&request).expect("serialise request");
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "sbt/exec",
                "params": {"commandLine": "compile"}
            })
        );
    }

    #[test]
    fn classifies_log_message() {
        let incoming = classify(json!({
            "jsonrpc": "2.0",
            "method": "window/logMessage",
            "params": {"type": 2, "message": "deprecated API"}
        }))
        .expect("classify log message");
        assert_eq!(
            incoming,
            Incoming::Event(ServerEvent::LogMessage {
                level: MessageLevel::Warning,
                message: String::from("deprecated API"),
            })
        );
    }

    #[test]
    fn classifies_diagnostics() {
        let incoming = classify(json!({
            "jsonrpc": "2.0",
            "method": "textDocument/publishDiagnostics",
            "params": {
                "uri": "file:///project/src/main/scala/Main.scala",
                "diagnostics": [{
                    "range": {
                        "start": {"line": 3, "character": 4},
                        "end": {"line": 3, "character": 9}
                    },
                    "severity": 1,
                    "message": "not found: value x"
                }]
            }
        }))
        .expect("classify diagnostics");
        let Incoming::Event(ServerEvent::Diagnostics { uri, diagnostics }) = incoming else {
            panic!("expected diagnostics event, got {incoming:?}");
        };
        assert_eq!(uri, "file:///project/src/main/scala/Main.scala");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start.line, 3);
    }

    #[test]
    fn keeps_unknown_notifications_verbatim() {
        let incoming = classify(json!({
            "jsonrpc": "2.0",
            "method": "build/taskStart",
            "params": {"taskId": {"id": "7"}}
        }))
        .expect("classify notification");
        assert_eq!(
            incoming,
            Incoming::Event(ServerEvent::Notification {
                method: String::from("build/taskStart"),
                params: json!({"taskId": {"id": "7"}}),
            })
        );
    }

    #[test]
    fn classifies_result_response() {
        let incoming = classify(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"status": "Done", "exitCode": 0}
        }))
        .expect("classify result");
        let Incoming::Response { id, outcome } = incoming else {
            panic!("expected response");
        };
        assert_eq!(id, Some(RequestId(1)));
        assert_eq!(outcome.build_status(), BuildStatus::Success);
    }

    #[test]
    fn classifies_error_response() {
        let incoming = classify(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -33000, "message": "Compilation failed"}
        }))
        .expect("classify error");
        let Incoming::Response { outcome, .. } = incoming else {
            panic!("expected response");
        };
        assert_eq!(
            outcome.build_status(),
            BuildStatus::Failure {
                code: Some(-33000),
                message: Some(String::from("Compilation failed")),
            }
        );
    }

    #[rstest]
    #[case(json!({"status": "Done"}), true)]
    #[case(json!({}), true)]
    #[case(json!({"status": "Done", "exitCode": 1}), false)]
    #[case(json!({"status": "Error"}), false)]
    fn interprets_result_payloads(#[case] result: Value, #[case] success: bool) {
        let outcome = ResponseOutcome::Result(result);
        assert_eq!(outcome.build_status().is_success(), success);
    }

    #[test]
    fn string_ids_never_correlate() {
        let incoming = classify(json!({"id": "abc", "result": {}})).expect("classify");
        assert!(matches!(incoming, Incoming::Response { id: None, .. }));
    }

    #[rstest]
    #[case(json!([1, 2, 3]))]
    #[case(json!({"jsonrpc": "2.0"}))]
    #[case(json!({"method": 7}))]
    #[case(json!({"method": "window/logMessage", "params": {"type": 3}}))]
    fn rejects_malformed_envelopes(#[case] value: Value) {
        assert!(matches!(classify(value), Err(DecodeError::Envelope { .. })));
    }
}
