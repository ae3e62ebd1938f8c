//! Wire types shared by the sbt client session layer.
//!
//! The sbt server speaks a JSON-RPC shaped protocol over a byte stream. The
//! client sends a single `sbt/exec` request and then receives log messages,
//! diagnostics and other notifications until the response correlated with the
//! request arrives. This crate models those envelopes, decodes them from a
//! stream of concatenated JSON values, and frames outgoing requests.

mod decoder;
mod envelope;
mod event;
mod framing;

pub use decoder::{DecodeError, EnvelopeDecoder};
pub use envelope::{
    ExecParams, Incoming, RequestId, ResponseError, ResponseOutcome, RpcRequest, classify,
    first_command,
};
pub use event::{
    BuildStatus, Diagnostic, DiagnosticPosition, DiagnosticRange, MessageLevel, ServerEvent,
};
pub use framing::{WireFraming, encode_request};
