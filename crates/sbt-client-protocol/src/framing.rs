//! Framing of outgoing requests.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::envelope::RpcRequest;

/// How requests are delimited on the wire.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WireFraming {
    /// The JSON value followed by a newline.
    #[default]
    Bare,
    /// An LSP `Content-Length` header block, the JSON value, then CRLF.
    ContentLength,
}

/// Serialises a request into the bytes written to the connection.
///
/// # Errors
///
/// Returns the serialisation error if the request cannot be encoded.
pub fn encode_request(
    request: &RpcRequest,
    framing: WireFraming,
) -> Result<Vec<u8>, serde_json::Error> {
    let body = serde_json::to_vec(request)?;
    let mut frame = Vec::with_capacity(body.len() + 32);
    match framing {
        WireFraming::Bare => {
            frame.extend_from_slice(&body);
            frame.push(b'\n');
        }
        WireFraming::ContentLength => {
            // The declared length covers the trailing CRLF.
            frame.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len() + 2).as_bytes());
            frame.extend_from_slice(&body);
            frame.extend_from_slice(b"\r\n");
        }
    }
    Ok(frame)
}
