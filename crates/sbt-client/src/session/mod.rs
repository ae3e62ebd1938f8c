//! A single command execution over a connection to the server.
//!
//! A [`Session`] is opened against a ready server, sends exactly one
//! `sbt/exec` request and then reads envelopes until the correlated response
//! arrives. Events are surfaced in wire order. The connection is closed
//! exactly once, when the session (or the stream it turned into) is dropped
//! or finishes.

mod transport;

use std::io::{self, Read};
use std::time::Duration;

use sbt_client_protocol::{
    BuildStatus, Diagnostic, EnvelopeDecoder, Incoming, MessageLevel, RequestId, RpcRequest,
    ServerEvent, WireFraming, classify, encode_request, first_command,
};
use tracing::{debug, warn};

pub use transport::{Connection, Transport, connect};

use crate::discovery::ConnectionDescriptor;
use crate::error::ClientError;

const READ_CHUNK: usize = 8 * 1024;
const EXEC_REQUEST_ID: RequestId = RequestId(1);

/// Per-connection settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub framing: WireFraming,
    pub read_timeout: Option<Duration>,
}

/// Opens sessions against a located server.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcSession {
    options: SessionOptions,
}

impl RpcSession {
    #[must_use]
    pub const fn new(options: SessionOptions) -> Self {
        Self { options }
    }

    /// Connects to the socket named by `descriptor`. No retry is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionRefused`] when nothing listens on the
    /// socket, or [`ClientError::Connect`] for other connection failures.
    pub fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Session<Connection>, ClientError> {
        if descriptor.requires_auth() {
            warn!(
                socket = %descriptor.socket,
                "server expects token authentication, which is not supported; the command may be rejected"
            );
        }
        let connection = connect(&descriptor.socket)?;
        debug!(socket = %descriptor.socket, "connected to sbt server");
        Ok(Session::new(connection, self.options))
    }
}

/// An open connection able to run one command.
#[derive(Debug)]
pub struct Session<T: Transport> {
    transport: T,
    decoder: EnvelopeDecoder,
    options: SessionOptions,
    closed: bool,
}

impl<T: Transport> Session<T> {
    /// Wraps an already connected transport.
    pub fn new(transport: T, options: SessionOptions) -> Self {
        Self {
            transport,
            decoder: EnvelopeDecoder::new(),
            options,
            closed: false,
        }
    }

    /// Runs the first command of `command_line` and collects every event.
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::SendRequest`] if the request cannot be
    /// written, [`ClientError::ConnectionLost`] if the stream ends before the
    /// response, [`ClientError::ResponseTimeout`] if a configured read
    /// timeout elapses, or [`ClientError::Protocol`] on undecodable input.
    /// A build that fails is not an error; it is reported in the status.
    pub fn execute(self, command_line: &str) -> Result<ExecutionResult, ClientError> {
        let mut stream = self.submit(command_line)?;
        let mut events = Vec::new();
        for event in stream.by_ref() {
            events.push(event?);
        }
        let status = stream.into_status()?;
        Ok(ExecutionResult { status, events })
    }

    /// Sends the request and returns a lazy stream of the events it produces.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SetReadTimeout`] if the configured read timeout
    /// is rejected by the socket, in which case nothing is sent, or
    /// [`ClientError::SendRequest`] if the request cannot be written.
    pub fn submit(mut self, command_line: &str) -> Result<EventStream<T>, ClientError> {
        let command = first_command(command_line);
        if command.len() != command_line.trim().len() {
            debug!(command, command_line, "forwarding only the first command");
        }
        if let Some(timeout) = self.options.read_timeout {
            self.transport
                .set_read_timeout(Some(timeout))
                .map_err(|source| ClientError::SetReadTimeout { timeout, source })?;
        }
        let request = RpcRequest::exec(EXEC_REQUEST_ID, command);
        let frame = encode_request(&request, self.options.framing)
            .map_err(|error| ClientError::SendRequest {
                source: io::Error::from(error),
            })?;
        self.transport
            .write_all(&frame)
            .and_then(|()| self.transport.flush())
            .map_err(|source| ClientError::SendRequest { source })?;
        debug!(id = %EXEC_REQUEST_ID, command, framing = %self.options.framing, "sent request");
        Ok(EventStream {
            session: self,
            request_id: EXEC_REQUEST_ID,
            status: None,
            finished: false,
        })
    }

    /// Returns the next classified envelope, reading from the socket as
    /// needed.
    fn next_incoming(&mut self) -> Result<Incoming, ClientError> {
        let mut chunk = [0_u8; READ_CHUNK];
        loop {
            if let Some(value) = self.decoder.next_value()? {
                return Ok(classify(value)?);
            }
            let read = match self.transport.read(&mut chunk) {
                Ok(0) => return Err(ClientError::ConnectionLost { source: None }),
                Ok(read) => read,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(self.read_failure(error)),
            };
            self.decoder.push(&chunk[..read]);
        }
    }

    fn read_failure(&self, error: io::Error) -> ClientError {
        match (self.options.read_timeout, error.kind()) {
            (Some(timeout), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                ClientError::ResponseTimeout { timeout }
            }
            _ => ClientError::ConnectionLost {
                source: Some(error),
            },
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(error) = self.transport.close() {
            warn!(%error, "failed to close connection to sbt server");
        }
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Events produced by one submitted command, read lazily from the socket.
///
/// The stream ends after the correlated response; [`EventStream::status`]
/// then reports the outcome. Any error is yielded once and ends the stream.
#[derive(Debug)]
pub struct EventStream<T: Transport> {
    session: Session<T>,
    request_id: RequestId,
    status: Option<BuildStatus>,
    finished: bool,
}

impl<T: Transport> EventStream<T> {
    /// Final status, available once the stream has ended successfully.
    #[must_use]
    pub const fn status(&self) -> Option<&BuildStatus> {
        self.status.as_ref()
    }

    /// Consumes the stream and returns the status.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionLost`] if the stream did not reach a
    /// response.
    pub fn into_status(mut self) -> Result<BuildStatus, ClientError> {
        self.status
            .take()
            .ok_or(ClientError::ConnectionLost { source: None })
    }

    fn finish(&mut self) {
        self.finished = true;
        self.session.close();
    }
}

impl<T: Transport> Iterator for EventStream<T> {
    type Item = Result<ServerEvent, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.session.next_incoming() {
                Ok(Incoming::Event(event)) => {
                    debug!(method = event.method(), "received event");
                    return Some(Ok(event));
                }
                Ok(Incoming::Response {
                    id: Some(id),
                    outcome,
                }) if id == self.request_id => {
                    let status = outcome.build_status();
                    debug!(%id, %status, "received response");
                    self.status = Some(status);
                    self.finish();
                    return None;
                }
                Ok(Incoming::Response { id, .. }) => {
                    debug!(?id, expected = %self.request_id, "ignoring uncorrelated response");
                }
                Err(error) => {
                    self.finish();
                    return Some(Err(error));
                }
            }
        }
    }
}

/// Outcome of an executed command together with everything the server
/// reported while running it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub status: BuildStatus,
    pub events: Vec<ServerEvent>,
}

impl ExecutionResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Log messages in arrival order.
    pub fn messages(&self) -> impl Iterator<Item = (MessageLevel, &str)> {
        self.events.iter().filter_map(|event| match event {
            ServerEvent::LogMessage { level, message } => Some((*level, message.as_str())),
            _ => None,
        })
    }

    /// Diagnostics paired with the URI of the file they refer to.
    pub fn diagnostics(&self) -> impl Iterator<Item = (&str, &Diagnostic)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ServerEvent::Diagnostics { uri, diagnostics } => Some((uri.as_str(), diagnostics)),
                _ => None,
            })
            .flat_map(|(uri, diagnostics)| {
                diagnostics.iter().map(move |diagnostic| (uri, diagnostic))
            })
    }
}
