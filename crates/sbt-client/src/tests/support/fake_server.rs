//! Fake sbt server for orchestration and CLI tests.
//!
//! Binds a Unix socket inside the project directory, optionally publishes the
//! connection descriptor after a delay to mimic a server that is still
//! booting, then accepts one connection, records the request and streams
//! canned replies.

use std::fs;
use std::io::{self, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use sbt_client_protocol::EnvelopeDecoder;
use serde_json::{Value, json};

use crate::project::descriptor_path;

const ACCEPT_DEADLINE: Duration = Duration::from_secs(10);

/// When the fake server writes its descriptor.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Publish {
    Now,
    After(Duration),
}

pub(crate) struct FakeServer {
    requests: Arc<Mutex<Vec<Value>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeServer {
    /// Starts a server for `project_root` that answers with `replies`.
    pub fn start(project_root: &Path, publish: Publish, replies: Vec<String>) -> Result<Self> {
        let socket_path = project_root.join("sbt-server.sock");
        let listener = UnixListener::bind(&socket_path).context("bind fake server")?;
        listener
            .set_nonblocking(true)
            .context("fake server nonblocking")?;
        let descriptor = descriptor_path(project_root);
        let uri = format!("local://{}", socket_path.display());
        let requests: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let requests_clone = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            match publish {
                Publish::Now => {}
                Publish::After(delay) => thread::sleep(delay),
            }
            write_descriptor(&descriptor, &uri)?;
            serve_client(&listener, &replies, &requests_clone)
        });
        if matches!(publish, Publish::Now) {
            // Make the descriptor visible before the caller's first locate.
            wait_for_file(&descriptor_path(project_root))?;
        }
        Ok(Self {
            requests,
            handle: Some(handle),
        })
    }

    /// Waits for the server thread and returns the requests it received.
    pub fn take_requests(&mut self) -> Result<Vec<Value>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake server thread panicked"))?
                .context("fake server failed")?;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A `window/logMessage` notification.
pub(crate) fn log_line(level: u8, message: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "window/logMessage",
        "params": { "type": level, "message": message }
    })
    .to_string()
}

/// A successful response to request 1.
pub(crate) fn done_line() -> String {
    json!({ "jsonrpc": "2.0", "id": 1, "result": { "status": "Done", "exitCode": 0 } })
        .to_string()
}

/// A failed response to request 1.
pub(crate) fn error_line(message: &str) -> String {
    json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": -33000, "message": message } })
        .to_string()
}

fn write_descriptor(path: &Path, uri: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create descriptor directory")?;
    }
    // Write then rename so readers never observe a partial file.
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, json!({ "uri": uri }).to_string()).context("write descriptor")?;
    fs::rename(&staging, path).context("publish descriptor")
}

fn wait_for_file(path: &Path) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !path.exists() {
        if Instant::now() >= deadline {
            return Err(anyhow!("descriptor {} never appeared", path.display()));
        }
        thread::sleep(Duration::from_millis(5));
    }
    Ok(())
}

fn serve_client(
    listener: &UnixListener,
    replies: &[String],
    requests: &Arc<Mutex<Vec<Value>>>,
) -> Result<()> {
    let deadline = Instant::now() + ACCEPT_DEADLINE;
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                stream
                    .set_nonblocking(false)
                    .context("fake server blocking stream")?;
                return respond(stream, replies, requests);
            }
            Err(ref error)
                if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
            {
                thread::sleep(Duration::from_millis(10));
            }
            // Nobody connected; the client failed before reaching the socket.
            Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(error) => return Err(error).context("accept connection"),
        }
    }
}

fn respond(
    mut stream: UnixStream,
    replies: &[String],
    requests: &Arc<Mutex<Vec<Value>>>,
) -> Result<()> {
    let request = read_request(&mut stream)?;
    requests
        .lock()
        .map_err(|error| anyhow!("lock requests: {error}"))?
        .push(request);
    for reply in replies {
        stream.write_all(reply.as_bytes()).context("write reply")?;
        stream.write_all(b"\n").context("write newline")?;
    }
    stream.flush().context("flush replies")
}

fn read_request(stream: &mut UnixStream) -> Result<Value> {
    let mut decoder = EnvelopeDecoder::new();
    let mut chunk = [0_u8; 1024];
    loop {
        if let Some(value) = decoder.next_value().context("decode request")? {
            return Ok(value);
        }
        let read = stream.read(&mut chunk).context("read request")?;
        if read == 0 {
            return Err(anyhow!("client closed before sending a request"));
        }
        decoder.push(&chunk[..read]);
    }
}
