//! Socket transport for the server connection.
//!
//! Connections are wrapped in a uniform [`Connection`] type so that the
//! session logic stays agnostic of whether the server listens on a Unix
//! socket or TCP.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

#[cfg(unix)]
use std::os::fd::OwnedFd;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
#[cfg(unix)]
use std::path::Path;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

use crate::discovery::SocketAddress;
use crate::error::ClientError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// A bidirectional byte stream that can be closed explicitly.
pub trait Transport: Read + Write {
    /// Shuts the stream down. Called exactly once by the owning session.
    ///
    /// # Errors
    ///
    /// Returns the underlying socket error; callers treat it as advisory.
    fn close(&mut self) -> io::Result<()>;

    /// Bounds each subsequent read. `None` blocks indefinitely.
    ///
    /// # Errors
    ///
    /// Returns the underlying socket error.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

/// Live connection to the server.
#[derive(Debug)]
pub enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

impl Transport for Connection {
    fn close(&mut self) -> io::Result<()> {
        let result = match self {
            Self::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Self::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        // The peer may already have hung up.
        match result {
            Err(error) if error.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            Self::Unix(stream) => stream.set_read_timeout(timeout),
        }
    }
}

/// Connects to `address` within [`CONNECTION_TIMEOUT`].
///
/// # Errors
///
/// Returns [`ClientError::ConnectionRefused`] when nothing listens at the
/// address and [`ClientError::Connect`] for any other failure.
pub fn connect(address: &SocketAddress) -> Result<Connection, ClientError> {
    let endpoint = address.to_string();
    let result = match address {
        SocketAddress::Tcp { host, port } => resolve_tcp_address(host, *port).and_then(
            |resolved| TcpStream::connect_timeout(&resolved, CONNECTION_TIMEOUT).map(Connection::Tcp),
        ),
        SocketAddress::Unix(path) => connect_unix_path(path),
    };
    result.map_err(|source| classify_connect_error(endpoint, source))
}

fn classify_connect_error(endpoint: String, source: io::Error) -> ClientError {
    match source.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::NotFound
        | io::ErrorKind::AddrNotAvailable => ClientError::ConnectionRefused { endpoint, source },
        _ => ClientError::Connect { endpoint, source },
    }
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

#[cfg(unix)]
fn connect_unix_path(path: &Path) -> io::Result<Connection> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, CONNECTION_TIMEOUT)?;
    let stream = UnixStream::from(OwnedFd::from(socket));
    Ok(Connection::Unix(stream))
}

#[cfg(not(unix))]
fn connect_unix_path(_path: &std::path::Path) -> io::Result<Connection> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "unix domain sockets are not supported on this platform",
    ))
}
