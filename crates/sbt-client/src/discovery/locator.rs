//! Reads the connection descriptor published by a running server.
//!
//! The server writes `project/target/active.json` when it starts accepting
//! connections and removes it on shutdown. The file's presence is the only
//! liveness signal trusted here; the socket is not probed.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::trace;
use url::Url;

use crate::error::ClientError;

const LOCAL_SCHEME_PREFIX: &str = "local://";

/// Address of the server socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketAddress {
    /// Unix domain socket at a filesystem path.
    Unix(PathBuf),
    /// TCP socket.
    Tcp { host: String, port: u16 },
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(formatter, "unix://{}", path.display()),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

impl SocketAddress {
    /// Parses the `uri` field of a descriptor.
    fn parse(uri: &str) -> Result<Self, String> {
        if let Some(path) = uri.strip_prefix(LOCAL_SCHEME_PREFIX) {
            if path.is_empty() {
                return Err(format!("socket uri '{uri}' has an empty path"));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }

        let url = Url::parse(uri).map_err(|error| format!("invalid socket uri '{uri}': {error}"))?;
        match url.scheme() {
            "tcp" => {
                let host = url
                    .host_str()
                    .ok_or_else(|| format!("socket uri '{uri}' has no host"))?;
                let port = url
                    .port()
                    .ok_or_else(|| format!("socket uri '{uri}' has no port"))?;
                Ok(Self::Tcp {
                    host: host.to_owned(),
                    port,
                })
            }
            other => Err(format!("unsupported socket scheme '{other}' in '{uri}'")),
        }
    }
}

/// Connection metadata published by the server.
///
/// TCP servers may publish a token for clients to present. The client does
/// not authenticate, so such servers are reachable only if they accept
/// unauthenticated commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub socket: SocketAddress,
    pub auth_token: Option<String>,
    pub token_file: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    uri: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    tokenfile_path: Option<PathBuf>,
}

impl ConnectionDescriptor {
    /// Whether the server published a token it expects clients to present.
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        self.auth_token.is_some() || self.token_file.is_some()
    }

    /// Parses descriptor file contents. Unknown fields are ignored.
    fn parse(content: &str) -> Result<Self, String> {
        let raw: RawDescriptor =
            serde_json::from_str(content).map_err(|error| error.to_string())?;
        Ok(Self {
            socket: SocketAddress::parse(&raw.uri)?,
            auth_token: raw.token,
            token_file: raw.tokenfile_path,
        })
    }
}

/// Something that can report the current descriptor, if any.
pub trait DescriptorSource {
    /// Returns `Ok(None)` when no server is running.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::CorruptState`] for a present but unusable
    /// descriptor and [`ClientError::ReadDescriptor`] for other IO failures.
    fn locate(&self) -> Result<Option<ConnectionDescriptor>, ClientError>;

    /// Path reported in errors.
    fn descriptor_path(&self) -> &Path;
}

/// Reads the descriptor from a fixed file path.
#[derive(Debug, Clone)]
pub struct DescriptorLocator {
    path: PathBuf,
}

impl DescriptorLocator {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DescriptorSource for DescriptorLocator {
    fn locate(&self) -> Result<Option<ConnectionDescriptor>, ClientError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "server descriptor absent");
                return Ok(None);
            }
            Err(source) => {
                return Err(ClientError::ReadDescriptor {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        ConnectionDescriptor::parse(&content)
            .map(Some)
            .map_err(|reason| ClientError::corrupt_state(&self.path, reason))
    }

    fn descriptor_path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn locator_with(content: Option<&str>) -> (TempDir, DescriptorLocator) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("active.json");
        if let Some(content) = content {
            fs::write(&path, content).expect("write descriptor");
        }
        (dir, DescriptorLocator::new(path))
    }

    #[test]
    fn missing_file_is_absent() {
        let (_dir, locator) = locator_with(None);
        assert_eq!(locator.locate().expect("locate"), None);
    }

    #[test]
    fn parses_local_socket_descriptor() {
        let (_dir, locator) = locator_with(Some(
            r#"{"uri":"local:///tmp/sbt/server/0a1b/sock","token":"s3cret","extra":{"ignored":true}}"#,
        ));
        let descriptor = locator.locate().expect("locate").expect("present");
        assert_eq!(
            descriptor,
            ConnectionDescriptor {
                socket: SocketAddress::Unix(PathBuf::from("/tmp/sbt/server/0a1b/sock")),
                auth_token: Some(String::from("s3cret")),
                token_file: None,
            }
        );
    }

    #[test]
    fn parses_tcp_descriptor_with_token_file() {
        let (_dir, locator) = locator_with(Some(
            r#"{"uri":"tcp://127.0.0.1:5010","tokenfilePath":"/home/me/.sbt/token.json","tokenfileUri":"file:///home/me/.sbt/token.json"}"#,
        ));
        let descriptor = locator.locate().expect("locate").expect("present");
        assert_eq!(
            descriptor.socket,
            SocketAddress::Tcp {
                host: String::from("127.0.0.1"),
                port: 5010,
            }
        );
        assert_eq!(
            descriptor.token_file,
            Some(PathBuf::from("/home/me/.sbt/token.json"))
        );
        assert_eq!(descriptor.socket.to_string(), "tcp://127.0.0.1:5010");
    }

    #[test]
    fn token_marks_descriptor_as_requiring_auth() {
        let (_dir, locator) = locator_with(Some(r#"{"uri":"local:///tmp/sbt/sock"}"#));
        let plain = locator.locate().expect("locate").expect("present");
        assert!(!plain.requires_auth());

        let tokened = ConnectionDescriptor {
            token_file: Some(PathBuf::from("/home/me/.sbt/token.json")),
            ..plain
        };
        assert!(tokened.requires_auth());
    }

    #[rstest]
    #[case("")]
    #[case("{\"uri\":")]
    #[case("not json")]
    #[case("{\"token\":\"abc\"}")]
    #[case("{\"uri\":42}")]
    #[case("{\"uri\":\"local://\"}")]
    #[case("{\"uri\":\"http://localhost:80\"}")]
    #[case("{\"uri\":\"tcp://localhost\"}")]
    fn unusable_descriptor_is_corrupt_state(#[case] content: &str) {
        let (_dir, locator) = locator_with(Some(content));
        let error = locator.locate().expect_err("corrupt descriptor");
        assert!(
            matches!(error, ClientError::CorruptState { .. }),
            "expected CorruptState, got {error:?}"
        );
    }

    #[test]
    fn unreadable_path_is_a_read_error() {
        let dir = TempDir::new().expect("temp dir");
        // A directory in place of the file cannot be read as text.
        let locator = DescriptorLocator::new(dir.path());
        let error = locator.locate().expect_err("directory is not readable");
        assert!(matches!(error, ClientError::ReadDescriptor { .. }));
    }
}
