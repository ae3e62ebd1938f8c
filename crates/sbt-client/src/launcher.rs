//! Starting an sbt server when none is running.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::info;

use crate::error::ClientError;

/// A server process started by this client.
///
/// The child is not waited on; the server outlives the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchedServer {
    pub pid: u32,
}

/// Starts a server for a project.
#[cfg_attr(test, mockall::automock)]
pub trait ServerLauncher {
    /// Spawns the server and returns without waiting for it to be ready.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::LaunchFailure`] when the process cannot be
    /// spawned.
    fn launch(&self, project_root: &Path) -> Result<LaunchedServer, ClientError>;
}

/// Launches the configured server command as a detached child process.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    command: String,
}

impl ProcessLauncher {
    /// `command` is split on whitespace into a program and its arguments.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn build_command(&self, project_root: &Path) -> Result<Command, ClientError> {
        let mut parts = self.command.split_whitespace();
        let program = parts.next().ok_or_else(|| ClientError::LaunchFailure {
            command: self.command.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "server command is empty"),
        })?;
        let mut command = Command::new(program);
        command
            .args(parts)
            .current_dir(project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Keep terminal signals sent to the client away from the server.
            command.process_group(0);
        }
        Ok(command)
    }
}

impl ServerLauncher for ProcessLauncher {
    fn launch(&self, project_root: &Path) -> Result<LaunchedServer, ClientError> {
        let mut command = self.build_command(project_root)?;
        let child = command
            .spawn()
            .map_err(|source| ClientError::LaunchFailure {
                command: self.command.clone(),
                source,
            })?;
        let pid = child.id();
        info!(
            pid,
            command = %self.command,
            root = %project_root.display(),
            "launched sbt server"
        );
        Ok(LaunchedServer { pid })
    }
}
