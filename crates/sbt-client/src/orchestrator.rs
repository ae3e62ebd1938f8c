//! Locate or launch, wait, connect, execute.
//!
//! The orchestrator walks a one-directional state machine:
//!
//! ```text
//! NotStarted -> Locating -> [Launching ->] [AwaitingReady ->] Connecting -> Executing -> Done
//!                    \___________________________________________________________/-> Failed
//! ```
//!
//! A descriptor that is present but unreadable is taken as a server still
//! writing it, so the orchestrator waits without launching a second one.

use std::path::Path;
use std::time::Duration;

use strum::Display;
use tracing::{debug, info};

use crate::discovery::{ConnectionDescriptor, ServerDiscovery};
use crate::error::ClientError;
use crate::launcher::ServerLauncher;
use crate::session::{ExecutionResult, RpcSession};

/// Phases of a single orchestrated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Locating,
    Launching,
    AwaitingReady,
    Connecting,
    Executing,
    Done,
    Failed,
}

/// Ordered record of the states a run passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTrace {
    states: Vec<SessionState>,
}

impl Default for StateTrace {
    fn default() -> Self {
        Self {
            states: vec![SessionState::NotStarted],
        }
    }
}

impl StateTrace {
    #[must_use]
    pub fn states(&self) -> &[SessionState] {
        &self.states
    }

    #[must_use]
    pub fn current(&self) -> SessionState {
        self.states
            .last()
            .copied()
            .unwrap_or(SessionState::NotStarted)
    }

    /// Whether the run entered `state` at any point.
    #[must_use]
    pub fn visited(&self, state: SessionState) -> bool {
        self.states.contains(&state)
    }

    fn enter(&mut self, state: SessionState) {
        debug!(from = %self.current(), to = %state, "session state");
        self.states.push(state);
    }
}

/// Drives one command from server discovery to its result.
#[derive(Debug)]
pub struct SessionOrchestrator<D, L> {
    discovery: D,
    launcher: L,
    sessions: RpcSession,
}

impl<D, L> SessionOrchestrator<D, L>
where
    D: ServerDiscovery,
    L: ServerLauncher,
{
    pub const fn new(discovery: D, launcher: L, sessions: RpcSession) -> Self {
        Self {
            discovery,
            launcher,
            sessions,
        }
    }

    /// Runs `command_line` against the project's server, launching one if
    /// none is running. `timeout` bounds the wait for a server to come up.
    ///
    /// # Errors
    ///
    /// Returns the first [`ClientError`] raised along the way; nothing is
    /// retried.
    pub fn run(
        &self,
        project_root: &Path,
        command_line: &str,
        timeout: Duration,
    ) -> Result<ExecutionResult, ClientError> {
        self.run_traced(project_root, command_line, timeout).0
    }

    /// Like [`SessionOrchestrator::run`], also returning the visited states.
    pub fn run_traced(
        &self,
        project_root: &Path,
        command_line: &str,
        timeout: Duration,
    ) -> (Result<ExecutionResult, ClientError>, StateTrace) {
        let mut trace = StateTrace::default();
        let result = self.drive(project_root, command_line, timeout, &mut trace);
        match &result {
            Ok(outcome) => {
                trace.enter(SessionState::Done);
                info!(status = %outcome.status, events = outcome.events.len(), "command finished");
            }
            Err(error) => {
                trace.enter(SessionState::Failed);
                debug!(%error, "command failed");
            }
        }
        (result, trace)
    }

    fn drive(
        &self,
        project_root: &Path,
        command_line: &str,
        timeout: Duration,
        trace: &mut StateTrace,
    ) -> Result<ExecutionResult, ClientError> {
        trace.enter(SessionState::Locating);
        let descriptor = self.ready_descriptor(project_root, timeout, trace)?;

        trace.enter(SessionState::Connecting);
        let session = self.sessions.open(&descriptor)?;

        trace.enter(SessionState::Executing);
        session.execute(command_line)
    }

    fn ready_descriptor(
        &self,
        project_root: &Path,
        timeout: Duration,
        trace: &mut StateTrace,
    ) -> Result<ConnectionDescriptor, ClientError> {
        match self.discovery.locate(project_root) {
            Ok(Some(descriptor)) => {
                debug!(socket = %descriptor.socket, "found running sbt server");
                Ok(descriptor)
            }
            Ok(None) => {
                trace.enter(SessionState::Launching);
                let launched = self.launcher.launch(project_root)?;
                info!(pid = launched.pid, "waiting for sbt server to start");
                trace.enter(SessionState::AwaitingReady);
                self.discovery.await_ready(project_root, timeout)
            }
            Err(ClientError::CorruptState { path, reason }) => {
                debug!(
                    path = %path.display(),
                    %reason,
                    "descriptor incomplete, waiting for the starting server"
                );
                trace.enter(SessionState::AwaitingReady);
                self.discovery.await_ready(project_root, timeout)
            }
            Err(error) => Err(error),
        }
    }
}
