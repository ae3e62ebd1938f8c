//! Thin client for the sbt build server.
//!
//! The crate locates the server a project is already running, or launches one
//! and waits for it to publish its connection descriptor, then sends a single
//! command over the server's socket and collects the log messages and
//! diagnostics it reports until the command completes.
//!
//! The library is layered leaf-first: [`discovery`] reads the descriptor and
//! waits for readiness, [`launcher`] starts servers, [`session`] speaks the
//! wire protocol, and [`orchestrator`] drives the whole sequence. [`run`]
//! wraps everything as the `sbtc` command-line tool.

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::error::ErrorKind as ClapErrorKind;
use thiserror::Error;
use tracing::warn;

mod cli;
mod config;
pub mod discovery;
pub mod error;
pub mod launcher;
pub mod orchestrator;
pub mod output;
pub mod project;
pub mod session;
pub mod telemetry;

use cli::Cli;
use config::{ConfigArgumentSplit, ConfigLoader, OrthoConfigLoader, split_config_arguments};
pub use discovery::{
    ConnectionDescriptor, DescriptorLocator, DescriptorSource, FileDiscovery, ReadinessWaiter,
    ServerDiscovery, SocketAddress,
};
pub use error::{ClientError, ErrorKind};
pub use launcher::{LaunchedServer, ProcessLauncher, ServerLauncher};
pub use orchestrator::{SessionOrchestrator, SessionState, StateTrace};
pub use output::{OutputStyle, write_event};
pub use project::ProjectRoot;
use sbt_client_config::Config;
pub use sbt_client_protocol::{BuildStatus, Diagnostic, MessageLevel, ServerEvent};
pub use session::{EventStream, ExecutionResult, RpcSession, Session, SessionOptions};
use telemetry::TelemetryError;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `sbt_client_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--server-command",
    "--startup-timeout-secs",
    "--poll-interval-ms",
    "--wire-framing",
    "--read-timeout-secs",
];

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
    stdout_is_terminal: bool,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) const fn new(stdout: &'a mut W, stderr: &'a mut E, stdout_is_terminal: bool) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("an sbt command must be provided, for example `sbtc compile`")]
    MissingCommand,
    #[error("failed to determine the working directory: {0}")]
    WorkingDirectory(#[source] io::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to write build output: {0}")]
    WriteOutput(#[source] io::Error),
    #[error("'{command}' failed: {status}")]
    BuildFailed { command: String, status: BuildStatus },
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    io: IoStreams<'a, W, E>,
    loader: &'a L,
    working_dir: Option<PathBuf>,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    const fn new(io: IoStreams<'a, W, E>, loader: &'a L) -> Self {
        Self {
            io,
            loader,
            working_dir: None,
        }
    }

    #[cfg(test)]
    fn with_working_dir(mut self, working_dir: PathBuf) -> Self {
        self.working_dir = Some(working_dir);
        self
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error)
                if matches!(
                    error.kind(),
                    ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion
                ) =>
            {
                let _ = write!(self.io.stdout, "{error}");
                return ExitCode::SUCCESS;
            }
            Err(error) => return self.fail(&AppError::CliUsage(error)),
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| self.execute(&cli, &config));
        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => self.fail(&error),
        }
    }

    fn execute(&mut self, cli: &Cli, config: &Config) -> Result<(), AppError> {
        telemetry::initialise(config)?;
        let command = cli.command_line().ok_or(AppError::MissingCommand)?;
        if !cli.ignored.is_empty() {
            warn!(ignored = ?cli.ignored, "only the first command is executed");
        }

        let working_dir = match self.working_dir.clone() {
            Some(dir) => dir,
            None => env::current_dir().map_err(AppError::WorkingDirectory)?,
        };
        let project = ProjectRoot::discover(working_dir)?;

        let orchestrator = SessionOrchestrator::new(
            FileDiscovery::new(config.poll_interval()),
            ProcessLauncher::new(config.server_command()),
            RpcSession::new(SessionOptions {
                framing: config.wire_framing(),
                read_timeout: config.read_timeout(),
            }),
        );
        let result = orchestrator.run(project.path(), command, config.startup_timeout())?;

        let style = OutputStyle {
            color: self.io.stdout_is_terminal && !cli.no_color,
            show_debug: cli.debug,
        };
        for event in &result.events {
            write_event(&mut *self.io.stdout, event, style).map_err(AppError::WriteOutput)?;
        }
        self.io.stdout.flush().map_err(AppError::WriteOutput)?;

        if result.is_success() {
            Ok(())
        } else {
            Err(AppError::BuildFailed {
                command: command.to_owned(),
                status: result.status,
            })
        }
    }

    fn fail(&mut self, error: &AppError) -> ExitCode {
        let _ = writeln!(self.io.stderr, "sbtc: {error}");
        if let AppError::Client(client) = error
            && let Some(hint) = client.hint()
        {
            let _ = writeln!(self.io.stderr, "sbtc: hint: {hint}");
        }
        ExitCode::FAILURE
    }
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let mut cli_arguments: Vec<OsString> = Vec::new();
    if let Some(first) = args.first() {
        cli_arguments.push(first.clone());
    }
    cli_arguments.extend(args.iter().skip(split.command_start).cloned());
    cli_arguments
}

/// Runs the CLI using the provided arguments and IO handles.
///
/// Returns success only when the server reports the command as done.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E, stdout_is_terminal: bool) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let io = IoStreams::new(stdout, stderr, stdout_is_terminal);
    CliRunner::new(io, &OrthoConfigLoader).run(args)
}
