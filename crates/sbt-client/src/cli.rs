//! CLI argument definitions for `sbtc`.
//!
//! Configuration flags (see `CONFIG_CLI_FLAGS`) are stripped before these
//! arguments reach clap, so only presentation switches and the command itself
//! are declared here.

use clap::Parser;

/// Runs one sbt command through a project's build server, starting the
/// server first when none is running.
#[derive(Parser, Debug)]
#[command(name = "sbtc", version)]
pub(crate) struct Cli {
    /// Print debug-level build messages.
    #[arg(long)]
    pub(crate) debug: bool,
    /// Never colour level tags, even on a terminal.
    #[arg(long)]
    pub(crate) no_color: bool,
    /// The sbt command to run, for example `compile` or `"testOnly my.Spec"`.
    #[arg(value_name = "COMMAND")]
    pub(crate) command: Option<String>,
    /// Further commands. Only the first command is executed.
    #[arg(
        value_name = "IGNORED",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) ignored: Vec<String>,
}

impl Cli {
    /// The command to execute, if a non-blank one was given.
    pub(crate) fn command_line(&self) -> Option<&str> {
        self.command
            .as_deref()
            .map(str::trim)
            .filter(|command| !command.is_empty())
    }
}
