//! Shared fixtures for unit and behavioural tests.

#[cfg(unix)]
mod fake_server;

use std::fs;

use anyhow::{Context, Result};
use rstest::fixture;
use tempfile::TempDir;

#[cfg(unix)]
pub(crate) use fake_server::{FakeServer, Publish, done_line, error_line, log_line};

/// A temporary directory laid out as an sbt project.
pub(crate) fn sbt_project() -> Result<TempDir> {
    let dir = TempDir::new().context("create project dir")?;
    fs::create_dir(dir.path().join("project")).context("create project/")?;
    fs::write(dir.path().join("build.sbt"), "scalaVersion := \"3.3.1\"\n")
        .context("write build.sbt")?;
    Ok(dir)
}

#[fixture]
pub(crate) fn project_dir() -> TempDir {
    sbt_project().expect("sbt project fixture")
}
