//! Validation of the directory the client is invoked from.

use std::path::{Path, PathBuf};

use sbt_client_config::DESCRIPTOR_RELATIVE_PATH;

use crate::error::ClientError;

const PROJECT_DIR: &str = "project";
const BUILD_FILE: &str = "build.sbt";

/// A directory confirmed to contain an sbt build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    path: PathBuf,
}

impl ProjectRoot {
    /// Accepts `path` when it holds a `project/` directory and a `build.sbt`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAProject`] otherwise.
    pub fn discover(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        if path.join(PROJECT_DIR).is_dir() && path.join(BUILD_FILE).is_file() {
            Ok(Self { path })
        } else {
            Err(ClientError::NotAProject { path })
        }
    }

    /// The project directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the running server publishes its connection descriptor.
    #[must_use]
    pub fn descriptor_path(&self) -> PathBuf {
        descriptor_path(&self.path)
    }
}

/// Descriptor location for an arbitrary project directory.
#[must_use]
pub fn descriptor_path(project_root: &Path) -> PathBuf {
    project_root.join(DESCRIPTOR_RELATIVE_PATH)
}
