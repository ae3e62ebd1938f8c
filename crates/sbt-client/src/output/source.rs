//! Source resolution helpers for diagnostic rendering.

use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

/// Where a diagnostic points on disk, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SourceReference {
    /// A local filesystem path.
    Path(PathBuf),
    /// A URI that does not name a local file; displayed verbatim.
    Unresolved(String),
}

impl SourceReference {
    /// Resolves a diagnostic URI. `file://` URIs map to paths; anything else
    /// is kept for display only.
    pub(crate) fn from_uri(uri: &str) -> Self {
        Url::parse(uri)
            .ok()
            .filter(|parsed| parsed.scheme() == "file")
            .and_then(|parsed| parsed.to_file_path().ok())
            .map_or_else(|| Self::Unresolved(uri.to_owned()), Self::Path)
    }

    pub(crate) fn display(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Unresolved(uri) => uri.clone(),
        }
    }

    pub(crate) fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path.as_path()),
            Self::Unresolved(_) => None,
        }
    }
}

/// Reads the zero-based `line` of `path`, without its terminator.
pub(crate) fn read_line(path: &Path, line: u32) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let index = usize::try_from(line).ok()?;
    content.lines().nth(index).map(str::to_owned)
}
