//! Text rendering of build messages and diagnostics.

use colored::Colorize;
use sbt_client_protocol::{Diagnostic, MessageLevel};

use super::source::{SourceReference, read_line};

/// Formats the `[level]` prefix, coloured when requested.
pub(crate) fn level_tag(level: MessageLevel, color: bool) -> String {
    let tag = format!("[{level}]");
    if !color {
        return tag;
    }
    match level {
        MessageLevel::Error => tag.red().to_string(),
        MessageLevel::Warning => tag.yellow().to_string(),
        MessageLevel::Info => tag.green().to_string(),
        MessageLevel::Debug => tag.dimmed().to_string(),
    }
}

/// Renders a diagnostic as `path:line:col: message`, followed by the source
/// line and a caret under the reported column when the file is readable.
///
/// Lines and columns are printed one-based.
pub(crate) fn render_diagnostic(uri: &str, diagnostic: &Diagnostic) -> String {
    let source = SourceReference::from_uri(uri);
    let start = diagnostic.range.start;
    let header = format!(
        "{}:{}:{}: {}",
        source.display(),
        u64::from(start.line) + 1,
        u64::from(start.character) + 1,
        diagnostic.message
    );

    let Some(text) = source
        .as_path()
        .and_then(|path| read_line(path, start.line))
    else {
        return header;
    };
    format!("{header}\n{text}\n{}^", caret_padding(&text, start.character))
}

/// Whitespace that lines a caret up under `column`, preserving tabs.
fn caret_padding(text: &str, column: u32) -> String {
    let width = usize::try_from(column).unwrap_or(usize::MAX);
    let mut padding: String = text
        .chars()
        .take(width)
        .map(|ch| if ch == '\t' { '\t' } else { ' ' })
        .collect();
    let shortfall = width.saturating_sub(padding.chars().count());
    padding.extend(std::iter::repeat_n(' ', shortfall.min(text.len() + 1)));
    padding
}
