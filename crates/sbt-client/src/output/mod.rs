//! Human-readable output for server events.
//!
//! Log messages print as `[level] message`. Diagnostics print under the level
//! of their severity with the offending source line and a caret. Debug-level
//! output is hidden unless requested.

mod render;
mod source;

use std::io::{self, Write};

use sbt_client_protocol::{MessageLevel, ServerEvent};

/// Presentation switches for event output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputStyle {
    /// Colour level tags with ANSI escapes.
    pub color: bool,
    /// Print debug-level messages.
    pub show_debug: bool,
}

impl OutputStyle {
    fn shows(self, level: MessageLevel) -> bool {
        self.show_debug || level != MessageLevel::Debug
    }
}

/// Writes one event to `out`. Notifications other than log messages and
/// diagnostics produce no output.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_event<W>(out: &mut W, event: &ServerEvent, style: OutputStyle) -> io::Result<()>
where
    W: Write + ?Sized,
{
    match event {
        ServerEvent::LogMessage { level, message } => write_line(out, *level, message, style),
        ServerEvent::Diagnostics { uri, diagnostics } => {
            for diagnostic in diagnostics {
                let rendered = render::render_diagnostic(uri, diagnostic);
                write_line(out, diagnostic.severity, &rendered, style)?;
            }
            Ok(())
        }
        ServerEvent::Notification { .. } => Ok(()),
    }
}

fn write_line<W>(out: &mut W, level: MessageLevel, text: &str, style: OutputStyle) -> io::Result<()>
where
    W: Write + ?Sized,
{
    if !style.shows(level) {
        return Ok(());
    }
    let tag = render::level_tag(level, style.color);
    writeln!(out, "{tag} {text}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sbt_client_protocol::{Diagnostic, DiagnosticPosition, DiagnosticRange};
    use serde_json::json;

    fn render(event: &ServerEvent, style: OutputStyle) -> String {
        let mut out = Vec::new();
        write_event(&mut out, event, style).expect("write to vec");
        String::from_utf8(out).expect("utf8 output")
    }

    fn log(level: MessageLevel, message: &str) -> ServerEvent {
        ServerEvent::LogMessage {
            level,
            message: message.to_owned(),
        }
    }

    #[rstest]
    #[case(MessageLevel::Error, "[error] boom\n")]
    #[case(MessageLevel::Warning, "[warning] boom\n")]
    #[case(MessageLevel::Info, "[info] boom\n")]
    fn prints_messages_with_level_tag(#[case] level: MessageLevel, #[case] expected: &str) {
        assert_eq!(render(&log(level, "boom"), OutputStyle::default()), expected);
    }

    #[rstest]
    #[case(false, "")]
    #[case(true, "[debug] resolving\n")]
    fn debug_messages_follow_the_switch(#[case] show_debug: bool, #[case] expected: &str) {
        let style = OutputStyle {
            color: false,
            show_debug,
        };
        assert_eq!(render(&log(MessageLevel::Debug, "resolving"), style), expected);
    }

    #[test]
    fn diagnostics_use_their_severity() {
        let position = DiagnosticPosition {
            line: 9,
            character: 0,
        };
        let event = ServerEvent::Diagnostics {
            uri: String::from("file:///nonexistent/B.scala"),
            diagnostics: vec![Diagnostic {
                range: DiagnosticRange {
                    start: position,
                    end: position,
                },
                severity: MessageLevel::Warning,
                message: String::from("unused import"),
            }],
        };
        assert_eq!(
            render(&event, OutputStyle::default()),
            "[warning] /nonexistent/B.scala:10:1: unused import\n"
        );
    }

    #[test]
    fn other_notifications_are_silent() {
        let event = ServerEvent::Notification {
            method: String::from("build/taskProgress"),
            params: json!({}),
        };
        assert_eq!(render(&event, OutputStyle::default()), "");
    }
}
