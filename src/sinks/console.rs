//! Console sinks
//!
//! The console is the human-facing output of a logger. It receives a
//! pre-formatted line plus the auxiliary values of the call.

use std::io::Write;

use crossterm::{cursor::MoveTo, execute, terminal};
use serde_json::Value;

use crate::event::{render_value, Severity};

/// Native console capability
///
/// Implementations must not call back into the logger that owns them.
pub trait ConsoleSink: Send + Sync {
    fn log(&self, line: &str, extra: &[Value]);
    fn info(&self, line: &str, extra: &[Value]);
    fn warn(&self, line: &str, extra: &[Value]);
    fn error(&self, line: &str, extra: &[Value]);

    /// Clear the console display
    fn clear(&self);

    /// Write at the given severity
    fn write(&self, severity: Severity, line: &str, extra: &[Value]) {
        match severity {
            Severity::Log => self.log(line, extra),
            Severity::Info => self.info(line, extra),
            Severity::Warn => self.warn(line, extra),
            Severity::Error => self.error(line, extra),
        }
    }
}

/// Join a line and its auxiliary values with single spaces
pub fn join_line(line: &str, extra: &[Value]) -> String {
    let mut out = line.to_string();
    for value in extra {
        out.push(' ');
        out.push_str(&render_value(value));
    }
    out
}

/// Console backed by the process's standard streams
///
/// LOG and INFO go to stdout, WARN and ERROR to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl ConsoleSink for StdConsole {
    fn log(&self, line: &str, extra: &[Value]) {
        println!("{}", join_line(line, extra));
    }

    fn info(&self, line: &str, extra: &[Value]) {
        println!("{}", join_line(line, extra));
    }

    fn warn(&self, line: &str, extra: &[Value]) {
        eprintln!("{}", join_line(line, extra));
    }

    fn error(&self, line: &str, extra: &[Value]) {
        eprintln!("{}", join_line(line, extra));
    }

    fn clear(&self) {
        let mut stdout = std::io::stdout();
        if let Err(e) = execute!(stdout, terminal::Clear(terminal::ClearType::All), MoveTo(0, 0)) {
            tracing::debug!(error = %e, "Failed to clear terminal");
        }
        if let Err(e) = stdout.flush() {
            tracing::debug!(error = %e, "Failed to flush stdout");
        }
    }
}

/// Console that forwards to `tracing` under the `fanlog::console` target
///
/// LOG and INFO map to `info!`, WARN to `warn!`, ERROR to `error!`.
/// Clearing is a no-op since emitted spans cannot be retracted.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn log(&self, line: &str, extra: &[Value]) {
        tracing::info!(target: "fanlog::console", "{}", join_line(line, extra));
    }

    fn info(&self, line: &str, extra: &[Value]) {
        tracing::info!(target: "fanlog::console", "{}", join_line(line, extra));
    }

    fn warn(&self, line: &str, extra: &[Value]) {
        tracing::warn!(target: "fanlog::console", "{}", join_line(line, extra));
    }

    fn error(&self, line: &str, extra: &[Value]) {
        tracing::error!(target: "fanlog::console", "{}", join_line(line, extra));
    }

    fn clear(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_line_without_extra() {
        assert_eq!(join_line("[LOG] ts: hello", &[]), "[LOG] ts: hello");
    }

    #[test]
    fn test_join_line_renders_values() {
        let line = join_line("[INFO] ts: user", &[json!("alice"), json!({"id": 7}), json!(3)]);
        assert_eq!(line, r#"[INFO] ts: user alice {"id":7} 3"#);
    }

    #[test]
    fn test_tracing_console_without_subscriber_does_not_panic() {
        let console = TracingConsole;
        console.write(Severity::Error, "[ERROR] ts: boom", &[json!(1)]);
        console.clear();
    }

    #[test]
    fn test_std_console_clear_without_terminal_does_not_panic() {
        // Under the test harness stdout is captured or piped, so terminal
        // control and flush may fail; both are only traced
        StdConsole.clear();
        StdConsole.clear();
    }
}
