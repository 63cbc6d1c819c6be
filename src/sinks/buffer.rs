//! In-memory console buffer
//!
//! A thread-safe ring buffer of console lines for embedding the console
//! output in an application view or inspecting it in tests.

use std::collections::VecDeque;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::console::{join_line, ConsoleSink};
use crate::event::Severity;

/// A single console line
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleLine {
    /// When the line was written
    pub timestamp: DateTime<Utc>,
    /// Severity it was written at
    pub severity: Severity,
    /// Formatted line as received
    pub line: String,
    /// Auxiliary values of the call
    pub extra: Vec<Value>,
}

impl ConsoleLine {
    /// Line and auxiliary values joined for display
    pub fn text(&self) -> String {
        join_line(&self.line, &self.extra)
    }
}

/// Console sink that keeps the most recent lines in memory
pub struct BufferedConsole {
    /// All lines (capped at max_lines)
    lines: RwLock<VecDeque<ConsoleLine>>,
    /// Warnings and errors only
    alerts: RwLock<VecDeque<ConsoleLine>>,
    max_lines: usize,
    max_alerts: usize,
}

impl BufferedConsole {
    /// Create a buffer with the given capacities
    pub fn new(max_lines: usize, max_alerts: usize) -> Self {
        Self {
            lines: RwLock::new(VecDeque::with_capacity(max_lines.min(1024))),
            alerts: RwLock::new(VecDeque::with_capacity(max_alerts.min(1024))),
            max_lines,
            max_alerts,
        }
    }

    fn push(&self, severity: Severity, line: &str, extra: &[Value]) {
        let entry = ConsoleLine {
            timestamp: Utc::now(),
            severity,
            line: line.to_string(),
            extra: extra.to_vec(),
        };

        if severity.is_alert() && self.max_alerts > 0 {
            if let Ok(mut alerts) = self.alerts.write() {
                if alerts.len() >= self.max_alerts {
                    alerts.pop_front();
                }
                alerts.push_back(entry.clone());
            }
        }

        if self.max_lines == 0 {
            return;
        }
        if let Ok(mut lines) = self.lines.write() {
            if lines.len() >= self.max_lines {
                lines.pop_front();
            }
            lines.push_back(entry);
        }
    }

    /// All buffered lines, oldest first
    pub fn lines(&self) -> Vec<ConsoleLine> {
        self.lines
            .read()
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Buffered lines of one severity
    pub fn lines_at(&self, severity: Severity) -> Vec<ConsoleLine> {
        self.lines
            .read()
            .map(|l| l.iter().filter(|e| e.severity == severity).cloned().collect())
            .unwrap_or_default()
    }

    /// Number of buffered lines
    pub fn len(&self) -> usize {
        self.lines.read().map(|l| l.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pending warnings and errors
    pub fn pending_alerts(&self) -> Vec<ConsoleLine> {
        self.alerts
            .read()
            .map(|a| a.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Clear all alerts (after they've been acknowledged)
    pub fn clear_alerts(&self) {
        if let Ok(mut alerts) = self.alerts.write() {
            alerts.clear();
        }
    }
}

impl Default for BufferedConsole {
    fn default() -> Self {
        Self::new(10_000, 100)
    }
}

impl ConsoleSink for BufferedConsole {
    fn log(&self, line: &str, extra: &[Value]) {
        self.push(Severity::Log, line, extra);
    }

    fn info(&self, line: &str, extra: &[Value]) {
        self.push(Severity::Info, line, extra);
    }

    fn warn(&self, line: &str, extra: &[Value]) {
        self.push(Severity::Warn, line, extra);
    }

    fn error(&self, line: &str, extra: &[Value]) {
        self.push(Severity::Error, line, extra);
    }

    /// Clears the display lines; alerts stay until acknowledged
    fn clear(&self) {
        if let Ok(mut lines) = self.lines.write() {
            lines.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_buffer_push_and_retrieve() {
        let console = BufferedConsole::new(100, 10);

        console.log("message 1", &[]);
        console.warn("warning 1", &[json!("detail")]);
        console.error("error 1", &[]);

        assert_eq!(console.len(), 3);
        let lines = console.lines();
        assert_eq!(lines[0].line, "message 1");
        assert_eq!(lines[1].text(), "warning 1 detail");
        assert_eq!(lines[2].severity, Severity::Error);

        let alerts = console.pending_alerts();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].line, "warning 1");
    }

    #[test]
    fn test_buffer_capacity() {
        let console = BufferedConsole::new(3, 2);
        for i in 0..5 {
            console.info(&format!("msg {}", i), &[]);
        }

        let lines = console.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].line, "msg 2");
        assert_eq!(lines[2].line, "msg 4");
    }

    #[test]
    fn test_clear_keeps_alerts() {
        let console = BufferedConsole::default();
        console.error("boom", &[]);
        console.clear();

        assert!(console.is_empty());
        assert_eq!(console.pending_alerts().len(), 1);

        console.clear_alerts();
        assert!(console.pending_alerts().is_empty());
    }

    #[test]
    fn test_lines_at_filters_by_severity() {
        let console = BufferedConsole::default();
        console.write(Severity::Warn, "w", &[]);
        console.write(Severity::Log, "l", &[]);

        let warns = console.lines_at(Severity::Warn);
        assert_eq!(warns.len(), 1);
        assert_eq!(warns[0].line, "w");
    }
}
