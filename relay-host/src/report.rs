//! Host boundary for human-readable status lines.
//!
//! Hosts differ in where status goes (a console, an info panel, a log pane),
//! so the poll loop talks to a small trait instead of printing.

/// Receives human-readable status lines from the poll loop.
pub trait StatusSink {
    fn info(&mut self, line: &str);
    fn warn(&mut self, line: &str);
}

/// Routes status lines to `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn info(&mut self, line: &str) {
        tracing::info!("{line}");
    }

    fn warn(&mut self, line: &str) {
        tracing::warn!("{line}");
    }
}

/// Captures status lines in memory, for tests and scripted runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub lines: Vec<String>,
}

impl MemorySink {
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }
}

impl StatusSink for MemorySink {
    fn info(&mut self, line: &str) {
        self.lines.push(format!("INFO: {line}"));
    }

    fn warn(&mut self, line: &str) {
        self.lines.push(format!("WARN: {line}"));
    }
}
