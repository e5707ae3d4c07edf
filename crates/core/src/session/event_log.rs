use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// User-visible record of notable session events.
///
/// Separate from `log` diagnostics: this is what the person running the
/// session reads (camera started, models loaded, download results).
pub trait EventLog: Send {
    fn record(&mut self, level: log::Level, message: &str);

    fn info(&mut self, message: &str) {
        self.record(log::Level::Info, message);
    }

    fn error(&mut self, message: &str) {
        self.record(log::Level::Error, message);
    }
}

/// Discards every event. Used by tests where the log is irrelevant.
pub struct NullEventLog;

impl EventLog for NullEventLog {
    fn record(&mut self, _level: log::Level, _message: &str) {}
}

/// Keeps the most recent lines newest-first and mirrors each to `log`.
///
/// Clones share the same buffer, so a front end can keep a handle while
/// the session owns another.
#[derive(Clone)]
pub struct MemoryEventLog {
    lines: Arc<Mutex<VecDeque<String>>>,
    max_lines: usize,
}

impl MemoryEventLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::new())),
            max_lines: max_lines.max(1),
        }
    }

    /// Snapshot of the buffered lines, newest first.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl Default for MemoryEventLog {
    fn default() -> Self {
        Self::new(200)
    }
}

impl EventLog for MemoryEventLog {
    fn record(&mut self, level: log::Level, message: &str) {
        log::log!(level, "{message}");
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push_front(message.to_string());
        lines.truncate(self.max_lines);
    }
}
