//! Frontend that records calls instead of displaying them.

use super::Frontend;

/// Keeps every log line and display update in order of arrival.
#[derive(Debug, Default, Clone)]
pub struct MemoryFrontend {
    /// Log lines.
    pub logs: Vec<String>,
    /// Values passed to [`Frontend::set_local_time`].
    pub local: Vec<String>,
    /// Values passed to [`Frontend::set_remote_time`].
    pub remote: Vec<String>,
}

impl MemoryFrontend {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any log line contains `needle`.
    pub fn logged(&self, needle: &str) -> bool {
        self.logs.iter().any(|line| line.contains(needle))
    }
}

impl Frontend for MemoryFrontend {
    fn add_log(&mut self, text: &str) {
        self.logs.push(text.to_string());
    }

    fn set_local_time(&mut self, value: &str) {
        self.local.push(value.to_string());
    }

    fn set_remote_time(&mut self, value: &str) {
        self.remote.push(value.to_string());
    }
}
