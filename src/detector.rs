//! Suppression of repeated readings.
//!
//! The console repeats the same value many times a second while the clock is
//! stopped. Only changes go to vMix; the local display sees everything.

use crate::frontend::Frontend;
use crate::output::OverlaySink;

/// Forwards a reading only when it differs from the last one forwarded.
///
/// Memory is exactly one value deep: `a, b, a` forwards all three.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_forwarded: String,
}

impl ChangeDetector {
    /// Creates a detector; the empty string counts as already forwarded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value handed to the sink.
    pub fn last_forwarded(&self) -> &str {
        &self.last_forwarded
    }

    /// Process one reading.
    ///
    /// Returns `true` if it was forwarded to `sink`.
    pub fn on_reading(
        &mut self,
        value: &str,
        sink: &mut dyn OverlaySink,
        frontend: &mut dyn Frontend,
    ) -> bool {
        let changed = self.last_forwarded != value;
        if changed {
            self.last_forwarded = value.to_string();
            sink.send(value, frontend);
        }

        frontend.set_local_time(value);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::MemoryFrontend;

    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<String>,
    }

    impl OverlaySink for RecordingSink {
        fn send(&mut self, value: &str, _frontend: &mut dyn Frontend) {
            self.sent.push(value.to_string());
        }
    }

    fn run(input: &[&str]) -> (Vec<String>, MemoryFrontend) {
        let mut detector = ChangeDetector::new();
        let mut sink = RecordingSink::default();
        let mut frontend = MemoryFrontend::new();
        for value in input {
            detector.on_reading(value, &mut sink, &mut frontend);
        }
        (sink.sent, frontend)
    }

    #[test]
    fn test_runs_collapse_to_one_send() {
        let input = ["1.00", "1.00", "1.01", "1.01", "1.01", "1.02"];
        let (sent, frontend) = run(&input);
        assert_eq!(sent, vec!["1.00", "1.01", "1.02"]);
        assert_eq!(frontend.local, input);
    }

    #[test]
    fn test_only_immediate_predecessor_counts() {
        let (sent, _) = run(&["5", "6", "5", "5", "6"]);
        assert_eq!(sent, vec!["5", "6", "5", "6"]);
    }

    #[test]
    fn test_empty_first_reading_is_suppressed() {
        let (sent, frontend) = run(&["", "0.01"]);
        assert_eq!(sent, vec!["0.01"]);
        assert_eq!(frontend.local, vec!["", "0.01"]);
    }

    #[test]
    fn test_no_two_equal_consecutive_sends() {
        let input: Vec<String> = (0..200).map(|i| format!("{}", (i / 7) % 5)).collect();
        let refs: Vec<&str> = input.iter().map(String::as_str).collect();
        let (sent, frontend) = run(&refs);

        assert!(sent.windows(2).all(|w| w[0] != w[1]));
        assert_eq!(frontend.local.len(), input.len());
        let runs = 1 + refs.windows(2).filter(|w| w[0] != w[1]).count();
        assert_eq!(sent.len(), runs);
    }

    #[test]
    fn test_reports_whether_forwarded() {
        let mut detector = ChangeDetector::new();
        let mut sink = RecordingSink::default();
        let mut frontend = MemoryFrontend::new();
        assert!(detector.on_reading("1", &mut sink, &mut frontend));
        assert!(!detector.on_reading("1", &mut sink, &mut frontend));
        assert_eq!(detector.last_forwarded(), "1");
    }
}
