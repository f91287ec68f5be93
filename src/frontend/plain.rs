//! Line-oriented frontend for headless runs and piping.

use super::Frontend;

/// Prints status lines on stdout and mirrors everything to the log.
#[derive(Debug, Default)]
pub struct PlainFrontend;

impl PlainFrontend {
    /// Creates a plain frontend.
    pub fn new() -> Self {
        Self
    }
}

impl Frontend for PlainFrontend {
    fn add_log(&mut self, text: &str) {
        log::info!("{}", text);
        println!("{}", text);
    }

    fn set_local_time(&mut self, value: &str) {
        log::debug!("Local time is {}", value);
    }

    fn set_remote_time(&mut self, value: &str) {
        log::info!("Remote time set to {}", value);
    }
}
