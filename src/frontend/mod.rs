//! Local display of timer data.
//!
//! The bridge core only needs three capabilities from a display: append a log
//! line, show the value read from the console, and show the value forwarded
//! to vMix. [`Frontend`] captures exactly that.
//!
//! # Implementations
//!
//! - [`PlainFrontend`] - line-oriented output on stdout
//! - [`DashboardFrontend`] - full screen ratatui dashboard
//! - [`MemoryFrontend`] - records every call; for embedding and tests

mod dashboard;
mod guard;
mod memory;
mod plain;

pub use dashboard::{DashboardFrontend, DashboardState, LOG_HISTORY};
pub use guard::TerminalGuard;
pub use memory::MemoryFrontend;
pub use plain::PlainFrontend;

use anyhow::Result;

use crate::output::ChannelTarget;

/// Display capabilities consumed by the bridge.
///
/// Calls arrive at reading rate (every few milliseconds with test data), so
/// implementations must be cheap and must never block.
pub trait Frontend {
    /// Append a status line.
    fn add_log(&mut self, text: &str);

    /// Show the latest value read from the console.
    fn set_local_time(&mut self, value: &str);

    /// Show the latest value written to vMix.
    fn set_remote_time(&mut self, value: &str);

    /// Service the display: redraw and handle input.
    ///
    /// Called periodically by the bridge loop. Returns `true` when the user
    /// asked to quit.
    fn refresh(&mut self) -> Result<bool> {
        Ok(false)
    }
}

/// Which frontend to build at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendKind {
    /// Plain stdout logger.
    Plain,
    /// Interactive terminal dashboard.
    Dashboard,
}

/// Build the selected frontend.
///
/// # Errors
///
/// Returns an error if the terminal cannot be put into dashboard mode.
pub fn build(kind: FrontendKind, target: &ChannelTarget) -> Result<Box<dyn Frontend>> {
    Ok(match kind {
        FrontendKind::Plain => Box::new(PlainFrontend::new()),
        FrontendKind::Dashboard => Box::new(DashboardFrontend::stdout(target)?),
    })
}
