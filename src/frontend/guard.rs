//! Terminal state guard for RAII cleanup.
//!
//! Restores the terminal even if the bridge panics while the dashboard owns
//! the screen.

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};

/// Puts the terminal into dashboard mode and restores it on drop.
///
/// When dropped, this guard:
/// - Disables raw mode
/// - Leaves alternate screen
/// - Shows the cursor
#[derive(Debug)]
pub struct TerminalGuard;

impl TerminalGuard {
    /// Enables raw mode and enters the alternate screen.
    ///
    /// # Errors
    ///
    /// Returns an error if stdout is not a terminal.
    pub fn enter() -> std::io::Result<Self> {
        enable_raw_mode()?;
        // From here on the drop handler undoes raw mode if the next step fails.
        let guard = Self;
        execute!(std::io::stdout(), EnterAlternateScreen)?;
        Ok(guard)
    }

    /// Restore terminal state, ignoring errors.
    pub fn restore() {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
        let _ = execute!(std::io::stdout(), crossterm::cursor::Show);
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        Self::restore();
    }
}
