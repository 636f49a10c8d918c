//! Terminal state RAII guard.

use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, LeaveAlternateScreen};

/// Restores the terminal when dropped, including on panic.
///
/// Leaves raw mode and the alternate screen and shows the cursor, ignoring
/// errors (the terminal may already be restored).
#[derive(Debug, Default)]
pub struct TerminalGuard;

impl TerminalGuard {
    /// Create a guard; cleanup happens on drop.
    pub fn new() -> Self {
        Self
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}
