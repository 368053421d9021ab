//! Terminal collaborators: raw mode and window geometry.

use std::io;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode, is_raw_mode_enabled};

use crate::editor::DEFAULT_COLUMNS;

/// Keeps the terminal in raw mode until dropped.
///
/// If the terminal was already raw when the guard was created it is left raw.
#[derive(Debug)]
pub struct RawMode {
    restore: bool,
}

impl RawMode {
    /// Switch the controlling terminal to raw mode.
    ///
    /// # Errors
    ///
    /// Fails when there is no terminal or its attributes cannot be changed.
    pub fn enable() -> io::Result<Self> {
        let already = is_raw_mode_enabled().unwrap_or(false);
        if !already {
            enable_raw_mode()?;
            tracing::debug!("raw mode enabled");
        }
        Ok(Self { restore: !already })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if self.restore
            && let Err(err) = disable_raw_mode()
        {
            tracing::warn!(%err, "could not restore terminal mode");
        }
    }
}

/// Something that can report the terminal width.
pub trait WidthSource: Send + 'static {
    /// Current width in columns, `None` if it cannot be determined.
    fn columns(&self) -> Option<u16>;
}

/// The process's controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalSize;

impl WidthSource for TerminalSize {
    fn columns(&self) -> Option<u16> {
        crossterm::terminal::size()
            .ok()
            .map(|(cols, _)| cols)
            .filter(|&cols| cols > 0)
    }
}

/// Terminal width in columns, falling back to [`DEFAULT_COLUMNS`].
pub fn columns() -> usize {
    TerminalSize
        .columns()
        .map_or(DEFAULT_COLUMNS, usize::from)
}
