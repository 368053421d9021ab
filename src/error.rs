//! Error types for editing sessions and history navigation.

use std::io;

use thiserror::Error;

/// Failures that end an editing session.
///
/// Both variants are fatal: the session stops and the error is handed to the
/// caller of [`LineEditor::read_line`](crate::editor::LineEditor::read_line).
#[derive(Debug, Error)]
pub enum Error {
    /// The input byte source failed or closed, possibly mid escape sequence.
    #[error("could not read from input: {0}")]
    Input(#[source] io::Error),

    /// The output sink rejected a write. The line may be partially rendered.
    #[error("could not write to output: {0}")]
    Output(#[source] io::Error),
}

/// Result alias for editing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the history navigator and its persistence.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Navigation was requested on a history with no entries.
    #[error("history: empty")]
    Empty,

    /// The browse cursor is already at the oldest or newest entry.
    #[error("history: no more elements")]
    NoMoreElements,

    /// A history must hold at least one entry.
    #[error("history: bad size {0}")]
    BadSize(usize),

    /// Reading or writing the backing file failed.
    #[error("history: {0}")]
    Io(#[from] io::Error),
}

impl HistoryError {
    /// Whether the caller can ignore this error and keep reading keys.
    pub const fn is_navigation(&self) -> bool {
        matches!(self, Self::Empty | Self::NoMoreElements)
    }
}
