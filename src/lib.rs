// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. question::QuestionError)
    clippy::module_name_repetitions
)]

//! # Rawline
//!
//! A line editor for terminals in raw mode.
//!
//! Rawline reads key bytes, edits a line in memory and keeps the terminal in
//! sync with ANSI escape sequences:
//! - Lines that wrap over several terminal rows
//! - Emacs-style control keys and cursor keys
//! - Bounded history with a file backing
//! - Redraw on terminal resize
//!
//! ## Architecture
//!
//! Every key goes through the same pipeline:
//! - **Decode**: bytes to an [`EditEvent`](editor::EditEvent)
//! - **Edit**: mutate the [`LineBuffer`](editor::LineBuffer), which reports
//!   the cheapest screen update that stays correct
//! - **Render**: the [`Renderer`](editor::Renderer) writes that update
//!
//! ## Modules
//!
//! - [`editor`]: Buffer, key decoder, renderer, history and the session loop
//! - [`error`]: Error types
//! - [`terminal`]: Raw mode and terminal width
//! - [`watcher`]: Resize watching
//! - [`question`]: Typed prompts
//! - [`config`]: Flags for the demo binary

pub mod config;
pub mod editor;
pub mod error;
pub mod question;
pub mod terminal;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::editor::{History, LineEditor, Outcome, Submission};
    pub use crate::error::{Error, HistoryError};
    pub use crate::question::Question;
}
