//! The line editing engine.
//!
//! A [`LineEditor`] reads keys through a [`KeyReader`], applies them to a
//! [`LineBuffer`], and keeps the terminal in sync through a [`Renderer`].
//! Accepted lines go to an optional [`History`].

mod buffer;
mod history;
mod keys;
mod render;
mod session;
#[cfg(test)]
pub(crate) mod vt;

pub use buffer::{DEFAULT_COLUMNS, GROWTH_STEP, LineBuffer, Redraw, position_to_row_col};
pub use history::{DEFAULT_CAPACITY, History, is_recordable};
pub use keys::{Decoded, EditEvent, KeyDecoder, KeyReader};
pub use render::{Renderer, Screen};
pub use session::{LineEditor, Outcome, SharedScreen, Submission, lock};
