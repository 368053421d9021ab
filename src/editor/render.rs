//! Redraw engine: keeps the terminal in sync with a [`LineBuffer`].
//!
//! The renderer remembers where it left the terminal cursor and how many rows
//! the previous render occupied. Every update starts from that physical state,
//! so a full [`refresh`](Renderer::refresh) is always correct and the cheap
//! incremental paths are used only when they end in the same screen state.

use std::io::Write;

use crossterm::cursor::{MoveDown, MoveLeft, MoveRight, MoveUp};
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};

use super::buffer::{LineBuffer, Redraw};
use crate::error::{Error, Result};

/// Delete the character under the cursor, shifting the rest of the row left.
/// crossterm has no command for it.
const DELETE_CHAR: &[u8] = b"\x1b[P";
const CR: &[u8] = b"\r";
const CRLF: &[u8] = b"\r\n";

fn count(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Writes ANSI updates for a line buffer to an output sink.
#[derive(Debug)]
pub struct Renderer<W: Write> {
    out: W,
    cursor_row: usize,
    cursor_col: usize,
    last_row: usize,
}

impl<W: Write> Renderer<W> {
    /// Create a renderer whose terminal cursor sits at column 0 of an empty row.
    pub const fn new(out: W) -> Self {
        Self {
            out,
            cursor_row: 0,
            cursor_col: 0,
            last_row: 0,
        }
    }

    /// The output sink.
    pub const fn get_ref(&self) -> &W {
        &self.out
    }

    /// Mutable access to the output sink.
    pub const fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Consume the renderer, returning the output sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Forget the previous render. The terminal cursor must be at column 0
    /// of a row that belongs to the next line.
    pub const fn reset(&mut self) {
        self.cursor_row = 0;
        self.cursor_col = 0;
        self.last_row = 0;
    }

    /// Carry out the update a buffer operation asked for.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] if the sink rejects a write.
    pub fn apply(&mut self, buf: &LineBuffer, redraw: &Redraw) -> Result<()> {
        match redraw {
            Redraw::None => return Ok(()),
            Redraw::Echo(text) => self.echo(buf, text)?,
            Redraw::Cursor => self.sync_cursor(buf)?,
            Redraw::EraseBackward => {
                queue!(self.out, MoveLeft(1)).map_err(Error::Output)?;
                self.write(DELETE_CHAR)?;
                self.cursor_col = buf.cursor_row_col().1;
            }
            Redraw::EraseForward => self.write(DELETE_CHAR)?,
            Redraw::Truncate => self.truncate(buf)?,
            Redraw::Full => return self.refresh(buf),
        }
        self.flush()
    }

    /// Redraw the whole line and put the terminal cursor on the buffer cursor.
    ///
    /// Makes no assumption about what is on screen beyond the position the
    /// previous render left the cursor at. Calling it twice in a row leaves
    /// the screen unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] if the sink rejects a write.
    pub fn refresh(&mut self, buf: &LineBuffer) -> Result<()> {
        let (last_row, last_col) = buf.end_row_col();
        let (row, col) = buf.cursor_row_col();

        for _ in 0..self.cursor_row {
            queue!(self.out, MoveUp(1)).map_err(Error::Output)?;
        }
        self.write(CR)?;
        self.write(buf.prompt().as_bytes())?;
        self.write(buf.text().as_bytes())?;
        if last_row > 0 && last_col == 0 {
            // The terminal defers the wrap until the next character arrives.
            self.write(CRLF)?;
        }
        queue!(self.out, Clear(ClearType::UntilNewLine)).map_err(Error::Output)?;
        if self.last_row > last_row {
            queue!(self.out, Clear(ClearType::FromCursorDown)).map_err(Error::Output)?;
        }

        for _ in row..last_row {
            queue!(self.out, MoveUp(1)).map_err(Error::Output)?;
        }
        self.write(CR)?;
        if col > 0 {
            queue!(self.out, MoveRight(count(col))).map_err(Error::Output)?;
        }

        self.cursor_row = row;
        self.cursor_col = col;
        self.last_row = last_row;
        tracing::trace!(row, col, last_row, "line refreshed");
        self.flush()
    }

    /// Write `text` after the line and start a fresh row.
    ///
    /// Used when a session ends; the renderer is reset afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] if the sink rejects a write.
    pub fn finish(&mut self, buf: &LineBuffer, text: &str) -> Result<()> {
        self.sync_cursor(buf)?;
        let (last_row, last_col) = buf.end_row_col();
        let on_fresh_row = buf.cursor() == buf.len() && last_row > 0 && last_col == 0;
        if text.is_empty() && on_fresh_row {
            self.write(CR)?;
        } else {
            self.write(text.as_bytes())?;
            self.write(CRLF)?;
        }
        self.reset();
        self.flush()
    }

    /// Write a full line of text below the current one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] if the sink rejects a write.
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        self.write(text.as_bytes())?;
        self.write(CRLF)?;
        self.reset();
        self.flush()
    }

    // --- Incremental updates ---

    /// Text was appended at the end of the line, where the cursor already is.
    fn echo(&mut self, buf: &LineBuffer, text: &str) -> Result<()> {
        self.write(text.as_bytes())?;
        let (row, col) = buf.end_row_col();
        if row > 0 && col == 0 {
            self.write(CRLF)?;
        }
        self.cursor_row = row;
        self.cursor_col = col;
        self.last_row = row;
        Ok(())
    }

    /// Move the terminal cursor to the buffer cursor.
    ///
    /// Moves within a row are relative; crossing rows goes up or down first
    /// and then sets the column from the left edge.
    fn sync_cursor(&mut self, buf: &LineBuffer) -> Result<()> {
        let (row, col) = buf.cursor_row_col();
        if row == self.cursor_row {
            if col < self.cursor_col {
                queue!(self.out, MoveLeft(count(self.cursor_col - col))).map_err(Error::Output)?;
            } else if col > self.cursor_col {
                queue!(self.out, MoveRight(count(col - self.cursor_col)))
                    .map_err(Error::Output)?;
            }
        } else {
            if row < self.cursor_row {
                queue!(self.out, MoveUp(count(self.cursor_row - row))).map_err(Error::Output)?;
            } else {
                queue!(self.out, MoveDown(count(row - self.cursor_row))).map_err(Error::Output)?;
            }
            self.write(CR)?;
            if col > 0 {
                queue!(self.out, MoveRight(count(col))).map_err(Error::Output)?;
            }
        }
        self.cursor_row = row;
        self.cursor_col = col;
        Ok(())
    }

    /// Erase everything after the cursor, row by row from the bottom.
    fn truncate(&mut self, buf: &LineBuffer) -> Result<()> {
        self.sync_cursor(buf)?;
        let row = self.cursor_row;
        if self.last_row > row {
            queue!(self.out, MoveDown(count(self.last_row - row))).map_err(Error::Output)?;
            for _ in row..self.last_row {
                queue!(self.out, Clear(ClearType::CurrentLine), MoveUp(1))
                    .map_err(Error::Output)?;
            }
        }
        queue!(self.out, Clear(ClearType::UntilNewLine)).map_err(Error::Output)?;
        self.last_row = row;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes).map_err(Error::Output)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().map_err(Error::Output)
    }
}

/// A line buffer together with the renderer that displays it.
///
/// The editing session and the resize watcher share one `Screen` behind a
/// mutex, so every buffer mutation and its terminal update happen atomically.
#[derive(Debug)]
pub struct Screen<W: Write> {
    buffer: LineBuffer,
    renderer: Renderer<W>,
    active: bool,
}

impl<W: Write> Screen<W> {
    /// Create a screen writing to `out`, wrapping at `width` columns.
    pub fn new(out: W, width: usize) -> Self {
        Self {
            buffer: LineBuffer::new(width),
            renderer: Renderer::new(out),
            active: false,
        }
    }

    /// The line being edited.
    pub const fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    /// Whether a line is being edited, between [`begin`](Self::begin) and
    /// [`finish`](Self::finish).
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// The output sink.
    pub const fn output(&self) -> &W {
        self.renderer.get_ref()
    }

    /// Mutable access to the output sink.
    pub const fn output_mut(&mut self) -> &mut W {
        self.renderer.get_mut()
    }

    /// Start a new line showing `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] if the sink rejects a write.
    pub fn begin(&mut self, prompt: &str) -> Result<()> {
        self.buffer.reset(prompt);
        self.renderer.reset();
        self.active = true;
        self.renderer.refresh(&self.buffer)
    }

    /// Run a buffer operation and reflect its result on the terminal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] if the sink rejects a write.
    pub fn edit(&mut self, op: impl FnOnce(&mut LineBuffer) -> Redraw) -> Result<()> {
        let redraw = op(&mut self.buffer);
        self.renderer.apply(&self.buffer, &redraw)
    }

    /// Redraw the whole line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] if the sink rejects a write.
    pub fn refresh(&mut self) -> Result<()> {
        self.renderer.refresh(&self.buffer)
    }

    /// Apply a new terminal width, redrawing the line if one is active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] if the sink rejects a write.
    pub fn resize(&mut self, width: usize) -> Result<()> {
        let before = self.buffer.width();
        self.buffer.set_width(width);
        if self.buffer.width() == before {
            return Ok(());
        }
        tracing::debug!(before, after = self.buffer.width(), "terminal resized");
        if !self.active {
            return Ok(());
        }
        self.renderer.refresh(&self.buffer)
    }

    /// Move past the end of the line, write `marker` and a line break.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] if the sink rejects a write.
    pub fn finish(&mut self, marker: &str) -> Result<()> {
        self.buffer.move_to_end();
        self.active = false;
        self.renderer.finish(&self.buffer, marker)
    }

    /// Print a message line in raw mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] if the sink rejects a write.
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        self.renderer.write_line(text)
    }
}
