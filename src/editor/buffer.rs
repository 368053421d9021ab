/// Columns assumed when the terminal reports no usable width.
pub const DEFAULT_COLUMNS: usize = 80;

/// Number of codepoints the buffer grows by whenever it runs out of room.
pub const GROWTH_STEP: usize = 64;

/// Map a flat position to the `(row, column)` it occupies when the line is
/// wrapped every `width` columns.
///
/// A position exactly on a multiple of `width` starts a new row, the same way
/// the terminal wraps text. A zero `width` is treated as "never wraps".
pub const fn position_to_row_col(pos: usize, width: usize) -> (usize, usize) {
    if width == 0 || pos < width {
        return (0, pos);
    }
    let row = pos / width;
    (row, pos - row * width)
}

/// What the terminal needs after a buffer mutation.
///
/// Buffer operations never write to the terminal themselves; they describe the
/// cheapest update that keeps the screen in sync and the
/// [`Renderer`](super::Renderer) carries it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redraw {
    /// Nothing visible changed.
    None,
    /// Text was appended at the end of the line; writing it is enough.
    Echo(String),
    /// Only the cursor moved.
    Cursor,
    /// The codepoint before the cursor was removed from a single-row line.
    EraseBackward,
    /// The codepoint under the cursor was removed from a single-row line.
    EraseForward,
    /// The cursor moved (or stayed) and everything after it was removed.
    Truncate,
    /// The line must be redrawn from scratch.
    Full,
}

impl Redraw {
    /// Whether a full refresh is required.
    pub const fn needs_refresh(&self) -> bool {
        matches!(self, Self::Full)
    }

    fn merge(self, next: Self) -> Self {
        match (self, next) {
            (Self::Full, _) | (_, Self::Full) => Self::Full,
            (Self::Echo(mut head), Self::Echo(tail)) => {
                head.push_str(&tail);
                Self::Echo(head)
            }
            (Self::None, other) | (other, Self::None) => other,
            _ => Self::Full,
        }
    }
}

/// Split a prompt into the text written to the terminal and the codepoints
/// that occupy columns.
///
/// CSI sequences (`ESC [ ... final`) such as colours are kept in the styled
/// text but take no columns. Other control characters, a lone `ESC` and an
/// unterminated CSI sequence are dropped from both.
fn split_prompt(prompt: &str) -> (String, Vec<char>) {
    let mut styled = String::with_capacity(prompt.len());
    let mut visible = Vec::with_capacity(prompt.len());
    let mut chars = prompt.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if chars.next_if_eq(&'[').is_none() {
                continue;
            }
            let mut sequence = String::from("\x1b[");
            for c in chars.by_ref() {
                sequence.push(c);
                if ('@'..='~').contains(&c) {
                    styled.push_str(&sequence);
                    break;
                }
            }
        } else if !ch.is_control() {
            styled.push(ch);
            visible.push(ch);
        }
    }
    (styled, visible)
}

/// The line being edited, stored as Unicode scalar values.
///
/// The prompt is kept inline: the first `prompt_offset` codepoints are its
/// visible characters and can't be edited or deleted. Rows and columns are
/// computed over the whole ribbon, prompt included, wrapped at the terminal
/// width. The prompt as written, style sequences included, is kept apart.
///
/// Invariant: `prompt_offset <= cursor <= len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    content: Vec<char>,
    cursor: usize,
    prompt_offset: usize,
    styled_prompt: String,
    width: usize,
}

impl LineBuffer {
    /// Create an empty buffer without a prompt.
    pub fn new(width: usize) -> Self {
        Self::with_prompt("", width)
    }

    /// Create a buffer whose first codepoints are `prompt`.
    ///
    /// Each visible codepoint of the prompt takes one column. CSI style
    /// sequences like `\x1b[1;32m` are written as they are and take none.
    pub fn with_prompt(prompt: &str, width: usize) -> Self {
        let mut buffer = Self {
            content: Vec::with_capacity(GROWTH_STEP),
            cursor: 0,
            prompt_offset: 0,
            styled_prompt: String::new(),
            width: DEFAULT_COLUMNS,
        };
        buffer.set_width(width);
        buffer.reset(prompt);
        buffer
    }

    /// Start a new line with `prompt`, keeping the allocation.
    pub fn reset(&mut self, prompt: &str) {
        self.content.clear();
        let (styled, visible) = split_prompt(prompt);
        self.styled_prompt = styled;
        self.grow(visible.len());
        self.content.extend(visible);
        self.prompt_offset = self.content.len();
        self.cursor = self.prompt_offset;
    }

    /// The cursor index into the whole line, prompt included.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of codepoints in the line, prompt included.
    pub const fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the editable region is empty.
    pub const fn is_empty(&self) -> bool {
        self.content.len() == self.prompt_offset
    }

    /// Number of leading codepoints owned by the prompt.
    pub const fn prompt_offset(&self) -> usize {
        self.prompt_offset
    }

    /// Allocated room in codepoints.
    pub fn capacity(&self) -> usize {
        self.content.capacity()
    }

    /// The terminal width used for wrapping.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Update the terminal width. Zero falls back to [`DEFAULT_COLUMNS`].
    pub const fn set_width(&mut self, width: usize) {
        self.width = if width == 0 { DEFAULT_COLUMNS } else { width };
    }

    /// The editable text, without the prompt.
    pub fn text(&self) -> String {
        self.content[self.prompt_offset..].iter().collect()
    }

    /// The prompt as written to the terminal.
    pub fn prompt(&self) -> &str {
        &self.styled_prompt
    }

    /// Visible prompt characters followed by the text.
    pub fn display_text(&self) -> String {
        self.content.iter().collect()
    }

    /// Row and column of `pos` under the current width.
    pub const fn position_to_row_col(&self, pos: usize) -> (usize, usize) {
        position_to_row_col(pos, self.width)
    }

    /// Inverse of [`position_to_row_col`](Self::position_to_row_col).
    pub const fn row_col_to_position(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Row and column of the cursor.
    pub const fn cursor_row_col(&self) -> (usize, usize) {
        self.position_to_row_col(self.cursor)
    }

    /// Row and column just past the last codepoint.
    pub const fn end_row_col(&self) -> (usize, usize) {
        self.position_to_row_col(self.content.len())
    }

    /// Number of terminal rows the line occupies.
    pub const fn rows(&self) -> usize {
        self.end_row_col().0 + 1
    }

    // --- Insertion ---

    /// Insert a codepoint at the cursor.
    ///
    /// Appending at the end of the line only needs the codepoint echoed;
    /// inserting before existing text shifts it right and needs a refresh.
    /// Control characters are dropped.
    pub fn insert(&mut self, ch: char) -> Redraw {
        if ch.is_control() {
            return Redraw::None;
        }
        self.grow(1);
        let redraw = if self.cursor == self.content.len() {
            self.content.push(ch);
            Redraw::Echo(ch.to_string())
        } else {
            self.content.insert(self.cursor, ch);
            Redraw::Full
        };
        self.cursor += 1;
        redraw
    }

    /// Insert every codepoint of `text` at the cursor.
    pub fn insert_str(&mut self, text: &str) -> Redraw {
        text.chars()
            .fold(Redraw::None, |redraw, ch| redraw.merge(self.insert(ch)))
    }

    /// Replace the editable text, leaving the cursor at the end.
    pub fn replace_text(&mut self, text: &str) -> Redraw {
        self.content.truncate(self.prompt_offset);
        let chars: Vec<char> = text.chars().filter(|c| !c.is_control()).collect();
        self.grow(chars.len());
        self.content.extend(chars);
        self.cursor = self.content.len();
        Redraw::Full
    }

    // --- Deletion ---

    /// Delete the codepoint before the cursor (Backspace).
    pub fn delete_backward(&mut self) -> Redraw {
        if self.cursor == self.prompt_offset {
            return Redraw::None;
        }
        let single_row = self.is_single_row();
        self.content.remove(self.cursor - 1);
        self.cursor -= 1;
        if single_row {
            Redraw::EraseBackward
        } else {
            Redraw::Full
        }
    }

    /// Delete the codepoint under the cursor (Delete).
    pub fn delete_forward(&mut self) -> Redraw {
        if self.cursor == self.content.len() {
            return Redraw::None;
        }
        let single_row = self.is_single_row();
        self.content.remove(self.cursor);
        if single_row {
            Redraw::EraseForward
        } else {
            Redraw::Full
        }
    }

    /// Delete from the cursor to the end of the line (Ctrl-K).
    pub fn delete_to_end(&mut self) -> Redraw {
        if self.cursor == self.content.len() {
            return Redraw::None;
        }
        self.content.truncate(self.cursor);
        Redraw::Truncate
    }

    /// Delete the whole editable text (Ctrl-U).
    pub fn delete_line(&mut self) -> Redraw {
        if self.is_empty() {
            return Redraw::None;
        }
        self.content.truncate(self.prompt_offset);
        self.cursor = self.prompt_offset;
        Redraw::Truncate
    }

    /// Swap the codepoint before the cursor with the one under it (Ctrl-T).
    ///
    /// At the end of the line the two codepoints before the cursor are
    /// swapped instead and the cursor stays put.
    pub fn transpose(&mut self) -> Redraw {
        if self.cursor == self.prompt_offset {
            return Redraw::None;
        }
        if self.cursor < self.content.len() {
            self.content.swap(self.cursor - 1, self.cursor);
            self.cursor += 1;
        } else {
            if self.cursor - self.prompt_offset < 2 {
                return Redraw::None;
            }
            self.content.swap(self.cursor - 2, self.cursor - 1);
        }
        Redraw::Full
    }

    // --- Cursor movement ---

    /// Move the cursor one codepoint left.
    pub const fn move_left(&mut self) -> Redraw {
        if self.cursor == self.prompt_offset {
            return Redraw::None;
        }
        self.cursor -= 1;
        Redraw::Cursor
    }

    /// Move the cursor one codepoint right.
    pub const fn move_right(&mut self) -> Redraw {
        if self.cursor == self.content.len() {
            return Redraw::None;
        }
        self.cursor += 1;
        Redraw::Cursor
    }

    /// Move the cursor to the first editable position (Home, Ctrl-A).
    pub const fn move_to_start(&mut self) -> Redraw {
        if self.cursor == self.prompt_offset {
            return Redraw::None;
        }
        self.cursor = self.prompt_offset;
        Redraw::Cursor
    }

    /// Move the cursor past the last codepoint (End, Ctrl-E).
    pub const fn move_to_end(&mut self) -> Redraw {
        if self.cursor == self.content.len() {
            return Redraw::None;
        }
        self.cursor = self.content.len();
        Redraw::Cursor
    }

    // --- Private helpers ---

    /// Whether the whole line, cursor included, sits on the first row.
    const fn is_single_row(&self) -> bool {
        self.content.len() < self.width
    }

    /// Guarantee room for `additional` more codepoints, growing in fixed steps.
    fn grow(&mut self, additional: usize) {
        let needed = self.content.len() + additional;
        if needed > self.content.capacity() {
            let target = needed.div_ceil(GROWTH_STEP) * GROWTH_STEP;
            self.content.reserve_exact(target - self.content.len());
        }
    }
}
