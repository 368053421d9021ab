//! Minimal terminal emulator for rendering tests.
//!
//! Understands exactly the output the renderer produces: printable text with
//! deferred (xterm-style) wrapping, CR, LF, and the CSI sequences
//! `A B C D G K J P`, plus SGR (`m`), which only styles text and is skipped.
//! Anything else panics so an unexpected sequence fails the
//! test instead of being silently ignored. Vertical moves must stay inside
//! rows that were already drawn.

#[derive(Debug)]
pub struct VirtualTerminal {
    width: usize,
    rows: Vec<Vec<char>>,
    row: usize,
    col: usize,
    pending_wrap: bool,
}

impl VirtualTerminal {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            rows: vec![vec![' '; width]],
            row: 0,
            col: 0,
            pending_wrap: false,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        let text = String::from_utf8(bytes.to_vec()).expect("renderer wrote invalid UTF-8");
        let mut chars = text.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '\r' => {
                    self.col = 0;
                    self.pending_wrap = false;
                }
                '\n' => {
                    self.pending_wrap = false;
                    self.row += 1;
                    self.ensure_row();
                }
                '\x1b' => {
                    assert_eq!(chars.next(), Some('['), "only CSI sequences are expected");
                    let mut params = String::new();
                    let final_byte = loop {
                        let c = chars.next().expect("unterminated CSI sequence");
                        if c.is_ascii_digit() || c == ';' {
                            params.push(c);
                        } else {
                            break c;
                        }
                    };
                    self.csi(&params, final_byte);
                }
                c => self.print(c),
            }
        }
    }

    /// Cursor as `(row, col)`.
    pub const fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Everything drawn, rows concatenated at full width, trailing blanks removed.
    pub fn contents(&self) -> String {
        let joined: String = self.rows.iter().flatten().collect();
        joined.trim_end_matches(' ').to_string()
    }

    /// One row with trailing blanks removed.
    pub fn line(&self, row: usize) -> String {
        self.rows.get(row).map_or_else(String::new, |r| {
            r.iter().collect::<String>().trim_end_matches(' ').to_string()
        })
    }

    fn csi(&mut self, params: &str, final_byte: char) {
        if final_byte == 'm' {
            return;
        }
        let n: usize = params.parse().unwrap_or(0);
        let count = n.max(1);
        self.pending_wrap = false;
        match final_byte {
            'A' => {
                assert!(count <= self.row, "cursor up past the first row of the line");
                self.row -= count;
            }
            'B' => {
                assert!(
                    self.row + count < self.rows.len(),
                    "cursor down past the rendered rows"
                );
                self.row += count;
            }
            'C' => self.col = (self.col + count).min(self.width - 1),
            'D' => self.col = self.col.saturating_sub(count),
            'G' => self.col = (count - 1).min(self.width - 1),
            'K' => {
                let col = self.col;
                let row = &mut self.rows[self.row];
                match n {
                    0 => row[col..].fill(' '),
                    1 => row[..=col].fill(' '),
                    _ => row.fill(' '),
                }
            }
            'J' => {
                assert_eq!(n, 0, "only erase-below is expected");
                let col = self.col;
                self.rows[self.row][col..].fill(' ');
                for row in &mut self.rows[self.row + 1..] {
                    row.fill(' ');
                }
            }
            'P' => {
                let col = self.col;
                let row = &mut self.rows[self.row];
                for _ in 0..count.min(self.width - col) {
                    row.remove(col);
                    row.push(' ');
                }
            }
            other => panic!("unexpected CSI final byte {other:?}"),
        }
    }

    fn print(&mut self, ch: char) {
        if self.pending_wrap {
            self.pending_wrap = false;
            self.col = 0;
            self.row += 1;
            self.ensure_row();
        }
        self.rows[self.row][self.col] = ch;
        if self.col + 1 == self.width {
            self.pending_wrap = true;
        } else {
            self.col += 1;
        }
    }

    fn ensure_row(&mut self) {
        while self.rows.len() <= self.row {
            self.rows.push(vec![' '; self.width]);
        }
    }
}
