//! The read loop that ties keys, buffer, renderer and history together.

use std::io::{Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::buffer::LineBuffer;
use super::history::History;
use super::keys::{EditEvent, KeyReader};
use super::render::Screen;
use crate::error::Result;

/// How a call to [`LineEditor::read_line`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Enter was pressed.
    Accepted,
    /// Ctrl-C was pressed.
    Interrupted,
    /// Ctrl-D was pressed.
    EndOfInput,
}

/// A finished line and how it was finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub text: String,
    pub outcome: Outcome,
}

/// Shared handle to a session's screen, as used by the resize watcher.
pub type SharedScreen<W> = Arc<Mutex<Screen<W>>>;

/// Lock a shared screen, ignoring poisoning.
pub fn lock<W: Write>(screen: &Mutex<Screen<W>>) -> MutexGuard<'_, Screen<W>> {
    screen.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Interactive line editor over a raw-mode byte stream.
///
/// ```no_run
/// use rawline::editor::{LineEditor, Outcome};
///
/// let mut editor = LineEditor::new(std::io::stdin(), std::io::stdout(), 80).with_prompt("> ");
/// let line = editor.read_line()?;
/// if line.outcome == Outcome::Accepted {
///     println!("{}", line.text);
/// }
/// # Ok::<(), rawline::error::Error>(())
/// ```
#[derive(Debug)]
pub struct LineEditor<R, W: Write> {
    keys: KeyReader<R>,
    screen: SharedScreen<W>,
    history: Option<History>,
    prompt: String,
}

impl<R: Read, W: Write> LineEditor<R, W> {
    /// Create an editor reading keys from `input` and rendering to `output`,
    /// wrapping lines at `columns`.
    pub fn new(input: R, output: W, columns: usize) -> Self {
        Self {
            keys: KeyReader::new(input),
            screen: Arc::new(Mutex::new(Screen::new(output, columns))),
            history: None,
            prompt: String::new(),
        }
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn with_history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    pub fn set_history(&mut self, history: History) {
        self.history = Some(history);
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub const fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    pub const fn history_mut(&mut self) -> Option<&mut History> {
        self.history.as_mut()
    }

    /// Detach the history, e.g. to save it after the last line.
    pub const fn take_history(&mut self) -> Option<History> {
        self.history.take()
    }

    /// A handle to the screen for another thread, such as a resize watcher.
    pub fn screen(&self) -> SharedScreen<W> {
        Arc::clone(&self.screen)
    }

    /// Print a message on its own line. Call between lines, not during one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`](crate::error::Error::Output) if the sink
    /// rejects a write.
    pub fn write_notice(&self, text: &str) -> Result<()> {
        lock(&self.screen).write_line(text)
    }

    /// Show the prompt and edit one line until Enter, Ctrl-C or Ctrl-D.
    ///
    /// Accepted lines are added to the history (subject to its filters) and
    /// returned trimmed. Interrupted and ended lines return the text as it
    /// was.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`](crate::error::Error::Input) when the input
    /// fails or closes, and [`Error::Output`](crate::error::Error::Output)
    /// when the output rejects a write. The session is over either way.
    pub fn read_line(&mut self) -> Result<Submission> {
        lock(&self.screen).begin(&self.prompt)?;
        tracing::debug!(prompt = %self.prompt, "session started");

        let submission = loop {
            // Never hold the lock while blocked on input.
            let event = self.keys.next_event()?;
            let done = apply_event(self.history.as_mut(), &mut lock(&self.screen), event)?;
            if let Some(submission) = done {
                break submission;
            }
        };

        tracing::debug!(outcome = ?submission.outcome, "session finished");
        Ok(submission)
    }
}

/// Apply one key to the screen. Returns the submission once the line ends.
fn apply_event<W: Write>(
    history: Option<&mut History>,
    screen: &mut Screen<W>,
    event: EditEvent,
) -> Result<Option<Submission>> {
    match event {
        EditEvent::InsertChar(ch) => screen.edit(|buf| buf.insert(ch))?,
        EditEvent::MoveLeft => screen.edit(LineBuffer::move_left)?,
        EditEvent::MoveRight => screen.edit(LineBuffer::move_right)?,
        EditEvent::MoveToStart => screen.edit(LineBuffer::move_to_start)?,
        EditEvent::MoveToEnd => screen.edit(LineBuffer::move_to_end)?,
        EditEvent::DeleteBackward => screen.edit(LineBuffer::delete_backward)?,
        EditEvent::DeleteForward => screen.edit(LineBuffer::delete_forward)?,
        EditEvent::DeleteToEnd => screen.edit(LineBuffer::delete_to_end)?,
        EditEvent::DeleteLine => screen.edit(LineBuffer::delete_line)?,
        EditEvent::TransposeChars => screen.edit(LineBuffer::transpose)?,
        EditEvent::HistoryPrev => navigate(history, screen, true)?,
        EditEvent::HistoryNext => navigate(history, screen, false)?,
        EditEvent::Accept => {
            let text = screen.buffer().text();
            screen.finish("")?;
            if let Some(history) = history {
                history.add(&text);
            }
            return Ok(Some(Submission {
                text: text.trim().to_string(),
                outcome: Outcome::Accepted,
            }));
        }
        EditEvent::Interrupt => {
            return abandon(history, screen, "^C", Outcome::Interrupted).map(Some);
        }
        EditEvent::EndOfInput => {
            return abandon(history, screen, "^D", Outcome::EndOfInput).map(Some);
        }
        EditEvent::Ignored => {}
    }
    Ok(None)
}

/// End the line without accepting it, keeping its text.
fn abandon<W: Write>(
    history: Option<&mut History>,
    screen: &mut Screen<W>,
    marker: &str,
    outcome: Outcome,
) -> Result<Submission> {
    let text = screen.buffer().text();
    screen.finish(marker)?;
    if let Some(history) = history {
        history.discard_stash();
    }
    Ok(Submission { text, outcome })
}

/// Replace the line with the previous or next history entry.
///
/// The live line is stashed when browsing starts from it. Running off either
/// end of the history leaves the line alone.
fn navigate<W: Write>(
    history: Option<&mut History>,
    screen: &mut Screen<W>,
    older: bool,
) -> Result<()> {
    let Some(history) = history else {
        return Ok(());
    };
    if !history.is_browsing() {
        history.stash(&screen.buffer().text());
    }
    let step = if older { history.prev() } else { history.next() };
    match step {
        Ok(line) => {
            let line = line.to_string();
            screen.edit(|buf| buf.replace_text(&line))
        }
        Err(err) => {
            tracing::debug!(%err, "history navigation ignored");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::vt::VirtualTerminal;
    use crate::error::Error;
    use std::io::Cursor;

    fn editor(input: &[u8], columns: usize) -> LineEditor<Cursor<Vec<u8>>, Vec<u8>> {
        LineEditor::new(Cursor::new(input.to_vec()), Vec::new(), columns).with_prompt("> ")
    }

    fn output<R: Read>(editor: &LineEditor<R, Vec<u8>>) -> Vec<u8> {
        lock(&editor.screen).output().clone()
    }

    fn history_of(lines: &[&str]) -> History {
        let mut history = History::new();
        for line in lines {
            history.add(line);
        }
        history
    }

    // --- Finishing a line ---

    #[test]
    fn test_enter_accepts_line() {
        let mut ed = editor(b"hello\r", 80).with_history(History::new());
        let line = ed.read_line().unwrap();
        assert_eq!(line.text, "hello");
        assert_eq!(line.outcome, Outcome::Accepted);
        assert_eq!(ed.history().unwrap().iter().collect::<Vec<_>>(), vec!["hello"]);
        assert!(output(&ed).ends_with(b"hello\r\n"));
    }

    #[test]
    fn test_accepted_text_is_trimmed_but_filtered_untrimmed() {
        let mut ed = editor(b"  padded \r", 80).with_history(History::new());
        let line = ed.read_line().unwrap();
        assert_eq!(line.text, "padded");
        assert!(ed.history().unwrap().is_empty());
    }

    #[test]
    fn test_ctrl_c_interrupts() {
        let mut ed = editor(b"abc\x03", 80);
        let line = ed.read_line().unwrap();
        assert_eq!(line.outcome, Outcome::Interrupted);
        assert_eq!(line.text, "abc");
        assert!(output(&ed).ends_with(b"abc^C\r\n"));
    }

    #[test]
    fn test_ctrl_d_ends_input_on_any_line() {
        let mut ed = editor(b"\x04", 80);
        let line = ed.read_line().unwrap();
        assert_eq!(line.outcome, Outcome::EndOfInput);
        assert_eq!(line.text, "");

        let mut ed = editor(b"partial\x04", 80);
        let line = ed.read_line().unwrap();
        assert_eq!(line.outcome, Outcome::EndOfInput);
        assert_eq!(line.text, "partial");
        assert!(output(&ed).ends_with(b"^D\r\n"));
    }

    #[test]
    fn test_closed_input_is_fatal() {
        let mut ed = editor(b"no enter", 80);
        assert!(matches!(ed.read_line(), Err(Error::Input(_))));
    }

    #[test]
    fn test_consecutive_lines() {
        let mut ed = editor(b"one\rtwo\r", 80);
        assert_eq!(ed.read_line().unwrap().text, "one");
        assert_eq!(ed.read_line().unwrap().text, "two");
    }

    // --- Editing ---

    #[test]
    fn test_insert_after_left_arrow() {
        let mut ed = editor(b"helo\x1b[Dl\r", 80);
        assert_eq!(ed.read_line().unwrap().text, "hello");
    }

    #[test]
    fn test_control_keys_edit_line() {
        // Ctrl-A, Ctrl-K, type, Ctrl-E, Ctrl-T, Delete at end is a no-op.
        let mut ed = editor(b"xyz\x01\x0bab\x05\x14\x1b[3~\r", 80);
        assert_eq!(ed.read_line().unwrap().text, "ba");
    }

    #[test]
    fn test_ctrl_u_clears_line() {
        let mut ed = editor(b"discard me\x15keep\r", 80);
        assert_eq!(ed.read_line().unwrap().text, "keep");
    }

    #[test]
    fn test_wrapped_editing_matches_screen() {
        let mut input = b"0123456789abcdefghij".to_vec();
        input.push(1);
        input.extend_from_slice(b"#\x1b[F!\x7f\x04");
        let mut ed = editor(&input, 10);
        let line = ed.read_line().unwrap();
        assert_eq!(line.text, "#0123456789abcdefghij");

        let mut vt = VirtualTerminal::new(10);
        vt.feed(&output(&ed));
        assert_eq!(vt.contents(), "> #0123456789abcdefghij^D");
        assert_eq!(vt.cursor(), (3, 0));
    }

    // --- History ---

    #[test]
    fn test_up_arrow_recalls_previous_lines() {
        let mut ed = editor(b"\x1b[A\x1b[A\r", 80).with_history(history_of(&["first", "second"]));
        assert_eq!(ed.read_line().unwrap().text, "first");
    }

    #[test]
    fn test_down_arrow_restores_draft() {
        let mut ed = editor(b"draft\x1b[A\x1b[B\r", 80).with_history(history_of(&["old"]));
        assert_eq!(ed.read_line().unwrap().text, "draft");
        let history = ed.history().unwrap();
        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["old", "draft"]);
        assert_eq!(history.stashed(), None);
    }

    #[test]
    fn test_recalled_line_can_be_edited() {
        let mut ed = editor(b"\x1b[A!\r", 80).with_history(history_of(&["ls"]));
        assert_eq!(ed.read_line().unwrap().text, "ls!");
        assert_eq!(ed.history().unwrap().iter().collect::<Vec<_>>(), vec!["ls", "ls!"]);
    }

    #[test]
    fn test_navigation_past_ends_is_ignored() {
        let mut ed = editor(b"\x1b[B\x1b[A\x1b[A\x1b[A\r", 80).with_history(history_of(&["only"]));
        assert_eq!(ed.read_line().unwrap().text, "only");
    }

    #[test]
    fn test_navigation_without_history_is_ignored() {
        let mut ed = editor(b"\x1b[Aok\x10\x0e\r", 80);
        assert_eq!(ed.read_line().unwrap().text, "ok");
        assert!(ed.take_history().is_none());
    }

    #[test]
    fn test_interrupt_drops_stash() {
        let mut ed = editor(b"draft\x1b[A\x03", 80).with_history(history_of(&["old"]));
        let line = ed.read_line().unwrap();
        assert_eq!(line.outcome, Outcome::Interrupted);
        assert_eq!(line.text, "old");
        assert_eq!(ed.history().unwrap().stashed(), None);
        assert!(!ed.history().unwrap().is_browsing());
    }

    // --- Notices and shared screen ---

    #[test]
    fn test_write_notice_prints_own_line() {
        let ed = editor(b"", 80);
        ed.write_notice("saved").unwrap();
        assert_eq!(output(&ed), b"saved\r\n");
    }

    #[test]
    fn test_resize_through_shared_screen() {
        let mut ed = editor(b"abc\r", 80);
        let screen = ed.screen();
        lock(&screen).resize(40).unwrap();
        assert_eq!(lock(&screen).buffer().width(), 40);
        assert_eq!(ed.read_line().unwrap().text, "abc");
    }
}
