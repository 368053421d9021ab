//! Bounded command history with a browse cursor.
//!
//! Entries are kept oldest first. The browse cursor ranges over
//! `0..=len`, where `len` stands for the live line being typed. Before the
//! first step away from the live line the session stashes its text, so
//! coming back with `next` restores unsaved edits.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::HistoryError;

/// Capacity used by [`History::new`].
pub const DEFAULT_CAPACITY: usize = 500;

/// Whether `line` may be recorded or persisted.
///
/// Empty lines, whitespace-only lines and lines starting with a space are
/// kept out of history.
pub fn is_recordable(line: &str) -> bool {
    !line.starts_with(' ') && !line.trim().is_empty()
}

#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
    cursor: usize,
    stash: Option<String>,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// An empty history holding up to [`DEFAULT_CAPACITY`] entries.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: DEFAULT_CAPACITY,
            cursor: 0,
            stash: None,
        }
    }

    /// An empty history holding up to `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::BadSize`] if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self, HistoryError> {
        if capacity == 0 {
            return Err(HistoryError::BadSize(capacity));
        }
        Ok(Self {
            capacity,
            ..Self::new()
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries, oldest first. The stash is not included.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Whether the browse cursor is on a stored entry rather than the live line.
    pub fn is_browsing(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// The provisional live line, if one was stashed.
    pub fn stashed(&self) -> Option<&str> {
        self.stash.as_deref()
    }

    /// Record an accepted line.
    ///
    /// Any stash is discarded and the browse cursor returns to the live line.
    /// Returns `false` when the line is filtered out or repeats the newest
    /// entry.
    pub fn add(&mut self, line: &str) -> bool {
        self.discard_stash();
        if !is_recordable(line) {
            return false;
        }
        let line = line.trim();
        if self.entries.back().is_some_and(|last| last == line) {
            return false;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
        self.cursor = self.entries.len();
        true
    }

    /// Remember the live line before browsing away from it.
    ///
    /// The stash is never filtered and never saved.
    pub fn stash(&mut self, line: &str) {
        self.stash = Some(line.to_string());
        self.cursor = self.entries.len();
    }

    /// Drop the stash and return the browse cursor to the live line.
    pub fn discard_stash(&mut self) {
        self.stash = None;
        self.cursor = self.entries.len();
    }

    /// Step to the next older entry.
    ///
    /// # Errors
    ///
    /// [`HistoryError::Empty`] without entries, [`HistoryError::NoMoreElements`]
    /// on the oldest entry.
    pub fn prev(&mut self) -> Result<&str, HistoryError> {
        if self.entries.is_empty() {
            return Err(HistoryError::Empty);
        }
        if self.cursor == 0 {
            return Err(HistoryError::NoMoreElements);
        }
        self.cursor -= 1;
        Ok(&self.entries[self.cursor])
    }

    /// Step to the next newer entry, ending on the stashed live line.
    ///
    /// # Errors
    ///
    /// [`HistoryError::Empty`] without entries, [`HistoryError::NoMoreElements`]
    /// on the live line.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<&str, HistoryError> {
        if self.entries.is_empty() {
            return Err(HistoryError::Empty);
        }
        if self.cursor >= self.entries.len() {
            return Err(HistoryError::NoMoreElements);
        }
        self.cursor += 1;
        Ok(self
            .entries
            .get(self.cursor)
            .map_or_else(|| self.stash.as_deref().unwrap_or(""), String::as_str))
    }

    // --- Persistence ---

    /// Append newline-delimited records, oldest first.
    ///
    /// Blank records are skipped. Records beyond capacity evict the oldest.
    /// Returns the number of records read.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Io`] if reading fails.
    pub fn load(&mut self, source: impl BufRead) -> Result<usize, HistoryError> {
        let mut count = 0;
        for line in source.lines() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if self.entries.len() == self.capacity {
                self.entries.pop_front();
            }
            self.entries.push_back(line.to_string());
            count += 1;
        }
        self.discard_stash();
        Ok(count)
    }

    /// Write recordable entries, oldest first, one per line.
    /// Returns the number of entries written.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Io`] if writing fails.
    pub fn save(&self, mut sink: impl Write) -> Result<usize, HistoryError> {
        let mut count = 0;
        for entry in self.entries.iter().filter(|e| is_recordable(e)) {
            writeln!(sink, "{entry}")?;
            count += 1;
        }
        sink.flush()?;
        Ok(count)
    }

    /// Load from a file. A missing file loads nothing.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Io`] if the file exists but cannot be read.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, HistoryError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no history file");
                return Ok(0);
            }
            Err(err) => return Err(err.into()),
        };
        let count = self.load(BufReader::new(file))?;
        tracing::debug!(path = %path.display(), count, "history loaded");
        Ok(count)
    }

    /// Replace the file's contents with the recordable entries.
    ///
    /// On Unix a newly created file is readable by its owner only.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Io`] if the file cannot be created or written.
    pub fn save_file(&self, path: &Path) -> Result<usize, HistoryError> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(path)?;
        let count = self.save(BufWriter::new(file))?;
        tracing::debug!(path = %path.display(), count, "history saved");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(lines: &[&str]) -> History {
        let mut history = History::new();
        for line in lines {
            history.add(line);
        }
        history
    }

    fn entries(history: &History) -> Vec<&str> {
        history.iter().collect()
    }

    // --- Recording ---

    #[test]
    fn test_filtered_lines_are_not_added() {
        let mut history = history_of(&["ls"]);
        assert!(!history.add(" x"));
        assert!(!history.add(""));
        assert!(!history.add("   "));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_consecutive_duplicates_collapse() {
        let mut history = History::new();
        assert!(history.add("dup"));
        assert!(!history.add("dup"));
        assert_eq!(entries(&history), vec!["dup"]);
    }

    #[test]
    fn test_non_consecutive_duplicates_are_kept() {
        let history = history_of(&["a", "b", "a"]);
        assert_eq!(entries(&history), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_entries_are_stored_trimmed() {
        let history = history_of(&["echo hi\t "]);
        assert_eq!(entries(&history), vec!["echo hi"]);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = History::with_capacity(3).unwrap();
        for line in ["1", "2", "3", "4", "5"] {
            history.add(line);
        }
        assert_eq!(entries(&history), vec!["3", "4", "5"]);
        assert_eq!(history.capacity(), 3);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(matches!(
            History::with_capacity(0),
            Err(HistoryError::BadSize(0))
        ));
        assert_eq!(History::new().capacity(), DEFAULT_CAPACITY);
    }

    // --- Browsing ---

    #[test]
    fn test_navigation_on_empty_history() {
        let mut history = History::new();
        assert!(matches!(history.prev(), Err(HistoryError::Empty)));
        assert!(matches!(history.next(), Err(HistoryError::Empty)));
    }

    #[test]
    fn test_prev_walks_back_to_oldest() {
        let mut history = history_of(&["one", "two"]);
        assert_eq!(history.prev().unwrap(), "two");
        assert_eq!(history.prev().unwrap(), "one");
        assert!(matches!(history.prev(), Err(HistoryError::NoMoreElements)));
        assert!(history.is_browsing());
    }

    #[test]
    fn test_next_on_live_line_fails() {
        let mut history = history_of(&["one"]);
        assert!(matches!(history.next(), Err(HistoryError::NoMoreElements)));
    }

    #[test]
    fn test_stash_restores_live_line() {
        let mut history = history_of(&["one", "two"]);
        history.stash("draft");
        assert_eq!(history.prev().unwrap(), "two");
        assert_eq!(history.prev().unwrap(), "one");
        assert_eq!(history.next().unwrap(), "two");
        assert_eq!(history.next().unwrap(), "draft");
        assert!(!history.is_browsing());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_next_without_stash_returns_empty_line() {
        let mut history = history_of(&["one"]);
        history.prev().unwrap();
        assert_eq!(history.next().unwrap(), "");
    }

    #[test]
    fn test_add_discards_stash() {
        let mut history = history_of(&["one"]);
        history.stash("draft");
        history.prev().unwrap();
        history.add("two");
        assert_eq!(history.stashed(), None);
        assert!(!history.is_browsing());
        assert_eq!(history.prev().unwrap(), "two");
    }

    // --- Persistence ---

    #[test]
    fn test_load_keeps_file_order() {
        let mut history = History::new();
        let count = history.load(&b"first\nsecond\n\nthird\n"[..]).unwrap();
        assert_eq!(count, 3);
        assert_eq!(entries(&history), vec!["first", "second", "third"]);
        assert_eq!(history.prev().unwrap(), "third");
    }

    #[test]
    fn test_load_respects_capacity() {
        let mut history = History::with_capacity(2).unwrap();
        history.load(&b"a\nb\nc\n"[..]).unwrap();
        assert_eq!(entries(&history), vec!["b", "c"]);
    }

    #[test]
    fn test_save_skips_unrecordable_and_stash() {
        let mut history = History::new();
        history.load(&b"keep\n indented\n"[..]).unwrap();
        history.stash("draft");
        let mut out = Vec::new();
        assert_eq!(history.save(&mut out).unwrap(), 1);
        assert_eq!(String::from_utf8(out).unwrap(), "keep\n");
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = History::new();
        assert_eq!(history.load_file(&dir.path().join("absent")).unwrap(), 0);
        assert!(history.is_empty());
    }

    #[test]
    fn test_file_round_trip_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        std::fs::write(&path, "stale\nstale\nstale\nstale\n").unwrap();

        history_of(&["x", "y"]).save_file(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x\ny\n");

        let mut loaded = History::new();
        loaded.load_file(&path).unwrap();
        assert_eq!(entries(&loaded), vec!["x", "y"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        history_of(&["secret"]).save_file(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn keeps_most_recent_lines(
                cap in 1usize..8,
                lines in prop::collection::vec("[a-z]{1,3}", 0..40),
            ) {
                let mut history = History::with_capacity(cap).unwrap();
                let mut expected: Vec<String> = Vec::new();
                for line in &lines {
                    if history.add(line) {
                        expected.push(line.clone());
                    }
                }
                let start = expected.len().saturating_sub(cap);
                let stored: Vec<String> = history.iter().map(str::to_string).collect();
                prop_assert!(history.len() <= cap);
                prop_assert_eq!(stored, expected[start..].to_vec());
            }
        }
    }
}
