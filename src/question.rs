//! Typed prompts on top of the line editor.
//!
//! Each `read_*` method shows ` + <prompt>`, with the default in brackets
//! when there is one, and keeps asking until the answer parses. Rejected
//! answers are reported on their own line. Ctrl-C and Ctrl-D abort the
//! question.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::io::{Read, Write};

use thiserror::Error;

use crate::editor::{LineEditor, Outcome};
use crate::error::Error;

/// Placed before every question.
pub const PREFIX: &str = " + ";
/// Placed before every rejection message.
pub const ERROR_PREFIX: &str = "  ";

#[derive(Debug, Error)]
pub enum QuestionError {
    #[error("the string {0:?} does not represent a boolean")]
    NotBoolean(String),

    #[error("default choice {index} is out of range for {len} choices")]
    DefaultOutOfRange { index: usize, len: usize },

    #[error("no choices to pick from")]
    EmptyChoices,

    /// The user pressed Ctrl-C or Ctrl-D instead of answering.
    #[error("question aborted ({0:?})")]
    Aborted(Outcome),

    #[error(transparent)]
    Edit(#[from] Error),
}

pub type Result<T> = std::result::Result<T, QuestionError>;

/// Parse a yes/no style answer.
///
/// Accepts `1 t T true TRUE True y Y yes YES Yes` and their negative
/// counterparts, then any word in `extra` (compared in lower case).
pub fn parse_bool<S: BuildHasher>(
    answer: &str,
    extra: &HashMap<String, bool, S>,
) -> Option<bool> {
    match answer {
        "1" | "t" | "T" | "true" | "TRUE" | "True" | "y" | "Y" | "yes" | "YES" | "Yes" => {
            Some(true)
        }
        "0" | "f" | "F" | "false" | "FALSE" | "False" | "n" | "N" | "no" | "NO" | "No" => {
            Some(false)
        }
        _ => extra.get(&answer.to_lowercase()).copied(),
    }
}

/// Asks questions through a history-less [`LineEditor`].
#[derive(Debug)]
pub struct Question<R, W: Write> {
    editor: LineEditor<R, W>,
    yes: String,
    no: String,
    extra: HashMap<String, bool>,
}

impl<R: Read, W: Write> Question<R, W> {
    /// Questions answered with `y` / `n`.
    pub fn new(input: R, output: W, columns: usize) -> Self {
        Self {
            editor: LineEditor::new(input, output, columns),
            yes: "y".to_string(),
            no: "n".to_string(),
            extra: HashMap::new(),
        }
    }

    /// Accept `word` as a boolean answer, e.g. `("oui", true)`.
    #[must_use]
    pub fn with_extra_word(mut self, word: &str, value: bool) -> Self {
        self.extra.insert(word.to_lowercase(), value);
        self
    }

    /// Show `yes` / `no` in boolean questions instead of `y` / `n`.
    ///
    /// # Errors
    ///
    /// Returns [`QuestionError::NotBoolean`] unless `yes` parses as true and
    /// `no` as false. Register extra words first.
    pub fn with_strings(mut self, yes: &str, no: &str) -> Result<Self> {
        if parse_bool(yes, &self.extra) != Some(true) {
            return Err(QuestionError::NotBoolean(yes.to_string()));
        }
        if parse_bool(no, &self.extra) != Some(false) {
            return Err(QuestionError::NotBoolean(no.to_string()));
        }
        self.yes = yes.to_lowercase();
        self.no = no.to_lowercase();
        Ok(self)
    }

    pub const fn editor(&self) -> &LineEditor<R, W> {
        &self.editor
    }

    pub fn into_editor(self) -> LineEditor<R, W> {
        self.editor
    }

    /// Ask until a non-empty answer is given.
    ///
    /// # Errors
    ///
    /// [`QuestionError::Aborted`] on Ctrl-C or Ctrl-D, [`QuestionError::Edit`]
    /// when the terminal fails.
    pub fn read(&mut self, prompt: &str) -> Result<String> {
        loop {
            let answer = self.ask(prompt, None)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
        }
    }

    /// Ask for text that is not a number. An empty answer picks `default`
    /// when there is one.
    ///
    /// # Errors
    ///
    /// [`QuestionError::Aborted`] on Ctrl-C or Ctrl-D, [`QuestionError::Edit`]
    /// when the terminal fails.
    pub fn read_string(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        loop {
            let answer = self.ask(prompt, default)?;
            if answer.is_empty() {
                match default {
                    Some(default) => return Ok(default.to_string()),
                    None => continue,
                }
            }
            if answer.parse::<i64>().is_ok() || answer.parse::<f64>().is_ok() {
                self.reject(&answer, "the value has to be a string")?;
                continue;
            }
            return Ok(answer);
        }
    }

    /// Ask for an integer.
    ///
    /// # Errors
    ///
    /// [`QuestionError::Aborted`] on Ctrl-C or Ctrl-D, [`QuestionError::Edit`]
    /// when the terminal fails.
    pub fn read_int(&mut self, prompt: &str, default: Option<i64>) -> Result<i64> {
        let shown = default.map(|d| d.to_string());
        loop {
            let answer = self.ask(prompt, shown.as_deref())?;
            if answer.is_empty()
                && let Some(default) = default
            {
                return Ok(default);
            }
            match answer.parse() {
                Ok(value) => return Ok(value),
                Err(_) => self.reject(&answer, "the value has to be an integer")?,
            }
        }
    }

    /// Ask for a floating point number.
    ///
    /// # Errors
    ///
    /// [`QuestionError::Aborted`] on Ctrl-C or Ctrl-D, [`QuestionError::Edit`]
    /// when the terminal fails.
    pub fn read_float(&mut self, prompt: &str, default: Option<f64>) -> Result<f64> {
        let shown = default.map(|d| d.to_string());
        loop {
            let answer = self.ask(prompt, shown.as_deref())?;
            if answer.is_empty()
                && let Some(default) = default
            {
                return Ok(default);
            }
            match answer.parse() {
                Ok(value) => return Ok(value),
                Err(_) => self.reject(&answer, "the value has to be a float")?,
            }
        }
    }

    /// Ask a yes/no question. The default is shown in upper case and taken
    /// on an empty answer.
    ///
    /// # Errors
    ///
    /// [`QuestionError::Aborted`] on Ctrl-C or Ctrl-D, [`QuestionError::Edit`]
    /// when the terminal fails.
    pub fn read_bool(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let options = if default {
            format!("{}/{}", self.yes.to_uppercase(), self.no)
        } else {
            format!("{}/{}", self.yes, self.no.to_uppercase())
        };
        loop {
            let answer = self.ask(prompt, Some(&options))?;
            if answer.is_empty() {
                return Ok(default);
            }
            match parse_bool(&answer, &self.extra) {
                Some(value) => return Ok(value),
                None => self.reject(&answer, "the value does not represent a boolean")?,
            }
        }
    }

    /// Ask for one of `choices`. An empty answer picks
    /// `choices[default_index]`.
    ///
    /// # Errors
    ///
    /// [`QuestionError::EmptyChoices`] or [`QuestionError::DefaultOutOfRange`]
    /// before asking, then as for [`read`](Self::read).
    pub fn read_choice(
        &mut self,
        prompt: &str,
        choices: &[&str],
        default_index: usize,
    ) -> Result<String> {
        if choices.is_empty() {
            return Err(QuestionError::EmptyChoices);
        }
        let Some(&default) = choices.get(default_index) else {
            return Err(QuestionError::DefaultOutOfRange {
                index: default_index,
                len: choices.len(),
            });
        };
        let prompt = format!("{prompt} ({})", choices.join(","));
        loop {
            let answer = self.ask(&prompt, Some(default))?;
            if answer.is_empty() {
                return Ok(default.to_string());
            }
            if choices.contains(&answer.as_str()) {
                return Ok(answer);
            }
            self.reject(&answer, "the value is not one of the choices")?;
        }
    }

    fn ask(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut line = match default {
            Some(default) => format!("{PREFIX}{prompt} [{default}]"),
            None => format!("{PREFIX}{prompt}"),
        };
        line.push_str(if line.ends_with('?') { " " } else { ": " });
        self.editor.set_prompt(line);

        let submission = self.editor.read_line()?;
        match submission.outcome {
            Outcome::Accepted => Ok(submission.text),
            outcome => Err(QuestionError::Aborted(outcome)),
        }
    }

    fn reject(&self, answer: &str, reason: &str) -> Result<()> {
        tracing::debug!(answer, reason, "answer rejected");
        self.editor
            .write_notice(&format!("{ERROR_PREFIX}{answer}: {reason}"))?;
        Ok(())
    }
}
