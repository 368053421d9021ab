//! Key decoding: raw terminal bytes to edit events.
//!
//! Terminals send every key over one unframed byte stream. Plain characters
//! arrive as UTF-8, control keys as single bytes below 0x20, and cursor keys
//! as escape sequences that share the `ESC [` prefix and differ only in their
//! trailing bytes. [`KeyDecoder`] is a push state machine fed one byte at a
//! time; [`KeyReader`] pulls bytes from a reader until an event is complete.

use std::io::Read;

use crate::error::{Error, Result};

/// One editing command decoded from the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditEvent {
    /// A printable codepoint.
    InsertChar(char),
    MoveLeft,
    MoveRight,
    MoveToStart,
    MoveToEnd,
    DeleteBackward,
    DeleteForward,
    DeleteToEnd,
    DeleteLine,
    TransposeChars,
    HistoryPrev,
    HistoryNext,
    /// Enter.
    Accept,
    /// Ctrl-C.
    Interrupt,
    /// Ctrl-D.
    EndOfInput,
    /// A key with no binding, or an unsupported escape sequence.
    Ignored,
}

/// Result of feeding one byte to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// More bytes are needed.
    Incomplete,
    /// The byte completed an event.
    Complete(EditEvent),
    /// The byte ended a broken UTF-8 sequence without belonging to it. The
    /// event stands for the broken sequence; the byte must be fed again.
    Replay(EditEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Normal,
    Utf8 {
        bytes: [u8; 4],
        len: usize,
        need: usize,
    },
    /// Saw `ESC`.
    Escape,
    /// Saw `ESC` and one more byte.
    EscapeIntro(u8),
    /// Saw `ESC [` and a digit; `params` is set once more parameter bytes follow.
    Extended { digit: u8, params: bool },
}

/// Byte-at-a-time key decoder.
#[derive(Debug, Clone, Default)]
pub struct KeyDecoder {
    state: State,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the decoder is in the middle of a multi-byte sequence.
    pub fn is_pending(&self) -> bool {
        self.state != State::Normal
    }

    /// Decode a complete byte string, replaying bytes where needed.
    /// A trailing incomplete sequence is dropped.
    pub fn decode_all(bytes: &[u8]) -> Vec<EditEvent> {
        let mut decoder = Self::new();
        let mut events = Vec::new();
        for &byte in bytes {
            loop {
                match decoder.feed(byte) {
                    Decoded::Incomplete => break,
                    Decoded::Complete(event) => {
                        events.push(event);
                        break;
                    }
                    Decoded::Replay(event) => events.push(event),
                }
            }
        }
        events
    }

    /// Feed one byte.
    pub fn feed(&mut self, byte: u8) -> Decoded {
        match self.state {
            State::Normal => self.normal(byte),
            State::Utf8 {
                mut bytes,
                len,
                need,
            } => {
                if byte & 0xC0 != 0x80 {
                    self.state = State::Normal;
                    return Decoded::Replay(EditEvent::InsertChar(char::REPLACEMENT_CHARACTER));
                }
                bytes[len] = byte;
                let len = len + 1;
                if len < need {
                    self.state = State::Utf8 { bytes, len, need };
                    return Decoded::Incomplete;
                }
                self.state = State::Normal;
                let ch = std::str::from_utf8(&bytes[..len])
                    .ok()
                    .and_then(|s| s.chars().next())
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                Decoded::Complete(EditEvent::InsertChar(ch))
            }
            State::Escape => {
                self.state = State::EscapeIntro(byte);
                Decoded::Incomplete
            }
            State::EscapeIntro(first) => self.escape(first, byte),
            State::Extended { digit, params } => {
                if byte.is_ascii_digit() || byte == b';' {
                    self.state = State::Extended {
                        digit,
                        params: true,
                    };
                    return Decoded::Incomplete;
                }
                self.state = State::Normal;
                if byte == b'~' && digit == b'3' && !params {
                    Decoded::Complete(EditEvent::DeleteForward)
                } else {
                    tracing::debug!(
                        digit = %char::from(digit),
                        last = byte,
                        "unsupported extended escape ignored"
                    );
                    Decoded::Complete(EditEvent::Ignored)
                }
            }
        }
    }

    fn normal(&mut self, byte: u8) -> Decoded {
        let event = match byte {
            13 => EditEvent::Accept,
            127 | 8 => EditEvent::DeleteBackward,
            3 => EditEvent::Interrupt,
            4 => EditEvent::EndOfInput,
            1 => EditEvent::MoveToStart,
            2 => EditEvent::MoveLeft,
            5 => EditEvent::MoveToEnd,
            6 => EditEvent::MoveRight,
            11 => EditEvent::DeleteToEnd,
            14 => EditEvent::HistoryNext,
            16 => EditEvent::HistoryPrev,
            20 => EditEvent::TransposeChars,
            21 => EditEvent::DeleteLine,
            27 => {
                self.state = State::Escape;
                return Decoded::Incomplete;
            }
            // Tab and every other control byte.
            0..=31 => EditEvent::Ignored,
            0x20..=0x7E => EditEvent::InsertChar(char::from(byte)),
            0xC2..=0xF4 => {
                let need = match byte {
                    0xC2..=0xDF => 2,
                    0xE0..=0xEF => 3,
                    _ => 4,
                };
                let mut bytes = [0; 4];
                bytes[0] = byte;
                self.state = State::Utf8 {
                    bytes,
                    len: 1,
                    need,
                };
                return Decoded::Incomplete;
            }
            _ => EditEvent::InsertChar(char::REPLACEMENT_CHARACTER),
        };
        Decoded::Complete(event)
    }

    fn escape(&mut self, first: u8, second: u8) -> Decoded {
        self.state = State::Normal;
        let event = match (first, second) {
            (b'[', b'D') => EditEvent::MoveLeft,
            (b'[', b'C') => EditEvent::MoveRight,
            (b'[', b'A') => EditEvent::HistoryPrev,
            (b'[', b'B') => EditEvent::HistoryNext,
            (b'[' | b'O', b'H') => EditEvent::MoveToStart,
            (b'[' | b'O', b'F') => EditEvent::MoveToEnd,
            (b'[', b'0'..=b'9') => {
                self.state = State::Extended {
                    digit: second,
                    params: false,
                };
                return Decoded::Incomplete;
            }
            _ => {
                tracing::debug!(first, second, "unsupported escape sequence ignored");
                EditEvent::Ignored
            }
        };
        Decoded::Complete(event)
    }
}

/// Pulls bytes from an input source and decodes them into events.
#[derive(Debug)]
pub struct KeyReader<R> {
    input: R,
    decoder: KeyDecoder,
    replay: Option<u8>,
}

impl<R: Read> KeyReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            decoder: KeyDecoder::new(),
            replay: None,
        }
    }

    /// Block until the next complete event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] if the source fails or ends, including in the
    /// middle of an escape sequence. The partial sequence is not recovered.
    pub fn next_event(&mut self) -> Result<EditEvent> {
        loop {
            let byte = match self.replay.take() {
                Some(byte) => byte,
                None => self.read_byte()?,
            };
            match self.decoder.feed(byte) {
                Decoded::Incomplete => {}
                Decoded::Complete(event) => return Ok(event),
                Decoded::Replay(event) => {
                    self.replay = Some(byte);
                    return Ok(event);
                }
            }
        }
    }

    /// The input source.
    pub const fn get_ref(&self) -> &R {
        &self.input
    }

    /// Consume the reader, returning the input source.
    pub fn into_inner(self) -> R {
        self.input
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.input.read_exact(&mut byte).map_err(|err| {
            self.decoder = KeyDecoder::new();
            Error::Input(err)
        })?;
        Ok(byte[0])
    }
}
