//! Wire vocabulary shared by the bulletin board server and client.
//!
//! Everything that crosses the socket lives here: the three-line handshake,
//! the closed [`Request`] type with its line parser, response status lines,
//! the `NOTE`/`PIN` detail lines and the error codes. The protocol is plain
//! newline-terminated text, one request per line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

mod request;

pub use request::{NoteFilter, Request};

pub const DEFAULT_PORT: u16 = 8080;

/// A request line that could not be parsed.
///
/// Always reported to the peer as `ERROR INVALID_FORMAT <reason>`; the
/// connection stays open and no state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct FormatError {
    pub reason: String,
}

impl FormatError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidFormat,
    OutOfBounds,
    ColorNotSupported,
    CompleteOverlap,
    NoNoteAtCoordinate,
    PinNotFound,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::OutOfBounds => "OUT_OF_BOUNDS",
            ErrorCode::ColorNotSupported => "COLOR_NOT_SUPPORTED",
            ErrorCode::CompleteOverlap => "COMPLETE_OVERLAP",
            ErrorCode::NoNoteAtCoordinate => "NO_NOTE_AT_COORDINATE",
            ErrorCode::PinNotFound => "PIN_NOT_FOUND",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INVALID_FORMAT" => Ok(ErrorCode::InvalidFormat),
            "OUT_OF_BOUNDS" => Ok(ErrorCode::OutOfBounds),
            "COLOR_NOT_SUPPORTED" => Ok(ErrorCode::ColorNotSupported),
            "COMPLETE_OVERLAP" => Ok(ErrorCode::CompleteOverlap),
            "NO_NOTE_AT_COORDINATE" => Ok(ErrorCode::NoNoteAtCoordinate),
            "PIN_NOT_FOUND" => Ok(ErrorCode::PinNotFound),
            other => Err(FormatError::new(format!("Unknown error code: {other}"))),
        }
    }
}

/// Single-line success acknowledgements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    NotePosted,
    Pinned,
    Unpinned,
    Shaken,
    Cleared,
    Disconnected,
}

impl Ack {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ack::NotePosted => "NOTE_POSTED",
            Ack::Pinned => "PINNED",
            Ack::Unpinned => "UNPINNED",
            Ack::Shaken => "SHAKEN",
            Ack::Cleared => "CLEARED",
            Ack::Disconnected => "DISCONNECTED",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "NOTE_POSTED" => Some(Ack::NotePosted),
            "PINNED" => Some(Ack::Pinned),
            "UNPINNED" => Some(Ack::Unpinned),
            "SHAKEN" => Some(Ack::Shaken),
            "CLEARED" => Some(Ack::Cleared),
            "DISCONNECTED" => Some(Ack::Disconnected),
            _ => None,
        }
    }
}

/// The first line of every response.
///
/// `Count(n)` announces that exactly `n` detail lines follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ack(Ack),
    Count(usize),
    Error { code: ErrorCode, message: String },
}

impl Status {
    /// Number of detail lines following this status line
    pub fn detail_lines(&self) -> usize {
        match self {
            Status::Count(n) => *n,
            _ => 0,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ack(ack) => write!(f, "OK {}", ack.as_str()),
            Status::Count(n) => write!(f, "OK {n}"),
            Status::Error { code, message } if message.is_empty() => write!(f, "ERROR {code}"),
            Status::Error { code, message } => write!(f, "ERROR {code} {message}"),
        }
    }
}

impl FromStr for Status {
    type Err = FormatError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (kind, rest) = request::next_token(line)
            .ok_or_else(|| FormatError::new("Empty status line"))?;

        match kind {
            "OK" => {
                if let Some(ack) = Ack::from_token(rest) {
                    return Ok(Status::Ack(ack));
                }
                rest.parse::<usize>()
                    .map(Status::Count)
                    .map_err(|_| FormatError::new(format!("Unknown OK status: {rest}")))
            }
            "ERROR" => {
                let (code, message) = request::next_token(rest)
                    .ok_or_else(|| FormatError::new("ERROR status without code"))?;
                Ok(Status::Error {
                    code: code.parse()?,
                    message: message.to_string(),
                })
            }
            other => Err(FormatError::new(format!("Unknown status: {other}"))),
        }
    }
}

/// A complete logical response to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ack(Ack),
    Notes(Vec<NoteView>),
    Pins(Vec<PinView>),
    Error { code: ErrorCode, message: String },
}

impl Response {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error {
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Response::Ack(ack) => Status::Ack(*ack),
            Response::Notes(notes) => Status::Count(notes.len()),
            Response::Pins(pins) => Status::Count(pins.len()),
            Response::Error { code, message } => Status::Error {
                code: *code,
                message: message.clone(),
            },
        }
    }

    /// True for the response after which the session must be closed
    pub fn ends_session(&self) -> bool {
        matches!(self, Response::Ack(Ack::Disconnected))
    }
}

impl fmt::Display for Response {
    /// Status line followed by the detail lines, without a trailing newline.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status())?;
        match self {
            Response::Notes(notes) => {
                for note in notes {
                    write!(f, "\n{note}")?;
                }
            }
            Response::Pins(pins) => {
                for pin in pins {
                    write!(f, "\n{pin}")?;
                }
            }
            Response::Ack(_) | Response::Error { .. } => {}
        }
        Ok(())
    }
}

/// One `NOTE <x> <y> <color> <message> PINNED=<bool>` detail line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteView {
    pub x: i32,
    pub y: i32,
    pub color: String,
    pub message: String,
    pub pinned: bool,
}

impl fmt::Display for NoteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NOTE {} {} {} {} PINNED={}",
            self.x, self.y, self.color, self.message, self.pinned
        )
    }
}

impl FromStr for NoteView {
    type Err = FormatError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let bad = || FormatError::new(format!("Malformed NOTE line: {line}"));

        let rest = line.trim().strip_prefix("NOTE ").ok_or_else(bad)?;
        let (x, rest) = request::next_token(rest).ok_or_else(bad)?;
        let (y, rest) = request::next_token(rest).ok_or_else(bad)?;
        let (color, rest) = request::next_token(rest).ok_or_else(bad)?;
        // The message may itself contain spaces, so the flag is taken from the end
        let (message, pinned) = rest.rsplit_once(" PINNED=").ok_or_else(bad)?;

        Ok(NoteView {
            x: x.parse().map_err(|_| bad())?,
            y: y.parse().map_err(|_| bad())?,
            color: color.to_string(),
            message: message.to_string(),
            pinned: pinned.parse().map_err(|_| bad())?,
        })
    }
}

/// One `PIN <x> <y>` detail line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinView {
    pub x: i32,
    pub y: i32,
}

impl fmt::Display for PinView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PIN {} {}", self.x, self.y)
    }
}

impl FromStr for PinView {
    type Err = FormatError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let bad = || FormatError::new(format!("Malformed PIN line: {line}"));

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["PIN", x, y] => Ok(PinView {
                x: x.parse().map_err(|_| bad())?,
                y: y.parse().map_err(|_| bad())?,
            }),
            _ => Err(bad()),
        }
    }
}

/// Board configuration announced to every new connection.
///
/// Sent as exactly three lines:
/// `BOARD <w> <h>`, `NOTE <w> <h>`, `COLORS <count> <c1> ... <cN>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub board_width: i32,
    pub board_height: i32,
    pub note_width: i32,
    pub note_height: i32,
    pub colors: Vec<String>,
}

impl Handshake {
    pub fn lines(&self) -> [String; 3] {
        [
            format!("BOARD {} {}", self.board_width, self.board_height),
            format!("NOTE {} {}", self.note_width, self.note_height),
            format!("COLORS {} {}", self.colors.len(), self.colors.join(" ")),
        ]
    }

    pub fn parse(board_line: &str, note_line: &str, colors_line: &str) -> Result<Self, FormatError> {
        let (board_width, board_height) = parse_dimensions(board_line, "BOARD")?;
        let (note_width, note_height) = parse_dimensions(note_line, "NOTE")?;

        let parts: Vec<&str> = colors_line.split_whitespace().collect();
        let (count, colors) = match parts.as_slice() {
            ["COLORS", count, colors @ ..] => (count, colors),
            _ => return Err(FormatError::new(format!("Bad handshake: {colors_line}"))),
        };
        let count: usize = count
            .parse()
            .map_err(|_| FormatError::new(format!("Bad color count: {count}")))?;
        if count == 0 || count != colors.len() {
            return Err(FormatError::new(format!(
                "Color count {count} does not match {} listed colors",
                colors.len()
            )));
        }

        Ok(Handshake {
            board_width,
            board_height,
            note_width,
            note_height,
            colors: colors.iter().map(|c| c.to_string()).collect(),
        })
    }
}

impl fmt::Display for Handshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

fn parse_dimensions(line: &str, keyword: &str) -> Result<(i32, i32), FormatError> {
    let bad = || FormatError::new(format!("Bad handshake: {line}"));

    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [k, w, h] if *k == keyword => Ok((
            w.parse().map_err(|_| bad())?,
            h.parse().map_err(|_| bad())?,
        )),
        _ => Err(bad()),
    }
}
