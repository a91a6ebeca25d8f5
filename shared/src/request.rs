//! Request lines and their parser.
//!
//! Every command a client may send parses into exactly one [`Request`]
//! variant, so the server matches on a closed type instead of comparing
//! strings. Parsing only checks shape (arity, integer coordinates, filter
//! syntax); domain rules such as allowed colors belong to the board.

use crate::FormatError;
use std::fmt;
use std::str::FromStr;

const COLOR_KEY: &str = "color=";
const CONTAINS_KEY: &str = "contains=";
const REFERS_TO_KEY: &str = "refersTo=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Disconnect,
    Clear,
    Shake,
    Post {
        x: i32,
        y: i32,
        color: String,
        message: String,
    },
    Pin {
        x: i32,
        y: i32,
    },
    Unpin {
        x: i32,
        y: i32,
    },
    Get(NoteFilter),
    GetPins,
}

/// Optional filters of a `GET` request, combined with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub color: Option<String>,
    pub contains: Option<(i32, i32)>,
    pub refers_to: Option<String>,
}

impl NoteFilter {
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn containing(mut self, x: i32, y: i32) -> Self {
        self.contains = Some((x, y));
        self
    }

    pub fn referring_to(mut self, text: impl Into<String>) -> Self {
        self.refers_to = Some(text.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.contains.is_none() && self.refers_to.is_none()
    }

    /// Case-insensitive substring test used by the `refersTo` filter
    pub fn refers_to_matches(&self, message: &str) -> bool {
        match &self.refers_to {
            Some(needle) => message.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

impl FromStr for Request {
    type Err = FormatError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (command, rest) =
            next_token(line.trim()).ok_or_else(|| FormatError::new("Invalid request"))?;

        match command {
            "DISCONNECT" => no_arguments(rest, command).map(|_| Request::Disconnect),
            "CLEAR" => no_arguments(rest, command).map(|_| Request::Clear),
            "SHAKE" => no_arguments(rest, command).map(|_| Request::Shake),
            "PIN" => parse_point(rest, command).map(|(x, y)| Request::Pin { x, y }),
            "UNPIN" => parse_point(rest, command).map(|(x, y)| Request::Unpin { x, y }),
            "POST" => parse_post(rest),
            "GET" => parse_get(rest),
            _ => Err(FormatError::new(format!("Unknown command: {command}"))),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Disconnect => f.write_str("DISCONNECT"),
            Request::Clear => f.write_str("CLEAR"),
            Request::Shake => f.write_str("SHAKE"),
            Request::Post {
                x,
                y,
                color,
                message,
            } => write!(f, "POST {x} {y} {color} {message}"),
            Request::Pin { x, y } => write!(f, "PIN {x} {y}"),
            Request::Unpin { x, y } => write!(f, "UNPIN {x} {y}"),
            Request::GetPins => f.write_str("GET PINS"),
            Request::Get(filter) => {
                f.write_str("GET")?;
                if let Some(color) = &filter.color {
                    write!(f, " {COLOR_KEY}{color}")?;
                }
                if let Some((x, y)) = filter.contains {
                    write!(f, " {CONTAINS_KEY}{x} {y}")?;
                }
                if let Some(text) = &filter.refers_to {
                    write!(f, " {REFERS_TO_KEY}{text}")?;
                }
                Ok(())
            }
        }
    }
}

/// Splits off the first whitespace-delimited token.
///
/// Returns the token and the remainder with its leading whitespace removed,
/// or `None` when the input holds no token at all.
pub(crate) fn next_token(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.find(char::is_whitespace) {
        Some(end) => Some((&input[..end], input[end..].trim_start())),
        None => Some((input, "")),
    }
}

fn parse_int(token: &str) -> Option<i32> {
    token.parse().ok()
}

fn no_arguments(rest: &str, command: &str) -> Result<(), FormatError> {
    if rest.trim().is_empty() {
        Ok(())
    } else {
        Err(FormatError::new(format!("{command} takes no parameters")))
    }
}

fn parse_point(rest: &str, command: &str) -> Result<(i32, i32), FormatError> {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let [x, y] = parts.as_slice() else {
        return Err(FormatError::new(format!("{command} requires x and y")));
    };

    match (parse_int(x), parse_int(y)) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(FormatError::new(format!(
            "{command} requires integer coordinates"
        ))),
    }
}

fn parse_post(rest: &str) -> Result<Request, FormatError> {
    let missing = || FormatError::new("POST requires coordinates, color, and message");

    let (x, rest) = next_token(rest).ok_or_else(missing)?;
    let (y, rest) = next_token(rest).ok_or_else(missing)?;
    let (color, message) = next_token(rest).ok_or_else(missing)?;
    let message = message.trim_end();
    if message.is_empty() {
        return Err(missing());
    }

    match (parse_int(x), parse_int(y)) {
        (Some(x), Some(y)) => Ok(Request::Post {
            x,
            y,
            color: color.to_string(),
            message: message.to_string(),
        }),
        _ => Err(FormatError::new("POST requires integer coordinates")),
    }
}

fn parse_get(rest: &str) -> Result<Request, FormatError> {
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    if tokens.as_slice() == ["PINS"] {
        return Ok(Request::GetPins);
    }

    let mut filter = NoteFilter::default();
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];

        if let Some(color) = token.strip_prefix(COLOR_KEY) {
            if filter.color.is_some() {
                return Err(FormatError::new("Duplicate color filter"));
            }
            if color.is_empty() {
                return Err(FormatError::new("color filter must not be empty"));
            }
            filter.color = Some(color.to_string());
            i += 1;
        } else if let Some(x) = token.strip_prefix(CONTAINS_KEY) {
            if filter.contains.is_some() {
                return Err(FormatError::new("Duplicate contains filter"));
            }
            let y = match tokens.get(i + 1) {
                Some(y) if !x.is_empty() => y,
                _ => return Err(FormatError::new("contains requires x and y")),
            };
            match (parse_int(x), parse_int(y)) {
                (Some(x), Some(y)) => filter.contains = Some((x, y)),
                _ => {
                    return Err(FormatError::new(
                        "contains requires integer coordinates",
                    ))
                }
            }
            i += 2;
        } else if let Some(text) = token.strip_prefix(REFERS_TO_KEY) {
            if filter.refers_to.is_some() {
                return Err(FormatError::new("Duplicate refersTo filter"));
            }
            if text.is_empty() {
                return Err(FormatError::new("refersTo filter must not be empty"));
            }
            filter.refers_to = Some(text.to_string());
            i += 1;
        } else {
            return Err(FormatError::new(format!("Unknown filter: {token}")));
        }
    }

    Ok(Request::Get(filter))
}
