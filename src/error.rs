// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Every way a generation request can fail.  None of these are fatal
//! to the process; each belongs to the single request that raised it
//! and the caller is free to retry with corrected input.

use failure::Fail;
use std::fmt;
use std::io;

/// An expression that could not be reduced to a polynomial in z and c.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// What went wrong, in words suitable for showing to a user.
    pub message: String,
    /// Byte offset into the expression where the problem was found,
    /// when there is a single place to point at.
    pub offset: Option<usize>,
}

impl ParseError {
    /// An error tied to a specific location in the expression.
    pub fn at(offset: usize, message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            offset: Some(offset),
        }
    }

    /// An error about the expression as a whole.
    pub fn whole(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            offset: None,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{} (at offset {})", self.message, offset),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Fail for ParseError {}

/// The error type for the whole pipeline.
#[derive(Debug, Fail)]
pub enum FractalError {
    /// The expression is not a valid polynomial in z.
    #[fail(display = "invalid expression: {}", _0)]
    Parse(#[cause] ParseError),

    /// The viewport was rejected before any sampling started.
    #[fail(display = "invalid viewport: {}", _0)]
    InvalidViewport(String),

    /// The request was cancelled before the grid was complete.
    #[fail(display = "generation cancelled")]
    Cancelled,

    /// The image could not be written.
    #[fail(display = "could not write image: {}", _0)]
    Io(#[cause] io::Error),
}

impl FractalError {
    /// True for errors caused by the expression itself, the ones a
    /// caller should report back against its input field.
    pub fn is_parse(&self) -> bool {
        match self {
            FractalError::Parse(_) => true,
            _ => false,
        }
    }
}

impl From<ParseError> for FractalError {
    fn from(e: ParseError) -> Self {
        FractalError::Parse(e)
    }
}

impl From<io::Error> for FractalError {
    fn from(e: io::Error) -> Self {
        FractalError::Io(e)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FractalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_shows_offset() {
        let e = ParseError::at(4, "unexpected ')'");
        assert_eq!(format!("{}", e), "unexpected ')' (at offset 4)");
        let e = ParseError::whole("expression does not depend on z");
        assert_eq!(format!("{}", e), "expression does not depend on z");
    }

    #[test]
    fn parse_errors_are_identifiable() {
        let e: FractalError = ParseError::whole("nope").into();
        assert!(e.is_parse());
        assert!(!FractalError::Cancelled.is_parse());
        assert!(format!("{}", e).starts_with("invalid expression"));
    }
}
