//! Error types

use std::fmt;

use crate::binary::read::ReadEof;

/// Errors that originate when parsing binary data
///
/// All of these are fatal for the font being read. Problems confined to a single glyph program
/// or a single dict entry are repaired during parsing instead of being reported here.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ParseError {
    BadEof,
    BadValue,
    BadOffset,
    LimitExceeded,
    MissingValue,
    /// The header sentinel byte (major version 1) was not found.
    MissingHeader,
    /// A charset, encoding or FDSelect used a format tag that is not defined.
    UnknownFormat,
    /// The FDSelect did not describe exactly one font dict per glyph.
    FdSelectMismatch,
    /// A dict was asked about a key that its schema does not define.
    UnknownDictKey,
}

impl From<ReadEof> for ParseError {
    fn from(_error: ReadEof) -> Self {
        ParseError::BadEof
    }
}

impl From<std::num::TryFromIntError> for ParseError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        ParseError::BadValue
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BadEof => write!(f, "end of data reached unexpectedly"),
            ParseError::BadValue => write!(f, "invalid value"),
            ParseError::BadOffset => write!(f, "invalid data offset"),
            ParseError::LimitExceeded => write!(f, "limit exceeded"),
            ParseError::MissingValue => write!(f, "an expected data value was missing"),
            ParseError::MissingHeader => write!(f, "invalid CFF header"),
            ParseError::UnknownFormat => write!(f, "unknown charset, encoding or FDSelect format"),
            ParseError::FdSelectMismatch => write!(f, "FDSelect does not cover every glyph"),
            ParseError::UnknownDictKey => write!(f, "key is not defined for this dict"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors that originate when writing binary data
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum WriteError {
    BadValue,
    /// An offset placeholder was about to be patched but did not hold the empty marker.
    PlaceholderMismatch,
    /// A section needed an offset entry that the owning dict did not contain.
    MissingPlaceholder,
    MissingPrivateDict,
    Dict(ParseError),
}

impl From<std::num::TryFromIntError> for WriteError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        WriteError::BadValue
    }
}

impl From<ParseError> for WriteError {
    fn from(error: ParseError) -> Self {
        WriteError::Dict(error)
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::BadValue => write!(f, "write: bad value"),
            WriteError::PlaceholderMismatch => {
                write!(f, "writing to an offset that is not empty")
            }
            WriteError::MissingPlaceholder => write!(f, "no offset entry to patch"),
            WriteError::MissingPrivateDict => write!(f, "there must be a private dictionary"),
            WriteError::Dict(err) => write!(f, "dict: {}", err),
        }
    }
}

impl std::error::Error for WriteError {}

/// Reasons a glyph program is rejected by the charstring validator.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum CharStringError {
    MissingSubroutines,
    InvalidSubroutineIndex,
    NestingLimitReached,
    InsufficientArguments,
    InvalidFontDict,
}

impl fmt::Display for CharStringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharStringError::MissingSubroutines => write!(f, "missing subrs index"),
            CharStringError::InvalidSubroutineIndex => write!(f, "out of bounds subr index"),
            CharStringError::NestingLimitReached => write!(f, "subroutines nesting limit reached"),
            CharStringError::InsufficientArguments => write!(f, "not enough parameters"),
            CharStringError::InvalidFontDict => write!(f, "invalid fd index for glyph index"),
        }
    }
}

impl std::error::Error for CharStringError {}
