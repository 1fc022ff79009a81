//! Error handling.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.
//!
//! All fallible operations of the crate return the [`Error`] type defined
//! here. An error carries a rough category in form of an [`ErrorKind`], a
//! human readable message, and the position in the stream where the error
//! was discovered as a [`Pos`]. Errors are always fatal: the codecs make no
//! attempt to resynchronize, they unwind to the caller which is expected to
//! discard the partially processed data.

use std::borrow::Cow;
use std::{error, fmt, io};


//------------ ErrorKind -----------------------------------------------------

/// The category of an error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The data is syntactically malformed.
    ///
    /// In binary streams this covers broken tag or length framing, in text
    /// streams unexpected characters or labels.
    Format,

    /// A length, tag number, or numeric value exceeds what can be stored.
    Overflow,

    /// The data is well-formed but semantically wrong for the expected type.
    InvalidData,

    /// The input ended in the middle of a structure.
    EndOfData,

    /// The API was used incorrectly.
    ///
    /// This indicates a bug in the calling code rather than bad input, e.g.
    /// ending a frame that was never begun.
    IllegalCall,

    /// The underlying byte source or sink failed.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            ErrorKind::Format => "format error",
            ErrorKind::Overflow => "overflow",
            ErrorKind::InvalidData => "invalid data",
            ErrorKind::EndOfData => "unexpected end of data",
            ErrorKind::IllegalCall => "illegal call",
            ErrorKind::Io => "io error",
        })
    }
}


//------------ Pos -----------------------------------------------------------

/// The position within a stream attached to an error.
///
/// Binary streams report a byte offset, text streams a line number. The
/// position is for diagnostics only, it cannot be used to seek.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Pos {
    /// The position is not known.
    #[default]
    None,

    /// A byte offset from the start of the stream.
    Byte(u64),

    /// A one-based line number.
    Line(usize),
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Pos::None => Ok(()),
            Pos::Byte(offset) => write!(f, " at offset {}", offset),
            Pos::Line(line) => write!(f, " at line {}", line),
        }
    }
}


//------------ Error ---------------------------------------------------------

/// An error happened while encoding or decoding an object stream.
pub struct Error {
    /// The category of the error.
    kind: ErrorKind,

    /// The description of what went wrong.
    message: Cow<'static, str>,

    /// Where in the stream it went wrong.
    pos: Pos,
}

impl Error {
    /// Creates a new error from its parts.
    pub fn new(
        kind: ErrorKind, message: impl Into<Cow<'static, str>>, pos: Pos
    ) -> Self {
        Self { kind, message: message.into(), pos }
    }

    /// Creates a format error.
    pub fn format(message: impl Into<Cow<'static, str>>, pos: Pos) -> Self {
        Self::new(ErrorKind::Format, message, pos)
    }

    /// Creates an overflow error.
    pub fn overflow(message: impl Into<Cow<'static, str>>, pos: Pos) -> Self {
        Self::new(ErrorKind::Overflow, message, pos)
    }

    /// Creates an invalid data error.
    pub fn invalid(message: impl Into<Cow<'static, str>>, pos: Pos) -> Self {
        Self::new(ErrorKind::InvalidData, message, pos)
    }

    /// Creates an end-of-data error.
    pub fn end_of_data(pos: Pos) -> Self {
        Self::new(ErrorKind::EndOfData, "unexpected end of data", pos)
    }

    /// Creates an illegal call error.
    pub fn illegal(message: impl Into<Cow<'static, str>>, pos: Pos) -> Self {
        Self::new(ErrorKind::IllegalCall, message, pos)
    }

    /// Converts an IO error into an error at the given position.
    ///
    /// An unexpected end of file becomes [`ErrorKind::EndOfData`] so that
    /// a truncated stream is reported the same way no matter where the
    /// truncation was noticed.
    pub fn from_io(err: io::Error, pos: Pos) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::end_of_data(pos)
        }
        else {
            Self::new(ErrorKind::Io, err.to_string(), pos)
        }
    }

    /// Returns the category of the error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the position the error was discovered at.
    pub fn pos(&self) -> Pos {
        self.pos
    }

    /// Returns the message of the error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}{}", self.kind, self.message, self.pos)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error({})", self)
    }
}

impl error::Error for Error { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            Error::format("stray comma", Pos::Line(12)).to_string(),
            "format error: stray comma at line 12"
        );
        assert_eq!(
            Error::end_of_data(Pos::Byte(7)).to_string(),
            "unexpected end of data: unexpected end of data at offset 7"
        );
        assert_eq!(
            Error::illegal("end without begin", Pos::None).to_string(),
            "illegal call: end without begin"
        );
    }

    #[test]
    fn from_io() {
        let err = Error::from_io(
            io::Error::new(io::ErrorKind::UnexpectedEof, "eof"),
            Pos::Byte(3)
        );
        assert_eq!(err.kind(), ErrorKind::EndOfData);
        let err = Error::from_io(
            io::Error::new(io::ErrorKind::BrokenPipe, "pipe"),
            Pos::Byte(3)
        );
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
