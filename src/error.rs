use std::fmt;
use std::io;

use serde::{de, ser};

use crate::element::Category;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    /// The underlying sink or source reported an error.
    Io(io::Error),
    /// The sink accepted fewer bytes than were handed to it.
    ShortWrite { expected: usize, actual: usize },
    /// The encoder met a value shape it has no rule for. Holds the type's name.
    Unsupported(&'static str),
    /// Input ended in the middle of a tag or payload.
    Truncated { step: &'static str, expected: usize },
    /// The stream itself is malformed: an unrecognized tag, or a raw that had to be text but
    /// wasn't valid UTF-8.
    BadEncode(String),
    /// The wire category can't populate the requested destination.
    TypeMismatch {
        expected: &'static str,
        found: Category,
    },
    /// A raw, array, or map was longer than the format's 32-bit length prefix allows.
    LengthTooLong { max: usize, actual: usize },
    /// Decoding hit a configured limit, such as nesting depth.
    ParseLimit(String),
    /// Raised from within a `Serialize` or `Deserialize` implementation.
    SerdeFail(String),
}

impl Error {
    pub(crate) fn mismatch(expected: &'static str, found: Category) -> Self {
        Error::TypeMismatch { expected, found }
    }

    /// Convert a read failure, keeping end-of-input distinct from other I/O errors.
    pub(crate) fn read(step: &'static str, expected: usize, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::Truncated { step, expected }
        } else {
            Error::Io(err)
        }
    }

    /// True if this error came from running out of input.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Error::Truncated { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => write!(f, "I/O failure: {}", err),
            Error::ShortWrite { expected, actual } => write!(
                f,
                "Short write: sink took {} of {} bytes",
                actual, expected
            ),
            Error::Unsupported(name) => write!(f, "Unsupported type {}", name),
            Error::Truncated { step, expected } => write!(
                f,
                "Input ended early: needed {} more bytes on step [{}]",
                expected, step
            ),
            Error::BadEncode(ref err) => write!(f, "Malformed data: {}", err),
            Error::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            Error::LengthTooLong { max, actual } => write!(
                f,
                "Data too long: was {} items, maximum allowed is {}",
                actual, max
            ),
            Error::ParseLimit(ref err) => write!(f, "Hit parsing limit: {}", err),
            Error::SerdeFail(ref msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl std::convert::From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}
