//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

/// Errors raised by matrix construction, indexing, counting and filtering.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed construction input: shape or length mismatches.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// An index into a matrix, view, table or count buffer past its end.
    #[error("index {index} out of range (len = {len})")]
    Index { index: usize, len: usize },

    /// An allelic state outside the countable alphabet.
    #[error("state {value} out of range (valid states are 0..{max})")]
    OutOfRange { value: i8, max: usize },

    /// A table whose internal invariants no longer hold.
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed text input.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Checks `index < len`.
    pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
        if index < len {
            Ok(())
        } else {
            Err(Self::Index { index, len })
        }
    }
}
