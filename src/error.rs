//! Error types for rmlines.

use std::io;
use thiserror::Error;

/// Main error type for rmlines operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying IO failure (includes short reads treated as EOF elsewhere).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Stream ended before a required read completed.
    #[error("unexpected end of stream")]
    Eof,

    /// A read expected a specific tag (index + type) and found another.
    #[error("unexpected block: {0}")]
    UnexpectedBlock(String),

    /// A block or sub-block was read past its declared length.
    #[error("block overflow: read past end of block ({0})")]
    BlockOverflow(String),

    /// A value violated a documented domain constraint (e.g. negative length,
    /// reserved byte not zero, min version greater than current version).
    #[error("invalid value: {0}")]
    Value(String),

    /// The CRDT sequence's left/right hints formed a cycle instead of a DAG.
    #[error("cyclic CRDT sequence: {0}")]
    Cyclic(String),

    /// File header did not match the expected literal.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// An id or offset referenced something that does not exist in the file.
    #[error("reference not found: {0}")]
    NotFound(String),
}

/// Result type alias for rmlines operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<io::ErrorKind> for Error {
    fn from(kind: io::ErrorKind) -> Self {
        if kind == io::ErrorKind::UnexpectedEof {
            Error::Eof
        } else {
            Error::Io(io::Error::from(kind))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnexpectedBlock("expected index 2 type Id, got index 3 type Byte1".into());
        assert!(err.to_string().contains("unexpected block"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_eof_from_kind() {
        let err: Error = io::ErrorKind::UnexpectedEof.into();
        assert!(matches!(err, Error::Eof));
    }
}
