//! Error types for each layer of the pipeline.

use thiserror::Error;

use crate::strip::SyntaxError;

/// Input bytes are not well-formed UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("source pointer is null")]
    NullSource,
    #[error("invalid UTF-8 sequence of {len} byte(s) at byte offset {offset}")]
    InvalidSequence { offset: usize, len: usize },
    #[error("incomplete UTF-8 sequence at end of input (byte offset {offset})")]
    Incomplete { offset: usize },
}

impl From<std::str::Utf8Error> for EncodingError {
    fn from(err: std::str::Utf8Error) -> Self {
        let offset = err.valid_up_to();
        match err.error_len() {
            Some(len) => Self::InvalidSequence { offset, len },
            None => Self::Incomplete { offset },
        }
    }
}

impl EncodingError {
    /// Byte offset of the first invalid byte, if the input was non-null.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::NullSource => None,
            Self::InvalidSequence { offset, .. } | Self::Incomplete { offset } => Some(*offset),
        }
    }
}

/// An engine declined to produce output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The built-in engine rejected the source.
    #[error("{0}")]
    Syntax(#[from] SyntaxError),
    /// Opaque diagnostic from an external engine.
    #[error("{0}")]
    Message(String),
    /// The engine broke its own contract (panicked, returned non-UTF-8, ...).
    #[error("engine fault: {0}")]
    Fault(String),
}

/// A result buffer did not follow the wire layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("result buffer is empty")]
    Empty,
    #[error("unknown status byte {0:#04x}")]
    UnknownStatus(u8),
    #[error("payload is not null-terminated")]
    MissingTerminator,
    #[error("payload has data after its terminator at byte offset {offset}")]
    TrailingData { offset: usize },
    #[error("output buffer is {actual} bytes, frame needs {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] EncodingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_error_maps_to_offsets() {
        let bad = [b'a', b'b', 0xFF, b'c'];
        let err = EncodingError::from(std::str::from_utf8(&bad).unwrap_err());
        assert_eq!(err, EncodingError::InvalidSequence { offset: 2, len: 1 });
        assert_eq!(err.offset(), Some(2));

        let truncated = [b'a', 0xE2, 0x82];
        let err = EncodingError::from(std::str::from_utf8(&truncated).unwrap_err());
        assert_eq!(err, EncodingError::Incomplete { offset: 1 });
    }

    #[test]
    fn engine_fault_display_is_prefixed() {
        let err = EngineError::Fault("boom".into());
        assert_eq!(err.to_string(), "engine fault: boom");
        assert_eq!(EngineError::Message("x".into()).to_string(), "x");
    }
}
