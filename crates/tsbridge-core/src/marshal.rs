//! Wire encoding between host bytes and [`TranspileOutcome`].
//!
//! Result layout:
//!
//! ```text
//! [status u8][payload: UTF-8, no interior NUL][0x00]
//! ```
//!
//! `status` is [`STATUS_SUCCESS`] or [`STATUS_FAILURE`]. Because the payload
//! is null-terminated it cannot carry a NUL byte: a success payload with one
//! becomes a `TranspileError` failure naming the offset, and a NUL inside a
//! diagnostic is rendered as the two characters `\0`.

use std::borrow::Cow;

use crate::error::{EncodingError, WireError};
use crate::outcome::{FailureKind, TranspileOutcome};

pub const STATUS_SUCCESS: u8 = 0;
pub const STATUS_FAILURE: u8 = 1;

/// Validate host bytes as UTF-8 without copying.
pub fn decode_source(bytes: &[u8]) -> Result<&str, EncodingError> {
    std::str::from_utf8(bytes).map_err(EncodingError::from)
}

/// An outcome ready to be written into a result buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFrame<'a> {
    status: u8,
    payload: Cow<'a, str>,
}

impl<'a> ResultFrame<'a> {
    #[must_use]
    pub fn from_outcome(outcome: &'a TranspileOutcome) -> Self {
        match outcome {
            TranspileOutcome::Success { code } => match code.find('\0') {
                None => Self {
                    status: STATUS_SUCCESS,
                    payload: Cow::Borrowed(code),
                },
                Some(offset) => Self {
                    status: STATUS_FAILURE,
                    payload: Cow::Owned(format!(
                        "{}: engine output contains a NUL byte at offset {offset}",
                        FailureKind::Transpile.label()
                    )),
                },
            },
            TranspileOutcome::Failure { diagnostic } => Self {
                status: STATUS_FAILURE,
                payload: if diagnostic.contains('\0') {
                    Cow::Owned(diagnostic.replace('\0', "\\0"))
                } else {
                    Cow::Borrowed(diagnostic)
                },
            },
        }
    }

    #[must_use]
    pub fn status(&self) -> u8 {
        self.status
    }

    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Total encoded size: status byte, payload, terminator.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.payload.len() + 2
    }

    /// Write the frame into `out`, which must be exactly
    /// [`encoded_len`](Self::encoded_len) bytes.
    pub fn write_to(&self, out: &mut [u8]) -> Result<(), WireError> {
        let n = self.payload.len();
        if out.len() != n + 2 {
            return Err(WireError::SizeMismatch {
                expected: n + 2,
                actual: out.len(),
            });
        }
        out[0] = self.status;
        out[1..=n].copy_from_slice(self.payload.as_bytes());
        out[n + 1] = 0;
        Ok(())
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.push(self.status);
        out.extend_from_slice(self.payload.as_bytes());
        out.push(0);
        out
    }
}

/// Encoded size of an outcome.
#[must_use]
pub fn encoded_len(outcome: &TranspileOutcome) -> usize {
    ResultFrame::from_outcome(outcome).encoded_len()
}

/// Write an outcome into a buffer of exactly [`encoded_len`] bytes.
pub fn write_encoded(outcome: &TranspileOutcome, out: &mut [u8]) -> Result<(), WireError> {
    ResultFrame::from_outcome(outcome).write_to(out)
}

/// Encode an outcome into an owned byte vector.
#[must_use]
pub fn encode(outcome: &TranspileOutcome) -> Vec<u8> {
    ResultFrame::from_outcome(outcome).to_vec()
}

/// Parse a result buffer (status byte through terminator, inclusive).
pub fn decode_result(bytes: &[u8]) -> Result<TranspileOutcome, WireError> {
    let (&status, rest) = bytes.split_first().ok_or(WireError::Empty)?;
    if status != STATUS_SUCCESS && status != STATUS_FAILURE {
        return Err(WireError::UnknownStatus(status));
    }
    let nul = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(WireError::MissingTerminator)?;
    if nul + 1 != rest.len() {
        return Err(WireError::TrailingData { offset: nul + 2 });
    }
    let text = decode_source(&rest[..nul])?.to_owned();
    Ok(if status == STATUS_SUCCESS {
        TranspileOutcome::Success { code: text }
    } else {
        TranspileOutcome::Failure { diagnostic: text }
    })
}
