//! The tagged result of one transpile call.

use std::fmt;

/// Which part of the taxonomy a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Input bytes were rejected before the engine ran.
    Encoding,
    /// The engine rejected the source or faulted.
    Transpile,
}

impl FailureKind {
    /// Prefix carried by every diagnostic of this kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Encoding => "EncodingError",
            Self::Transpile => "TranspileError",
        }
    }

    fn from_diagnostic(diagnostic: &str) -> Option<Self> {
        let (label, _) = diagnostic.split_once(": ")?;
        [Self::Encoding, Self::Transpile]
            .into_iter()
            .find(|kind| kind.label() == label)
    }
}

/// Exactly one of these is produced per call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TranspileOutcome {
    Success { code: String },
    Failure { diagnostic: String },
}

impl TranspileOutcome {
    #[must_use]
    pub fn success(code: impl Into<String>) -> Self {
        Self::Success { code: code.into() }
    }

    /// Build a failure whose diagnostic reads `"<Kind>: <message>"`.
    #[must_use]
    pub fn failure(kind: FailureKind, message: impl fmt::Display) -> Self {
        Self::Failure {
            diagnostic: format!("{}: {message}", kind.label()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Output text on success, diagnostic on failure.
    #[must_use]
    pub fn payload(&self) -> &str {
        match self {
            Self::Success { code } => code,
            Self::Failure { diagnostic } => diagnostic,
        }
    }

    /// Taxonomy of a failure, read back from its diagnostic prefix.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { diagnostic } => FailureKind::from_diagnostic(diagnostic),
        }
    }
}

impl fmt::Display for TranspileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { code } => write!(f, "success ({} bytes)", code.len()),
            Self::Failure { diagnostic } => write!(f, "failure: {diagnostic}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_diagnostics_carry_their_kind() {
        let out = TranspileOutcome::failure(FailureKind::Encoding, "bad byte");
        assert_eq!(out.payload(), "EncodingError: bad byte");
        assert_eq!(out.failure_kind(), Some(FailureKind::Encoding));

        let out = TranspileOutcome::failure(FailureKind::Transpile, "1:3: oops");
        assert_eq!(out.failure_kind(), Some(FailureKind::Transpile));
        assert!(!out.is_success());
    }

    #[test]
    fn success_has_no_kind() {
        let out = TranspileOutcome::success("let a = 1;");
        assert!(out.is_success());
        assert_eq!(out.failure_kind(), None);
        assert_eq!(out.payload(), "let a = 1;");
    }

    #[test]
    fn unknown_prefix_is_not_classified() {
        let out = TranspileOutcome::Failure {
            diagnostic: "Something: else".into(),
        };
        assert_eq!(out.failure_kind(), None);
    }
}
