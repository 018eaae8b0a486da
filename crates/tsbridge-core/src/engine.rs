//! The swappable transpilation capability.

use crate::error::EngineError;

/// A source-to-source transpiler.
///
/// Implementations report whether they tolerate concurrent calls; a
/// [`TranspilerContext`](crate::TranspilerContext) serializes calls into an
/// engine that does not.
pub trait Engine: Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &str;

    /// Whether `transpile` may run on several threads at once.
    fn is_reentrant(&self) -> bool {
        true
    }

    fn transpile(&self, source: &str) -> Result<String, EngineError>;
}

/// Plain function-pointer capability.
pub type EngineFn = fn(&str) -> Result<String, String>;

/// Wraps an [`EngineFn`] as an [`Engine`].
#[derive(Debug, Clone)]
pub struct FnEngine {
    name: String,
    func: EngineFn,
    reentrant: bool,
}

impl FnEngine {
    #[must_use]
    pub fn new(name: impl Into<String>, func: EngineFn) -> Self {
        Self {
            name: name.into(),
            func,
            reentrant: true,
        }
    }

    /// Mark the wrapped function as unsafe to call concurrently.
    #[must_use]
    pub fn non_reentrant(mut self) -> Self {
        self.reentrant = false;
        self
    }
}

impl Engine for FnEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_reentrant(&self) -> bool {
        self.reentrant
    }

    fn transpile(&self, source: &str) -> Result<String, EngineError> {
        (self.func)(source).map_err(EngineError::Message)
    }
}

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoEngine;

impl Engine for EchoEngine {
    fn name(&self) -> &str {
        "echo"
    }

    fn transpile(&self, source: &str) -> Result<String, EngineError> {
        Ok(source.to_owned())
    }
}
