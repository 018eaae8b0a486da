//! Transpiler context: one engine plus its concurrency guard.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once, OnceLock};

use parking_lot::Mutex;
use tsbridge_membrane::CallMetrics;
use tsbridge_membrane::metrics::call_metrics;

use crate::engine::Engine;
use crate::error::{EncodingError, EngineError};
use crate::marshal::{self, ResultFrame};
use crate::outcome::{FailureKind, TranspileOutcome};
use crate::strip::StripEngine;

thread_local! {
    static IN_ENGINE: Cell<bool> = const { Cell::new(false) };
}

/// Chain a panic hook that stays silent for panics raised inside an engine
/// call. Those are reported through the outcome, never on the host's stderr.
fn install_quiet_hook() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !IN_ENGINE.with(Cell::get) {
                previous(info);
            }
        }));
    });
}

/// Marks the current thread as inside an engine call until dropped.
struct EngineScope {
    outer: bool,
}

impl EngineScope {
    fn enter() -> Self {
        install_quiet_hook();
        Self {
            outer: IN_ENGINE.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for EngineScope {
    fn drop(&mut self) {
        IN_ENGINE.with(|flag| flag.set(self.outer));
    }
}

/// An explicit transpiler handle.
///
/// Calls into a non-reentrant engine take `guard` for their full duration.
/// Engine errors and engine panics are both turned into
/// [`TranspileOutcome::Failure`]; nothing unwinds out of [`transpile`].
///
/// [`transpile`]: TranspilerContext::transpile
pub struct TranspilerContext {
    engine: Arc<dyn Engine>,
    guard: Option<Mutex<()>>,
}

impl std::fmt::Debug for TranspilerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspilerContext")
            .field("engine", &self.engine.name())
            .field("serialized", &self.is_serialized())
            .finish()
    }
}

impl Default for TranspilerContext {
    fn default() -> Self {
        Self::new(StripEngine::new())
    }
}

impl TranspilerContext {
    #[must_use]
    pub fn new(engine: impl Engine + 'static) -> Self {
        Self::from_arc(Arc::new(engine))
    }

    #[must_use]
    pub fn from_arc(engine: Arc<dyn Engine>) -> Self {
        let guard = (!engine.is_reentrant()).then(|| Mutex::new(()));
        Self { engine, guard }
    }

    /// Process-wide default context backed by [`StripEngine`].
    pub fn global() -> &'static TranspilerContext {
        static GLOBAL: OnceLock<TranspilerContext> = OnceLock::new();
        GLOBAL.get_or_init(TranspilerContext::default)
    }

    #[must_use]
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Whether calls through this context are serialized.
    #[must_use]
    pub fn is_serialized(&self) -> bool {
        self.guard.is_some()
    }

    /// Run the engine on already-decoded text.
    pub fn transpile(&self, source: &str) -> TranspileOutcome {
        let metrics = call_metrics();
        CallMetrics::inc(&metrics.calls);

        let _held = self.guard.as_ref().map(|guard| {
            CallMetrics::inc(&metrics.serialized_calls);
            guard.lock()
        });

        let scope = EngineScope::enter();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.engine.transpile(source)));
        drop(scope);
        match result {
            Ok(Ok(code)) => {
                CallMetrics::inc(&metrics.successes);
                TranspileOutcome::Success { code }
            }
            Ok(Err(err)) => {
                if matches!(err, EngineError::Fault(_)) {
                    CallMetrics::inc(&metrics.engine_faults);
                }
                CallMetrics::inc(&metrics.transpile_failures);
                TranspileOutcome::failure(FailureKind::Transpile, err)
            }
            Err(payload) => {
                CallMetrics::inc(&metrics.engine_faults);
                CallMetrics::inc(&metrics.transpile_failures);
                TranspileOutcome::failure(
                    FailureKind::Transpile,
                    format_args!("engine fault: {}", panic_message(payload.as_ref())),
                )
            }
        }
    }

    /// Decode host bytes, then transpile.
    pub fn run(&self, source: &[u8]) -> TranspileOutcome {
        match marshal::decode_source(source) {
            Ok(text) => self.transpile(text),
            Err(err) => encoding_failure(err),
        }
    }

    /// Outcome for a host that passed no source at all.
    pub fn run_missing(&self) -> TranspileOutcome {
        encoding_failure(EncodingError::NullSource)
    }

    /// Decode, transpile and encode into an owned result frame.
    pub fn run_encoded(&self, source: &[u8]) -> Vec<u8> {
        ResultFrame::from_outcome(&self.run(source)).to_vec()
    }
}

fn encoding_failure(err: EncodingError) -> TranspileOutcome {
    let metrics = call_metrics();
    CallMetrics::inc(&metrics.calls);
    CallMetrics::inc(&metrics.encoding_failures);
    TranspileOutcome::failure(FailureKind::Encoding, err)
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EchoEngine, FnEngine};

    struct Panicking;

    impl Engine for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn transpile(&self, _source: &str) -> Result<String, EngineError> {
            panic!("parser state corrupted");
        }
    }

    fn reject(_: &str) -> Result<String, String> {
        Err("unexpected token".into())
    }

    #[test]
    fn echo_context_round_trips() {
        let ctx = TranspilerContext::new(EchoEngine);
        assert_eq!(ctx.transpile("abc"), TranspileOutcome::success("abc"));
        assert!(!ctx.is_serialized());
        assert_eq!(ctx.engine_name(), "echo");
    }

    #[test]
    fn engine_errors_become_transpile_failures() {
        let ctx = TranspilerContext::new(FnEngine::new("reject", reject));
        let out = ctx.transpile("x");
        assert_eq!(out.payload(), "TranspileError: unexpected token");
    }

    #[test]
    fn engine_panics_are_contained() {
        let ctx = TranspilerContext::new(Panicking);
        let out = ctx.transpile("x");
        assert_eq!(out.failure_kind(), Some(FailureKind::Transpile));
        assert_eq!(
            out.payload(),
            "TranspileError: engine fault: parser state corrupted"
        );
    }

    #[test]
    fn engine_scope_restores_the_outer_flag() {
        assert!(!IN_ENGINE.with(Cell::get));
        {
            let _outer = EngineScope::enter();
            {
                let _inner = EngineScope::enter();
                assert!(IN_ENGINE.with(Cell::get));
            }
            assert!(IN_ENGINE.with(Cell::get));
        }
        assert!(!IN_ENGINE.with(Cell::get));
    }

    /// Reports whether the panic hook would stay quiet for this call.
    struct QuietReport;

    impl Engine for QuietReport {
        fn name(&self) -> &str {
            "quiet-report"
        }

        fn transpile(&self, _source: &str) -> Result<String, EngineError> {
            Ok(IN_ENGINE.with(Cell::get).to_string())
        }
    }

    #[test]
    fn engine_calls_run_with_the_hook_silenced() {
        let ctx = TranspilerContext::new(QuietReport);
        assert_eq!(ctx.transpile("x"), TranspileOutcome::success("true"));
        assert!(!IN_ENGINE.with(Cell::get));

        assert!(TranspilerContext::new(Panicking).transpile("x").failure_kind().is_some());
        assert!(!IN_ENGINE.with(Cell::get));
    }

    #[test]
    fn invalid_utf8_is_an_encoding_failure() {
        let ctx = TranspilerContext::new(EchoEngine);
        let out = ctx.run(b"ok\xFFno");
        assert_eq!(out.failure_kind(), Some(FailureKind::Encoding));
        assert!(out.payload().contains("byte offset 2"), "{}", out.payload());
    }

    #[test]
    fn missing_source_is_an_encoding_failure() {
        let ctx = TranspilerContext::new(EchoEngine);
        assert_eq!(
            ctx.run_missing().payload(),
            "EncodingError: source pointer is null"
        );
    }

    #[test]
    fn non_reentrant_engines_are_serialized() {
        let ctx = TranspilerContext::new(FnEngine::new("reject", reject).non_reentrant());
        assert!(ctx.is_serialized());
    }

    #[test]
    fn run_encoded_frames_the_outcome() {
        let ctx = TranspilerContext::new(EchoEngine);
        assert_eq!(ctx.run_encoded(b"hi"), b"\x00hi\x00");
    }

    #[test]
    fn global_context_uses_the_stripper() {
        let ctx = TranspilerContext::global();
        assert_eq!(ctx.engine_name(), "strip");
        assert_eq!(
            ctx.transpile("const x: number = 1;"),
            TranspileOutcome::success("const x = 1;")
        );
    }
}
