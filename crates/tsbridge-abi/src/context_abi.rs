//! Explicit transpiler contexts.
//!
//! A context pairs one engine with its concurrency guard. Hosts that never
//! create one get the lazily built default context; hosts that want their
//! own engine register it as a callback.

use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::ptr;

use tsbridge_core::{EncodingError, Engine, EngineError, TranspilerContext};

/// Host engine entry point.
///
/// Receives the host's `user_data`, the decoded source as a NUL-terminated
/// string, and a flag to set non-zero when the returned text is a diagnostic
/// rather than output. Returns a NUL-terminated buffer, or null on an
/// internal failure.
pub type TsbridgeEngineCallback =
    unsafe extern "C" fn(user_data: *mut c_void, source: *const c_char, failed: *mut c_int) -> *mut c_char;

/// Releases a buffer returned by a [`TsbridgeEngineCallback`] with the host's
/// allocator.
pub type TsbridgeEngineRelease = unsafe extern "C" fn(user_data: *mut c_void, buffer: *mut c_char);

/// Opaque context handle.
#[derive(Debug)]
pub struct TsbridgeContext {
    inner: TranspilerContext,
}

impl TsbridgeContext {
    #[must_use]
    pub fn context(&self) -> &TranspilerContext {
        &self.inner
    }
}

impl From<TranspilerContext> for TsbridgeContext {
    fn from(inner: TranspilerContext) -> Self {
        Self { inner }
    }
}

/// An engine implemented by the host.
struct ForeignEngine {
    callback: TsbridgeEngineCallback,
    release: Option<TsbridgeEngineRelease>,
    user_data: *mut c_void,
    reentrant: bool,
}

// SAFETY: registering a callback is the host's promise that `user_data` may
// be used from any thread. Concurrent use is further limited to engines
// registered as reentrant; the others run under the context's lock.
unsafe impl Send for ForeignEngine {}
unsafe impl Sync for ForeignEngine {}

impl Engine for ForeignEngine {
    fn name(&self) -> &str {
        "foreign"
    }

    fn is_reentrant(&self) -> bool {
        self.reentrant
    }

    fn transpile(&self, source: &str) -> Result<String, EngineError> {
        let source = CString::new(source).map_err(|err| {
            EngineError::Message(format!(
                "source contains a NUL byte at offset {}",
                err.nul_position()
            ))
        })?;

        let mut failed: c_int = 0;
        // SAFETY: the callback was registered by the host for exactly this use;
        // `source` and `failed` outlive the call.
        let out = unsafe { (self.callback)(self.user_data, source.as_ptr(), &mut failed) };
        if out.is_null() {
            return Err(EngineError::Fault("callback returned a null buffer".into()));
        }

        // SAFETY: non-null callback output is NUL-terminated by contract and
        // stays valid until handed to `release`.
        let text = match unsafe { CStr::from_ptr(out) }.to_str() {
            Ok(text) => Ok(text.to_owned()),
            Err(err) => Err(EngineError::Fault(format!(
                "callback output: {}",
                EncodingError::from(err)
            ))),
        };
        if let Some(release) = self.release {
            // SAFETY: `out` came from this callback and is released once.
            unsafe { release(self.user_data, out) };
        }

        let text = text?;
        if failed != 0 {
            Err(EngineError::Message(text))
        } else {
            Ok(text)
        }
    }
}

fn into_handle(inner: TranspilerContext) -> *mut TsbridgeContext {
    Box::into_raw(Box::new(TsbridgeContext::from(inner)))
}

abi_fn! {
    /// Create a context backed by the built-in swc engine.
    fn tsbridge_context_new() -> *mut TsbridgeContext, on_unwind: ptr::null_mut();
    {
        into_handle(TranspilerContext::default())
    }
}

abi_fn! {
    /// Create a context backed by a host callback. A non-zero `reentrant`
    /// lets calls run concurrently; otherwise they are serialized. Returns
    /// null when `callback` is null.
    fn tsbridge_context_new_foreign(
        callback: Option<TsbridgeEngineCallback>,
        release: Option<TsbridgeEngineRelease>,
        user_data: *mut c_void,
        reentrant: c_int,
    ) -> *mut TsbridgeContext, on_unwind: ptr::null_mut();
    {
        let Some(callback) = callback else {
            return ptr::null_mut();
        };
        into_handle(TranspilerContext::new(ForeignEngine {
            callback,
            release,
            user_data,
            reentrant: reentrant != 0,
        }))
    }
}

abi_fn! {
    /// Destroy a context. Null is ignored. Result buffers produced through
    /// the context stay valid and are still released with
    /// `tsbridge_release_result`.
    fn tsbridge_context_free(ctx: *mut TsbridgeContext) -> (), on_unwind: ();
    {
        if !ctx.is_null() {
            // SAFETY: non-null handles come from `into_handle` and are freed once.
            drop(Box::from_raw(ctx));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsbridge_core::TranspileOutcome;

    unsafe extern "C" fn shout(
        _user_data: *mut c_void,
        source: *const c_char,
        _failed: *mut c_int,
    ) -> *mut c_char {
        let text = unsafe { CStr::from_ptr(source) }.to_string_lossy().to_uppercase();
        CString::new(text).map_or(ptr::null_mut(), CString::into_raw)
    }

    unsafe extern "C" fn free_cstring(_user_data: *mut c_void, buffer: *mut c_char) {
        drop(unsafe { CString::from_raw(buffer) });
    }

    #[test]
    fn foreign_engine_runs_the_callback() {
        let engine = ForeignEngine {
            callback: shout,
            release: Some(free_cstring),
            user_data: ptr::null_mut(),
            reentrant: true,
        };
        let ctx = TranspilerContext::new(engine);
        assert_eq!(ctx.transpile("abc"), TranspileOutcome::success("ABC"));
    }

    #[test]
    fn interior_nul_never_reaches_the_callback() {
        let engine = ForeignEngine {
            callback: shout,
            release: Some(free_cstring),
            user_data: ptr::null_mut(),
            reentrant: false,
        };
        let ctx = TranspilerContext::new(engine);
        assert!(ctx.is_serialized());
        assert_eq!(
            ctx.transpile("a\0b").payload(),
            "TranspileError: source contains a NUL byte at offset 1"
        );
    }

    #[test]
    fn null_callback_creates_nothing() {
        let ctx = unsafe { tsbridge_context_new_foreign(None, None, ptr::null_mut(), 1) };
        assert!(ctx.is_null());
        unsafe { tsbridge_context_free(ctx) };
    }
}
