//! Transpile entry points.
//!
//! Both exports take a NUL-terminated source string that stays owned by the
//! host and return a result buffer owned by the boundary:
//!
//! ```text
//! [status u8][payload][0x00]      status: 0 = Success, 1 = Failure
//! ```
//!
//! Decoding and engine failures come back as Failure buffers. Null is
//! returned only when the result buffer itself cannot be allocated.

use std::ffi::{CStr, c_char};
use std::ptr;

use tsbridge_core::marshal::ResultFrame;
use tsbridge_core::{TranspileOutcome, TranspilerContext};

use crate::context_abi::TsbridgeContext;
use crate::membrane_state::arena;

abi_fn! {
    /// Transpile with the process-wide default context.
    fn tsbridge_transpile(source: *const c_char) -> *mut c_char, on_unwind: ptr::null_mut();
    {
        transpile_into_arena(TranspilerContext::global(), source)
    }
}

abi_fn! {
    /// Transpile with an explicit context. A null `ctx` selects the default
    /// context.
    fn tsbridge_transpile_with(
        ctx: *const TsbridgeContext,
        source: *const c_char,
    ) -> *mut c_char, on_unwind: ptr::null_mut();
    {
        let context = match ctx.as_ref() {
            Some(ctx) => ctx.context(),
            None => TranspilerContext::global(),
        };
        transpile_into_arena(context, source)
    }
}

/// # Safety
///
/// `source` is null or points to a NUL-terminated string that stays valid
/// and unmodified for the duration of the call.
unsafe fn transpile_into_arena(context: &TranspilerContext, source: *const c_char) -> *mut c_char {
    let outcome = if source.is_null() {
        context.run_missing()
    } else {
        // SAFETY: non-null and NUL-terminated per the caller contract.
        let bytes = unsafe { CStr::from_ptr(source) }.to_bytes();
        context.run(bytes)
    };
    publish(&outcome)
}

/// Copy an outcome into a fresh arena buffer.
pub(crate) fn publish(outcome: &TranspileOutcome) -> *mut c_char {
    let frame = ResultFrame::from_outcome(outcome);
    arena()
        .allocate_with(frame.encoded_len(), |buf| {
            let written = frame.write_to(buf);
            debug_assert!(written.is_ok(), "frame length drifted: {written:?}");
        })
        .map_or(ptr::null_mut(), |user| user.as_ptr().cast::<c_char>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release_abi::tsbridge_release_result;

    #[test]
    fn publish_writes_the_framed_outcome() {
        let handle = publish(&TranspileOutcome::success("let a = 1;"));
        assert!(!handle.is_null());
        // SAFETY: the handle is live and NUL-terminated after its status byte.
        let (status, text) = unsafe { (*handle.cast::<u8>(), CStr::from_ptr(handle.add(1))) };
        assert_eq!(status, 0);
        assert_eq!(text.to_bytes(), b"let a = 1;");
        assert_eq!(unsafe { tsbridge_release_result(handle) }, 0);
    }

    #[test]
    fn null_source_is_a_releasable_failure() {
        let handle = unsafe { tsbridge_transpile(ptr::null()) };
        assert!(!handle.is_null());
        let status = unsafe { *handle.cast::<u8>() };
        let text = unsafe { CStr::from_ptr(handle.add(1)) };
        assert_eq!(status, 1);
        assert_eq!(text.to_str(), Ok("EncodingError: source pointer is null"));
        assert_eq!(unsafe { tsbridge_release_result(handle) }, 0);
    }
}
