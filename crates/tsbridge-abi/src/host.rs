//! Safe Rust view of a result handle, for Rust hosts and the harness.

use std::ffi::{CStr, c_char, c_int};
use std::ptr::NonNull;

use tsbridge_core::marshal::decode_result;
use tsbridge_core::{TranspileOutcome, WireError};

use crate::context_abi::TsbridgeContext;
use crate::membrane_state::arena;
use crate::release_abi::{TSBRIDGE_RELEASE_NULL, tsbridge_release_result};
use crate::transpile_abi::{tsbridge_transpile, tsbridge_transpile_with};

/// A live result buffer, released on drop.
#[derive(Debug)]
pub struct ResultHandle {
    ptr: NonNull<c_char>,
}

// SAFETY: the buffer is exclusively owned by this handle and the arena is
// thread-safe, so the handle may move to and be read from other threads.
unsafe impl Send for ResultHandle {}
unsafe impl Sync for ResultHandle {}

impl ResultHandle {
    /// Transpile through the default context. `None` means the result buffer
    /// could not be allocated.
    #[must_use]
    pub fn transpile(source: &CStr) -> Option<Self> {
        // SAFETY: `source` is a valid C string for the whole call.
        let raw = unsafe { tsbridge_transpile(source.as_ptr()) };
        NonNull::new(raw).map(|ptr| Self { ptr })
    }

    /// Transpile through an explicit context.
    #[must_use]
    pub fn transpile_with(ctx: &TsbridgeContext, source: &CStr) -> Option<Self> {
        // SAFETY: both pointers come from live references.
        let raw = unsafe { tsbridge_transpile_with(ctx, source.as_ptr()) };
        NonNull::new(raw).map(|ptr| Self { ptr })
    }

    /// The raw handle, as a C host would see it.
    #[must_use]
    pub fn as_ptr(&self) -> *const c_char {
        self.ptr.as_ptr()
    }

    /// The whole frame: status byte, payload and terminator.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        let len = arena()
            .payload_len(self.ptr.as_ptr() as usize)
            .unwrap_or_default();
        // SAFETY: the arena reports `len` bytes for this live buffer, and it
        // stays live until `self` is dropped.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().cast::<u8>(), len) }
    }

    #[must_use]
    pub fn status(&self) -> u8 {
        self.bytes().first().copied().unwrap_or_default()
    }

    /// Decode the frame back into an outcome.
    pub fn outcome(&self) -> Result<TranspileOutcome, WireError> {
        decode_result(self.bytes())
    }

    /// Release now and report the release code.
    pub fn release(self) -> c_int {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        // SAFETY: ownership was held by `self`, which will not release again.
        unsafe { tsbridge_release_result(ptr) }
    }
}

impl Drop for ResultHandle {
    fn drop(&mut self) {
        // SAFETY: the handle owns the buffer and is dropped once.
        let code = unsafe { tsbridge_release_result(self.ptr.as_ptr()) };
        debug_assert!(code == 0 || code == TSBRIDGE_RELEASE_NULL, "release code {code}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_decodes_and_releases() {
        let handle = ResultHandle::transpile(c"let y: string = 5;").expect("allocated");
        assert_eq!(handle.status(), 0);
        assert_eq!(handle.outcome(), Ok(TranspileOutcome::success("let y = 5;")));
        assert_eq!(handle.bytes().len(), "let y = 5;".len() + 2);
        assert_eq!(handle.release(), 0);
    }
}
