//! Release entry point and handle inspection.
//!
//! Result buffers come from the boundary's allocator and must go back to it.
//! The arena classifies every handle before touching memory, so a repeated or
//! foreign release is reported instead of corrupting the heap.

use std::ffi::{c_char, c_int};

use tsbridge_membrane::ReleaseResult;

use crate::membrane_state::arena;

/// The buffer was released.
pub const TSBRIDGE_RELEASED: c_int = 0;
/// Null handle; nothing was done.
pub const TSBRIDGE_RELEASE_NULL: c_int = 1;
/// The handle had already been released.
pub const TSBRIDGE_RELEASE_DOUBLE: c_int = -1;
/// The handle was not produced by this boundary.
pub const TSBRIDGE_RELEASE_FOREIGN: c_int = -2;
/// Released, but the host had written past the end of the buffer.
pub const TSBRIDGE_RELEASE_CORRUPTED: c_int = -3;
/// The release itself failed internally.
pub const TSBRIDGE_RELEASE_FAULT: c_int = -4;

/// Status code reported to the host for a release classification.
#[must_use]
pub const fn release_code(result: ReleaseResult) -> c_int {
    match result {
        ReleaseResult::Released => TSBRIDGE_RELEASED,
        ReleaseResult::Null => TSBRIDGE_RELEASE_NULL,
        ReleaseResult::DoubleRelease => TSBRIDGE_RELEASE_DOUBLE,
        ReleaseResult::ForeignPointer => TSBRIDGE_RELEASE_FOREIGN,
        ReleaseResult::ReleasedWithCorruption => TSBRIDGE_RELEASE_CORRUPTED,
    }
}

abi_fn! {
    /// Return a result buffer to the boundary. Every non-null handle must be
    /// passed here exactly once.
    fn tsbridge_release_result(handle: *mut c_char) -> c_int, on_unwind: TSBRIDGE_RELEASE_FAULT;
    {
        release_code(arena().release(handle.cast::<u8>()))
    }
}

abi_fn! {
    /// Byte length of a live result's payload, excluding the status byte and
    /// the terminator. `usize::MAX` for null, released or foreign handles.
    fn tsbridge_result_len(handle: *const c_char) -> usize, on_unwind: usize::MAX;
    {
        arena()
            .payload_len(handle as usize)
            .map_or(usize::MAX, |framed| framed.saturating_sub(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_codes_are_distinct() {
        let codes = [
            ReleaseResult::Released,
            ReleaseResult::Null,
            ReleaseResult::DoubleRelease,
            ReleaseResult::ForeignPointer,
            ReleaseResult::ReleasedWithCorruption,
        ]
        .map(release_code);
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
            assert_ne!(*a, TSBRIDGE_RELEASE_FAULT);
        }
    }

    #[test]
    fn unknown_handles_have_no_length() {
        let local = 0u8;
        let foreign = (&raw const local).cast::<c_char>();
        assert_eq!(unsafe { tsbridge_result_len(foreign) }, usize::MAX);
        assert_eq!(unsafe { tsbridge_result_len(std::ptr::null()) }, usize::MAX);
    }
}
