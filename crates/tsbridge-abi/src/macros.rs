//! Helper macros for export generation.
//!
//! `abi_fn!` produces a `#[unsafe(no_mangle)] pub unsafe extern "C" fn` whose
//! body runs under `catch_unwind`. A panic anywhere in the body yields the
//! declared fallback value instead of unwinding into the host.

/// Generate a panic-contained `extern "C"` export.
///
/// ```ignore
/// abi_fn! {
///     /// Doc comment for the export.
///     fn tsbridge_thing(arg: *const c_char) -> c_int, on_unwind: -1;
///     {
///         // body; may use `return`
///     }
/// }
/// ```
macro_rules! abi_fn {
    (
        $(#[$meta:meta])*
        fn $name:ident( $($arg:ident : $argty:ty),* $(,)? ) -> $ret:ty, on_unwind: $fallback:expr;
        $body:block
    ) => {
        $(#[$meta])*
        #[unsafe(no_mangle)]
        #[allow(unused_unsafe)]
        pub unsafe extern "C" fn $name( $($arg : $argty),* ) -> $ret {
            let call = ::std::panic::AssertUnwindSafe(|| -> $ret { unsafe { $body } });
            match ::std::panic::catch_unwind(call) {
                Ok(value) => value,
                Err(_) => $fallback,
            }
        }
    };
}

pub(crate) use abi_fn;
