// Every export takes raw pointers from C hosts and documents its contract in
// include/tsbridge.h; per-function safety sections would repeat the header.
#![allow(clippy::missing_safety_doc)]
//! # tsbridge
//!
//! `extern "C"` boundary for the tsbridge transpiler. Built as a `cdylib`
//! (`libtsbridge.so`) whose only exported symbols are `tsbridge_*`.
//!
//! # Architecture
//!
//! ```text
//! C host -> export (this crate) -> TranspilerContext (tsbridge-core)
//!        -> ResultFrame -> ResultArena (tsbridge-membrane) -> handle
//! ```
//!
//! Every export runs under `catch_unwind`; no panic crosses into the host.
//! Result buffers are allocated by the arena and must be handed back through
//! `tsbridge_release_result`, never to the host's `free`.

#[macro_use]
mod macros;

mod membrane_state;

pub mod context_abi;
pub mod host;
pub mod release_abi;
pub mod stats_abi;
pub mod transpile_abi;

pub use context_abi::{TsbridgeContext, TsbridgeEngineCallback, TsbridgeEngineRelease};
pub use host::ResultHandle;
pub use stats_abi::{TSBRIDGE_ABI_VERSION, TsbridgeStats};
