//! Marshaling, adapter and engine layers of the tsbridge foreign boundary.
//!
//! The pipeline for one call is:
//!
//! ```text
//! source bytes -> marshal::decode_source -> TranspilerContext::transpile
//!              -> TranspileOutcome -> marshal::ResultFrame -> result bytes
//! ```
//!
//! Everything here is safe Rust. Raw pointers and the result arena live in
//! `tsbridge-abi` and `tsbridge-membrane`.

#![deny(unsafe_code)]

pub mod adapter;
pub mod engine;
pub mod error;
pub mod marshal;
pub mod outcome;
pub mod strip;

pub use adapter::TranspilerContext;
pub use engine::{EchoEngine, Engine, EngineFn, FnEngine};
pub use error::{EncodingError, EngineError, WireError};
pub use outcome::{FailureKind, TranspileOutcome};
pub use strip::{StripEngine, SyntaxError};
