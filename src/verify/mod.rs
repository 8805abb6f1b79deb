//! Structural verifier for generated class files
//!
//! Runs after generation and before any bytes are written: constant-pool cross
//! references, this/super classes, method records and the instruction stream of
//! every Code attribute.

mod verifier;
pub mod constant_pool;
pub mod methods;

pub use verifier::{verify, VerifyError, VerifyResult};
