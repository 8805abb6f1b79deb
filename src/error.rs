use thiserror::Error;

use crate::codegen::error::CodeGenError;
use crate::rt::RuntimeError;
use crate::verify::VerifyError;

/// Result type for jclassgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the jclassgen generator
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Code generation error: {0}")]
    CodeGen(#[from] CodeGenError),

    #[error("ClassFile verify failed: {0}")]
    Verify(#[from] VerifyError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}
