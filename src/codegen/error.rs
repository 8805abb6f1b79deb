//! Specific error types for code generation operations

use thiserror::Error;

/// Errors that can occur during constant pool operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstPoolError {
    #[error("Constant pool size limit exceeded: current={current}, adding={adding}, max={max}")]
    PoolOverflow { current: usize, adding: usize, max: usize },
    #[error("Invalid constant pool index: {0}")]
    InvalidIndex(u16),
    #[error("Utf8 constant of {length} bytes exceeds the 65535-byte limit")]
    Utf8TooLong { length: usize },
}

/// Errors raised by the per-function bytecode emitter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BytecodeError {
    #[error("Label L{label} was branched to but never placed")]
    UnresolvedBranch { label: u32 },
    #[error("Label L{label} placed twice")]
    LabelAlreadyPlaced { label: u32 },
    #[error("Branch at {at} to {target} does not fit a 16-bit offset")]
    BranchTooFar { at: usize, target: usize },
    #[error("Method code exceeds 65535 bytes ({size} bytes)")]
    CodeTooLarge { size: usize },
    #[error("Operand stack underflow at offset {at}")]
    StackUnderflow { at: usize },
    #[error("Opcode 0x{op:02x} has no fixed stack effect")]
    NoStackEffect { op: u8 },
}

/// Errors raised while lowering a program into a class file
#[derive(Error, Debug)]
pub enum CodeGenError {
    #[error("Unresolved symbol: {name}")]
    UnresolvedSymbol { name: String },
    #[error("Duplicate declaration of '{name}' in function '{function}'")]
    DuplicateDeclaration { name: String, function: String },
    #[error("Constant pool error: {0}")]
    ConstPool(#[from] ConstPoolError),
    #[error("Bytecode error in '{function}': {source}")]
    Bytecode {
        function: String,
        #[source]
        source: BytecodeError,
    },
    #[error("Input contract violation: {message}")]
    TypeContract { message: String },
    #[error("Function '{function}' can complete without returning a value")]
    MissingReturn { function: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodeGenError {
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::UnresolvedSymbol { name: name.into() }
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Self::TypeContract { message: message.into() }
    }

    /// Attach the function name to a bytecode error raised while compiling it.
    pub fn in_function(self, name: &str) -> Self {
        match self {
            Self::Bytecode { function, source } if function.is_empty() => Self::Bytecode {
                function: name.to_string(),
                source,
            },
            other => other,
        }
    }

    /// True when this error is the internal "label never placed" invariant violation.
    pub fn is_unresolved_branch(&self) -> bool {
        matches!(self, Self::Bytecode { source: BytecodeError::UnresolvedBranch { .. }, .. })
    }
}

impl From<BytecodeError> for CodeGenError {
    fn from(source: BytecodeError) -> Self {
        Self::Bytecode { function: String::new(), source }
    }
}

/// Generic result type for code generation operations
pub type CodeGenResult<T> = Result<T, CodeGenError>;

/// Generic result type for constant pool operations
pub type ConstPoolResult<T> = Result<T, ConstPoolError>;

/// Generic result type for bytecode operations
pub type BytecodeResult<T> = Result<T, BytecodeError>;
