//! Reference runtime for generated classes
//!
//! A class-file reader, a small stack interpreter for the instruction subset the
//! generator emits, and a disassembler. The interpreter stands in for a JVM in tests
//! and in the `run` command: print builtins are captured into a buffer instead of
//! going to stdout.

mod disasm;
mod interpreter;
mod reader;

pub use disasm::{disasm, disasm_code};
pub use interpreter::{Instance, Interpreter, Value, DEFAULT_STEP_LIMIT};
pub use reader::{read_class, read_class_file};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("class file truncated at byte {at}")]
    Truncated { at: usize },

    #[error("bad magic 0x{0:08x}")]
    BadMagic(u32),

    #[error("malformed Utf8 constant at byte {at}")]
    BadUtf8 { at: usize },

    #[error("unsupported constant tag {tag} at byte {at}")]
    UnsupportedConstant { tag: u8, at: usize },

    #[error("method {0} has no Code attribute")]
    MissingCode(String),

    #[error("no method {name}{descriptor}")]
    NoSuchMethod { name: String, descriptor: String },

    #[error("bad constant pool reference #{0}")]
    BadConstant(u16),

    #[error("{method}@{pc}: unsupported opcode 0x{op:02x}")]
    UnsupportedOpcode { method: String, pc: usize, op: u8 },

    #[error("{method}@{pc}: operand stack underflow")]
    StackUnderflow { method: String, pc: usize },

    #[error("{method}@{pc}: expected {expected} value")]
    TypeMismatch { method: String, pc: usize, expected: &'static str },

    #[error("{method}@{pc}: local {slot} out of range")]
    BadLocal { method: String, pc: usize, slot: usize },

    #[error("{method}@{pc}: fell off the end of the code")]
    FellOffCode { method: String, pc: usize },

    #[error("call to unsupported method {class}.{name}{descriptor}")]
    UnsupportedCall { class: String, name: String, descriptor: String },

    #[error("access to unsupported field {class}.{name}")]
    UnsupportedField { class: String, name: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("null pointer dereference")]
    NullPointer,

    #[error("call depth exceeds {0}")]
    CallDepth(usize),

    #[error("step limit of {0} instructions exceeded")]
    StepLimit(u64),
}
