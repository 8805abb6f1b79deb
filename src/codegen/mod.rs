//! Code generation module
//!
//! This module lowers a typed [`Program`] into a JVM class file: constant pool,
//! per-method bytecode with labels, and the serialized `.class` bytes.

pub mod attribute;
pub mod class;
pub mod code;
pub mod constpool;
pub mod defs;
pub mod descriptor;
pub mod error;
pub mod gen;
pub mod method;
pub mod opcodes;
pub mod pending_jumps;
pub mod symtab;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use class::ClassFile;
pub use code::{BytecodeEmitter, Code, FinishedCode};
pub use constpool::{Constant, ConstantPool};
pub use error::{BytecodeError, CodeGenError, CodeGenResult, ConstPoolError};
pub use gen::CodeGenerator;
pub use method::{MethodEntry, MethodInfo, MethodTable, Receiver};
pub use pending_jumps::Label;
pub use symtab::{LocalSlot, SymbolAllocator};
pub use writer::{class_file_to_bytes, write_class_file, ClassfileWritable};

use crate::ast::Program;
use crate::config::Config;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Build the class file for `program`, verified when the config asks for it.
pub fn generate_class(program: &Program, config: &Config) -> Result<ClassFile> {
    let class_file = CodeGenerator::new(program, config).generate()?;
    if config.verify_output {
        crate::verify::verify(&class_file)?;
    }
    Ok(class_file)
}

/// Generate the class bytes for `program` without touching the filesystem.
pub fn generate_bytecode_inmemory(program: &Program, config: &Config) -> Result<Vec<u8>> {
    let class_file = generate_class(program, config)?;
    Ok(class_file_to_bytes(&class_file))
}

/// Generate `program` and write it below `output_dir`, returning the class file path.
pub fn generate_bytecode(program: &Program, output_dir: &Path, config: &Config) -> Result<PathBuf> {
    let class_file = generate_class(program, config)?;
    Ok(write_class_file(output_dir, &class_file)?)
}
