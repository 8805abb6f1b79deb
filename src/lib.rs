//! jclassgen: typed AST to JVM class file code generator
//!
//! Front ends hand over a fully typed [`ast::Program`]; this crate lowers it into one
//! class file. The generator is the back half of a compiler pipeline: parsing, type
//! checking and optimisation happen elsewhere.
//!
//! ## Architecture
//!
//! - **ast**: the typed tree the generator consumes (borrowed, never modified)
//! - **codegen**: constant pool, local slot allocation, bytecode emission with labels,
//!   method table, class assembly and serialization
//! - **verify**: structural checks on a finished class before it is written
//! - **rt**: class reader, reference interpreter and disassembler
//! - **bin**: command-line interface
//!
//! ## Generation Flow
//!
//! ```text
//! Program → register functions → compile each function → ClassFile → verify → bytes
//!                                   ↓
//!                    SymbolAllocator + Code (labels, stack depth)
//! ```

pub mod ast;
pub mod codegen;
pub mod config;
pub mod error;
pub mod rt;
pub mod verify;

pub use config::Config;
pub use error::{Error, Result};

use std::path::{Path, PathBuf};

/// Generate class bytes for `program` without writing to files.
pub fn compile(program: &ast::Program, config: &Config) -> Result<Vec<u8>> {
    log::debug!("compiling {} in memory", program.name);
    let bytes = codegen::generate_bytecode_inmemory(program, config)?;
    log::debug!("{}: {} bytes", program.name, bytes.len());
    Ok(bytes)
}

/// Generate `program` and write `<name>.class` below `output_dir`.
pub fn compile2file(program: &ast::Program, output_dir: &Path, config: &Config) -> Result<PathBuf> {
    log::debug!("compiling {} into {}", program.name, output_dir.display());
    let path = codegen::generate_bytecode(program, output_dir, config)?;
    log::info!("wrote {}", path.display());
    Ok(path)
}
