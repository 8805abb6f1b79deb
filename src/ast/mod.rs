//! Typed abstract syntax tree consumed by the code generator.
//!
//! The tree is produced (and owned) by the language front ends and their
//! midend passes; the generator only ever borrows it. Every expression node
//! carries its resolved [`DataType`].

mod nodes;
mod printer;
pub mod samples;

pub use nodes::*;
pub use printer::*;

use std::fmt;

/// Main AST root node: one compilation unit, lowered to one class.
#[derive(Debug, Clone)]
pub struct Program {
    /// Internal class name, e.g. `Hello` or `demo/Hello`.
    pub name: String,
    pub functions: Vec<Function>,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), functions: Vec::new() }
    }

    pub fn with_function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&AstPrinter::new().print(self))
    }
}

/// Width of a source integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }
}

/// Closed set of source data types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Void,
    Bool,
    Char,
    Int { width: IntWidth, unsigned: bool },
    String,
    Ptr(Box<DataType>),
    Struct(String),
    Object(String),
}

impl DataType {
    pub const I8: DataType = DataType::Int { width: IntWidth::W8, unsigned: false };
    pub const I16: DataType = DataType::Int { width: IntWidth::W16, unsigned: false };
    pub const I32: DataType = DataType::Int { width: IntWidth::W32, unsigned: false };
    pub const I64: DataType = DataType::Int { width: IntWidth::W64, unsigned: false };
    pub const U8: DataType = DataType::Int { width: IntWidth::W8, unsigned: true };
    pub const U16: DataType = DataType::Int { width: IntWidth::W16, unsigned: true };
    pub const U32: DataType = DataType::Int { width: IntWidth::W32, unsigned: true };
    pub const U64: DataType = DataType::Int { width: IntWidth::W64, unsigned: true };

    pub fn object(class: impl Into<String>) -> Self {
        DataType::Object(class.into())
    }

    pub fn ptr(base: DataType) -> Self {
        DataType::Ptr(Box::new(base))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, DataType::Void)
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, DataType::Int { unsigned: true, .. })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Void => write!(f, "void"),
            DataType::Bool => write!(f, "bool"),
            DataType::Char => write!(f, "char"),
            DataType::Int { width, unsigned } => {
                write!(f, "{}{}", if *unsigned { "u" } else { "i" }, width.bits())
            }
            DataType::String => write!(f, "string"),
            DataType::Ptr(base) => write!(f, "{}*", base),
            DataType::Struct(name) => write!(f, "struct {}", name),
            DataType::Object(name) => write!(f, "{}", name),
        }
    }
}

/// Visibility attribute some source languages attach to functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attr {
    #[default]
    Public,
    Protected,
    Private,
}
