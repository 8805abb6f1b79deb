//! Mapping from source data types to JVM storage categories and opcode families
//!
//! Narrow integers (`i8`, `i16`, `char`, `bool`, `u8`, `u16`) and `i32`/`u32` live on the
//! operand stack as JVM `int`; `i64`/`u64` are JVM `long`. Unsigned narrow types are carried
//! zero-extended, so only the 32 and 64 bit unsigned types need the `*Unsigned` helpers.

use super::error::{CodeGenError, CodeGenResult};
use super::opcodes;
use crate::ast::{DataType, IntWidth};

/// Storage class of a local variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Integer,
    Reference,
}

/// Computational type of a value on the JVM operand stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackKind {
    Int,
    Long,
    Reference,
}

impl StackKind {
    /// Operand stack words taken by one value of this kind.
    pub fn size(self) -> u16 {
        match self {
            StackKind::Long => 2,
            _ => 1,
        }
    }

    pub fn category(self) -> Category {
        match self {
            StackKind::Reference => Category::Reference,
            _ => Category::Integer,
        }
    }

    /// `xload` with an explicit slot operand.
    pub fn load_op(self) -> u8 {
        match self {
            StackKind::Int => opcodes::ILOAD,
            StackKind::Long => opcodes::LLOAD,
            StackKind::Reference => opcodes::ALOAD,
        }
    }

    pub fn store_op(self) -> u8 {
        match self {
            StackKind::Int => opcodes::ISTORE,
            StackKind::Long => opcodes::LSTORE,
            StackKind::Reference => opcodes::ASTORE,
        }
    }

    /// `xload_0` opcode for this kind.
    pub fn load_short(self) -> u8 {
        match self {
            StackKind::Int => opcodes::ILOAD_0,
            StackKind::Long => opcodes::LLOAD_0,
            StackKind::Reference => opcodes::ALOAD_0,
        }
    }

    /// `xstore_0` opcode for this kind.
    pub fn store_short(self) -> u8 {
        match self {
            StackKind::Int => opcodes::ISTORE_0,
            StackKind::Long => opcodes::LSTORE_0,
            StackKind::Reference => opcodes::ASTORE_0,
        }
    }

    pub fn return_op(self) -> u8 {
        match self {
            StackKind::Int => opcodes::IRETURN,
            StackKind::Long => opcodes::LRETURN,
            StackKind::Reference => opcodes::ARETURN,
        }
    }

    pub fn pop_op(self) -> u8 {
        match self {
            StackKind::Long => opcodes::POP2,
            _ => opcodes::POP,
        }
    }
}

/// Stack kind of a value of type `ty`, `None` for `void`.
pub fn stack_kind(ty: &DataType) -> Option<StackKind> {
    match ty {
        DataType::Void => None,
        DataType::Bool | DataType::Char => Some(StackKind::Int),
        DataType::Int { width: IntWidth::W64, .. } => Some(StackKind::Long),
        DataType::Int { .. } => Some(StackKind::Int),
        DataType::String | DataType::Ptr(_) | DataType::Struct(_) | DataType::Object(_) => {
            Some(StackKind::Reference)
        }
    }
}

/// Stack kind of a value that must exist, failing for `void`.
pub fn value_kind(ty: &DataType) -> CodeGenResult<StackKind> {
    stack_kind(ty).ok_or_else(|| CodeGenError::contract("void expression used as a value"))
}

pub fn category(ty: &DataType) -> Option<Category> {
    stack_kind(ty).map(StackKind::category)
}

/// Local variable slots taken by a value of `ty`.
pub fn slot_width(ty: &DataType) -> u16 {
    stack_kind(ty).map_or(0, StackKind::size)
}

/// Whether the integer type needs the unsigned library helpers for
/// division, remainder and ordered comparison.
pub fn needs_unsigned_ops(ty: &DataType) -> bool {
    matches!(ty, DataType::Int { width: IntWidth::W32 | IntWidth::W64, unsigned: true })
}

/// Whether an integer expression of this type is a JVM long.
pub fn is_long(ty: &DataType) -> bool {
    stack_kind(ty) == Some(StackKind::Long)
}

/// How a JVM int is narrowed to a sub-int type before it is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narrowing {
    /// A single conversion instruction (`i2b`, `i2s`, `i2c`).
    Convert(u8),
    /// `and` with a mask, for zero-extended unsigned bytes.
    Mask(i32),
}

pub fn narrowing(ty: &DataType) -> Option<Narrowing> {
    match ty {
        DataType::Int { width: IntWidth::W8, unsigned: false } => Some(Narrowing::Convert(opcodes::I2B)),
        DataType::Int { width: IntWidth::W16, unsigned: false } => Some(Narrowing::Convert(opcodes::I2S)),
        DataType::Int { width: IntWidth::W16, unsigned: true } | DataType::Char => {
            Some(Narrowing::Convert(opcodes::I2C))
        }
        DataType::Int { width: IntWidth::W8, unsigned: true } => Some(Narrowing::Mask(0xff)),
        _ => None,
    }
}

/// Owning class used for `new` and `<init>` when an object-typed local is declared.
pub fn object_class(ty: &DataType) -> Option<&str> {
    match ty {
        DataType::Object(name) | DataType::Struct(name) => Some(name.as_str()),
        _ => None,
    }
}
