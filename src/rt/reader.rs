//! Parse class file bytes back into a [`ClassFile`]
//!
//! Accepts what the generator writes plus anything structurally compatible: the
//! constant-pool kinds the generator uses, methods that carry a `Code` attribute,
//! and skipped interfaces, fields and other attributes.

use super::RuntimeError;
use crate::codegen::attribute::CodeAttribute;
use crate::codegen::class::ClassFile;
use crate::codegen::constpool::{constant_tags::*, from_modified_utf8, Constant, ConstantPool};
use crate::codegen::defs::{CODE_ATTRIBUTE_NAME, MAGIC};
use crate::codegen::method::MethodInfo;
use std::path::Path;

struct ByteReader<'b> {
    bytes: &'b [u8],
    pos: usize,
}

impl<'b> ByteReader<'b> {
    fn take(&mut self, n: usize) -> Result<&'b [u8], RuntimeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(RuntimeError::Truncated { at: self.pos })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, RuntimeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, RuntimeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, RuntimeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn skip_attributes(&mut self) -> Result<(), RuntimeError> {
        let count = self.u16()?;
        for _ in 0..count {
            self.u16()?;
            let len = self.u32()? as usize;
            self.take(len)?;
        }
        Ok(())
    }
}

/// Read one class from `bytes`.
pub fn read_class(bytes: &[u8]) -> Result<ClassFile, RuntimeError> {
    let mut r = ByteReader { bytes, pos: 0 };
    let magic = r.u32()?;
    if magic != MAGIC {
        return Err(RuntimeError::BadMagic(magic));
    }
    let mut class = ClassFile::new();
    class.minor_version = r.u16()?;
    class.major_version = r.u16()?;
    class.constant_pool = read_constant_pool(&mut r)?;
    class.access_flags = r.u16()?;
    class.this_class = r.u16()?;
    class.super_class = r.u16()?;

    let interfaces = r.u16()? as usize;
    r.take(interfaces * 2)?;
    let fields = r.u16()?;
    for _ in 0..fields {
        r.take(6)?;
        r.skip_attributes()?;
    }

    let methods = r.u16()?;
    for _ in 0..methods {
        let method = read_method(&mut r, &class.constant_pool)?;
        class.methods.push(method);
    }
    r.skip_attributes()?;
    log::debug!(
        "read class {} ({} constants, {} methods)",
        class.name().unwrap_or("<unnamed>"),
        class.constant_pool.len(),
        class.methods.len()
    );
    Ok(class)
}

/// Read the class file at `path`.
pub fn read_class_file(path: &Path) -> Result<ClassFile, RuntimeError> {
    let bytes = std::fs::read(path)?;
    read_class(&bytes)
}

fn read_constant_pool(r: &mut ByteReader<'_>) -> Result<ConstantPool, RuntimeError> {
    let count = r.u16()? as usize;
    let mut constants = Vec::with_capacity(count.saturating_sub(1));
    while constants.len() + 1 < count {
        let tag = r.u8()?;
        let constant = match tag {
            CONSTANT_UTF8 => {
                let len = r.u16()? as usize;
                let at = r.pos;
                let text = from_modified_utf8(r.take(len)?).ok_or(RuntimeError::BadUtf8 { at })?;
                Constant::Utf8(text)
            }
            CONSTANT_INTEGER => Constant::Integer(r.u32()? as i32),
            CONSTANT_LONG => {
                let high = r.u32()? as u64;
                let low = r.u32()? as u64;
                Constant::Long(((high << 32) | low) as i64)
            }
            CONSTANT_CLASS => Constant::Class(r.u16()?),
            CONSTANT_STRING => Constant::String(r.u16()?),
            CONSTANT_FIELDREF => Constant::FieldRef(r.u16()?, r.u16()?),
            CONSTANT_METHODREF => Constant::MethodRef(r.u16()?, r.u16()?),
            CONSTANT_NAMEANDTYPE => Constant::NameAndType(r.u16()?, r.u16()?),
            _ => return Err(RuntimeError::UnsupportedConstant { tag, at: r.pos - 1 }),
        };
        let wide = constant.slots() == 2;
        constants.push(constant);
        if wide {
            constants.push(Constant::Unusable);
        }
    }
    Ok(ConstantPool::from_constants(constants))
}

fn read_method(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<MethodInfo, RuntimeError> {
    let access_flags = r.u16()?;
    let name_index = r.u16()?;
    let descriptor_index = r.u16()?;
    let mut code = None;
    let attributes = r.u16()?;
    for _ in 0..attributes {
        let attr_name = r.u16()?;
        let len = r.u32()? as usize;
        if pool.utf8(attr_name) != Some(CODE_ATTRIBUTE_NAME) {
            r.take(len)?;
            continue;
        }
        let max_stack = r.u16()?;
        let max_locals = r.u16()?;
        let code_len = r.u32()? as usize;
        let bytes = r.take(code_len)?.to_vec();
        let handlers = r.u16()? as usize;
        r.take(handlers * 8)?;
        r.skip_attributes()?;
        code = Some(CodeAttribute::new(attr_name, max_stack, max_locals, bytes));
    }
    let name = pool.utf8(name_index).unwrap_or("<unnamed>");
    let code = code.ok_or_else(|| RuntimeError::MissingCode(name.to_string()))?;
    Ok(MethodInfo::new(access_flags, name_index, descriptor_index, code))
}
