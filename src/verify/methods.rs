use super::constant_pool::{self, ConstantPoolVerifyError};
use crate::codegen::class::ClassFile;
use crate::codegen::defs::access_flags;
use crate::codegen::descriptor;
use crate::codegen::method::MethodInfo;
use crate::codegen::opcodes::*;
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MethodVerifyError {
    #[error(transparent)]
    ConstantPool(#[from] ConstantPoolVerifyError),
    #[error("Invalid method access flags: 0x{0:04x}")]
    InvalidMethodAccessFlags(u16),
    #[error("Malformed method descriptor {0}")]
    InvalidDescriptor(String),
    #[error("Duplicate method {name}{descriptor}")]
    DuplicateMethod { name: String, descriptor: String },
    #[error("Method {0} has an empty Code attribute")]
    EmptyCode(String),
    #[error("Method {method}: max_locals {max_locals} is below the {needed} argument slots")]
    MaxLocalsTooSmall { method: String, max_locals: u16, needed: u16 },
    #[error("Method {method}: unknown opcode 0x{op:02x} at {at}")]
    UnknownOpcode { method: String, op: u8, at: usize },
    #[error("Method {method}: instruction at {at} runs past the end of the code")]
    TruncatedInstruction { method: String, at: usize },
    #[error("Method {method}: branch at {at} targets {target}, which is not an instruction boundary")]
    BadBranchTarget { method: String, at: usize, target: i64 },
}

pub type Result<T> = std::result::Result<T, MethodVerifyError>;

/// Verify the ClassFile methods
pub fn verify(class_file: &ClassFile) -> Result<()> {
    let pool = &class_file.constant_pool;
    let mut seen = HashSet::new();
    for method in &class_file.methods {
        constant_pool::expect(pool, method.name_index, "Utf8")?;
        constant_pool::expect(pool, method.descriptor_index, "Utf8")?;
        constant_pool::expect(pool, method.code.name_index, "Utf8")?;
        let name = pool.utf8(method.name_index).unwrap_or_default();
        let desc = pool.utf8(method.descriptor_index).unwrap_or_default();
        if !seen.insert((name, desc)) {
            return Err(MethodVerifyError::DuplicateMethod { name: name.to_string(), descriptor: desc.to_string() });
        }
        verify_access_flags(method.access_flags)?;

        let args = descriptor::argument_slots(desc).ok_or_else(|| MethodVerifyError::InvalidDescriptor(desc.to_string()))?;
        descriptor::return_slots(desc).ok_or_else(|| MethodVerifyError::InvalidDescriptor(desc.to_string()))?;
        let receiver = if method.access_flags & access_flags::ACC_STATIC != 0 { 0 } else { 1 };
        if method.code.max_locals < args + receiver {
            return Err(MethodVerifyError::MaxLocalsTooSmall {
                method: name.to_string(),
                max_locals: method.code.max_locals,
                needed: args + receiver,
            });
        }
        verify_code(class_file, name, method)?;
    }
    Ok(())
}

fn verify_access_flags(flags: u16) -> Result<()> {
    let visibility = [access_flags::ACC_PUBLIC, access_flags::ACC_PROTECTED, access_flags::ACC_PRIVATE]
        .iter()
        .filter(|&&f| flags & f != 0)
        .count();
    if visibility > 1 {
        return Err(MethodVerifyError::InvalidMethodAccessFlags(flags));
    }
    Ok(())
}

/// Walk the instruction stream: every opcode known, every operand in bounds, every
/// constant-pool operand of the right kind and every branch on an instruction boundary.
fn verify_code(class_file: &ClassFile, name: &str, method: &MethodInfo) -> Result<()> {
    let code = &method.code.code;
    if code.is_empty() {
        return Err(MethodVerifyError::EmptyCode(name.to_string()));
    }
    let pool = &class_file.constant_pool;
    let mut boundaries = HashSet::new();
    let mut branches = Vec::new();
    let mut pc = 0;
    while pc < code.len() {
        let op = code[pc];
        let len = length_at(code, pc).ok_or_else(|| MethodVerifyError::UnknownOpcode {
            method: name.to_string(),
            op,
            at: pc,
        })?;
        if pc + len > code.len() {
            return Err(MethodVerifyError::TruncatedInstruction { method: name.to_string(), at: pc });
        }
        boundaries.insert(pc);
        let u16_operand = || u16::from_be_bytes([code[pc + 1], code[pc + 2]]);
        match op {
            LDC => constant_pool::expect_any(pool, code[pc + 1] as u16, &["Integer", "String"])?,
            LDC_W => constant_pool::expect_any(pool, u16_operand(), &["Integer", "String"])?,
            LDC2_W => constant_pool::expect(pool, u16_operand(), "Long")?,
            GETSTATIC => constant_pool::expect(pool, u16_operand(), "Fieldref")?,
            INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC => constant_pool::expect(pool, u16_operand(), "Methodref")?,
            NEW => constant_pool::expect(pool, u16_operand(), "Class")?,
            _ if is_branch(op) => {
                let offset = u16_operand() as i16;
                branches.push((pc, pc as i64 + offset as i64));
            }
            _ => {}
        }
        pc += len;
    }
    for (at, target) in branches {
        if target < 0 || !boundaries.contains(&(target as usize)) {
            return Err(MethodVerifyError::BadBranchTarget { method: name.to_string(), at, target });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::attribute::CodeAttribute;

    fn class_with(code: Vec<u8>, max_locals: u16) -> ClassFile {
        let mut class = ClassFile::new();
        let code_name = class.constant_pool.intern_utf8("Code").unwrap();
        let name = class.constant_pool.intern_utf8("f").unwrap();
        let desc = class.constant_pool.intern_utf8("(I)V").unwrap();
        class.methods.push(MethodInfo::new(
            access_flags::ACC_PUBLIC | access_flags::ACC_STATIC,
            name,
            desc,
            CodeAttribute::new(code_name, 2, max_locals, code),
        ));
        class
    }

    #[test]
    fn test_well_formed_loop() {
        // 0: goto 4; 3: nop; 4: iload_0; 5: ifne -2 (to 3); 8: return
        let code = vec![GOTO, 0, 4, NOP, ILOAD_0, IFNE, 0xff, 0xfe, RETURN];
        assert_eq!(verify(&class_with(code, 1)), Ok(()));
    }

    #[test]
    fn test_branch_into_operand() {
        let code = vec![GOTO, 0, 2, BIPUSH, 5, POP, RETURN];
        assert!(matches!(
            verify(&class_with(code, 1)),
            Err(MethodVerifyError::BadBranchTarget { at: 0, target: 2, .. })
        ));
    }

    #[test]
    fn test_max_locals_covers_arguments() {
        let code = vec![RETURN];
        assert!(matches!(verify(&class_with(code, 0)), Err(MethodVerifyError::MaxLocalsTooSmall { needed: 1, .. })));
    }

    #[test]
    fn test_invoke_operand_must_be_methodref() {
        // pool #1 is the "Code" Utf8
        let code = vec![INVOKESTATIC, 0, 1, RETURN];
        assert!(matches!(verify(&class_with(code, 1)), Err(MethodVerifyError::ConstantPool(_))));
    }

    #[test]
    fn test_truncated_instruction() {
        let code = vec![SIPUSH, 1];
        assert!(matches!(verify(&class_with(code, 1)), Err(MethodVerifyError::TruncatedInstruction { at: 0, .. })));
    }
}
