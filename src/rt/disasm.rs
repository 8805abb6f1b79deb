//! Human-readable listing of a class file

use crate::codegen::class::ClassFile;
use crate::codegen::constpool::{Constant, ConstantPool};
use crate::codegen::opcodes::{self, *};
use std::fmt::Write;

fn describe_constant(pool: &ConstantPool, constant: &Constant) -> String {
    match constant {
        Constant::Utf8(s) => format!("Utf8 {}", s),
        Constant::Integer(v) => format!("Integer {}", v),
        Constant::Long(v) => format!("Long {}l", v),
        Constant::Class(name) => format!("Class #{} // {}", name, pool.utf8(*name).unwrap_or("?")),
        Constant::String(utf8) => format!("String #{} // {:?}", utf8, pool.utf8(*utf8).unwrap_or("?")),
        Constant::FieldRef(class, nat) | Constant::MethodRef(class, nat) => {
            let target = match pool.member_ref_parts(*class, *nat) {
                Some((c, n, d)) => format!("{}.{}:{}", c, n, d),
                None => "?".to_string(),
            };
            format!("{} #{}.#{} // {}", constant.tag_name(), class, nat, target)
        }
        Constant::NameAndType(name, desc) => format!(
            "NameAndType #{}:#{} // {}:{}",
            name,
            desc,
            pool.utf8(*name).unwrap_or("?"),
            pool.utf8(*desc).unwrap_or("?")
        ),
        Constant::Unusable => String::new(),
    }
}

/// Instruction listing of one method body, one instruction per line.
pub fn disasm_code(pool: &ConstantPool, code: &[u8]) -> String {
    let mut out = String::new();
    let mut pc = 0;
    while pc < code.len() {
        let op = code[pc];
        let len = match opcodes::length_at(code, pc) {
            Some(len) if pc + len <= code.len() => len,
            _ => {
                let _ = writeln!(out, "{:>6}: <bad opcode 0x{:02x}>", pc, op);
                break;
            }
        };
        let u16_operand = || u16::from_be_bytes([code[pc + 1], code[pc + 2]]);
        let operands = match op {
            BIPUSH => format!(" {}", code[pc + 1] as i8),
            SIPUSH => format!(" {}", u16_operand() as i16),
            ILOAD | LLOAD | ALOAD | ISTORE | LSTORE | ASTORE => format!(" {}", code[pc + 1]),
            LDC => constant_operand(pool, code[pc + 1] as u16),
            LDC_W | LDC2_W | GETSTATIC | INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC | NEW => {
                constant_operand(pool, u16_operand())
            }
            WIDE => format!(
                " {} {}",
                opcodes::mnemonic(code[pc + 1]),
                u16::from_be_bytes([code[pc + 2], code[pc + 3]])
            ),
            _ if is_branch(op) => format!(" {}", pc as i64 + (u16_operand() as i16) as i64),
            _ => String::new(),
        };
        let _ = writeln!(out, "{:>6}: {}{}", pc, opcodes::mnemonic(op), operands);
        pc += len;
    }
    out
}

fn constant_operand(pool: &ConstantPool, index: u16) -> String {
    match pool.get(index) {
        Some(constant) => {
            let text = describe_constant(pool, constant);
            // keep only the resolved part after the comment marker
            let resolved = text.rsplit("// ").next().unwrap_or(&text);
            format!(" #{} // {}", index, resolved)
        }
        None => format!(" #{} // <invalid>", index),
    }
}

/// Constant pool and every method of `class`, in a `javap -c -v` like layout.
pub fn disasm(class: &ClassFile) -> String {
    let pool = &class.constant_pool;
    let mut out = String::new();
    let _ = writeln!(out, "class {} extends {}", class.name().unwrap_or("?"), class.super_name().unwrap_or("?"));
    let _ = writeln!(out, "  version: {}.{}", class.major_version, class.minor_version);
    let _ = writeln!(out, "  flags: 0x{:04x}", class.access_flags);
    let _ = writeln!(out, "Constant pool:");
    for (index, constant) in pool.entries() {
        let _ = writeln!(out, "  {:>5} = {}", format!("#{}", index), describe_constant(pool, constant));
    }
    for method in &class.methods {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}{} flags 0x{:04x}",
            pool.utf8(method.name_index).unwrap_or("?"),
            pool.utf8(method.descriptor_index).unwrap_or("?"),
            method.access_flags
        );
        let _ = writeln!(out, "  stack={}, locals={}", method.code.max_stack, method.code.max_locals);
        out.push_str(&disasm_code(pool, &method.code.code));
    }
    out
}
