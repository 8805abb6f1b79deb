/// JVM instruction opcodes used by the generator.
///
/// Values follow the Java Virtual Machine Specification, chapter 6, and are
/// ordered by opcode value.

// 0x00 - 0x14: Constants
pub const NOP: u8 = 0x00;
pub const ACONST_NULL: u8 = 0x01;
pub const ICONST_M1: u8 = 0x02;
pub const ICONST_0: u8 = 0x03;
pub const ICONST_1: u8 = 0x04;
pub const ICONST_2: u8 = 0x05;
pub const ICONST_3: u8 = 0x06;
pub const ICONST_4: u8 = 0x07;
pub const ICONST_5: u8 = 0x08;
pub const LCONST_0: u8 = 0x09;
pub const LCONST_1: u8 = 0x0a;
pub const BIPUSH: u8 = 0x10;
pub const SIPUSH: u8 = 0x11;
pub const LDC: u8 = 0x12;
pub const LDC_W: u8 = 0x13;
pub const LDC2_W: u8 = 0x14;

// 0x15 - 0x2D: Loads
pub const ILOAD: u8 = 0x15;
pub const LLOAD: u8 = 0x16;
pub const ALOAD: u8 = 0x19;
pub const ILOAD_0: u8 = 0x1a;
pub const LLOAD_0: u8 = 0x1e;
pub const ALOAD_0: u8 = 0x2a;

// 0x36 - 0x4E: Stores
pub const ISTORE: u8 = 0x36;
pub const LSTORE: u8 = 0x37;
pub const ASTORE: u8 = 0x3a;
pub const ISTORE_0: u8 = 0x3b;
pub const LSTORE_0: u8 = 0x3f;
pub const ASTORE_0: u8 = 0x4b;

// 0x57 - 0x5F: Stack operations
pub const POP: u8 = 0x57;
pub const POP2: u8 = 0x58;
pub const DUP: u8 = 0x59;

// 0x60 - 0x77: Arithmetic
pub const IADD: u8 = 0x60;
pub const LADD: u8 = 0x61;
pub const ISUB: u8 = 0x64;
pub const LSUB: u8 = 0x65;
pub const IMUL: u8 = 0x68;
pub const LMUL: u8 = 0x69;
pub const IDIV: u8 = 0x6c;
pub const LDIV: u8 = 0x6d;
pub const IREM: u8 = 0x70;
pub const LREM: u8 = 0x71;
pub const INEG: u8 = 0x74;
pub const LNEG: u8 = 0x75;

// 0x78 - 0x83: Shifts and bitwise
pub const ISHL: u8 = 0x78;
pub const LSHL: u8 = 0x79;
pub const ISHR: u8 = 0x7a;
pub const LSHR: u8 = 0x7b;
pub const IUSHR: u8 = 0x7c;
pub const LUSHR: u8 = 0x7d;
pub const IAND: u8 = 0x7e;
pub const LAND: u8 = 0x7f;
pub const IOR: u8 = 0x80;
pub const LOR: u8 = 0x81;
pub const IXOR: u8 = 0x82;
pub const LXOR: u8 = 0x83;

// 0x85 - 0x94: Conversions and long compare
pub const I2L: u8 = 0x85;
pub const L2I: u8 = 0x88;
pub const I2B: u8 = 0x91;
pub const I2C: u8 = 0x92;
pub const I2S: u8 = 0x93;
pub const LCMP: u8 = 0x94;

// 0x99 - 0xA7: Branches
pub const IFEQ: u8 = 0x99;
pub const IFNE: u8 = 0x9a;
pub const IFLT: u8 = 0x9b;
pub const IFGE: u8 = 0x9c;
pub const IFGT: u8 = 0x9d;
pub const IFLE: u8 = 0x9e;
pub const IF_ICMPEQ: u8 = 0x9f;
pub const IF_ICMPNE: u8 = 0xa0;
pub const IF_ICMPLT: u8 = 0xa1;
pub const IF_ICMPGE: u8 = 0xa2;
pub const IF_ICMPGT: u8 = 0xa3;
pub const IF_ICMPLE: u8 = 0xa4;
pub const IF_ACMPEQ: u8 = 0xa5;
pub const IF_ACMPNE: u8 = 0xa6;
pub const GOTO: u8 = 0xa7;

// 0xAC - 0xB1: Returns
pub const IRETURN: u8 = 0xac;
pub const LRETURN: u8 = 0xad;
pub const ARETURN: u8 = 0xb0;
pub const RETURN: u8 = 0xb1;

// 0xB2 - 0xBB: Fields, invocation, allocation
pub const GETSTATIC: u8 = 0xb2;
pub const INVOKEVIRTUAL: u8 = 0xb6;
pub const INVOKESPECIAL: u8 = 0xb7;
pub const INVOKESTATIC: u8 = 0xb8;
pub const NEW: u8 = 0xbb;

pub const WIDE: u8 = 0xc4;

/// Negate a conditional branch opcode.
pub fn negate(op: u8) -> Option<u8> {
    let negated = match op {
        IFEQ => IFNE,
        IFNE => IFEQ,
        IFLT => IFGE,
        IFGE => IFLT,
        IFGT => IFLE,
        IFLE => IFGT,
        IF_ICMPEQ => IF_ICMPNE,
        IF_ICMPNE => IF_ICMPEQ,
        IF_ICMPLT => IF_ICMPGE,
        IF_ICMPGE => IF_ICMPLT,
        IF_ICMPGT => IF_ICMPLE,
        IF_ICMPLE => IF_ICMPGT,
        IF_ACMPEQ => IF_ACMPNE,
        IF_ACMPNE => IF_ACMPEQ,
        _ => return None,
    };
    Some(negated)
}

/// Whether `op` is a branch with a 16-bit relative offset operand.
pub fn is_branch(op: u8) -> bool {
    matches!(op, IFEQ..=GOTO)
}

/// Whether `op` ends straight-line execution.
pub fn is_terminal(op: u8) -> bool {
    matches!(op, IRETURN | LRETURN | ARETURN | RETURN | GOTO)
}

/// Total encoded length of the instruction starting with `op`, operands included.
///
/// `wide` prefixed forms are handled by the caller.
pub fn instruction_length(op: u8) -> Option<usize> {
    let len = match op {
        NOP | ACONST_NULL | ICONST_M1..=LCONST_1 => 1,
        ILOAD_0..=0x2d | ISTORE_0..=0x4e => 1,
        POP | POP2 | DUP => 1,
        IADD..=LXOR => 1,
        I2L | L2I | I2B | I2C | I2S | LCMP => 1,
        IRETURN | LRETURN | ARETURN | RETURN => 1,
        BIPUSH | LDC => 2,
        ILOAD | LLOAD | ALOAD | ISTORE | LSTORE | ASTORE => 2,
        SIPUSH | LDC_W | LDC2_W => 3,
        IFEQ..=GOTO => 3,
        GETSTATIC | INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC | NEW => 3,
        _ => return None,
    };
    Some(len)
}

/// Length of the instruction at `pc` in `code`, a `wide` prefix included.
pub fn length_at(code: &[u8], pc: usize) -> Option<usize> {
    let op = *code.get(pc)?;
    if op == WIDE {
        return match *code.get(pc + 1)? {
            ILOAD | LLOAD | ALOAD | ISTORE | LSTORE | ASTORE => Some(4),
            _ => None,
        };
    }
    instruction_length(op)
}

/// Mnemonic for disassembly and debug tracing.
pub fn mnemonic(op: u8) -> &'static str {
    match op {
        NOP => "nop",
        ACONST_NULL => "aconst_null",
        ICONST_M1 => "iconst_m1",
        ICONST_0 => "iconst_0",
        ICONST_1 => "iconst_1",
        ICONST_2 => "iconst_2",
        ICONST_3 => "iconst_3",
        ICONST_4 => "iconst_4",
        ICONST_5 => "iconst_5",
        LCONST_0 => "lconst_0",
        LCONST_1 => "lconst_1",
        BIPUSH => "bipush",
        SIPUSH => "sipush",
        LDC => "ldc",
        LDC_W => "ldc_w",
        LDC2_W => "ldc2_w",
        ILOAD => "iload",
        LLOAD => "lload",
        ALOAD => "aload",
        0x1a => "iload_0",
        0x1b => "iload_1",
        0x1c => "iload_2",
        0x1d => "iload_3",
        0x1e => "lload_0",
        0x1f => "lload_1",
        0x20 => "lload_2",
        0x21 => "lload_3",
        0x2a => "aload_0",
        0x2b => "aload_1",
        0x2c => "aload_2",
        0x2d => "aload_3",
        ISTORE => "istore",
        LSTORE => "lstore",
        ASTORE => "astore",
        0x3b => "istore_0",
        0x3c => "istore_1",
        0x3d => "istore_2",
        0x3e => "istore_3",
        0x3f => "lstore_0",
        0x40 => "lstore_1",
        0x41 => "lstore_2",
        0x42 => "lstore_3",
        0x4b => "astore_0",
        0x4c => "astore_1",
        0x4d => "astore_2",
        0x4e => "astore_3",
        POP => "pop",
        POP2 => "pop2",
        DUP => "dup",
        IADD => "iadd",
        LADD => "ladd",
        ISUB => "isub",
        LSUB => "lsub",
        IMUL => "imul",
        LMUL => "lmul",
        IDIV => "idiv",
        LDIV => "ldiv",
        IREM => "irem",
        LREM => "lrem",
        INEG => "ineg",
        LNEG => "lneg",
        ISHL => "ishl",
        LSHL => "lshl",
        ISHR => "ishr",
        LSHR => "lshr",
        IUSHR => "iushr",
        LUSHR => "lushr",
        IAND => "iand",
        LAND => "land",
        IOR => "ior",
        LOR => "lor",
        IXOR => "ixor",
        LXOR => "lxor",
        I2L => "i2l",
        L2I => "l2i",
        I2B => "i2b",
        I2C => "i2c",
        I2S => "i2s",
        LCMP => "lcmp",
        IFEQ => "ifeq",
        IFNE => "ifne",
        IFLT => "iflt",
        IFGE => "ifge",
        IFGT => "ifgt",
        IFLE => "ifle",
        IF_ICMPEQ => "if_icmpeq",
        IF_ICMPNE => "if_icmpne",
        IF_ICMPLT => "if_icmplt",
        IF_ICMPGE => "if_icmpge",
        IF_ICMPGT => "if_icmpgt",
        IF_ICMPLE => "if_icmple",
        IF_ACMPEQ => "if_acmpeq",
        IF_ACMPNE => "if_acmpne",
        GOTO => "goto",
        IRETURN => "ireturn",
        LRETURN => "lreturn",
        ARETURN => "areturn",
        RETURN => "return",
        GETSTATIC => "getstatic",
        INVOKEVIRTUAL => "invokevirtual",
        INVOKESPECIAL => "invokespecial",
        INVOKESTATIC => "invokestatic",
        NEW => "new",
        WIDE => "wide",
        _ => "<unknown>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negate_is_an_involution() {
        for op in IFEQ..=IF_ACMPNE {
            let n = negate(op).unwrap();
            assert_ne!(n, op);
            assert_eq!(negate(n), Some(op));
        }
        assert_eq!(negate(GOTO), None);
    }

    #[test]
    fn branch_lengths() {
        assert!(is_branch(IF_ICMPLE));
        assert!(!is_branch(IRETURN));
        assert_eq!(instruction_length(GOTO), Some(3));
        assert_eq!(instruction_length(ILOAD_0 + 3), Some(1));
        assert_eq!(instruction_length(WIDE), None);
        assert_eq!(length_at(&[WIDE, ILOAD, 1, 0], 0), Some(4));
        assert_eq!(length_at(&[WIDE, IADD], 0), None);
        assert_eq!(length_at(&[NOP], 1), None);
    }
}
