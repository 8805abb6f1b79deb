//! Stack interpreter for generated methods

use super::RuntimeError;
use crate::codegen::class::ClassFile;
use crate::codegen::constpool::Constant;
use crate::codegen::defs::{access_flags, CONSTRUCTOR_METHOD_NAME};
use crate::codegen::descriptor::{self, STRING_CLASS};
use crate::codegen::method::{MethodInfo, PRINT_STREAM_CLASS, SYSTEM_CLASS};
use crate::codegen::opcodes::{self, *};
use crate::codegen::types::StackKind;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Instructions one interpreter may execute before giving up.
pub const DEFAULT_STEP_LIMIT: u64 = 1_000_000;

const MAX_CALL_DEPTH: usize = 512;

/// A plain object: only its class is tracked
#[derive(Debug, PartialEq, Eq)]
pub struct Instance {
    pub class: String,
}

/// One operand-stack or local-variable value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Null,
    Str(Rc<str>),
    Object(Rc<Instance>),
    /// Upper half of a long local, or a local never written.
    Top,
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    fn is_reference(&self) -> bool {
        matches!(self, Value::Null | Value::Str(_) | Value::Object(_))
    }

    /// Reference identity, as `if_acmpeq` sees it.
    fn same_ref(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}L", v),
            Value::Null => write!(f, "null"),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Object(o) => write!(f, "{}@{:p}", o.class, Rc::as_ptr(o)),
            Value::Top => write!(f, "<top>"),
        }
    }
}

struct Frame<'c> {
    method: &'c str,
    pc: usize,
    locals: Vec<Value>,
    stack: Vec<Value>,
}

impl<'c> Frame<'c> {
    fn new(method: &'c str, max_locals: usize, this: Option<Value>, args: Vec<Value>) -> Self {
        let mut locals = Vec::with_capacity(max_locals);
        locals.extend(this);
        for arg in args {
            let wide = matches!(arg, Value::Long(_));
            locals.push(arg);
            if wide {
                locals.push(Value::Top);
            }
        }
        if locals.len() < max_locals {
            locals.resize(max_locals, Value::Top);
        }
        Self { method, pc: 0, locals, stack: Vec::new() }
    }

    fn underflow(&self) -> RuntimeError {
        RuntimeError::StackUnderflow { method: self.method.to_string(), pc: self.pc }
    }

    fn mismatch(&self, expected: &'static str) -> RuntimeError {
        RuntimeError::TypeMismatch { method: self.method.to_string(), pc: self.pc, expected }
    }

    fn fell_off(&self) -> RuntimeError {
        RuntimeError::FellOffCode { method: self.method.to_string(), pc: self.pc }
    }

    fn unsupported(&self, op: u8) -> RuntimeError {
        RuntimeError::UnsupportedOpcode { method: self.method.to_string(), pc: self.pc, op }
    }

    fn bad_local(&self, slot: usize) -> RuntimeError {
        RuntimeError::BadLocal { method: self.method.to_string(), pc: self.pc, slot }
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or_else(|| self.underflow())
    }

    fn pop_int(&mut self) -> Result<i32, RuntimeError> {
        match self.pop()? {
            Value::Int(v) => Ok(v),
            _ => Err(self.mismatch("int")),
        }
    }

    fn pop_long(&mut self) -> Result<i64, RuntimeError> {
        match self.pop()? {
            Value::Long(v) => Ok(v),
            _ => Err(self.mismatch("long")),
        }
    }

    fn pop_kind(&mut self, kind: StackKind) -> Result<Value, RuntimeError> {
        let value = self.pop()?;
        let ok = match kind {
            StackKind::Int => matches!(value, Value::Int(_)),
            StackKind::Long => matches!(value, Value::Long(_)),
            StackKind::Reference => value.is_reference(),
        };
        if ok {
            Ok(value)
        } else {
            Err(self.mismatch(kind_name(kind)))
        }
    }

    fn load(&mut self, kind: StackKind, slot: usize) -> Result<(), RuntimeError> {
        let value = self.locals.get(slot).cloned().ok_or_else(|| self.bad_local(slot))?;
        let ok = match kind {
            StackKind::Int => matches!(value, Value::Int(_)),
            StackKind::Long => matches!(value, Value::Long(_)),
            StackKind::Reference => value.is_reference(),
        };
        if !ok {
            return Err(self.mismatch(kind_name(kind)));
        }
        self.push(value);
        Ok(())
    }

    fn store(&mut self, kind: StackKind, slot: usize) -> Result<(), RuntimeError> {
        let value = self.pop_kind(kind)?;
        let end = slot + kind.size() as usize;
        if end > self.locals.len() {
            return Err(self.bad_local(slot));
        }
        self.locals[slot] = value;
        if kind == StackKind::Long {
            self.locals[slot + 1] = Value::Top;
        }
        Ok(())
    }

    fn int_binary(&mut self, f: impl FnOnce(i32, i32) -> Option<i32>) -> Result<(), RuntimeError> {
        let b = self.pop_int()?;
        let a = self.pop_int()?;
        self.push(Value::Int(f(a, b).ok_or(RuntimeError::DivisionByZero)?));
        Ok(())
    }

    fn long_binary(&mut self, f: impl FnOnce(i64, i64) -> Option<i64>) -> Result<(), RuntimeError> {
        let b = self.pop_long()?;
        let a = self.pop_long()?;
        self.push(Value::Long(f(a, b).ok_or(RuntimeError::DivisionByZero)?));
        Ok(())
    }

    fn long_shift(&mut self, f: impl FnOnce(i64, u32) -> i64) -> Result<(), RuntimeError> {
        let distance = self.pop_int()?;
        let a = self.pop_long()?;
        self.push(Value::Long(f(a, distance as u32)));
        Ok(())
    }
}

fn kind_name(kind: StackKind) -> &'static str {
    match kind {
        StackKind::Int => "int",
        StackKind::Long => "long",
        StackKind::Reference => "reference",
    }
}

/// `(is_store, kind, implicit slot)` of a local-variable instruction.
fn local_op(op: u8) -> Option<(bool, StackKind, Option<usize>)> {
    use StackKind::*;
    let decoded = match op {
        ILOAD => (false, Int, None),
        LLOAD => (false, Long, None),
        ALOAD => (false, Reference, None),
        ISTORE => (true, Int, None),
        LSTORE => (true, Long, None),
        ASTORE => (true, Reference, None),
        0x1a..=0x1d => (false, Int, Some((op - ILOAD_0) as usize)),
        0x1e..=0x21 => (false, Long, Some((op - LLOAD_0) as usize)),
        0x2a..=0x2d => (false, Reference, Some((op - ALOAD_0) as usize)),
        0x3b..=0x3e => (true, Int, Some((op - ISTORE_0) as usize)),
        0x3f..=0x42 => (true, Long, Some((op - LSTORE_0) as usize)),
        0x4b..=0x4e => (true, Reference, Some((op - ASTORE_0) as usize)),
        _ => return None,
    };
    Some(decoded)
}

fn compare_branch(op: u8, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    let family = if (IFEQ..=IFLE).contains(&op) { op - IFEQ } else { op - IF_ICMPEQ };
    match family {
        0 => ordering == Equal,
        1 => ordering != Equal,
        2 => ordering == Less,
        3 => ordering != Less,
        4 => ordering == Greater,
        _ => ordering != Greater,
    }
}

/// Executes methods of one class, capturing what they print
pub struct Interpreter<'c> {
    class: &'c ClassFile,
    class_name: &'c str,
    output: String,
    steps: u64,
    step_limit: u64,
    depth: usize,
    strings: HashMap<u16, Rc<str>>,
    system_out: Rc<Instance>,
}

impl<'c> Interpreter<'c> {
    pub fn new(class: &'c ClassFile) -> Self {
        Self {
            class,
            class_name: class.name().unwrap_or_default(),
            output: String::new(),
            steps: 0,
            step_limit: DEFAULT_STEP_LIMIT,
            depth: 0,
            strings: HashMap::new(),
            system_out: Rc::new(Instance { class: PRINT_STREAM_CLASS.to_string() }),
        }
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    /// Everything printed so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// A fresh instance of the interpreted class, constructor not run.
    pub fn new_instance(&self) -> Value {
        Value::Object(Rc::new(Instance { class: self.class_name.to_string() }))
    }

    /// Run the static method called `name`.
    pub fn invoke_static(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>, RuntimeError> {
        let class: &'c ClassFile = self.class;
        let method = class
            .methods
            .iter()
            .find(|m| m.access_flags & access_flags::ACC_STATIC != 0 && self.method_name(m) == name)
            .ok_or_else(|| RuntimeError::NoSuchMethod { name: name.to_string(), descriptor: String::new() })?;
        self.execute(method, None, args.to_vec())
    }

    /// Run `name` with exactly `descriptor`, on `this` for instance methods.
    pub fn invoke(
        &mut self,
        name: &str,
        descriptor: &str,
        this: Option<Value>,
        args: &[Value],
    ) -> Result<Option<Value>, RuntimeError> {
        let method = self.find(name, descriptor)?;
        self.execute(method, this, args.to_vec())
    }

    fn method_name(&self, method: &MethodInfo) -> &'c str {
        self.class.constant_pool.utf8(method.name_index).unwrap_or_default()
    }

    fn find(&self, name: &str, descriptor: &str) -> Result<&'c MethodInfo, RuntimeError> {
        let class: &'c ClassFile = self.class;
        class
            .methods
            .iter()
            .find(|m| {
                class.constant_pool.utf8(m.name_index) == Some(name)
                    && class.constant_pool.utf8(m.descriptor_index) == Some(descriptor)
            })
            .ok_or_else(|| RuntimeError::NoSuchMethod { name: name.to_string(), descriptor: descriptor.to_string() })
    }

    fn execute(&mut self, method: &'c MethodInfo, this: Option<Value>, args: Vec<Value>) -> Result<Option<Value>, RuntimeError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::CallDepth(MAX_CALL_DEPTH));
        }
        self.depth += 1;
        let result = self.run(method, this, args);
        self.depth -= 1;
        result
    }

    fn constant(&mut self, index: u16) -> Result<Value, RuntimeError> {
        match self.class.constant_pool.get(index) {
            Some(Constant::Integer(v)) => Ok(Value::Int(*v)),
            Some(Constant::Long(v)) => Ok(Value::Long(*v)),
            Some(Constant::String(utf8)) => {
                let text = self.class.constant_pool.utf8(*utf8).ok_or(RuntimeError::BadConstant(index))?;
                // literals are interned, so equal literals are the same reference
                let interned = self.strings.entry(index).or_insert_with(|| Rc::from(text));
                Ok(Value::Str(interned.clone()))
            }
            _ => Err(RuntimeError::BadConstant(index)),
        }
    }

    fn run(&mut self, method: &'c MethodInfo, this: Option<Value>, args: Vec<Value>) -> Result<Option<Value>, RuntimeError> {
        let class: &'c ClassFile = self.class;
        let code: &'c [u8] = &method.code.code;
        let mut frame = Frame::new(self.method_name(method), method.code.max_locals as usize, this, args);
        log::trace!("enter {} with {} locals", frame.method, frame.locals.len());

        loop {
            self.steps += 1;
            if self.steps > self.step_limit {
                return Err(RuntimeError::StepLimit(self.step_limit));
            }
            let pc = frame.pc;
            let op = *code.get(pc).ok_or_else(|| frame.fell_off())?;
            let len = opcodes::length_at(code, pc).ok_or_else(|| frame.unsupported(op))?;
            if pc + len > code.len() {
                return Err(frame.fell_off());
            }
            let u16_operand = u16::from_be_bytes([code.get(pc + 1).copied().unwrap_or(0), code.get(pc + 2).copied().unwrap_or(0)]);
            let branch_target = pc as i64 + i64::from(u16_operand as i16);
            let mut next = pc + len;

            if let Some((is_store, kind, implicit)) = local_op(op) {
                let slot = match implicit {
                    Some(slot) => slot,
                    None => code[pc + 1] as usize,
                };
                if is_store {
                    frame.store(kind, slot)?;
                } else {
                    frame.load(kind, slot)?;
                }
                frame.pc = next;
                continue;
            }

            match op {
                NOP => {}
                WIDE => {
                    let slot = u16::from_be_bytes([code[pc + 2], code[pc + 3]]) as usize;
                    match local_op(code[pc + 1]) {
                        Some((true, kind, None)) => frame.store(kind, slot)?,
                        Some((false, kind, None)) => frame.load(kind, slot)?,
                        _ => return Err(frame.unsupported(code[pc + 1])),
                    }
                }
                ACONST_NULL => frame.push(Value::Null),
                ICONST_M1..=ICONST_5 => frame.push(Value::Int(op as i32 - ICONST_0 as i32)),
                LCONST_0 | LCONST_1 => frame.push(Value::Long((op - LCONST_0) as i64)),
                BIPUSH => frame.push(Value::Int(code[pc + 1] as i8 as i32)),
                SIPUSH => frame.push(Value::Int(u16_operand as i16 as i32)),
                LDC => frame.push(self.constant(code[pc + 1] as u16)?),
                LDC_W | LDC2_W => frame.push(self.constant(u16_operand)?),
                POP => {
                    frame.pop()?;
                }
                POP2 => {
                    if !matches!(frame.pop()?, Value::Long(_)) {
                        frame.pop()?;
                    }
                }
                DUP => {
                    let top = frame.stack.last().cloned().ok_or_else(|| frame.underflow())?;
                    frame.push(top);
                }
                IADD => frame.int_binary(|a, b| Some(a.wrapping_add(b)))?,
                ISUB => frame.int_binary(|a, b| Some(a.wrapping_sub(b)))?,
                IMUL => frame.int_binary(|a, b| Some(a.wrapping_mul(b)))?,
                IDIV => frame.int_binary(|a, b| (b != 0).then(|| a.wrapping_div(b)))?,
                IREM => frame.int_binary(|a, b| (b != 0).then(|| a.wrapping_rem(b)))?,
                ISHL => frame.int_binary(|a, b| Some(a.wrapping_shl(b as u32)))?,
                ISHR => frame.int_binary(|a, b| Some(a.wrapping_shr(b as u32)))?,
                IUSHR => frame.int_binary(|a, b| Some((a as u32).wrapping_shr(b as u32) as i32))?,
                IAND => frame.int_binary(|a, b| Some(a & b))?,
                IOR => frame.int_binary(|a, b| Some(a | b))?,
                IXOR => frame.int_binary(|a, b| Some(a ^ b))?,
                LADD => frame.long_binary(|a, b| Some(a.wrapping_add(b)))?,
                LSUB => frame.long_binary(|a, b| Some(a.wrapping_sub(b)))?,
                LMUL => frame.long_binary(|a, b| Some(a.wrapping_mul(b)))?,
                LDIV => frame.long_binary(|a, b| (b != 0).then(|| a.wrapping_div(b)))?,
                LREM => frame.long_binary(|a, b| (b != 0).then(|| a.wrapping_rem(b)))?,
                LAND => frame.long_binary(|a, b| Some(a & b))?,
                LOR => frame.long_binary(|a, b| Some(a | b))?,
                LXOR => frame.long_binary(|a, b| Some(a ^ b))?,
                LSHL => frame.long_shift(|a, s| a.wrapping_shl(s))?,
                LSHR => frame.long_shift(|a, s| a.wrapping_shr(s))?,
                LUSHR => frame.long_shift(|a, s| (a as u64).wrapping_shr(s) as i64)?,
                INEG => {
                    let v = frame.pop_int()?;
                    frame.push(Value::Int(v.wrapping_neg()));
                }
                LNEG => {
                    let v = frame.pop_long()?;
                    frame.push(Value::Long(v.wrapping_neg()));
                }
                I2L => {
                    let v = frame.pop_int()?;
                    frame.push(Value::Long(v as i64));
                }
                L2I => {
                    let v = frame.pop_long()?;
                    frame.push(Value::Int(v as i32));
                }
                I2B | I2C | I2S => {
                    let v = frame.pop_int()?;
                    let narrowed = match op {
                        I2B => v as i8 as i32,
                        I2C => v as u16 as i32,
                        _ => v as i16 as i32,
                    };
                    frame.push(Value::Int(narrowed));
                }
                LCMP => {
                    let b = frame.pop_long()?;
                    let a = frame.pop_long()?;
                    frame.push(Value::Int(a.cmp(&b) as i32));
                }
                IFEQ..=IFLE => {
                    let v = frame.pop_int()?;
                    if compare_branch(op, v.cmp(&0)) {
                        next = usize::try_from(branch_target).map_err(|_| frame.fell_off())?;
                    }
                }
                IF_ICMPEQ..=IF_ICMPLE => {
                    let b = frame.pop_int()?;
                    let a = frame.pop_int()?;
                    if compare_branch(op, a.cmp(&b)) {
                        next = usize::try_from(branch_target).map_err(|_| frame.fell_off())?;
                    }
                }
                IF_ACMPEQ | IF_ACMPNE => {
                    let b = frame.pop_kind(StackKind::Reference)?;
                    let a = frame.pop_kind(StackKind::Reference)?;
                    if a.same_ref(&b) == (op == IF_ACMPEQ) {
                        next = usize::try_from(branch_target).map_err(|_| frame.fell_off())?;
                    }
                }
                GOTO => next = usize::try_from(branch_target).map_err(|_| frame.fell_off())?,
                IRETURN => return Ok(Some(Value::Int(frame.pop_int()?))),
                LRETURN => return Ok(Some(Value::Long(frame.pop_long()?))),
                ARETURN => return Ok(Some(frame.pop_kind(StackKind::Reference)?)),
                RETURN => return Ok(None),
                GETSTATIC => {
                    let (owner, name, _) = class
                        .constant_pool
                        .member_ref(u16_operand)
                        .ok_or(RuntimeError::BadConstant(u16_operand))?;
                    if owner != SYSTEM_CLASS || name != "out" {
                        return Err(RuntimeError::UnsupportedField { class: owner.to_string(), name: name.to_string() });
                    }
                    frame.push(Value::Object(self.system_out.clone()));
                }
                INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC => {
                    let (owner, name, desc) = class
                        .constant_pool
                        .member_ref(u16_operand)
                        .ok_or(RuntimeError::BadConstant(u16_operand))?;
                    let count = descriptor::split_parameters(desc)
                        .ok_or(RuntimeError::BadConstant(u16_operand))?
                        .len();
                    let mut args = Vec::with_capacity(count);
                    for _ in 0..count {
                        args.push(frame.pop()?);
                    }
                    args.reverse();
                    let receiver = if op == INVOKESTATIC { None } else { Some(frame.pop_kind(StackKind::Reference)?) };
                    if matches!(receiver, Some(Value::Null)) {
                        return Err(RuntimeError::NullPointer);
                    }
                    let result = if owner == self.class_name {
                        let target = self.find(name, desc)?;
                        self.execute(target, receiver, args)?
                    } else {
                        self.builtin(owner, name, desc, receiver, args)?
                    };
                    frame.push_result(result);
                }
                NEW => {
                    let class_name = class.constant_pool.class_name(u16_operand).ok_or(RuntimeError::BadConstant(u16_operand))?;
                    frame.push(Value::Object(Rc::new(Instance { class: class_name.to_string() })));
                }
                _ => return Err(frame.unsupported(op)),
            }
            frame.pc = next;
        }
    }

    /// Library methods the generator calls.
    fn builtin(
        &mut self,
        class: &str,
        name: &str,
        desc: &str,
        receiver: Option<Value>,
        args: Vec<Value>,
    ) -> Result<Option<Value>, RuntimeError> {
        let unsupported = || RuntimeError::UnsupportedCall {
            class: class.to_string(),
            name: name.to_string(),
            descriptor: desc.to_string(),
        };
        let int = |i: usize| args.get(i).and_then(Value::as_int).ok_or_else(unsupported);
        let long = |i: usize| args.get(i).and_then(Value::as_long).ok_or_else(unsupported);

        match (class, name) {
            (PRINT_STREAM_CLASS, "print" | "println") => {
                let text = match desc {
                    "()V" => String::new(),
                    "(I)V" | "(B)V" | "(S)V" => int(0)?.to_string(),
                    "(J)V" => long(0)?.to_string(),
                    "(C)V" => char::from_u32(int(0)? as u16 as u32).unwrap_or('\u{fffd}').to_string(),
                    "(Z)V" => (int(0)? != 0).to_string(),
                    "(Ljava/lang/String;)V" => match args.first() {
                        Some(Value::Str(s)) => s.to_string(),
                        Some(Value::Null) => "null".to_string(),
                        _ => return Err(unsupported()),
                    },
                    _ => return Err(unsupported()),
                };
                self.output.push_str(&text);
                if name == "println" {
                    self.output.push('\n');
                }
                Ok(None)
            }
            (STRING_CLASS, _) => {
                let this = receiver.as_ref().and_then(Value::as_str).ok_or_else(unsupported)?;
                match name {
                    "concat" => {
                        let other = args.first().and_then(Value::as_str).ok_or(RuntimeError::NullPointer)?;
                        Ok(Some(Value::str(&format!("{}{}", this, other))))
                    }
                    "length" => Ok(Some(Value::Int(this.encode_utf16().count() as i32))),
                    "equals" => {
                        let equal = args.first().and_then(Value::as_str) == Some(this);
                        Ok(Some(Value::Int(equal as i32)))
                    }
                    _ => Err(unsupported()),
                }
            }
            ("java/lang/Integer", _) => {
                let (a, b) = (int(0)? as u32, int(1)? as u32);
                let result = match name {
                    "compareUnsigned" => a.cmp(&b) as i32,
                    "divideUnsigned" => a.checked_div(b).ok_or(RuntimeError::DivisionByZero)? as i32,
                    "remainderUnsigned" => a.checked_rem(b).ok_or(RuntimeError::DivisionByZero)? as i32,
                    _ => return Err(unsupported()),
                };
                Ok(Some(Value::Int(result)))
            }
            ("java/lang/Long", _) => {
                let (a, b) = (long(0)? as u64, long(1)? as u64);
                let result = match name {
                    "compareUnsigned" => return Ok(Some(Value::Int(a.cmp(&b) as i32))),
                    "divideUnsigned" => a.checked_div(b).ok_or(RuntimeError::DivisionByZero)?,
                    "remainderUnsigned" => a.checked_rem(b).ok_or(RuntimeError::DivisionByZero)?,
                    _ => return Err(unsupported()),
                };
                Ok(Some(Value::Long(result as i64)))
            }
            // constructors of plain library objects have nothing to run
            (_, CONSTRUCTOR_METHOD_NAME) if desc == "()V" => Ok(None),
            _ => Err(unsupported()),
        }
    }
}

impl Frame<'_> {
    fn push_result(&mut self, result: Option<Value>) {
        if let Some(value) = result {
            self.push(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::codegen::CodeGenerator;
    use crate::config::Config;

    fn build(program: &Program) -> ClassFile {
        CodeGenerator::new(program, &Config::default()).generate().unwrap()
    }

    fn max_program() -> Program {
        let a = || Expr::ident("a", DataType::I32);
        let b = || Expr::ident("b", DataType::I32);
        Program::new("MaxTest").with_function(Function::new(
            "max",
            vec![Param::new("a", DataType::I32), Param::new("b", DataType::I32)],
            DataType::I32,
            vec![Stmt::if_else(
                Expr::binary(BinaryOp::Gt, a(), b()),
                vec![Stmt::ret(a())],
                Some(vec![Stmt::ret(b())]),
            )],
        ))
    }

    #[test]
    fn test_runs_generated_max() {
        let class = build(&max_program());
        let mut rt = Interpreter::new(&class);
        assert_eq!(rt.invoke_static("max", &[Value::Int(3), Value::Int(7)]).unwrap(), Some(Value::Int(7)));
        assert_eq!(rt.invoke_static("max", &[Value::Int(7), Value::Int(3)]).unwrap(), Some(Value::Int(7)));
        assert_eq!(rt.invoke_static("max", &[Value::Int(-1), Value::Int(-1)]).unwrap(), Some(Value::Int(-1)));
    }

    #[test]
    fn test_step_limit_stops_endless_loop() {
        let program = Program::new("Spin").with_function(Function::new(
            "spin",
            vec![],
            DataType::Void,
            vec![Stmt::while_loop(Expr::boolean(true), vec![])],
        ));
        let class = build(&program);
        let mut rt = Interpreter::new(&class).with_step_limit(1000);
        assert!(matches!(rt.invoke_static("spin", &[]), Err(RuntimeError::StepLimit(1000))));
    }

    #[test]
    fn test_print_and_string_helpers() {
        let s = || Expr::ident("s", DataType::String);
        let program = Program::new("Strings").with_function(Function::new(
            "main",
            vec![],
            DataType::Void,
            vec![
                Stmt::var(
                    "s",
                    DataType::String,
                    Some(Expr::call("strcat", vec![Expr::string("ab"), Expr::string("cd")], DataType::String)),
                ),
                Stmt::call("println", vec![s()]),
                Stmt::call("println", vec![Expr::call("strlen", vec![s()], DataType::I32)]),
                Stmt::call("print", vec![Expr::call("streq", vec![s(), Expr::string("abcd")], DataType::Bool)]),
                Stmt::call("print", vec![Expr::CharLiteral('!')]),
                Stmt::call("println", vec![]),
            ],
        ));
        let class = build(&program);
        let mut rt = Interpreter::new(&class);
        rt.invoke_static("main", &[Value::Null]).unwrap();
        assert_eq!(rt.output(), "abcd\n4\ntrue!\n");
    }

    #[test]
    fn test_unsigned_arithmetic() {
        let program = Program::new("Unsigned").with_function(Function::new(
            "div",
            vec![Param::new("a", DataType::U32), Param::new("b", DataType::U32)],
            DataType::U32,
            vec![Stmt::ret(Expr::binary(
                BinaryOp::Div,
                Expr::ident("a", DataType::U32),
                Expr::ident("b", DataType::U32),
            ))],
        ));
        let class = build(&program);
        let mut rt = Interpreter::new(&class);
        // 0xFFFFFFFE / 2 as unsigned
        let result = rt.invoke_static("div", &[Value::Int(-2), Value::Int(2)]).unwrap();
        assert_eq!(result, Some(Value::Int(0x7fff_ffff)));
        assert!(matches!(rt.invoke_static("div", &[Value::Int(1), Value::Int(0)]), Err(RuntimeError::DivisionByZero)));
    }

    #[test]
    fn test_instance_method_through_this() {
        let program = Program::new("Counter")
            .with_function(
                Function::new("twice", vec![Param::new("x", DataType::I64)], DataType::I64, vec![Stmt::ret(
                    Expr::binary(BinaryOp::Mul, Expr::ident("x", DataType::I64), Expr::typed_int(2, DataType::I64)),
                )])
                .instance(),
            )
            .with_function(
                Function::new("run", vec![], DataType::I64, vec![Stmt::ret(Expr::call(
                    "twice",
                    vec![Expr::typed_int(21, DataType::I64)],
                    DataType::I64,
                ))])
                .instance(),
            );
        let class = build(&program);
        let mut rt = Interpreter::new(&class);
        let this = rt.new_instance();
        rt.invoke("<init>", "()V", Some(this.clone()), &[]).unwrap();
        assert_eq!(rt.invoke("run", "()J", Some(this), &[]).unwrap(), Some(Value::Long(42)));
    }
}
