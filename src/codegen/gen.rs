//! Program to class file lowering
//!
//! [`CodeGenerator`] makes two passes: the first registers every function in the
//! [`MethodTable`] and reserves its Methodref so calls may refer to functions defined
//! later, the second compiles each function to completion with a fresh
//! [`SymbolAllocator`] and [`Code`] before moving on to the next.

use super::attribute::CodeAttribute;
use super::class::ClassFile;
use super::code::{Code, FinishedCode};
use super::constpool::ConstantPool;
use super::defs::{CODE_ATTRIBUTE_NAME, CONSTRUCTOR_METHOD_NAME};
use super::descriptor;
use super::error::{CodeGenError, CodeGenResult};
use super::method::{self, MethodEntry, MethodInfo, MethodTable, Receiver};
use super::opcodes::*;
use super::pending_jumps::Label;
use super::symtab::SymbolAllocator;
use super::types::{self, Narrowing, StackKind};
use crate::ast::*;
use crate::config::Config;

/// Lowers one [`Program`] into one [`ClassFile`]
pub struct CodeGenerator<'a> {
    program: &'a Program,
    config: &'a Config,
    pool: ConstantPool,
    methods: MethodTable,
    infos: Vec<MethodInfo>,
    code_attr_name: u16,
    emitted_code: usize,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(program: &'a Program, config: &'a Config) -> Self {
        Self {
            program,
            config,
            pool: ConstantPool::with_limit(config.constant_pool_limit),
            methods: MethodTable::with_runtime(),
            infos: Vec::new(),
            code_attr_name: 0,
            emitted_code: 0,
        }
    }

    /// Make another class's method callable from the program.
    pub fn import_method(&mut self, entry: MethodEntry) -> &mut Self {
        self.methods.import_method(entry);
        self
    }

    /// Methods known to the generator, including the program's own once registered.
    pub fn method_table(&self) -> &MethodTable {
        &self.methods
    }

    pub fn generate(mut self) -> CodeGenResult<ClassFile> {
        let class_name = self.program.name.as_str();
        log::debug!("generating class {} ({} functions)", class_name, self.program.functions.len());

        let this_class = self.pool.intern_class(class_name)?;
        let super_class = self.pool.intern_class(&self.config.super_class)?;
        self.code_attr_name = self.pool.intern_utf8(CODE_ATTRIBUTE_NAME)?;

        self.register_functions()?;

        if self.config.emit_default_constructor {
            if self.program.function(CONSTRUCTOR_METHOD_NAME).is_some() {
                log::warn!("{} defines its own {}; no default constructor added", class_name, CONSTRUCTOR_METHOD_NAME);
            } else {
                self.default_constructor()?;
            }
        }

        for function in &self.program.functions {
            self.compile_function(function)?;
        }

        let mut class_file = ClassFile::new();
        class_file.major_version = self.config.major_version;
        class_file.access_flags = self.config.class_access_flags;
        class_file.this_class = this_class;
        class_file.super_class = super_class;
        class_file.methods = self.infos;
        class_file.constant_pool = self.pool;
        log::debug!(
            "class {} done: {} methods, {} constant pool slots",
            class_name,
            class_file.methods.len(),
            class_file.constant_pool.len()
        );
        Ok(class_file)
    }

    fn register_functions(&mut self) -> CodeGenResult<()> {
        for function in &self.program.functions {
            let mut entry = MethodEntry::for_function(&self.program.name, function);
            entry.method_ref = Some(self.pool.intern_method_ref(&entry.class, &entry.jvm_name, &entry.descriptor)?);
            self.methods.register(entry)?;
        }
        Ok(())
    }

    fn push_method(&mut self, access_flags: u16, name: &str, descriptor: &str, finished: FinishedCode) -> CodeGenResult<()> {
        let name_index = self.pool.intern_utf8(name)?;
        let descriptor_index = self.pool.intern_utf8(descriptor)?;
        let code = CodeAttribute::from_finished(self.code_attr_name, finished);
        self.emitted_code += code.code.len();
        self.infos.push(MethodInfo::new(access_flags, name_index, descriptor_index, code));
        Ok(())
    }

    /// `<init>()V` that only calls the superclass constructor.
    fn default_constructor(&mut self) -> CodeGenResult<()> {
        let super_init = self.pool.intern_method_ref(&self.config.super_class, CONSTRUCTOR_METHOD_NAME, "()V")?;
        let mut code = Code::new(1, self.config.debug_code);
        code.emit_load(StackKind::Reference, 0)?;
        code.emit_invoke(INVOKESPECIAL, super_init, 0, 0)?;
        code.emit_return(None)?;
        let finished = code.finalize().map_err(|e| CodeGenError::from(e).in_function(CONSTRUCTOR_METHOD_NAME))?;
        self.push_method(
            super::defs::access_flags::ACC_PUBLIC,
            CONSTRUCTOR_METHOD_NAME,
            "()V",
            finished,
        )
    }

    fn compile_function(&mut self, function: &Function) -> CodeGenResult<()> {
        let index = self
            .methods
            .defined(&function.name)
            .ok_or_else(|| CodeGenError::unresolved(&function.name))?;
        let entry = self.methods.get(index).clone();
        log::debug!("compiling {}{}", function.name, entry.descriptor);

        let reserved = if !function.is_static || method::is_entry_point(function) { 1 } else { 0 };
        let finished = MethodGen::new(&mut self.pool, &self.methods, function, reserved, self.config.debug_code)
            .and_then(MethodGen::compile)
            .map_err(|e| e.in_function(&function.name))?;

        let slot = self.methods.get_mut(index);
        slot.code_length = finished.code.len();
        slot.code_offset = self.emitted_code;
        log::trace!(
            "{}: {} bytes, max_stack {}, max_locals {}",
            function.name,
            finished.code.len(),
            finished.max_stack,
            finished.max_locals
        );
        self.push_method(entry.access_flags, &entry.jvm_name, &entry.descriptor, finished)
    }
}

/// Break and continue targets of the innermost loop
#[derive(Debug, Clone, Copy)]
struct LoopLabels {
    end: Label,
    compare: Label,
}

/// Compiles one function body
struct MethodGen<'g> {
    pool: &'g mut ConstantPool,
    methods: &'g MethodTable,
    function: &'g Function,
    locals: SymbolAllocator,
    code: Code,
    loops: Vec<LoopLabels>,
}

/// Offset of a comparison from the `eq` member of its branch family.
fn compare_offset(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Eq => 0,
        BinaryOp::Ne => 1,
        BinaryOp::Lt => 2,
        BinaryOp::Ge => 3,
        BinaryOp::Gt => 4,
        BinaryOp::Le => 5,
        _ => 0,
    }
}

/// Whether control cannot fall off the end of `block`: some statement in it
/// returns, breaks, continues, or is an if/else whose arms all terminate.
pub fn terminates(block: &[Stmt]) -> bool {
    block.iter().any(stmt_terminates)
}

fn stmt_terminates(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) | Stmt::Break | Stmt::Continue => true,
        Stmt::If(s) => match &s.else_block {
            Some(else_block) => terminates(&s.then_block) && terminates(else_block),
            None => false,
        },
        _ => false,
    }
}

impl<'g> MethodGen<'g> {
    fn new(
        pool: &'g mut ConstantPool,
        methods: &'g MethodTable,
        function: &'g Function,
        reserved: u16,
        debug_code: bool,
    ) -> CodeGenResult<Self> {
        let locals = SymbolAllocator::for_function(function, reserved)?;
        let code = Code::new(locals.max_locals(), debug_code);
        Ok(Self { pool, methods, function, locals, code, loops: Vec::new() })
    }

    fn compile(mut self) -> CodeGenResult<FinishedCode> {
        let body = &self.function.body;
        self.compile_block(body)?;
        if !terminates(body) {
            if self.function.return_type.is_void() {
                self.code.emit_return(None)?;
            } else {
                return Err(CodeGenError::MissingReturn { function: self.function.name.clone() });
            }
        }
        let max_locals = self.locals.max_locals();
        let mut finished = self.code.finalize()?;
        finished.max_locals = finished.max_locals.max(max_locals);
        Ok(finished)
    }

    fn compile_block(&mut self, block: &[Stmt]) -> CodeGenResult<()> {
        for (i, stmt) in block.iter().enumerate() {
            self.compile_stmt(stmt)?;
            if stmt_terminates(stmt) {
                if i + 1 < block.len() {
                    log::debug!("{}: {} unreachable statement(s) skipped", self.function.name, block.len() - i - 1);
                }
                break;
            }
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> CodeGenResult<()> {
        match stmt {
            Stmt::VarDec(dec) => self.compile_var_dec(dec),
            Stmt::VarAssign(assign) => {
                let local = self.locals.resolve(&assign.name)?;
                let (slot, ty) = (local.slot, local.ty.clone());
                self.compile_expr_to(&assign.value, &ty)?;
                self.store(&ty, slot)
            }
            Stmt::Return(value) => self.compile_return(value.as_ref()),
            Stmt::If(s) => self.compile_if(s),
            Stmt::While(s) => self.compile_while(s),
            Stmt::Break => {
                let target = self.innermost_loop("break")?.end;
                Ok(self.code.emit_branch(GOTO, target)?)
            }
            Stmt::Continue => {
                let target = self.innermost_loop("continue")?.compare;
                Ok(self.code.emit_branch(GOTO, target)?)
            }
            Stmt::FuncCall(call) => {
                let returned = self.compile_call(call)?;
                if let Some(kind) = types::stack_kind(&returned) {
                    self.code.emitop(kind.pop_op())?;
                }
                Ok(())
            }
        }
    }

    fn innermost_loop(&self, what: &str) -> CodeGenResult<LoopLabels> {
        self.loops
            .last()
            .copied()
            .ok_or_else(|| CodeGenError::contract(format!("'{}' outside of a loop", what)))
    }

    fn compile_var_dec(&mut self, dec: &VarDec) -> CodeGenResult<()> {
        // the initializer cannot see the variable it initializes
        match &dec.init {
            Some(init) => self.compile_expr_to(init, &dec.ty)?,
            None => self.default_value(&dec.ty)?,
        }
        let slot = self.locals.declare(&dec.name, &dec.ty)?;
        self.store(&dec.ty, slot)
    }

    /// Push the value an uninitialized local of type `ty` starts with.
    fn default_value(&mut self, ty: &DataType) -> CodeGenResult<()> {
        match types::value_kind(ty)? {
            StackKind::Int => self.code.emitop(ICONST_0)?,
            StackKind::Long => self.code.emitop(LCONST_0)?,
            StackKind::Reference => match types::object_class(ty) {
                Some(class) => {
                    let class_index = self.pool.intern_class(class)?;
                    let init = self.pool.intern_method_ref(class, CONSTRUCTOR_METHOD_NAME, "()V")?;
                    self.code.emit_new(class_index)?;
                    self.code.emitop(DUP)?;
                    self.code.emit_invoke(INVOKESPECIAL, init, 0, 0)?;
                }
                None => self.code.emitop(ACONST_NULL)?,
            },
        }
        Ok(())
    }

    fn store(&mut self, ty: &DataType, slot: u16) -> CodeGenResult<()> {
        let kind = types::value_kind(ty)?;
        Ok(self.code.emit_store(kind, slot)?)
    }

    fn compile_return(&mut self, value: Option<&Expr>) -> CodeGenResult<()> {
        let return_type = &self.function.return_type;
        match (value, types::stack_kind(return_type)) {
            (Some(value), Some(kind)) => {
                self.compile_expr_to(value, return_type)?;
                self.code.emit_return(Some(kind))?;
            }
            (None, None) => self.code.emit_return(None)?,
            (Some(_), None) => {
                return Err(CodeGenError::contract(format!(
                    "void function '{}' returns a value",
                    self.function.name
                )))
            }
            (None, Some(_)) => {
                return Err(CodeGenError::contract(format!(
                    "function '{}' returns without a value",
                    self.function.name
                )))
            }
        }
        Ok(())
    }

    fn compile_if(&mut self, s: &IfStmt) -> CodeGenResult<()> {
        let false_label = self.code.new_label();
        self.compile_cond(&s.cond, false, false_label)?;
        self.compile_block(&s.then_block)?;
        match &s.else_block {
            None => self.code.place_label(false_label)?,
            Some(else_block) => {
                let end = self.code.new_label();
                if !terminates(&s.then_block) {
                    self.code.emit_branch(GOTO, end)?;
                }
                self.code.place_label(false_label)?;
                self.compile_block(else_block)?;
                if !terminates(else_block) {
                    self.code.emit_branch(GOTO, end)?;
                }
                self.code.place_label(end)?;
            }
        }
        Ok(())
    }

    fn compile_while(&mut self, s: &WhileStmt) -> CodeGenResult<()> {
        let compare = self.code.new_label();
        let body = self.code.new_label();
        let end = self.code.new_label();

        self.code.emit_branch(GOTO, compare)?;
        self.code.place_label(body)?;
        self.loops.push(LoopLabels { end, compare });
        let compiled = self.compile_block(&s.body);
        self.loops.pop();
        compiled?;
        self.code.place_label(compare)?;
        self.compile_cond(&s.cond, true, body)?;
        self.code.place_label(end)?;
        Ok(())
    }

    /// Branch to `target` when `cond` evaluates to `jump_if`, fall through otherwise.
    fn compile_cond(&mut self, cond: &Expr, jump_if: bool, target: Label) -> CodeGenResult<()> {
        match cond {
            Expr::Binary(b) if b.op.is_comparison() => self.compile_compare(b, jump_if, target),
            Expr::Binary(b) if b.op == BinaryOp::LogicalAnd => {
                if jump_if {
                    let skip = self.code.new_label();
                    self.compile_cond(&b.lhs, false, skip)?;
                    self.compile_cond(&b.rhs, true, target)?;
                    self.code.place_label(skip)?;
                } else {
                    self.compile_cond(&b.lhs, false, target)?;
                    self.compile_cond(&b.rhs, false, target)?;
                }
                Ok(())
            }
            Expr::Binary(b) if b.op == BinaryOp::LogicalOr => {
                if jump_if {
                    self.compile_cond(&b.lhs, true, target)?;
                    self.compile_cond(&b.rhs, true, target)?;
                } else {
                    let skip = self.code.new_label();
                    self.compile_cond(&b.lhs, true, skip)?;
                    self.compile_cond(&b.rhs, false, target)?;
                    self.code.place_label(skip)?;
                }
                Ok(())
            }
            Expr::Unary(u) if u.op == UnaryOp::LogicalNot => self.compile_cond(&u.operand, !jump_if, target),
            _ => {
                match types::value_kind(cond.ty())? {
                    StackKind::Int => self.compile_expr(cond)?,
                    StackKind::Long => {
                        self.compile_expr(cond)?;
                        self.code.emitop(LCONST_0)?;
                        self.code.emitop(LCMP)?;
                    }
                    StackKind::Reference => {
                        return Err(CodeGenError::contract(format!("reference value used as condition: {}", cond)))
                    }
                }
                let op = if jump_if { IFNE } else { IFEQ };
                Ok(self.code.emit_branch(op, target)?)
            }
        }
    }

    fn compile_compare(&mut self, b: &BinaryExpr, jump_if: bool, target: Label) -> CodeGenResult<()> {
        let lhs_kind = types::value_kind(b.lhs.ty())?;
        let rhs_kind = types::value_kind(b.rhs.ty())?;
        let offset = compare_offset(b.op);

        let op = match (lhs_kind, rhs_kind) {
            (StackKind::Reference, StackKind::Reference) => {
                if !matches!(b.op, BinaryOp::Eq | BinaryOp::Ne) {
                    return Err(CodeGenError::contract(format!("ordered comparison of references: {}", Expr::Binary(b.clone()))));
                }
                self.compile_expr(&b.lhs)?;
                self.compile_expr(&b.rhs)?;
                IF_ACMPEQ + offset
            }
            (StackKind::Reference, _) | (_, StackKind::Reference) => {
                return Err(CodeGenError::contract(format!("comparison of a reference with an integer: {}", Expr::Binary(b.clone()))))
            }
            _ => {
                let long = lhs_kind == StackKind::Long || rhs_kind == StackKind::Long;
                let unsigned = types::needs_unsigned_ops(b.lhs.ty()) || types::needs_unsigned_ops(b.rhs.ty());
                let kind = if long { StackKind::Long } else { StackKind::Int };
                self.compile_expr_as(&b.lhs, kind)?;
                self.compile_expr_as(&b.rhs, kind)?;
                let ordered = !matches!(b.op, BinaryOp::Eq | BinaryOp::Ne);
                match (long, unsigned && ordered) {
                    (false, false) => IF_ICMPEQ + offset,
                    (false, true) => {
                        self.invoke_static("java/lang/Integer", "compareUnsigned", "(II)I", 2, 1)?;
                        IFEQ + offset
                    }
                    (true, false) => {
                        self.code.emitop(LCMP)?;
                        IFEQ + offset
                    }
                    (true, true) => {
                        self.invoke_static("java/lang/Long", "compareUnsigned", "(JJ)I", 4, 1)?;
                        IFEQ + offset
                    }
                }
            }
        };
        let op = if jump_if { op } else { negate(op).unwrap_or(op) };
        Ok(self.code.emit_branch(op, target)?)
    }

    fn invoke_static(&mut self, class: &str, name: &str, desc: &str, arg_size: u16, return_size: u16) -> CodeGenResult<()> {
        let index = self.pool.intern_method_ref(class, name, desc)?;
        Ok(self.code.emit_invoke(INVOKESTATIC, index, arg_size, return_size)?)
    }

    /// Push `cond` as 0 or 1.
    fn compile_bool_value(&mut self, cond: &Expr) -> CodeGenResult<()> {
        let false_label = self.code.new_label();
        let end = self.code.new_label();
        self.compile_cond(cond, false, false_label)?;
        self.code.emitop(ICONST_1)?;
        self.code.emit_branch(GOTO, end)?;
        self.code.place_label(false_label)?;
        self.code.emitop(ICONST_0)?;
        self.code.place_label(end)?;
        Ok(())
    }

    /// Push `expr` converted to the representation of `ty`.
    fn compile_expr_to(&mut self, expr: &Expr, ty: &DataType) -> CodeGenResult<()> {
        let to = types::value_kind(ty)?;
        let from = types::value_kind(expr.ty())?;
        if (from == StackKind::Reference) != (to == StackKind::Reference) {
            return Err(CodeGenError::contract(format!(
                "cannot use {} value '{}' as {}",
                expr.ty(),
                expr,
                ty
            )));
        }
        self.compile_expr(expr)?;
        self.convert(expr.ty(), ty)
    }

    /// Push `expr` as a JVM int or long.
    fn compile_expr_as(&mut self, expr: &Expr, kind: StackKind) -> CodeGenResult<()> {
        self.compile_expr(expr)?;
        self.widen(expr.ty(), kind)
    }

    fn widen(&mut self, from: &DataType, to: StackKind) -> CodeGenResult<()> {
        match (types::value_kind(from)?, to) {
            (StackKind::Int, StackKind::Long) => {
                self.code.emitop(I2L)?;
                if types::needs_unsigned_ops(from) {
                    // zero-extend u32
                    let mask = self.pool.intern_long(0xffff_ffff)?;
                    self.code.emit_ldc2(mask)?;
                    self.code.emitop(LAND)?;
                }
            }
            (StackKind::Long, StackKind::Int) => self.code.emitop(L2I)?,
            _ => {}
        }
        Ok(())
    }

    fn convert(&mut self, from: &DataType, to: &DataType) -> CodeGenResult<()> {
        if from == to {
            return Ok(());
        }
        let kind = types::value_kind(to)?;
        if kind == StackKind::Reference {
            return Ok(());
        }
        self.widen(from, kind)?;
        self.narrow(to)
    }

    fn narrow(&mut self, ty: &DataType) -> CodeGenResult<()> {
        match types::narrowing(ty) {
            Some(Narrowing::Convert(op)) => self.code.emitop(op)?,
            Some(Narrowing::Mask(mask)) => {
                self.push_int(mask)?;
                self.code.emitop(IAND)?;
            }
            None => {}
        }
        Ok(())
    }

    fn push_int(&mut self, value: i32) -> CodeGenResult<()> {
        if !self.code.emit_small_int(value)? {
            let index = self.pool.intern_integer(value)?;
            self.code.emit_ldc(index)?;
        }
        Ok(())
    }

    fn push_long(&mut self, value: i64) -> CodeGenResult<()> {
        match value {
            0 => self.code.emitop(LCONST_0)?,
            1 => self.code.emitop(LCONST_1)?,
            _ => {
                let index = self.pool.intern_long(value)?;
                self.code.emit_ldc2(index)?;
            }
        }
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expr) -> CodeGenResult<()> {
        match expr {
            Expr::Identifier { name, ty } => {
                let local = self.locals.resolve(name)?;
                let kind = types::value_kind(&local.ty)?;
                if types::stack_kind(ty) != Some(kind) {
                    return Err(CodeGenError::contract(format!(
                        "'{}' is declared {} but used as {}",
                        name, local.ty, ty
                    )));
                }
                let slot = local.slot;
                self.code.emit_load(kind, slot)?;
            }
            Expr::IntLiteral { value, ty } => match types::value_kind(ty)? {
                StackKind::Int => {
                    let bits = i32::try_from(*value)
                        .ok()
                        .or_else(|| if ty.is_unsigned() { u32::try_from(*value).ok().map(|v| v as i32) } else { None })
                        .ok_or_else(|| CodeGenError::contract(format!("literal {} does not fit {}", value, ty)))?;
                    self.push_int(bits)?;
                }
                StackKind::Long => self.push_long(*value)?,
                StackKind::Reference => {
                    return Err(CodeGenError::contract(format!("integer literal {} typed {}", value, ty)))
                }
            },
            Expr::CharLiteral(c) => {
                let unit = u16::try_from(*c as u32)
                    .map_err(|_| CodeGenError::contract(format!("character {:?} is outside the 16-bit range", c)))?;
                self.push_int(unit as i32)?;
            }
            Expr::StringLiteral(s) => {
                let index = self.pool.intern_string(s)?;
                self.code.emit_ldc(index)?;
            }
            Expr::Binary(b) if b.op.is_comparison() || b.op.is_logical() => self.compile_bool_value(expr)?,
            Expr::Binary(b) => self.compile_arith(b)?,
            Expr::Unary(u) => match u.op {
                UnaryOp::LogicalNot => self.compile_bool_value(expr)?,
                UnaryOp::Neg | UnaryOp::Not => {
                    let kind = self.integer_kind(&u.ty, expr)?;
                    self.compile_expr_as(&u.operand, kind)?;
                    match (u.op, kind) {
                        (UnaryOp::Neg, StackKind::Long) => self.code.emitop(LNEG)?,
                        (UnaryOp::Neg, _) => self.code.emitop(INEG)?,
                        (_, StackKind::Long) => {
                            self.push_long(-1)?;
                            self.code.emitop(LXOR)?;
                        }
                        _ => {
                            self.code.emitop(ICONST_M1)?;
                            self.code.emitop(IXOR)?;
                        }
                    }
                    self.narrow(&u.ty)?;
                }
            },
            Expr::FuncCall(call) => {
                let returned = self.compile_call(call)?;
                let kind = types::stack_kind(&returned)
                    .ok_or_else(|| CodeGenError::contract(format!("void call {} used as a value", call)))?;
                if types::stack_kind(&call.ty) != Some(kind) {
                    return Err(CodeGenError::contract(format!(
                        "call {} typed {} but returns {}",
                        call, call.ty, returned
                    )));
                }
            }
        }
        Ok(())
    }

    fn integer_kind(&self, ty: &DataType, expr: &Expr) -> CodeGenResult<StackKind> {
        match types::value_kind(ty)? {
            StackKind::Reference => Err(CodeGenError::contract(format!("arithmetic on {} value: {}", ty, expr))),
            kind => Ok(kind),
        }
    }

    fn compile_arith(&mut self, b: &BinaryExpr) -> CodeGenResult<()> {
        let whole = Expr::Binary(b.clone());
        let kind = self.integer_kind(&b.ty, &whole)?;
        self.integer_kind(b.lhs.ty(), &whole)?;
        self.integer_kind(b.rhs.ty(), &whole)?;
        let long = kind == StackKind::Long;
        let unsigned = types::needs_unsigned_ops(&b.ty);

        self.compile_expr_as(&b.lhs, kind)?;
        let shift = matches!(b.op, BinaryOp::Shl | BinaryOp::Shr);
        // shift distances are always ints
        self.compile_expr_as(&b.rhs, if shift { StackKind::Int } else { kind })?;

        let pick = |int_op: u8, long_op: u8| if long { long_op } else { int_op };
        match b.op {
            BinaryOp::Add => self.code.emitop(pick(IADD, LADD))?,
            BinaryOp::Sub => self.code.emitop(pick(ISUB, LSUB))?,
            BinaryOp::Mul => self.code.emitop(pick(IMUL, LMUL))?,
            BinaryOp::Div | BinaryOp::Mod if unsigned => {
                let name = if b.op == BinaryOp::Div { "divideUnsigned" } else { "remainderUnsigned" };
                if long {
                    self.invoke_static("java/lang/Long", name, "(JJ)J", 4, 2)?;
                } else {
                    self.invoke_static("java/lang/Integer", name, "(II)I", 2, 1)?;
                }
            }
            BinaryOp::Div => self.code.emitop(pick(IDIV, LDIV))?,
            BinaryOp::Mod => self.code.emitop(pick(IREM, LREM))?,
            BinaryOp::And => self.code.emitop(pick(IAND, LAND))?,
            BinaryOp::Or => self.code.emitop(pick(IOR, LOR))?,
            BinaryOp::Xor => self.code.emitop(pick(IXOR, LXOR))?,
            BinaryOp::Shl => self.code.emitop(pick(ISHL, LSHL))?,
            BinaryOp::Shr if b.ty.is_unsigned() => self.code.emitop(pick(IUSHR, LUSHR))?,
            BinaryOp::Shr => self.code.emitop(pick(ISHR, LSHR))?,
            _ => return Err(CodeGenError::contract(format!("{} is not arithmetic", b.op.symbol()))),
        }
        self.narrow(&b.ty)
    }

    /// Emit a call and return the type the callee leaves on the stack.
    fn compile_call(&mut self, call: &FuncCall) -> CodeGenResult<DataType> {
        if let Some(object) = &call.object {
            return self.compile_method_call(object, call);
        }

        let arg_types: Vec<DataType> = call.args.iter().map(|a| a.ty().clone()).collect();
        let methods = self.methods;
        let index = methods.resolve(&call.name, &arg_types)?;
        let entry = methods.get(index);
        let mut args = call.args.iter().zip(entry.params.iter());

        let op = match &entry.receiver {
            Receiver::None => INVOKESTATIC,
            Receiver::This => {
                if self.function.is_static {
                    return Err(CodeGenError::contract(format!(
                        "instance function '{}' called from static function '{}'",
                        entry.name, self.function.name
                    )));
                }
                self.code.emit_load(StackKind::Reference, 0)?;
                if entry.access_flags & super::defs::access_flags::ACC_PRIVATE != 0 {
                    INVOKESPECIAL
                } else {
                    INVOKEVIRTUAL
                }
            }
            Receiver::FirstArg => {
                let (receiver, ty) = args
                    .next()
                    .ok_or_else(|| CodeGenError::contract(format!("'{}' needs a receiver argument", entry.name)))?;
                self.compile_expr_to(receiver, ty)?;
                INVOKEVIRTUAL
            }
            Receiver::StaticField { class, name, descriptor } => {
                let field = self.pool.intern_field_ref(class, name, descriptor)?;
                self.code.emit_getstatic(field, 1)?;
                INVOKEVIRTUAL
            }
        };
        if entry.entry_point {
            self.code.emitop(ACONST_NULL)?;
        }
        for (arg, ty) in args {
            self.compile_expr_to(arg, ty)?;
        }
        let method_ref = match entry.method_ref {
            Some(index) => index,
            None => self.pool.intern_method_ref(&entry.class, &entry.jvm_name, &entry.descriptor)?,
        };
        self.code.emit_invoke(op, method_ref, entry.arg_size(), entry.return_size())?;
        Ok(entry.return_type.clone())
    }

    /// `object.name(args)` on an object-typed local; the descriptor follows the argument types.
    fn compile_method_call(&mut self, object: &str, call: &FuncCall) -> CodeGenResult<DataType> {
        let local = self.locals.resolve(object)?;
        let class = types::object_class(&local.ty)
            .ok_or_else(|| CodeGenError::contract(format!("'{}' of type {} has no methods", object, local.ty)))?
            .to_string();
        let slot = local.slot;
        self.code.emit_load(StackKind::Reference, slot)?;

        let mut arg_size = 0;
        for arg in &call.args {
            types::value_kind(arg.ty())?;
            self.compile_expr(arg)?;
            arg_size += types::slot_width(arg.ty());
        }
        let desc = descriptor::method_descriptor(call.args.iter().map(|a| a.ty()), &call.ty);
        let method_ref = self.pool.intern_method_ref(&class, &call.name, &desc)?;
        self.code.emit_invoke(INVOKEVIRTUAL, method_ref, arg_size, types::slot_width(&call.ty))?;
        Ok(call.ty.clone())
    }
}
