// Common test utilities
#![allow(dead_code)]

use jclassgen::ast::{BinaryOp, DataType, Expr, Function, Param, Program, Stmt};
use jclassgen::codegen::opcodes;
use jclassgen::codegen::ClassFile;
use jclassgen::rt::{read_class, Interpreter, Value};
use jclassgen::{compile, Config};

/// Route `log` output through the test harness; safe to call from every test.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn int(name: &str) -> Expr {
    Expr::ident(name, DataType::I32)
}

pub fn int_param(name: &str) -> Param {
    Param::new(name, DataType::I32)
}

pub fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::binary(op, lhs, rhs)
}

/// Program holding a single function.
pub fn single(class: &str, function: Function) -> Program {
    Program::new(class).with_function(function)
}

/// `counter() -> int { i = 0; while (i < limit) { i = i + 1; } return i; }`
pub fn counter_program(limit: i64) -> Program {
    single(
        "Counter",
        Function::new(
            "counter",
            vec![],
            DataType::I32,
            vec![
                Stmt::var("i", DataType::I32, Some(Expr::int(0))),
                Stmt::while_loop(
                    bin(BinaryOp::Lt, int("i"), Expr::int(limit)),
                    vec![Stmt::assign("i", bin(BinaryOp::Add, int("i"), Expr::int(1)))],
                ),
                Stmt::ret(int("i")),
            ],
        ),
    )
}

/// Compile with the default config and read the bytes back.
pub fn compile_and_read(program: &Program) -> ClassFile {
    let bytes = compile(program, &Config::default()).expect("compilation failed");
    read_class(&bytes).expect("generated class did not parse")
}

/// Run static `name` of `class` and return its int result.
pub fn run_int(class: &ClassFile, name: &str, args: &[i32]) -> i32 {
    let args: Vec<Value> = args.iter().map(|v| Value::Int(*v)).collect();
    let mut interpreter = Interpreter::new(class);
    interpreter
        .invoke_static(name, &args)
        .expect("execution failed")
        .and_then(|v| v.as_int())
        .expect("method returned no int")
}

/// Code bytes of method `name`.
pub fn code_of<'c>(class: &'c ClassFile, name: &str) -> &'c [u8] {
    &class.method(name).expect("missing method").code.code
}

/// Start offset and opcode of every instruction in `code`.
pub fn instructions(code: &[u8]) -> Vec<(usize, u8)> {
    let mut out = Vec::new();
    let mut pc = 0;
    while pc < code.len() {
        let len = opcodes::length_at(code, pc).expect("unknown opcode");
        out.push((pc, code[pc]));
        pc += len;
    }
    out
}

/// `(branch offset, absolute target)` for every branch in `code`.
pub fn branches(code: &[u8]) -> Vec<(usize, i64)> {
    instructions(code)
        .into_iter()
        .filter(|(_, op)| opcodes::is_branch(*op))
        .map(|(pc, _)| {
            let offset = i16::from_be_bytes([code[pc + 1], code[pc + 2]]);
            (pc, pc as i64 + offset as i64)
        })
        .collect()
}

pub fn count_op(code: &[u8], op: u8) -> usize {
    instructions(code).iter().filter(|(_, o)| *o == op).count()
}
