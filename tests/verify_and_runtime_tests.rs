mod common;

use common::*;
use jclassgen::ast::samples;
use jclassgen::codegen::opcodes::{GOTO, IF_ICMPLE};
use jclassgen::codegen::{class_file_to_bytes, generate_class};
use jclassgen::rt::{disasm, read_class, Interpreter, RuntimeError, Value};
use jclassgen::verify::methods::MethodVerifyError;
use jclassgen::verify::{verify, VerifyError};
use jclassgen::{compile, Config};

#[test]
fn samples_pass_structural_verification() {
    init_logger();
    for name in ["max", "loop", "hello"] {
        let program = samples::by_name(name).unwrap();
        let class = compile_and_read(&program);
        assert_eq!(verify(&class), Ok(()), "{}", name);
    }
}

#[test]
fn branch_into_an_operand_is_rejected() {
    let mut class = generate_class(&counter_program(1000), &Config::default()).unwrap();
    let method = class.methods.iter_mut().find(|m| m.code.code[2] == GOTO).unwrap();
    // the loop test starts with iload_0 then sipush; aim into the sipush operand
    let code = &mut method.code.code;
    let offset = i16::from_be_bytes([code[3], code[4]]) + 2;
    code[3..5].copy_from_slice(&offset.to_be_bytes());
    match verify(&class) {
        Err(VerifyError::Method(MethodVerifyError::BadBranchTarget { method, at, .. })) => {
            assert_eq!(method, "counter");
            assert_eq!(at, 2);
        }
        other => panic!("expected BadBranchTarget, got {:?}", other),
    }
}

#[test]
fn wrong_version_is_rejected() {
    let mut class = generate_class(&samples::max_program(), &Config::default()).unwrap();
    class.major_version = 20;
    assert_eq!(verify(&class), Err(VerifyError::UnsupportedVersion(20)));
}

#[test]
fn reader_rejects_damaged_bytes() {
    let bytes = compile(&samples::max_program(), &Config::default()).unwrap();

    let mut bad_magic = bytes.clone();
    bad_magic[0] = 0;
    assert!(matches!(read_class(&bad_magic), Err(RuntimeError::BadMagic(_))));

    let truncated = &bytes[..bytes.len() / 2];
    assert!(matches!(read_class(truncated), Err(RuntimeError::Truncated { .. })));
}

#[test]
fn read_back_matches_written_class() {
    let class = generate_class(&samples::hello_program(), &Config::default()).unwrap();
    let bytes = class_file_to_bytes(&class);
    let read = read_class(&bytes).unwrap();
    assert_eq!(read.name(), class.name());
    assert_eq!(read.methods.len(), class.methods.len());
    for (a, b) in read.methods.iter().zip(&class.methods) {
        assert_eq!(a.code.code, b.code.code);
        assert_eq!(a.code.max_stack, b.code.max_stack);
        assert_eq!(a.code.max_locals, b.code.max_locals);
    }
    assert_eq!(class_file_to_bytes(&read), bytes);
}

#[test]
fn disassembly_lists_pool_and_code() {
    let class = compile_and_read(&samples::max_program());
    let listing = disasm(&class);
    assert!(listing.starts_with("class Max extends java/lang/Object"));
    assert!(listing.contains("version: 52.0"));
    assert!(listing.contains("Methodref"));
    assert!(listing.contains("java/lang/Object.<init>:()V"));
    assert!(listing.contains("max(II)I flags 0x0009"));
    assert!(listing.contains(jclassgen::codegen::opcodes::mnemonic(IF_ICMPLE)));
    assert!(listing.contains("ireturn"));
}

#[test]
fn endless_loop_hits_step_limit() {
    let class = compile_and_read(&counter_program(i32::MAX as i64));
    let mut interpreter = Interpreter::new(&class).with_step_limit(10_000);
    assert!(matches!(
        interpreter.invoke_static("counter", &[]),
        Err(RuntimeError::StepLimit(10_000))
    ));
    assert!(interpreter.steps() > 10_000);
}

#[test]
fn wrong_argument_count_is_an_error() {
    let class = compile_and_read(&samples::max_program());
    let mut interpreter = Interpreter::new(&class);
    assert!(interpreter.invoke_static("max", &[Value::Int(1)]).is_err());
    assert!(interpreter.invoke_static("min", &[]).is_err());
}
