mod common;

use common::*;
use jclassgen::ast::samples;
use jclassgen::ast::{BinaryOp, DataType, Expr, Function, Param, Program, Stmt};
use jclassgen::codegen::opcodes::{GOTO, IRETURN};
use jclassgen::codegen::CodeGenError;
use jclassgen::{compile, Config, Error};

fn pick_program(then_returns: bool) -> Program {
    let then_block = if then_returns {
        vec![Stmt::ret(int("x"))]
    } else {
        vec![Stmt::call("println", vec![Expr::int(1)])]
    };
    single(
        "Pick",
        Function::new(
            "pick",
            vec![Param::new("c", DataType::Bool), int_param("x")],
            DataType::I32,
            vec![
                Stmt::if_else(
                    Expr::ident("c", DataType::Bool),
                    then_block,
                    Some(vec![Stmt::call("println", vec![int("x")])]),
                ),
                Stmt::ret(Expr::int(0)),
            ],
        ),
    )
}

#[test]
fn no_jump_after_returning_branch() {
    init_logger();
    let class = compile_and_read(&pick_program(true));
    let code = code_of(&class, "pick");
    let ops = instructions(code);

    let first_return = ops.iter().position(|(_, op)| *op == IRETURN).unwrap();
    assert_ne!(ops[first_return + 1].1, GOTO, "returning branch must not jump out");
    // only the else branch jumps to the join point
    assert_eq!(count_op(code, GOTO), 1);
    let goto_at = ops.iter().find(|(_, op)| *op == GOTO).unwrap().0;
    assert!(goto_at > ops[first_return].0);

    assert_eq!(run_int(&class, "pick", &[1, 42]), 42);
    assert_eq!(run_int(&class, "pick", &[0, 42]), 0);
}

#[test]
fn both_branches_jump_when_neither_terminates() {
    let class = compile_and_read(&pick_program(false));
    assert_eq!(count_op(code_of(&class, "pick"), GOTO), 2);
}

#[test]
fn if_without_else_has_no_jump() {
    let program = single(
        "Abs",
        Function::new(
            "abs",
            vec![int_param("x")],
            DataType::I32,
            vec![
                Stmt::if_else(
                    bin(BinaryOp::Lt, int("x"), Expr::int(0)),
                    vec![Stmt::assign("x", Expr::unary(jclassgen::ast::UnaryOp::Neg, int("x")))],
                    None,
                ),
                Stmt::ret(int("x")),
            ],
        ),
    );
    let class = compile_and_read(&program);
    assert_eq!(count_op(code_of(&class, "abs"), GOTO), 0);
    assert_eq!(run_int(&class, "abs", &[-5]), 5);
    assert_eq!(run_int(&class, "abs", &[6]), 6);
}

#[test]
fn every_branch_lands_on_an_instruction() {
    init_logger();
    let programs = [
        samples::max_program(),
        samples::loop_program(),
        counter_program(3),
        pick_program(true),
        pick_program(false),
    ];
    for program in &programs {
        let class = compile_and_read(program);
        for method in &class.methods {
            let code = &method.code.code;
            let starts: Vec<i64> = instructions(code).iter().map(|(pc, _)| *pc as i64).collect();
            for (at, target) in branches(code) {
                assert!(
                    starts.contains(&target),
                    "{}: branch at {} targets {} which is not an instruction start",
                    program.name,
                    at,
                    target
                );
            }
        }
    }
}

#[test]
fn loop_condition_is_tested_at_the_bottom() {
    let class = compile_and_read(&counter_program(3));
    let code = code_of(&class, "counter");
    let jumps = branches(code);
    // a forward goto to the test, then a backward conditional branch into the body
    assert_eq!(code[jumps[0].0], GOTO);
    assert!(jumps[0].1 > jumps[0].0 as i64);
    let (back_at, back_target) = jumps[1];
    assert!(back_target < back_at as i64);
    assert_eq!(back_target, jumps[0].0 as i64 + 3);
}

#[test]
fn falling_off_non_void_function_is_rejected() {
    let program = single(
        "Missing",
        Function::new(
            "sign",
            vec![int_param("x")],
            DataType::I32,
            vec![Stmt::if_else(
                bin(BinaryOp::Gt, int("x"), Expr::int(0)),
                vec![Stmt::ret(Expr::int(1))],
                None,
            )],
        ),
    );
    match compile(&program, &Config::default()) {
        Err(Error::CodeGen(CodeGenError::MissingReturn { function })) => assert_eq!(function, "sign"),
        other => panic!("expected MissingReturn, got {:?}", other.map(|b| b.len())),
    }
}

#[test]
fn both_branches_returning_needs_no_trailing_return() {
    // max ends in an if/else where both arms return
    let class = compile_and_read(&samples::max_program());
    let code = code_of(&class, "max");
    assert_eq!(count_op(code, IRETURN), 2);
    assert_eq!(*code.last().unwrap(), IRETURN);
}

#[test]
fn return_before_the_last_statement_ends_the_function() {
    let program = single(
        "Early",
        Function::new(
            "early",
            vec![int_param("x")],
            DataType::I32,
            vec![
                Stmt::ret(int("x")),
                Stmt::call("println", vec![Expr::int(2)]),
            ],
        ),
    );
    let class = compile_and_read(&program);
    let code = code_of(&class, "early");
    assert_eq!(*code.last().unwrap(), IRETURN);
    assert_eq!(count_op(code, IRETURN), 1);
    assert_eq!(run_int(&class, "early", &[9]), 9);
}
