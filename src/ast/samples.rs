//! Small ready-made programs for the CLI `demo` command and for tests

use super::*;

fn int_var(name: &str) -> Expr {
    Expr::ident(name, DataType::I32)
}

/// `max(a, b)` returning the larger argument.
pub fn max_program() -> Program {
    Program::new("Max").with_function(Function::new(
        "max",
        vec![Param::new("a", DataType::I32), Param::new("b", DataType::I32)],
        DataType::I32,
        vec![Stmt::if_else(
            Expr::binary(BinaryOp::Gt, int_var("a"), int_var("b")),
            vec![Stmt::ret(int_var("a"))],
            Some(vec![Stmt::ret(int_var("b"))]),
        )],
    ))
}

/// `count(n)` counting up to `n` one step at a time, printing each step.
pub fn loop_program() -> Program {
    Program::new("Loop").with_function(Function::new(
        "count",
        vec![Param::new("n", DataType::I32)],
        DataType::I32,
        vec![
            Stmt::var("i", DataType::I32, Some(Expr::int(0))),
            Stmt::while_loop(
                Expr::binary(BinaryOp::Lt, int_var("i"), int_var("n")),
                vec![
                    Stmt::assign("i", Expr::binary(BinaryOp::Add, int_var("i"), Expr::int(1))),
                    Stmt::call("println", vec![int_var("i")]),
                ],
            ),
            Stmt::ret(int_var("i")),
        ],
    ))
}

/// `main()` printing a greeting.
pub fn hello_program() -> Program {
    Program::new("Hello").with_function(Function::new(
        "main",
        vec![],
        DataType::Void,
        vec![
            Stmt::var("greeting", DataType::String, Some(Expr::string("Hello, "))),
            Stmt::call(
                "println",
                vec![Expr::call(
                    "strcat",
                    vec![Expr::ident("greeting", DataType::String), Expr::string("world!")],
                    DataType::String,
                )],
            ),
        ],
    ))
}

/// Sample by its CLI name.
pub fn by_name(name: &str) -> Option<Program> {
    match name {
        "max" => Some(max_program()),
        "loop" => Some(loop_program()),
        "hello" => Some(hello_program()),
        _ => None,
    }
}
