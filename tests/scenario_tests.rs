mod common;

use common::*;
use jclassgen::ast::samples;
use jclassgen::ast::{BinaryOp, DataType, Expr, Function, Param, Stmt};
use jclassgen::rt::{Interpreter, Value};

#[test]
fn max_returns_larger_argument() {
    init_logger();
    let class = compile_and_read(&samples::max_program());
    assert_eq!(run_int(&class, "max", &[3, 7]), 7);
    assert_eq!(run_int(&class, "max", &[7, 3]), 7);
    assert_eq!(run_int(&class, "max", &[-4, -9]), -4);
    assert_eq!(run_int(&class, "max", &[5, 5]), 5);
}

#[test]
fn while_body_runs_exactly_three_times() {
    init_logger();
    let class = compile_and_read(&samples::loop_program());
    let mut interpreter = Interpreter::new(&class);
    let result = interpreter.invoke_static("count", &[Value::Int(3)]).unwrap();
    assert_eq!(result, Some(Value::Int(3)));
    // one println per body execution
    assert_eq!(interpreter.output(), "1\n2\n3\n");
}

#[test]
fn while_with_false_condition_skips_body() {
    let class = compile_and_read(&samples::loop_program());
    let mut interpreter = Interpreter::new(&class);
    let result = interpreter.invoke_static("count", &[Value::Int(0)]).unwrap();
    assert_eq!(result, Some(Value::Int(0)));
    assert_eq!(interpreter.output(), "");
}

#[test]
fn counter_stops_at_limit() {
    let class = compile_and_read(&counter_program(3));
    assert_eq!(run_int(&class, "counter", &[]), 3);
    let class = compile_and_read(&counter_program(1000));
    assert_eq!(run_int(&class, "counter", &[]), 1000);
}

#[test]
fn break_and_continue() {
    init_logger();
    let i = || int("i");
    let body = vec![
        Stmt::assign("i", bin(BinaryOp::Add, i(), Expr::int(1))),
        Stmt::if_else(
            bin(BinaryOp::Eq, bin(BinaryOp::Mod, i(), Expr::int(2)), Expr::int(0)),
            vec![Stmt::Continue],
            None,
        ),
        Stmt::if_else(bin(BinaryOp::Gt, i(), Expr::int(7)), vec![Stmt::Break], None),
        Stmt::assign("s", bin(BinaryOp::Add, int("s"), i())),
    ];
    let program = single(
        "Odd",
        Function::new(
            "sum_odd",
            vec![int_param("n")],
            DataType::I32,
            vec![
                Stmt::var("i", DataType::I32, Some(Expr::int(0))),
                Stmt::var("s", DataType::I32, Some(Expr::int(0))),
                Stmt::while_loop(bin(BinaryOp::Lt, i(), int("n")), body),
                Stmt::ret(int("s")),
            ],
        ),
    );
    let class = compile_and_read(&program);
    assert_eq!(run_int(&class, "sum_odd", &[4]), 1 + 3);
    assert_eq!(run_int(&class, "sum_odd", &[10]), 1 + 3 + 5 + 7);
    assert_eq!(run_int(&class, "sum_odd", &[0]), 0);
}

#[test]
fn short_circuit_conditions() {
    let x = || int("x");
    let in_range = bin(
        BinaryOp::LogicalAnd,
        bin(BinaryOp::Gt, x(), Expr::int(0)),
        bin(BinaryOp::Lt, x(), Expr::int(10)),
    );
    let outside = bin(
        BinaryOp::LogicalOr,
        bin(BinaryOp::Le, x(), Expr::int(0)),
        bin(BinaryOp::Ge, x(), Expr::int(10)),
    );
    let program = single(
        "Range",
        Function::new(
            "in_range",
            vec![int_param("x")],
            DataType::I32,
            vec![Stmt::if_else(in_range, vec![Stmt::ret(Expr::int(1))], None), Stmt::ret(Expr::int(0))],
        ),
    )
    .with_function(Function::new("outside", vec![int_param("x")], DataType::Bool, vec![Stmt::ret(outside)]));

    let class = compile_and_read(&program);
    for (x, inside) in [(5, 1), (0, 0), (10, 0), (9, 1), (-3, 0)] {
        assert_eq!(run_int(&class, "in_range", &[x]), inside, "in_range({})", x);
        assert_eq!(run_int(&class, "outside", &[x]), 1 - inside, "outside({})", x);
    }
}

#[test]
fn calls_between_generated_functions() {
    let program = samples::max_program().with_function(Function::new(
        "max3",
        vec![int_param("a"), int_param("b"), int_param("c")],
        DataType::I32,
        vec![Stmt::ret(Expr::call(
            "max",
            vec![Expr::call("max", vec![int("a"), int("b")], DataType::I32), int("c")],
            DataType::I32,
        ))],
    ));
    let class = compile_and_read(&program);
    assert_eq!(run_int(&class, "max3", &[1, 9, 4]), 9);
    assert_eq!(run_int(&class, "max3", &[1, 2, 40]), 40);
}

#[test]
fn long_arithmetic() {
    let program = single(
        "Big",
        Function::new(
            "scale",
            vec![Param::new("a", DataType::I32)],
            DataType::I64,
            vec![
                Stmt::var("big", DataType::I64, Some(int("a"))),
                Stmt::assign(
                    "big",
                    bin(
                        BinaryOp::Mul,
                        Expr::ident("big", DataType::I64),
                        Expr::typed_int(1_000_000_000, DataType::I64),
                    ),
                ),
                Stmt::ret(Expr::ident("big", DataType::I64)),
            ],
        ),
    );
    let class = compile_and_read(&program);
    let mut interpreter = Interpreter::new(&class);
    let result = interpreter.invoke_static("scale", &[Value::Int(7)]).unwrap();
    assert_eq!(result, Some(Value::Long(7_000_000_000)));
}

#[test]
fn unsigned_division_and_shift() {
    let u = || Expr::ident("u", DataType::U32);
    let program = single(
        "Unsigned",
        Function::new(
            "half",
            vec![Param::new("u", DataType::U32)],
            DataType::U32,
            vec![Stmt::ret(bin(BinaryOp::Div, u(), Expr::typed_int(2, DataType::U32)))],
        ),
    )
    .with_function(Function::new(
        "shift",
        vec![Param::new("u", DataType::U32)],
        DataType::U32,
        vec![Stmt::ret(bin(BinaryOp::Shr, u(), Expr::typed_int(28, DataType::U32)))],
    ));
    let class = compile_and_read(&program);
    // 0xfffffffe is carried as -2
    assert_eq!(run_int(&class, "half", &[-2]), 0x7fff_ffff);
    assert_eq!(run_int(&class, "shift", &[-1]), 0xf);
}

#[test]
fn hello_prints_concatenation() {
    let class = compile_and_read(&samples::hello_program());
    let mut interpreter = Interpreter::new(&class);
    let result = interpreter
        .invoke("main", "([Ljava/lang/String;)V", None, &[Value::Null])
        .unwrap();
    assert_eq!(result, None);
    assert_eq!(interpreter.output(), "Hello, world!\n");
}

#[test]
fn unsigned_values_print_their_magnitude() {
    init_logger();
    let shows = |ty: DataType| {
        Function::new(
            "show",
            vec![Param::new("u", ty.clone())],
            DataType::Void,
            vec![Stmt::call("println", vec![Expr::ident("u", ty)])],
        )
    };
    let class = compile_and_read(&single("ShowU32", shows(DataType::U32)));
    let mut interpreter = Interpreter::new(&class);
    // u32::MAX travels as the int -1
    interpreter.invoke_static("show", &[Value::Int(-1)]).unwrap();
    assert_eq!(interpreter.output(), "4294967295\n");

    let class = compile_and_read(&single("ShowU16", shows(DataType::U16)));
    let mut interpreter = Interpreter::new(&class);
    interpreter.invoke_static("show", &[Value::Int(65535)]).unwrap();
    assert_eq!(interpreter.output(), "65535\n");
}

#[test]
fn calling_main_passes_an_args_array() {
    init_logger();
    let program = jclassgen::ast::Program::new("Reentry")
        .with_function(Function::new(
            "main",
            vec![],
            DataType::Void,
            vec![Stmt::call("println", vec![Expr::string("in main")])],
        ))
        .with_function(Function::new(
            "twice",
            vec![],
            DataType::Void,
            vec![Stmt::call("main", vec![]), Stmt::call("main", vec![])],
        ));
    let class = compile_and_read(&program);
    assert_eq!(jclassgen::verify::verify(&class), Ok(()));
    let mut interpreter = Interpreter::new(&class);
    interpreter.invoke_static("twice", &[]).unwrap();
    assert_eq!(interpreter.output(), "in main\nin main\n");
}

#[test]
fn nul_and_supplementary_characters_survive_the_class_file() {
    init_logger();
    let text = "a\0b\u{1F600}";
    let program = single(
        "Odd",
        Function::new("odd", vec![], DataType::Void, vec![Stmt::call("println", vec![Expr::string(text)])]),
    );
    let bytes = jclassgen::compile(&program, &jclassgen::Config::default()).unwrap();
    // NUL as C0 80, the emoji as two three-byte surrogates, never a four-byte form
    assert!(bytes.windows(4).any(|w| w == [b'a', 0xC0, 0x80, b'b']));
    assert!(bytes.windows(6).any(|w| w == [0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80]));
    assert!(!bytes.windows(4).any(|w| w == "\u{1F600}".as_bytes()));

    let class = jclassgen::rt::read_class(&bytes).unwrap();
    assert!(class
        .constant_pool
        .entries()
        .any(|(_, c)| matches!(c, jclassgen::codegen::Constant::Utf8(s) if s == text)));
    let mut interpreter = Interpreter::new(&class);
    interpreter.invoke_static("odd", &[]).unwrap();
    assert_eq!(interpreter.output(), "a\0b\u{1F600}\n");
}
