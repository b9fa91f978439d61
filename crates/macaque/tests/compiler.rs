//! Bytecode-shape tests: source in, expected instruction stream and
//! constants out. Expected streams are built with `make` and compared via
//! the disassembler, so failures read as bytecode listings.

use std::rc::Rc;

use pretty_assertions::assert_eq;

use macaque::ast::{Expression, Program, Statement};
use macaque::bytecode::{make, Instructions, Op};
use macaque::compiler::{self, Bytecode};
use macaque::parser;
use macaque::{CompileError, CompiledFunction, Constant};

fn compile(input: &str) -> Bytecode {
    let program = parser::parse(input)
        .unwrap_or_else(|errors| panic!("parse errors for {input:?}:\n{errors}"));
    compiler::compile(&program)
        .unwrap_or_else(|errors| panic!("compile errors for {input:?}:\n{errors}"))
}

fn compile_err(input: &str) -> Vec<CompileError> {
    let program = parser::parse(input)
        .unwrap_or_else(|errors| panic!("parse errors for {input:?}:\n{errors}"));
    match compiler::compile(&program) {
        Ok(_) => panic!("expected compile errors for {input:?}"),
        Err(errors) => errors.0,
    }
}

fn concat(parts: &[Instructions]) -> Instructions {
    let mut out = Instructions::new();
    for part in parts {
        out.extend(part);
    }
    out
}

fn int(value: i64) -> Constant {
    Constant::Int(value)
}

fn string(value: &str) -> Constant {
    Constant::Str(Rc::from(value))
}

fn function(parts: &[Instructions], num_locals: usize, num_parameters: usize) -> Constant {
    Constant::Function(Rc::new(CompiledFunction {
        instructions: concat(parts),
        num_locals,
        num_parameters,
    }))
}

fn check(input: &str, expected_constants: &[Constant], expected: &[Instructions]) {
    let bytecode = compile(input);
    assert_eq!(
        bytecode.instructions.disassemble(),
        concat(expected).disassemble(),
        "instructions for input: {input}"
    );
    assert_eq!(
        bytecode.constants, expected_constants,
        "constants for input: {input}"
    );
}

#[test]
fn integer_arithmetic() {
    check(
        "1 + 2",
        &[int(1), int(2)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Add, &[]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "1; 2",
        &[int(1), int(2)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Pop, &[]),
            make(Op::Constant, &[1]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "1 - 2",
        &[int(1), int(2)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Sub, &[]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "1 * 2",
        &[int(1), int(2)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Mul, &[]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "2 / 1",
        &[int(2), int(1)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Div, &[]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "-1",
        &[int(1)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Minus, &[]),
            make(Op::Pop, &[]),
        ],
    );
}

#[test]
fn boolean_expressions() {
    check("true", &[], &[make(Op::True, &[]), make(Op::Pop, &[])]);
    check("false", &[], &[make(Op::False, &[]), make(Op::Pop, &[])]);
    check(
        "1 > 2",
        &[int(1), int(2)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::GreaterThan, &[]),
            make(Op::Pop, &[]),
        ],
    );
    // `<` swaps its operands at compile time, so the constants pool holds
    // 2 before 1
    check(
        "1 < 2",
        &[int(2), int(1)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::GreaterThan, &[]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "1 == 2",
        &[int(1), int(2)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Equal, &[]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "true != false",
        &[],
        &[
            make(Op::True, &[]),
            make(Op::False, &[]),
            make(Op::NotEqual, &[]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "!true",
        &[],
        &[make(Op::True, &[]), make(Op::Bang, &[]), make(Op::Pop, &[])],
    );
}

#[test]
fn conditionals() {
    check(
        "if (true) { 10 }; 3333;",
        &[int(10), int(3333)],
        &[
            make(Op::True, &[]),
            make(Op::JumpFalse, &[10]),
            make(Op::Constant, &[0]),
            make(Op::Jump, &[11]),
            make(Op::Null, &[]),
            make(Op::Pop, &[]),
            make(Op::Constant, &[1]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "if (true) { 10 } else { 20 }; 3333;",
        &[int(10), int(20), int(3333)],
        &[
            make(Op::True, &[]),
            make(Op::JumpFalse, &[10]),
            make(Op::Constant, &[0]),
            make(Op::Jump, &[13]),
            make(Op::Constant, &[1]),
            make(Op::Pop, &[]),
            make(Op::Constant, &[2]),
            make(Op::Pop, &[]),
        ],
    );
}

#[test]
fn global_let_statements() {
    check(
        "let one = 1; let two = 2;",
        &[int(1), int(2)],
        &[
            make(Op::Constant, &[0]),
            make(Op::SetGlobal, &[0]),
            make(Op::Constant, &[1]),
            make(Op::SetGlobal, &[1]),
        ],
    );
    check(
        "let one = 1; one;",
        &[int(1)],
        &[
            make(Op::Constant, &[0]),
            make(Op::SetGlobal, &[0]),
            make(Op::GetGlobal, &[0]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "let one = 1; let two = one; two;",
        &[int(1)],
        &[
            make(Op::Constant, &[0]),
            make(Op::SetGlobal, &[0]),
            make(Op::GetGlobal, &[0]),
            make(Op::SetGlobal, &[1]),
            make(Op::GetGlobal, &[1]),
            make(Op::Pop, &[]),
        ],
    );
}

#[test]
fn string_expressions() {
    check(
        r#""monkey""#,
        &[string("monkey")],
        &[make(Op::Constant, &[0]), make(Op::Pop, &[])],
    );
    check(
        r#""mon" + "key""#,
        &[string("mon"), string("key")],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Add, &[]),
            make(Op::Pop, &[]),
        ],
    );
}

#[test]
fn array_literals() {
    check("[]", &[], &[make(Op::Array, &[0]), make(Op::Pop, &[])]);
    check(
        "[1, 2, 3]",
        &[int(1), int(2), int(3)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Constant, &[2]),
            make(Op::Array, &[3]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "[1 + 2, 3 - 4]",
        &[int(1), int(2), int(3), int(4)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Add, &[]),
            make(Op::Constant, &[2]),
            make(Op::Constant, &[3]),
            make(Op::Sub, &[]),
            make(Op::Array, &[2]),
            make(Op::Pop, &[]),
        ],
    );
}

#[test]
fn hash_literals() {
    check("{}", &[], &[make(Op::Hash, &[0]), make(Op::Pop, &[])]);
    check(
        "{1: 2, 3: 4, 5: 6}",
        &[int(1), int(2), int(3), int(4), int(5), int(6)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Constant, &[2]),
            make(Op::Constant, &[3]),
            make(Op::Constant, &[4]),
            make(Op::Constant, &[5]),
            make(Op::Hash, &[6]),
            make(Op::Pop, &[]),
        ],
    );
}

#[test]
fn hash_literal_keys_are_emitted_in_sorted_order() {
    // source order 3 before 1; emission is sorted by the keys' textual form
    check(
        "{3: 10, 1: 20}",
        &[int(1), int(20), int(3), int(10)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Constant, &[2]),
            make(Op::Constant, &[3]),
            make(Op::Hash, &[4]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        r#"{"b": 1, "a": 2}"#,
        &[string("a"), int(2), string("b"), int(1)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Constant, &[2]),
            make(Op::Constant, &[3]),
            make(Op::Hash, &[4]),
            make(Op::Pop, &[]),
        ],
    );
}

#[test]
fn index_expressions() {
    check(
        "[1, 2, 3][1 + 1]",
        &[int(1), int(2), int(3), int(1), int(1)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Constant, &[2]),
            make(Op::Array, &[3]),
            make(Op::Constant, &[3]),
            make(Op::Constant, &[4]),
            make(Op::Add, &[]),
            make(Op::Index, &[]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "{1: 2}[2 - 1]",
        &[int(1), int(2), int(2), int(1)],
        &[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Hash, &[2]),
            make(Op::Constant, &[2]),
            make(Op::Constant, &[3]),
            make(Op::Sub, &[]),
            make(Op::Index, &[]),
            make(Op::Pop, &[]),
        ],
    );
}

#[test]
fn functions() {
    check(
        "fn() { return 5 + 10 }",
        &[
            int(5),
            int(10),
            function(
                &[
                    make(Op::Constant, &[0]),
                    make(Op::Constant, &[1]),
                    make(Op::Add, &[]),
                    make(Op::ReturnValue, &[]),
                ],
                0,
                0,
            ),
        ],
        &[make(Op::Constant, &[2]), make(Op::Pop, &[])],
    );
    // an expression in tail position compiles to the same body: the
    // trailing pop becomes the return
    check(
        "fn() { 5 + 10 }",
        &[
            int(5),
            int(10),
            function(
                &[
                    make(Op::Constant, &[0]),
                    make(Op::Constant, &[1]),
                    make(Op::Add, &[]),
                    make(Op::ReturnValue, &[]),
                ],
                0,
                0,
            ),
        ],
        &[make(Op::Constant, &[2]), make(Op::Pop, &[])],
    );
    check(
        "fn() { 1; 2 }",
        &[
            int(1),
            int(2),
            function(
                &[
                    make(Op::Constant, &[0]),
                    make(Op::Pop, &[]),
                    make(Op::Constant, &[1]),
                    make(Op::ReturnValue, &[]),
                ],
                0,
                0,
            ),
        ],
        &[make(Op::Constant, &[2]), make(Op::Pop, &[])],
    );
    check(
        "fn() { }",
        &[function(&[make(Op::Return, &[])], 0, 0)],
        &[make(Op::Constant, &[0]), make(Op::Pop, &[])],
    );
}

#[test]
fn function_calls() {
    check(
        "fn() { 24 }();",
        &[
            int(24),
            function(
                &[make(Op::Constant, &[0]), make(Op::ReturnValue, &[])],
                0,
                0,
            ),
        ],
        &[
            make(Op::Constant, &[1]),
            make(Op::Call, &[0]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "let oneArg = fn(a) { a }; oneArg(24);",
        &[
            function(
                &[make(Op::GetLocal, &[0]), make(Op::ReturnValue, &[])],
                1,
                1,
            ),
            int(24),
        ],
        &[
            make(Op::Constant, &[0]),
            make(Op::SetGlobal, &[0]),
            make(Op::GetGlobal, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Call, &[1]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "let manyArg = fn(a, b, c) { a; b; c }; manyArg(24, 25, 26);",
        &[
            function(
                &[
                    make(Op::GetLocal, &[0]),
                    make(Op::Pop, &[]),
                    make(Op::GetLocal, &[1]),
                    make(Op::Pop, &[]),
                    make(Op::GetLocal, &[2]),
                    make(Op::ReturnValue, &[]),
                ],
                3,
                3,
            ),
            int(24),
            int(25),
            int(26),
        ],
        &[
            make(Op::Constant, &[0]),
            make(Op::SetGlobal, &[0]),
            make(Op::GetGlobal, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Constant, &[2]),
            make(Op::Constant, &[3]),
            make(Op::Call, &[3]),
            make(Op::Pop, &[]),
        ],
    );
}

#[test]
fn let_statement_scopes() {
    check(
        "let num = 55; fn() { num }",
        &[
            int(55),
            function(
                &[make(Op::GetGlobal, &[0]), make(Op::ReturnValue, &[])],
                0,
                0,
            ),
        ],
        &[
            make(Op::Constant, &[0]),
            make(Op::SetGlobal, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "fn() { let num = 55; num }",
        &[
            int(55),
            function(
                &[
                    make(Op::Constant, &[0]),
                    make(Op::SetLocal, &[0]),
                    make(Op::GetLocal, &[0]),
                    make(Op::ReturnValue, &[]),
                ],
                1,
                0,
            ),
        ],
        &[make(Op::Constant, &[1]), make(Op::Pop, &[])],
    );
    check(
        "fn() { let a = 55; let b = 77; a + b }",
        &[
            int(55),
            int(77),
            function(
                &[
                    make(Op::Constant, &[0]),
                    make(Op::SetLocal, &[0]),
                    make(Op::Constant, &[1]),
                    make(Op::SetLocal, &[1]),
                    make(Op::GetLocal, &[0]),
                    make(Op::GetLocal, &[1]),
                    make(Op::Add, &[]),
                    make(Op::ReturnValue, &[]),
                ],
                2,
                0,
            ),
        ],
        &[make(Op::Constant, &[2]), make(Op::Pop, &[])],
    );
}

#[test]
fn builtins_compile_to_registry_loads() {
    check(
        "len([]); push([], 1);",
        &[int(1)],
        &[
            make(Op::GetBuiltin, &[0]),
            make(Op::Array, &[0]),
            make(Op::Call, &[1]),
            make(Op::Pop, &[]),
            make(Op::GetBuiltin, &[5]),
            make(Op::Array, &[0]),
            make(Op::Constant, &[0]),
            make(Op::Call, &[2]),
            make(Op::Pop, &[]),
        ],
    );
    check(
        "fn() { len([]) }",
        &[function(
            &[
                make(Op::GetBuiltin, &[0]),
                make(Op::Array, &[0]),
                make(Op::Call, &[1]),
                make(Op::ReturnValue, &[]),
            ],
            0,
            0,
        )],
        &[make(Op::Constant, &[0]), make(Op::Pop, &[])],
    );
}

#[test]
fn compilation_is_deterministic() {
    let input = r#"let h = {"b": 1, "a": 2}; let f = fn(x) { if (x < 1) { h } else { x } }; f(0)"#;
    let program = parser::parse(input).unwrap();
    let a = compiler::compile(&program).unwrap();
    let b = compiler::compile(&program).unwrap();
    assert_eq!(a.instructions.bytes(), b.instructions.bytes());
    assert_eq!(a.constants, b.constants);
    assert_eq!(a.instructions.disassemble(), b.instructions.disassemble());
}

#[test]
fn undefined_identifier_is_a_compile_error() {
    let errors = compile_err("foo;");
    assert_eq!(errors, [CompileError::UndefinedIdentifier("foo".into())]);
}

#[test]
fn errors_are_collected_not_fail_fast() {
    let errors = compile_err("foo; bar;");
    assert_eq!(
        errors,
        [
            CompileError::UndefinedIdentifier("foo".into()),
            CompileError::UndefinedIdentifier("bar".into()),
        ]
    );
}

#[test]
fn free_variables_do_not_compile() {
    // no closure capture: x is out of reach inside the inner function
    let errors = compile_err("fn(x) { fn(y) { x + y } }");
    assert_eq!(errors, [CompileError::UndefinedIdentifier("x".into())]);
}

#[test]
fn let_value_cannot_reference_its_own_name() {
    // the name is defined after its value is compiled
    let errors = compile_err("let f = fn() { f() };");
    assert_eq!(errors, [CompileError::UndefinedIdentifier("f".into())]);
}

#[test]
fn unknown_operator_is_a_compile_error() {
    // the parser never produces this operator; drive the compiler directly
    let program = Program {
        statements: vec![Statement::Expression(Expression::Infix {
            op: "%".into(),
            left: Box::new(Expression::IntegerLiteral(1)),
            right: Box::new(Expression::IntegerLiteral(2)),
        })],
    };
    match compiler::compile(&program) {
        Err(errors) => assert_eq!(errors.0, [CompileError::UnknownOperator("%".into())]),
        Ok(_) => panic!("expected unknown operator error"),
    }
}
