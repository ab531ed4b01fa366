//! Integration tests for the full pipeline.
//!
//! Programs are validated and then emitted as Rust source, interpreted, or
//! both off the same session; the backends must agree on the specializations
//! a program needs and on what it prints.

use std::{fs, process::Command, rc::Rc};

use monoforge::{
    ast::{
        ast::{Expr, Program, Stmt},
        expressions::BinaryOperator,
        statements::{GenericFunctionDefinitionStmt, ProcedureDefinitionStmt},
        types::TypeExpr,
    },
    compiler::compiler::compile_program,
    config::config::CompilerConfig,
    interpreter::interpreter::interpret_program,
    monomorphization::naming::hashed_monomorphization_name,
    type_checker::type_checker::type_check,
    Position, Span,
};

/// Swaps the first two positions of a 3-tuple through a generic helper.
fn swap_program() -> Vec<Stmt> {
    let swap = Stmt::generic(GenericFunctionDefinitionStmt::new(
        vec!["A", "B"],
        ProcedureDefinitionStmt::function(
            "swap",
            vec![("pair", TypeExpr::Tuple(vec![TypeExpr::named("A"), TypeExpr::named("B")]))],
            TypeExpr::Tuple(vec![TypeExpr::named("B"), TypeExpr::named("A")]),
            vec![Stmt::ret(Some(Expr::tuple(vec![
                Expr::subscript(Expr::ident("pair"), Expr::int(1)),
                Expr::subscript(Expr::ident("pair"), Expr::int(0)),
            ])))],
        ),
    ));

    vec![
        swap,
        Stmt::var("t", None, Expr::tuple(vec![Expr::int(1), Expr::text("one"), Expr::boolean(true)])),
        Stmt::set_element(Expr::ident("t"), Expr::int(0), Expr::int(2)),
        Stmt::print(Expr::ident("t")),
        Stmt::print(Expr::call("swap", vec![Expr::tuple(vec![Expr::int(1), Expr::text("one")])])),
        Stmt::print(Expr::call("swap", vec![Expr::tuple(vec![Expr::text("x"), Expr::text("y")])])),
        Stmt::print(Expr::call("swap", vec![Expr::tuple(vec![Expr::int(3), Expr::text("three")])])),
    ]
}

fn growing_program() -> Vec<Stmt> {
    let grow = Stmt::generic(GenericFunctionDefinitionStmt::new(
        vec!["T"],
        ProcedureDefinitionStmt::function(
            "grow",
            vec![("x", TypeExpr::named("T")), ("n", TypeExpr::Integer)],
            TypeExpr::Integer,
            vec![
                Stmt::if_else(
                    Expr::binary(Expr::ident("n"), BinaryOperator::Equal, Expr::int(0)),
                    vec![Stmt::ret(Some(Expr::int(0)))],
                    None,
                ),
                Stmt::ret(Some(Expr::call(
                    "grow",
                    vec![
                        Expr::list(vec![Expr::ident("x")]),
                        Expr::binary(Expr::ident("n"), BinaryOperator::Subtract, Expr::int(1)),
                    ],
                ))),
            ],
        ),
    ));
    vec![grow, Stmt::print(Expr::call("grow", vec![Expr::int(1), Expr::int(100)]))]
}

#[test]
fn test_interpreted_program() {
    let mut program = Program::new(swap_program());
    let (mut checker, error) = type_check(&mut program, CompilerConfig::default());
    assert!(error.is_none());

    let output = interpret_program(&mut checker, &program).unwrap();
    assert_eq!(output.printed, vec!["(2, one, true)", "(one, 1)", "(y, x)", "(three, 3)"]);
    assert_eq!(checker.monomorphizer.emitted_count(), 2);
}

#[test]
fn test_compiled_program() {
    let mut program = Program::new(swap_program());
    let (mut checker, error) = type_check(&mut program, CompilerConfig::default());
    assert!(error.is_none());

    let source = compile_program(&mut checker, &program).unwrap().into_program();
    let int_text = hashed_monomorphization_name("swap", "$MONOMORPHIZATION$int$string$swap");
    let text_text = hashed_monomorphization_name("swap", "$MONOMORPHIZATION$string$string$swap");

    assert!(source.contains(&format!("fn {}(mut pair: (i64, String, )) -> (String, i64, ) {{", int_text)));
    assert!(source.contains(&format!("fn {}(mut pair: (String, String, )) -> (String, String, ) {{", text_text)));
    assert_eq!(source.matches("fn swap__").count(), 2);
    assert!(source.contains("t.0 = 2i64;\n"));
    assert!(source.contains("fn main() {\n"));
}

#[test]
fn test_specialization_depth_from_config() {
    let config = CompilerConfig::from_toml_str("max_specialization_depth = 3\n").unwrap();
    assert_eq!(config.max_specialization_depth, 3);
    assert!(config.quiet);

    let mut program = Program::new(growing_program());
    let (mut checker, error) = type_check(&mut program, config.clone());
    assert!(error.is_none());
    let error = interpret_program(&mut checker, &program).unwrap_err();
    assert_eq!(error.get_error_name(), "UnboundedSpecialization");

    let mut program = Program::new(growing_program());
    let (mut checker, _) = type_check(&mut program, config);
    let error = compile_program(&mut checker, &program).unwrap_err();
    assert_eq!(error.get_error_name(), "UnboundedSpecialization");
}

#[test]
fn test_invalid_config() {
    let error = CompilerConfig::from_toml_str("max_specialization_depth = \"deep\"\n").unwrap_err();
    assert_eq!(error.get_error_name(), "InvalidConfig");
}

#[test]
fn test_errors_point_at_the_offending_node() {
    let file = Rc::new(String::from("main.mf"));
    let mut program = Program::new(vec![
        Stmt::var("ok", None, Expr::int(1)),
        Stmt::print(Expr::ident("missing").with_span(Span::new(12, 19, &file))),
        Stmt::print(Expr::ident("ok")),
    ]);
    let (checker, error) = type_check(&mut program, CompilerConfig::default());

    let error = error.unwrap();
    assert_eq!(error.get_error_name(), "UndeclaredIdentifier");
    assert_eq!(error.get_position(), &Position(12, Rc::clone(&file)));
    assert_eq!(error.get_node(), Some("Identifier"));
    assert_eq!(checker.error_count(), 1);
}

fn identity_program() -> Vec<Stmt> {
    vec![
        Stmt::generic(GenericFunctionDefinitionStmt::new(
            vec!["T"],
            ProcedureDefinitionStmt::function(
                "identity",
                vec![("x", TypeExpr::named("T"))],
                TypeExpr::named("T"),
                vec![Stmt::ret(Some(Expr::ident("x")))],
            ),
        )),
        Stmt::print(Expr::call("identity", vec![Expr::int(7)])),
    ]
}

#[test]
fn test_both_backends_share_one_session() {
    let identity_int = hashed_monomorphization_name("identity", "$MONOMORPHIZATION$int$identity");

    let mut program = Program::new(identity_program());
    let (mut checker, error) = type_check(&mut program, CompilerConfig::default());
    assert!(error.is_none());
    assert_eq!(interpret_program(&mut checker, &program).unwrap().printed, vec!["7"]);
    let source = compile_program(&mut checker, &program).unwrap().into_program();
    assert_eq!(source.matches(&format!("fn {}(", identity_int)).count(), 1);
    assert_eq!(interpret_program(&mut checker, &program).unwrap().printed, vec!["7"]);

    let mut program = Program::new(identity_program());
    let (mut checker, error) = type_check(&mut program, CompilerConfig::default());
    assert!(error.is_none());
    let first = compile_program(&mut checker, &program).unwrap().into_program();
    assert_eq!(interpret_program(&mut checker, &program).unwrap().printed, vec!["7"]);
    let second = compile_program(&mut checker, &program).unwrap().into_program();
    assert_eq!(first, second);
    assert_eq!(checker.monomorphizer.emitted_count(), 1);
}

fn display_program() -> Vec<Stmt> {
    vec![
        Stmt::var("t", None, Expr::tuple(vec![Expr::int(1), Expr::text("one"), Expr::float(2.5)])),
        Stmt::var(
            "m",
            Some(TypeExpr::map(TypeExpr::Text, TypeExpr::Integer)),
            Expr::map(vec![
                (Expr::text("b"), Expr::int(2)),
                (Expr::text("a b"), Expr::int(3)),
                (Expr::text("a"), Expr::int(1)),
            ]),
        ),
        Stmt::var(
            "xs",
            None,
            Expr::list(vec![
                Expr::list(vec![Expr::text("x"), Expr::text("y")]),
                Expr::list(vec![Expr::text("z")]),
            ]),
        ),
        Stmt::var("big", None, Expr::int(i64::MAX)),
        Stmt::print(Expr::ident("t")),
        Stmt::print(Expr::ident("m")),
        Stmt::print(Expr::ident("xs")),
        Stmt::print(Expr::binary(Expr::ident("big"), BinaryOperator::Add, Expr::int(1))),
    ]
}

#[test]
fn test_backends_print_the_same_text() {
    let expected = vec!["(1, one, 2.5)", "{a b: 3, a: 1, b: 2}", "[[x, y], [z]]", "-9223372036854775808"];

    let mut program = Program::new(display_program());
    let (mut checker, error) = type_check(&mut program, CompilerConfig::default());
    assert!(error.is_none());
    assert_eq!(interpret_program(&mut checker, &program).unwrap().printed, expected);
    let source = compile_program(&mut checker, &program).unwrap().into_program();
    assert!(source.contains("(big.clone()).wrapping_add(1i64)"));
    assert!(!source.contains("{:?}\", t"));

    // The emitted program is only built where a Rust compiler is on the path.
    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| String::from("rustc"));
    if Command::new(&rustc).arg("--version").output().is_err() {
        return;
    }
    let dir = std::env::temp_dir().join(format!("monoforge_display_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let main = dir.join("main.rs");
    let binary = dir.join("main");
    fs::write(&main, &source).unwrap();

    let build = Command::new(&rustc)
        .args(["--edition=2021", "-A", "warnings", "-o"])
        .arg(&binary)
        .arg(&main)
        .output()
        .unwrap();
    assert!(build.status.success(), "{}", String::from_utf8_lossy(&build.stderr));
    let run = Command::new(&binary).output().unwrap();
    fs::remove_dir_all(&dir).unwrap();

    assert!(run.status.success());
    assert_eq!(String::from_utf8_lossy(&run.stdout).lines().collect::<Vec<_>>(), expected);
}
