use pretty_assertions::assert_eq;

use crate::{
    ast::{
        ast::{Expr, Program, Stmt},
        expressions::BinaryOperator,
        statements::{GenericFunctionDefinitionStmt, ProcedureDefinitionStmt},
        types::{ProcedureKind, ProcedureType, Type, TypeExpr},
    },
    config::config::CompilerConfig,
    monomorphization::naming::hashed_monomorphization_name,
    type_checker::type_checker::type_check,
};

use super::{
    compiler::{compile_program, indent, Compiler, HASH_MAP_IMPORT},
    generated::GeneratedSource,
};

fn compile(statements: Vec<Stmt>) -> GeneratedSource {
    let mut program = Program::new(statements);
    let (mut checker, error) = type_check(&mut program, CompilerConfig::default());
    assert!(error.is_none(), "{:?}", error);
    compile_program(&mut checker, &program).unwrap()
}

fn identity() -> Stmt {
    Stmt::generic(GenericFunctionDefinitionStmt::new(
        vec!["T"],
        ProcedureDefinitionStmt::function(
            "identity",
            vec![("x", TypeExpr::named("T"))],
            TypeExpr::named("T"),
            vec![Stmt::ret(Some(Expr::ident("x")))],
        ),
    ))
}

#[test]
fn test_type_source() {
    let compiler = Compiler::new(CompilerConfig::default());
    let render = |ty: Type| compiler.type_source(&ty).unwrap();

    assert_eq!(render(Type::list(Type::Integer)).body(), "Vec<i64>");
    assert_eq!(render(Type::tuple(vec![Type::Integer, Type::Text])).body(), "(i64, String, )");
    assert_eq!(
        render(Type::function(vec![Type::Float], Type::Boolean)).body(),
        "fn(f64) -> bool"
    );
    assert!(render(Type::list(Type::Integer)).preamble().is_empty());

    let map = render(Type::list(Type::map(Type::Text, Type::Integer)));
    assert_eq!(map.body(), "Vec<HashMap<String, i64>>");
    assert!(map.preamble().contains(HASH_MAP_IMPORT));

    let error = compiler.type_source(&Type::generic("T")).unwrap_err();
    assert_eq!(error.get_error_name(), "UnknownType");
}

#[test]
fn test_rust_identifier() {
    let compiler = Compiler::new(CompilerConfig::default());

    assert_eq!(compiler.rust_identifier("total"), "total");
    assert_eq!(compiler.rust_identifier("match"), "r#match");
    assert!(compiler.rust_identifier("Show$int$show").starts_with("Show_int_show__"));
}

#[test]
fn test_generated_source_composition() {
    let mut first = GeneratedSource::for_body("a();\n").with_preamble(HASH_MAP_IMPORT);
    let second = GeneratedSource::for_static_definitions("fn a() {}\n\n").with_preamble(HASH_MAP_IMPORT);
    first.merge(second);

    assert_eq!(first.preamble().len(), 1);
    assert_eq!(first.clone().take_body(), "a();\n");
    assert_eq!(
        first.into_program(),
        "use std::collections::HashMap;\n\nfn a() {}\n\nfn main() {\na();\n}\n"
    );
}

#[test]
fn test_indent() {
    assert_eq!(indent("a;\n\nb;\n"), "    a;\n\n    b;\n");
}

#[test]
fn test_each_specialization_is_emitted_once() {
    let generated = compile(vec![
        identity(),
        Stmt::print(Expr::call("identity", vec![Expr::int(1)])),
        Stmt::print(Expr::call("identity", vec![Expr::int(2)])),
        Stmt::print(Expr::call("identity", vec![Expr::text("a")])),
    ]);

    let int_name = hashed_monomorphization_name("identity", "$MONOMORPHIZATION$int$identity");
    let text_name = hashed_monomorphization_name("identity", "$MONOMORPHIZATION$string$identity");

    assert_eq!(
        generated.body(),
        format!(
            "println!(\"{{}}\", {int}(1i64));\nprintln!(\"{{}}\", {int}(2i64));\nprintln!(\"{{}}\", {text}(String::from(\"a\")));\n",
            int = int_name,
            text = text_name
        )
    );
    assert_eq!(
        generated.static_definitions(),
        format!(
            "fn {}(mut x: i64) -> i64 {{\n    return x.clone();\n}}\n\nfn {}(mut x: String) -> String {{\n    return x.clone();\n}}\n\n",
            int_name, text_name
        )
    );
    assert_eq!(generated.static_definitions().matches("fn identity__").count(), 2);
}

#[test]
fn test_tuple_element_assignment() {
    let generated = compile(vec![
        Stmt::var("t", None, Expr::tuple(vec![Expr::int(1), Expr::text("a"), Expr::boolean(true)])),
        Stmt::set_element(Expr::ident("t"), Expr::int(1), Expr::text("b")),
        Stmt::print(Expr::ident("t")),
    ]);

    assert_eq!(
        generated.body(),
        "let mut t: (i64, String, bool, ) = (1i64, String::from(\"a\"), true, );\n\
         t.1 = String::from(\"b\");\n\
         println!(\"{}\", { let t0 = &(t.clone()); format!(\"({})\", [(t0.0).to_string(), (t0.1).to_string(), (t0.2).to_string()].join(\", \")) });\n"
    );
}

#[test]
fn test_collection_element_assignment() {
    let generated = compile(vec![
        Stmt::var("xs", None, Expr::list(vec![Expr::int(1), Expr::int(2)])),
        Stmt::set_element(Expr::ident("xs"), Expr::int(0), Expr::int(5)),
        Stmt::var(
            "m",
            Some(TypeExpr::map(TypeExpr::Text, TypeExpr::Integer)),
            Expr::map(vec![(Expr::text("a"), Expr::int(1))]),
        ),
        Stmt::set_element(Expr::ident("m"), Expr::text("b"), Expr::int(2)),
        Stmt::print(Expr::ident("xs")),
        Stmt::print(Expr::ident("m")),
    ]);

    let body = generated.body();
    assert!(body.contains("xs[(0i64) as usize] = 5i64;\n"));
    assert!(body.contains(
        "let mut m: HashMap<String, i64> = HashMap::<String, i64>::from([(String::from(\"a\"), 1i64)]);\n"
    ));
    assert!(body.contains("m.insert(String::from(\"b\"), 2i64);\n"));
    assert!(generated.preamble().contains(HASH_MAP_IMPORT));
    assert!(generated.into_program().starts_with("use std::collections::HashMap;\n\nfn main() {\n"));
}

#[test]
fn test_new_type_and_procedures_are_hoisted() {
    let generated = compile(vec![
        Stmt::new_type("Meters", TypeExpr::Float),
        Stmt::procedure(ProcedureDefinitionStmt::function(
            "double",
            vec![("n", TypeExpr::Integer)],
            TypeExpr::Integer,
            vec![Stmt::ret(Some(Expr::binary(
                Expr::ident("n"),
                BinaryOperator::Multiply,
                Expr::int(2),
            )))],
        )),
        Stmt::var("distance", None, Expr::wrap("Meters", Expr::float(1.5))),
        Stmt::print(Expr::call("double", vec![Expr::int(4)])),
        Stmt::print(Expr::ident("distance")),
    ]);

    assert_eq!(
        generated.static_definitions(),
        "#[derive(Clone, Debug, PartialEq)]\nstruct Meters(f64);\n\n\
         fn double(mut n: i64) -> i64 {\n    return (n.clone()).wrapping_mul(2i64);\n}\n\n"
    );
    assert!(generated
        .body()
        .contains("let mut distance: Meters = Meters(1.5f64);\n"));
}

#[test]
fn test_injected_keys_are_read_from_the_embedding_program() {
    let generated = compile(vec![Stmt::procedure(
        ProcedureDefinitionStmt::consumer("report", vec![], vec![Stmt::print(Expr::ident("limit"))])
            .with_injected_keys(vec![("limit", TypeExpr::Integer)]),
    )]);

    assert_eq!(
        generated.static_definitions(),
        "fn report() {\n    let limit: i64 = injected::limit();\n    println!(\"{}\", limit.clone());\n}\n\n"
    );
}

#[test]
fn test_invalid_programs_are_not_compiled() {
    let mut program = Program::new(vec![Stmt::print(Expr::ident("missing"))]);
    let (mut checker, error) = type_check(&mut program, CompilerConfig::default());
    assert!(error.is_some());

    let error = compile_program(&mut checker, &program).unwrap_err();
    assert_eq!(error.get_error_name(), "ValidationFailed");
}

#[test]
fn test_procedure_types_render_as_fn_pointers() {
    let compiler = Compiler::new(CompilerConfig::default());
    let consumer = Type::procedure(ProcedureType::new(
        ProcedureKind::Consumer,
        vec![(String::from("x"), Type::Integer)],
        None,
    ));

    assert_eq!(compiler.type_source(&consumer).unwrap().body(), "fn(i64)");
}

#[test]
fn test_integer_arithmetic_wraps() {
    let generated = compile(vec![
        Stmt::var("big", None, Expr::int(i64::MAX)),
        Stmt::print(Expr::binary(Expr::ident("big"), BinaryOperator::Add, Expr::int(1))),
        Stmt::print(Expr::binary(Expr::float(1.5), BinaryOperator::Add, Expr::float(1.0))),
        Stmt::print(Expr::binary(Expr::ident("big"), BinaryOperator::Less, Expr::int(1))),
    ]);

    assert_eq!(
        generated.body(),
        "let mut big: i64 = 9223372036854775807i64;\n\
         println!(\"{}\", (big.clone()).wrapping_add(1i64));\n\
         println!(\"{}\", format!(\"{:?}\", (1.5f64 + 1.0f64)));\n\
         println!(\"{}\", (big.clone() < 1i64));\n"
    );
}

#[test]
fn test_rendered_values() {
    let compiler = Compiler::new(CompilerConfig::default());
    let render = |ty: Type| compiler.render_value(&ty, "x").unwrap();

    assert_eq!(render(Type::Integer), "(x).to_string()");
    assert_eq!(render(Type::Float), "format!(\"{:?}\", x)");
    assert_eq!(
        render(Type::list(Type::Text)),
        "format!(\"[{}]\", (x).iter().map(|v0| (v0).to_string()).collect::<Vec<_>>().join(\", \"))"
    );
    assert_eq!(
        render(Type::map(Type::Text, Type::Boolean)),
        "{ let mut entries0 = (x).iter().map(|(k0, v0)| format!(\"{}: {}\", (k0).to_string(), (v0).to_string())).collect::<Vec<_>>(); \
         entries0.sort(); format!(\"{{{}}}\", entries0.join(\", \")) }"
    );
    assert_eq!(
        render(Type::tuple(vec![Type::Integer, Type::list(Type::Float)])),
        "{ let t0 = &(x); format!(\"({})\", [(t0.0).to_string(), \
         format!(\"[{}]\", (t0.1).iter().map(|v1| format!(\"{:?}\", v1)).collect::<Vec<_>>().join(\", \"))].join(\", \")) }"
    );
    assert_eq!(
        render(Type::UserDefined {
            name: String::from("Meters"),
            wrapped: Box::new(Type::Float),
        }),
        "format!(\"Meters({})\", format!(\"{:?}\", (x).0))"
    );
    assert_eq!(
        compiler.render_value(&Type::generic("T"), "x").unwrap_err().get_error_name(),
        "UnknownType"
    );
}
