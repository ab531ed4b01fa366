//! Unit tests for validation.
//!
//! Programs are built directly as IR and run through `type_check`.

use crate::{
    ast::{
        ast::{Expr, Program, Stmt},
        expressions::BinaryOperator,
        statements::{ContractSignature, GenericFunctionDefinitionStmt, ProcedureDefinitionStmt, UnwrapperProcedure},
        types::{ProcedureKind, Type, TypeExpr},
    },
    config::config::CompilerConfig,
    errors::errors::Error,
    interpreter::value::Value,
    type_checker::{
        symbol_table::SymbolValue,
        type_checker::{type_check, type_check_expr, TypeChecker},
    },
};

fn check(statements: Vec<Stmt>) -> (Program, TypeChecker, Option<Error>) {
    let mut program = Program::new(statements);
    let (checker, error) = type_check(&mut program, CompilerConfig::default());
    (program, checker, error)
}

fn first_error(statements: Vec<Stmt>) -> String {
    let (_, _, error) = check(statements);
    error.map(|error| error.get_error_name().to_string()).unwrap_or_default()
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

fn show_contract() -> Stmt {
    Stmt::contract(
        "Show",
        vec!["T"],
        vec![ContractSignature::new(
            "show",
            ProcedureKind::Function,
            vec![("value", TypeExpr::named("T"))],
            Some(TypeExpr::Text),
        )],
    )
}

fn show_int() -> Stmt {
    Stmt::implement(
        "Show",
        vec![TypeExpr::Integer],
        vec![ProcedureDefinitionStmt::function(
            "show",
            vec![("n", TypeExpr::Integer)],
            TypeExpr::Text,
            vec![Stmt::ret(Some(Expr::text("int")))],
        )],
    )
}

fn describe() -> Stmt {
    Stmt::generic(
        GenericFunctionDefinitionStmt::new(
            vec!["T"],
            ProcedureDefinitionStmt::function(
                "describe",
                vec![("x", TypeExpr::named("T"))],
                TypeExpr::Text,
                vec![Stmt::ret(Some(Expr::contract_call("Show", "show", vec![Expr::ident("x")])))],
            ),
        )
        .requiring("Show", vec!["T"]),
    )
}

fn tuple_var() -> Stmt {
    Stmt::var("t", None, Expr::tuple(vec![Expr::int(1), Expr::text("a"), Expr::boolean(true)]))
}

#[test]
fn test_valid_program_has_no_errors() {
    let (_, checker, error) = check(vec![
        Stmt::var("x", Some(TypeExpr::Integer), Expr::int(1)),
        Stmt::print(Expr::binary(Expr::ident("x"), BinaryOperator::Add, Expr::int(2))),
    ]);

    assert!(error.is_none());
    assert!(!checker.has_errors());
}

#[test]
fn test_undeclared_identifier() {
    assert_eq!(first_error(vec![Stmt::print(Expr::ident("missing"))]), "UndeclaredIdentifier");
}

#[test]
fn test_redeclaration_in_same_scope() {
    assert_eq!(
        first_error(vec![
            Stmt::var("x", None, Expr::int(1)),
            Stmt::var("x", None, Expr::int(2)),
        ]),
        "Redeclaration"
    );
}

#[test]
fn test_errors_are_collected_across_statements() {
    let (_, checker, _) = check(vec![
        Stmt::print(Expr::ident("a")),
        Stmt::print(Expr::ident("b")),
        Stmt::var("ok", None, Expr::int(1)),
    ]);

    assert_eq!(checker.error_count(), 2);
    assert_eq!(checker.errors()[0].get_node(), Some("Identifier"));
}

#[test]
fn test_unused_identifiers_are_warnings() {
    let (_, checker, error) = check(vec![Stmt::var("unused", None, Expr::int(1))]);

    assert!(error.is_none());
    assert_eq!(checker.warnings().len(), 1);
    assert_eq!(checker.warnings()[0].get_error_name(), "UnusedIdentifier");
}

#[test]
fn test_tuple_assignment_checks_position_type() {
    let (_, checker, _) = check(vec![
        tuple_var(),
        Stmt::set_element(Expr::ident("t"), Expr::int(1), Expr::text("b")),
        Stmt::set_element(Expr::ident("t"), Expr::int(2), Expr::boolean(false)),
    ]);
    assert!(!checker.has_errors());

    assert_eq!(
        first_error(vec![
            tuple_var(),
            Stmt::set_element(Expr::ident("t"), Expr::int(0), Expr::text("wrong")),
        ]),
        "TypeMatchError"
    );
}

#[test]
fn test_tuple_index_must_be_literal_in_bounds() {
    assert_eq!(
        first_error(vec![
            tuple_var(),
            Stmt::set_element(Expr::ident("t"), Expr::int(3), Expr::int(0)),
        ]),
        "TupleIndexOutOfBounds"
    );
    assert_eq!(
        first_error(vec![
            tuple_var(),
            Stmt::set_element(Expr::ident("t"), Expr::int(-1), Expr::int(0)),
        ]),
        "TupleIndexOutOfBounds"
    );
    assert_eq!(
        first_error(vec![
            tuple_var(),
            Stmt::var("i", None, Expr::int(0)),
            Stmt::set_element(Expr::ident("t"), Expr::ident("i"), Expr::int(0)),
        ]),
        "NonLiteralTupleIndex"
    );
}

#[test]
fn test_tuple_subscript_read_yields_position_type() {
    let (program, checker, _) = check(vec![
        tuple_var(),
        Stmt::var("s", None, Expr::subscript(Expr::ident("t"), Expr::int(1))),
    ]);

    assert!(!checker.has_errors());
    let Stmt::VarDecl(declaration) = &program.statements[1] else {
        panic!("expected a variable declaration");
    };
    assert_eq!(declaration.validated_type, Some(Type::Text));
}

#[test]
fn test_list_assignment_checks_index_and_element() {
    let list = || Stmt::var("l", None, Expr::list(vec![Expr::int(1), Expr::int(2)]));

    assert_eq!(
        first_error(vec![list(), Stmt::set_element(Expr::ident("l"), Expr::int(0), Expr::text("x"))]),
        "TypeMatchError"
    );
    assert_eq!(
        first_error(vec![list(), Stmt::set_element(Expr::ident("l"), Expr::text("0"), Expr::int(3))]),
        "TypeMatchError"
    );

    let index = Expr::binary(Expr::int(0), BinaryOperator::Add, Expr::int(1));
    let (_, checker, _) = check(vec![list(), Stmt::set_element(Expr::ident("l"), index, Expr::int(3))]);
    assert!(!checker.has_errors());
}

#[test]
fn test_map_assignment_checks_key_and_value() {
    let map = || Stmt::var("m", None, Expr::map(vec![(Expr::text("a"), Expr::int(1))]));

    assert_eq!(
        first_error(vec![map(), Stmt::set_element(Expr::ident("m"), Expr::int(1), Expr::int(2))]),
        "TypeMatchError"
    );
    assert_eq!(
        first_error(vec![map(), Stmt::set_element(Expr::ident("m"), Expr::text("b"), Expr::boolean(true))]),
        "TypeMatchError"
    );
}

#[test]
fn test_unsupported_subscript_target() {
    assert_eq!(
        first_error(vec![
            Stmt::var("n", None, Expr::int(1)),
            Stmt::set_element(Expr::ident("n"), Expr::int(0), Expr::int(2)),
        ]),
        "UnsupportedSubscriptTarget"
    );
}

#[test]
fn test_tuple_literal_checked_top_down() {
    let declared = TypeExpr::Tuple(vec![TypeExpr::Integer, TypeExpr::Float]);

    let (program, checker, _) = check(vec![Stmt::var(
        "t",
        Some(declared.clone()),
        Expr::tuple(vec![Expr::int(1), Expr::float(2.0)]),
    )]);
    assert!(!checker.has_errors());
    let Stmt::VarDecl(declaration) = &program.statements[0] else {
        panic!("expected a variable declaration");
    };
    let Expr::Tuple(tuple) = &declaration.value else {
        panic!("expected a tuple literal");
    };
    assert_eq!(tuple.asserted_type, Some(Type::tuple(vec![Type::Integer, Type::Float])));

    assert_eq!(
        first_error(vec![Stmt::var("t", Some(declared.clone()), Expr::tuple(vec![Expr::int(1), Expr::int(2)]))]),
        "TypeMatchError"
    );
    assert_eq!(
        first_error(vec![Stmt::var("t", Some(declared), Expr::tuple(vec![Expr::int(1)]))]),
        "TypeMatchError"
    );
}

#[test]
fn test_empty_collections_need_an_expected_type() {
    assert_eq!(
        first_error(vec![Stmt::var("l", None, Expr::list(vec![]))]),
        "AmbiguousEmptyCollection"
    );

    let (_, checker, _) = check(vec![Stmt::var("l", Some(TypeExpr::list(TypeExpr::Integer)), Expr::list(vec![]))]);
    assert!(!checker.has_errors());
}

#[test]
fn test_consumer_is_not_an_expression() {
    let log = ProcedureDefinitionStmt::consumer("log", vec![("line", TypeExpr::Text)], vec![Stmt::print(Expr::ident("line"))]);

    let (_, checker, _) = check(vec![
        Stmt::procedure(log.clone()),
        Stmt::expr(Expr::call("log", vec![Expr::text("hi")])),
    ]);
    assert!(!checker.has_errors());

    assert_eq!(
        first_error(vec![
            Stmt::procedure(log),
            Stmt::var("x", None, Expr::call("log", vec![Expr::text("hi")])),
        ]),
        "NotAnExpression"
    );
}

#[test]
fn test_call_arity_and_callee_kind() {
    let double = ProcedureDefinitionStmt::function(
        "double",
        vec![("n", TypeExpr::Integer)],
        TypeExpr::Integer,
        vec![Stmt::ret(Some(Expr::binary(Expr::ident("n"), BinaryOperator::Multiply, Expr::int(2))))],
    );

    assert_eq!(
        first_error(vec![Stmt::procedure(double), Stmt::print(Expr::call("double", vec![]))]),
        "ArityMismatch"
    );
    assert_eq!(
        first_error(vec![
            Stmt::var("n", None, Expr::int(1)),
            Stmt::print(Expr::call("n", vec![])),
        ]),
        "WrongBaseType"
    );
}

#[test]
fn test_procedures_may_be_called_before_definition() {
    let (_, checker, _) = check(vec![
        Stmt::print(Expr::call("answer", vec![])),
        Stmt::procedure(ProcedureDefinitionStmt::provider(
            "answer",
            TypeExpr::Integer,
            vec![Stmt::ret(Some(Expr::int(42)))],
        )),
    ]);

    assert!(!checker.has_errors());
}

#[test]
fn test_procedure_bodies_do_not_see_caller_locals() {
    assert_eq!(
        first_error(vec![
            Stmt::var("outer", None, Expr::int(1)),
            Stmt::procedure(ProcedureDefinitionStmt::provider(
                "peek",
                TypeExpr::Integer,
                vec![Stmt::ret(Some(Expr::ident("outer")))],
            )),
        ]),
        "UndeclaredIdentifier"
    );
}

#[test]
fn test_return_rules() {
    assert_eq!(first_error(vec![Stmt::ret(None)]), "ReturnOutsideProcedure");
    assert_eq!(
        first_error(vec![Stmt::procedure(ProcedureDefinitionStmt::provider(
            "nothing",
            TypeExpr::Integer,
            vec![],
        ))]),
        "MissingReturn"
    );
    assert_eq!(
        first_error(vec![Stmt::procedure(ProcedureDefinitionStmt::consumer(
            "sink",
            vec![("x", TypeExpr::Integer)],
            vec![Stmt::ret(Some(Expr::ident("x")))],
        ))]),
        "UnexpectedReturnValue"
    );
}

#[test]
fn test_generic_call_is_specialized() {
    let (program, checker, error) = check(vec![
        identity(),
        Stmt::var("a", None, Expr::call("identity", vec![Expr::int(1)])),
        Stmt::var("b", None, Expr::call("identity", vec![Expr::text("s")])),
    ]);

    assert!(error.is_none());
    assert_eq!(checker.monomorphizer.pending_count(), 2);
    let Stmt::VarDecl(declaration) = &program.statements[1] else {
        panic!("expected a variable declaration");
    };
    assert_eq!(declaration.validated_type, Some(Type::Integer));
    let Expr::Call(call) = &declaration.value else {
        panic!("expected a call");
    };
    assert_eq!(call.specialized_name.as_deref(), Some("$MONOMORPHIZATION$int$identity"));
}

#[test]
fn test_generic_calls_resolve_through_the_deferred_value() {
    let (_, mut checker, error) = check(vec![identity()]);
    assert!(error.is_none());

    let Some(SymbolValue::Deferred(resolver)) = checker.symbols.value_of("identity").cloned() else {
        panic!("expected a deferred value");
    };
    let mut call = Expr::call("identity", vec![Expr::boolean(true)]);
    assert_eq!(type_check_expr(&mut checker, &mut call).unwrap(), Type::Boolean);
    let Expr::Call(validated) = &call else {
        panic!("expected a call");
    };
    let assignment = [(String::from("T"), Type::Boolean)].into_iter().collect();
    assert_eq!(validated.specialized_name, Some(resolver.resolve(&assignment)));

    assert!(checker
        .symbols
        .set_value("identity", SymbolValue::Runtime(Value::Nothing)));
    let mut call = Expr::call("identity", vec![Expr::int(1)]);
    let error = type_check_expr(&mut checker, &mut call).unwrap_err();
    assert_eq!(error.get_error_name(), "UndeclaredIdentifier");
}

#[test]
fn test_generic_function_is_not_a_value() {
    assert_eq!(
        first_error(vec![
            identity(),
            Stmt::var("f", None, Expr::ident("identity")),
            Stmt::print(Expr::ident("f")),
        ]),
        "WrongBaseType"
    );
    assert_eq!(
        first_error(vec![identity(), Stmt::print(Expr::ident("identity"))]),
        "WrongBaseType"
    );
}

#[test]
fn test_generic_return_inferred_from_expected_type() {
    let make = Stmt::generic(GenericFunctionDefinitionStmt::new(
        vec!["T"],
        ProcedureDefinitionStmt::function(
            "first",
            vec![("items", TypeExpr::list(TypeExpr::named("T")))],
            TypeExpr::named("T"),
            vec![Stmt::ret(Some(Expr::subscript(Expr::ident("items"), Expr::int(0))))],
        ),
    ));

    let (_, checker, error) = check(vec![
        make,
        Stmt::var(
            "x",
            Some(TypeExpr::Integer),
            Expr::call("first", vec![Expr::list(vec![])]),
        ),
    ]);

    assert!(error.is_none());
    assert_eq!(checker.monomorphizer.pending_count(), 1);
}

#[test]
fn test_uninferable_generic_param() {
    let make = || {
        Stmt::generic(GenericFunctionDefinitionStmt::new(
            vec!["T"],
            ProcedureDefinitionStmt::provider(
                "empty",
                TypeExpr::list(TypeExpr::named("T")),
                vec![Stmt::ret(Some(Expr::list(vec![])))],
            ),
        ))
    };

    assert_eq!(
        first_error(vec![make(), Stmt::var("x", None, Expr::call("empty", vec![]))]),
        "UninferableGenericParam"
    );

    let (_, checker, _) = check(vec![
        make(),
        Stmt::var("x", Some(TypeExpr::list(TypeExpr::Text)), Expr::call("empty", vec![])),
    ]);
    assert!(!checker.has_errors());
}

#[test]
fn test_generic_registration_errors() {
    assert_eq!(
        first_error(vec![Stmt::new_type("T", TypeExpr::Integer), identity()]),
        "GenericNameCollision"
    );
    assert_eq!(first_error(vec![describe()]), "UndeclaredContract");
    assert_eq!(
        first_error(vec![
            identity(),
            Stmt::procedure(ProcedureDefinitionStmt::provider(
                "identity",
                TypeExpr::Integer,
                vec![Stmt::ret(Some(Expr::int(0)))],
            )),
        ]),
        "Redeclaration"
    );

    let mismatched = Stmt::generic(
        GenericFunctionDefinitionStmt::new(
            vec!["T", "U"],
            ProcedureDefinitionStmt::function(
                "pair_show",
                vec![("x", TypeExpr::named("T"))],
                TypeExpr::Text,
                vec![Stmt::ret(Some(Expr::text("")))],
            ),
        )
        .requiring("Show", vec!["T", "U"]),
    );
    assert_eq!(first_error(vec![show_contract(), mismatched]), "ContractArityMismatch");

    let unknown = Stmt::generic(
        GenericFunctionDefinitionStmt::new(
            vec!["T"],
            ProcedureDefinitionStmt::function(
                "show_other",
                vec![("x", TypeExpr::named("T"))],
                TypeExpr::Text,
                vec![Stmt::ret(Some(Expr::text("")))],
            ),
        )
        .requiring("Show", vec!["V"]),
    );
    assert_eq!(first_error(vec![show_contract(), unknown]), "UnknownGenericArg");
}

#[test]
fn test_contract_requirement_checked_at_call_site() {
    let (_, checker, error) = check(vec![
        show_contract(),
        show_int(),
        describe(),
        Stmt::print(Expr::call("describe", vec![Expr::int(1)])),
    ]);
    assert!(error.is_none());
    assert_eq!(checker.monomorphizer.pending_count(), 1);

    assert_eq!(
        first_error(vec![
            show_contract(),
            show_int(),
            describe(),
            Stmt::print(Expr::call("describe", vec![Expr::float(1.5)])),
        ]),
        "MissingContractImplementation"
    );
}

#[test]
fn test_generic_body_needs_declared_contract() {
    let undeclared_requirement = Stmt::generic(GenericFunctionDefinitionStmt::new(
        vec!["T"],
        ProcedureDefinitionStmt::function(
            "describe",
            vec![("x", TypeExpr::named("T"))],
            TypeExpr::Text,
            vec![Stmt::ret(Some(Expr::contract_call("Show", "show", vec![Expr::ident("x")])))],
        ),
    ));

    assert_eq!(
        first_error(vec![show_contract(), undeclared_requirement]),
        "MissingContractImplementation"
    );
}

#[test]
fn test_incomplete_contract_implementation() {
    assert_eq!(
        first_error(vec![show_contract(), Stmt::implement("Show", vec![TypeExpr::Integer], vec![])]),
        "IncompleteContractImplementation"
    );
    assert_eq!(
        first_error(vec![show_contract(), show_int(), show_int()]),
        "Redeclaration"
    );
    assert_eq!(
        first_error(vec![show_contract(), Stmt::implement("Show", vec![TypeExpr::Integer, TypeExpr::Text], vec![])]),
        "ContractArityMismatch"
    );
}

#[test]
fn test_unwrap_restricted_to_unwrappers() {
    let raw = ProcedureDefinitionStmt::function(
        "raw",
        vec![("m", TypeExpr::named("Meters"))],
        TypeExpr::Float,
        vec![Stmt::ret(Some(Expr::unwrap(Expr::ident("m"))))],
    );
    let statements = |extra: Stmt| {
        vec![
            Stmt::new_type("Meters", TypeExpr::Float),
            Stmt::unwrappers("Meters", vec![UnwrapperProcedure::Procedure(raw.clone())]),
            Stmt::var("d", None, Expr::wrap("Meters", Expr::float(1.5))),
            extra,
        ]
    };

    let (_, checker, _) = check(statements(Stmt::print(Expr::call("raw", vec![Expr::ident("d")]))));
    assert!(!checker.has_errors());

    assert_eq!(
        first_error(statements(Stmt::print(Expr::unwrap(Expr::ident("d"))))),
        "IllegalUnwrap"
    );
    assert_eq!(
        first_error(vec![Stmt::unwrappers("Nowhere", vec![])]),
        "UndeclaredIdentifier"
    );
}

#[test]
fn test_unknown_type_in_signature() {
    assert_eq!(
        first_error(vec![Stmt::var("x", Some(TypeExpr::named("Ghost")), Expr::int(1))]),
        "UnknownType"
    );
}
