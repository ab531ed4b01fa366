use std::collections::BTreeMap;

use crate::{
    ast::{
        ast::{Expr, ExprNode, Node, Stmt},
        types::{blocking_arg_indices, BaseType, ProcedureKind, ProcedureType, Type, TypeAssignment},
    },
    compiler::compiler::Compiler,
    config::config::CompilerConfig,
    type_checker::type_checker::TypeChecker,
};

#[test]
fn test_type_display() {
    assert_eq!(Type::list(Type::Integer).to_string(), "[int]");
    assert_eq!(Type::map(Type::Text, Type::Boolean).to_string(), "{string: boolean}");
    assert_eq!(
        Type::tuple(vec![Type::Integer, Type::Text, Type::Boolean]).to_string(),
        "tuple<int, string, boolean>"
    );
    assert_eq!(
        Type::function(vec![Type::Integer, Type::Text], Type::Boolean).to_string(),
        "function<int, string -> boolean>"
    );
    assert_eq!(Type::provider(Type::Float).to_string(), "provider<float>");
    assert_eq!(Type::consumer(vec![Type::Integer]).to_string(), "consumer<int>");
    assert_eq!(Type::user_defined("Meters", Type::Float).to_string(), "Meters");
}

#[test]
fn test_structural_equality() {
    assert_eq!(Type::list(Type::Integer), Type::list(Type::Integer));
    assert_ne!(Type::list(Type::Integer), Type::list(Type::Float));
    assert_ne!(
        Type::tuple(vec![Type::Integer]),
        Type::tuple(vec![Type::Integer, Type::Integer])
    );
}

#[test]
fn test_procedure_equality_ignores_argument_names() {
    let named = Type::procedure(ProcedureType::new(
        ProcedureKind::Function,
        vec![(String::from("count"), Type::Integer)],
        Some(Type::Integer),
    ));

    assert_eq!(named, Type::function(vec![Type::Integer], Type::Integer));
    assert_ne!(named, Type::consumer(vec![Type::Integer]));
}

#[test]
fn test_base_types() {
    assert_eq!(Type::provider(Type::Integer).base_type(), BaseType::ProviderFunction);
    assert_eq!(Type::consumer(vec![]).base_type(), BaseType::ConsumerFunction);
    assert_eq!(Type::generic("T").base_type(), BaseType::GenericTypeParam);
    assert_eq!(Type::map(Type::Integer, Type::Integer).base_type(), BaseType::Map);
}

#[test]
fn test_unify_binds_generic_params() {
    let declared = Type::map(Type::generic("K"), Type::list(Type::generic("V")));
    let actual = Type::map(Type::Text, Type::list(Type::Integer));
    let mut assignment = TypeAssignment::new();

    assert!(declared.unify(&actual, &mut assignment));
    assert_eq!(assignment.get("K"), Some(&Type::Text));
    assert_eq!(assignment.get("V"), Some(&Type::Integer));
    assert_eq!(declared.substitute(&assignment), actual);
}

#[test]
fn test_unify_rejects_conflicting_bindings() {
    let declared = Type::tuple(vec![Type::generic("T"), Type::generic("T")]);
    let mut assignment = TypeAssignment::new();

    assert!(!declared.unify(&Type::tuple(vec![Type::Integer, Type::Text]), &mut assignment));
}

#[test]
fn test_depth_and_generic_detection() {
    assert_eq!(Type::Integer.depth(), 1);
    assert_eq!(Type::list(Type::list(Type::Integer)).depth(), 3);
    assert!(Type::function(vec![Type::generic("T")], Type::Integer).contains_generic_params());
    assert!(!Type::tuple(vec![Type::Integer, Type::Text]).contains_generic_params());
}

#[test]
fn test_specialize_clears_generic_metadata() {
    let generic = ProcedureType::new(
        ProcedureKind::Function,
        vec![(String::from("callback"), Type::generic("F"))],
        Some(Type::Integer),
    )
    .with_blocking(false, Some(vec![0]))
    .with_generics(vec![String::from("F")], BTreeMap::new());

    let blocking_callback = Type::procedure(
        ProcedureType::new(ProcedureKind::Provider, vec![], Some(Type::Integer)).with_blocking(true, None),
    );
    let mut assignment = TypeAssignment::new();
    assignment.insert(String::from("F"), blocking_callback.clone());

    let specialized = generic.specialize(&assignment);
    assert!(!specialized.is_generic());
    assert!(specialized.explicitly_blocking);
    assert_eq!(specialized.arg_types[0].1, blocking_callback);
}

#[test]
fn test_blocking_arg_indices() {
    let blocking_on = vec![String::from("b")];

    assert_eq!(blocking_arg_indices(&blocking_on, &["a", "b"]), Ok(vec![1]));
    assert_eq!(blocking_arg_indices(&blocking_on, &["a"]), Err(String::from("b")));
}

#[test]
fn test_integer_literal_detection() {
    assert_eq!(Expr::int(2).as_integer_literal(), Some(2));
    assert_eq!(Expr::ident("i").as_integer_literal(), None);
    assert_eq!(Expr::text("a").validated_type(), Some(Type::Text));
}

#[test]
fn test_node_contract() {
    let mut checker = TypeChecker::new(CompilerConfig::default());
    checker.symbols.push_scope();

    let mut declaration = Stmt::var("t", None, Expr::tuple(vec![Expr::int(1), Expr::text("a")]));
    declaration.validate(&mut checker).unwrap();

    let mut read = Expr::subscript(Expr::ident("t"), Expr::int(1));
    assert_eq!(read.validate(&mut checker).unwrap(), Type::Text);

    let pair = Type::tuple(vec![Type::Integer, Type::Text]);
    let mut literal = Expr::tuple(vec![Expr::int(2), Expr::text("b")]);
    literal.assert_expected_type(&pair, &mut checker).unwrap();
    assert_eq!(literal.validated_type(), Some(pair));

    let error = literal
        .assert_expected_type(&Type::tuple(vec![Type::Integer]), &mut checker)
        .unwrap_err();
    assert_eq!(error.get_error_name(), "TypeMatchError");
    assert_eq!(error.get_node(), Some("TupleExpr"));

    let compiler = Compiler::new(CompilerConfig::default());
    assert_eq!(read.generate_source(&compiler).unwrap().body(), "(t.clone()).1.clone()");
}
