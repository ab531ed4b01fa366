use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::{
    ast::{
        ast::{Expr, Program, Stmt},
        expressions::{BinaryExpr, BinaryOperator, ContractProcedureCallExpr, FunctionCallExpr, SubscriptExpr},
        statements::{
            ContractDefinitionStmt, ContractImplementationStmt, ListElementAssignmentStmt, NewTypeDefinitionStmt,
            ProcedureDefinitionStmt, UnwrapperProcedure, UnwrappersBlockStmt,
        },
        types::{blocking_arg_indices, ProcedureKind, ProcedureType, Type, TypeAssignment, TypeExpr},
    },
    config::config::{CompilerConfig, DebugTrace},
    errors::errors::{Error, ErrorImpl},
    monomorphization::{
        generics::{
            bind_generic_placeholders, prepare_monomorphization, register_generic_function, unbind_generic_params,
            validate_generic_body, Monomorphizer,
        },
        naming::canonical_procedure_name,
    },
    phase_log, phase_warn, trace_dbg, Position,
};

use super::symbol_table::{SymbolTable, SymbolValue};

/// A declared contract: its type parameters and the signatures every
/// implementation must provide, written over those parameters.
#[derive(Debug, Clone)]
pub struct ContractInfo {
    pub type_params: Vec<String>,
    pub signatures: BTreeMap<String, ProcedureType>,
}

/// The procedure whose body is being validated.
#[derive(Debug, Clone)]
pub struct ProcedureContext {
    pub name: String,
    /// Source-level name; a specialization's origin is its generic function
    pub origin: String,
    pub kind: ProcedureKind,
    pub return_type: Option<Type>,
}

/// The generic function whose body is being validated abstractly.
#[derive(Debug, Clone)]
pub struct GenericContext {
    pub function: String,
    pub required_contracts: BTreeMap<String, Vec<String>>,
}

/// State of one compilation session, threaded through validation, the
/// monomorphization drain and both backends.
#[derive(Debug)]
pub struct TypeChecker {
    pub config: CompilerConfig,
    pub symbols: SymbolTable,
    pub monomorphizer: Monomorphizer,
    pub contracts: HashMap<String, ContractInfo>,
    /// (contract, concrete types) to procedure name to registered name
    pub contract_implementations: HashMap<(String, Vec<Type>), BTreeMap<String, String>>,
    /// User-defined type name to the procedures allowed to unwrap it
    pub unwrappers: HashMap<String, BTreeSet<String>>,
    pub procedure_stack: Vec<ProcedureContext>,
    pub generic_stack: Vec<GenericContext>,
    errors: Vec<Error>,
    warnings: Vec<Error>,
}

impl TypeChecker {
    pub fn new(config: CompilerConfig) -> Self {
        TypeChecker {
            symbols: SymbolTable::new(config.check_unused),
            config,
            monomorphizer: Monomorphizer::new(),
            contracts: HashMap::new(),
            contract_implementations: HashMap::new(),
            unwrappers: HashMap::new(),
            procedure_stack: vec![],
            generic_stack: vec![],
            errors: vec![],
            warnings: vec![],
        }
    }

    /// Validates a whole program. Errors are logged and validation carries on
    /// with the next statement.
    pub fn check_program(&mut self, program: &mut Program) {
        phase_log!(&self.config, "Validating {} statements", program.statements.len());
        self.symbols.push_scope();
        check_statements(self, &mut program.statements);
        self.pop_scope(&Position::null());

        if self.has_errors() {
            phase_warn!(&self.config, "validation failed with {} errors", self.errors.len());
        }
    }

    pub fn log_error(&mut self, error: Error) {
        trace_dbg!(&self.config, DebugTrace::TypeChecker, "error: {}", error);
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Error] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Pops a scope, recording the identifiers it never read as warnings.
    pub fn pop_scope(&mut self, position: &Position) {
        for name in self.symbols.pop_scope() {
            phase_warn!(&self.config, "identifier `{}` is never used", name);
            self.warnings.push(Error::new(
                ErrorImpl::UnusedIdentifier { identifier: name },
                position.clone(),
            ));
        }
    }

    pub fn resolve_type(&mut self, type_expr: &TypeExpr, position: &Position) -> Result<Type, Error> {
        match type_expr {
            TypeExpr::Integer => Ok(Type::Integer),
            TypeExpr::Float => Ok(Type::Float),
            TypeExpr::Text => Ok(Type::Text),
            TypeExpr::Boolean => Ok(Type::Boolean),
            TypeExpr::Nothing => Ok(Type::Nothing),
            TypeExpr::List(element) => Ok(Type::list(self.resolve_type(element, position)?)),
            TypeExpr::Map(key, value) => Ok(Type::map(
                self.resolve_type(key, position)?,
                self.resolve_type(value, position)?,
            )),
            TypeExpr::Tuple(elements) => Ok(Type::Tuple(self.resolve_types(elements, position)?)),
            TypeExpr::Named(name) => {
                if !self.symbols.is_type_definition(name) {
                    return Err(Error::new(
                        ErrorImpl::UnknownType { type_: name.clone() },
                        position.clone(),
                    ));
                }
                self.symbols.mark_used(name);
                self.symbols.type_of(name, position)
            }
            TypeExpr::Function { args, ret } => Ok(Type::function(
                self.resolve_types(args, position)?,
                self.resolve_type(ret, position)?,
            )),
            TypeExpr::Provider(ret) => Ok(Type::provider(self.resolve_type(ret, position)?)),
            TypeExpr::Consumer(args) => Ok(Type::consumer(self.resolve_types(args, position)?)),
        }
    }

    fn resolve_types(&mut self, type_exprs: &[TypeExpr], position: &Position) -> Result<Vec<Type>, Error> {
        type_exprs
            .iter()
            .map(|type_expr| self.resolve_type(type_expr, position))
            .collect()
    }

    fn resolve_named_types(
        &mut self,
        named: &[(String, TypeExpr)],
        position: &Position,
    ) -> Result<Vec<(String, Type)>, Error> {
        named
            .iter()
            .map(|(name, type_expr)| Ok((name.clone(), self.resolve_type(type_expr, position)?)))
            .collect()
    }

    /// Resolves a signature, checking it has the shape its kind demands.
    pub fn resolve_signature(
        &mut self,
        name: &str,
        kind: ProcedureKind,
        arguments: &[(String, TypeExpr)],
        return_type: Option<&TypeExpr>,
        position: &Position,
    ) -> Result<ProcedureType, Error> {
        let shape_error = match (kind, return_type) {
            (ProcedureKind::Provider, _) if !arguments.is_empty() => Some(ErrorImpl::ArityMismatch {
                expected: 0,
                received: arguments.len(),
            }),
            (ProcedureKind::Function | ProcedureKind::Provider, None) => Some(ErrorImpl::MissingReturn {
                procedure: name.to_string(),
            }),
            (ProcedureKind::Consumer, Some(_)) => Some(ErrorImpl::UnexpectedReturnValue {
                procedure: name.to_string(),
            }),
            _ => None,
        };
        if let Some(error) = shape_error {
            return Err(Error::new(error, position.clone()));
        }

        let arg_types = self.resolve_named_types(arguments, position)?;
        let return_type = return_type
            .map(|type_expr| self.resolve_type(type_expr, position))
            .transpose()?;
        Ok(ProcedureType::new(kind, arg_types, return_type))
    }

    pub fn resolve_procedure_type(&mut self, procedure: &ProcedureDefinitionStmt) -> Result<ProcedureType, Error> {
        let position = procedure.span.start.clone();
        let signature = self.resolve_signature(
            &procedure.name,
            procedure.kind,
            &procedure.arguments,
            procedure.return_type.as_ref(),
            &position,
        )?;
        let injected_keys = self.resolve_named_types(&procedure.injected_keys, &position)?;

        let blocking_generic_args = match &procedure.blocking_on_args {
            Some(blocking_on) => {
                let arg_names = procedure
                    .arguments
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>();
                let indices = blocking_arg_indices(blocking_on, &arg_names).map_err(|identifier| {
                    Error::new(ErrorImpl::UndeclaredIdentifier { identifier }, position.clone())
                })?;
                Some(indices)
            }
            None => None,
        };

        Ok(signature
            .with_injected_keys(injected_keys)
            .with_blocking(procedure.explicitly_blocking, blocking_generic_args))
    }

    /// Checks that `contract` is implemented over `types`.
    ///
    /// Concrete types need a registered implementation, whose procedure names
    /// are returned. Placeholder types are satisfied when the generic function
    /// being validated requires the contract over the same parameters.
    pub fn check_contract_requirement(
        &self,
        contract: &str,
        types: &[Type],
        position: &Position,
    ) -> Result<Option<BTreeMap<String, String>>, Error> {
        let missing = || {
            Error::new(
                ErrorImpl::MissingContractImplementation {
                    contract: contract.to_string(),
                    types: types.iter().map(Type::to_string).collect::<Vec<_>>().join(", "),
                },
                position.clone(),
            )
        };

        if types.iter().any(Type::contains_generic_params) {
            let params = types
                .iter()
                .map(|ty| match ty {
                    Type::GenericTypeParam(name) => Some(name.clone()),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>();
            let satisfied = match (params, self.generic_stack.last()) {
                (Some(params), Some(context)) => context.required_contracts.get(contract) == Some(&params),
                _ => false,
            };
            return if satisfied { Ok(None) } else { Err(missing()) };
        }

        self.contract_implementations
            .get(&(contract.to_string(), types.to_vec()))
            .cloned()
            .map(Some)
            .ok_or_else(missing)
    }
}

/// Validates `program` with a fresh session and returns it together with the
/// first error logged, if any.
pub fn type_check(program: &mut Program, config: CompilerConfig) -> (TypeChecker, Option<Error>) {
    let mut type_checker = TypeChecker::new(config);
    type_checker.check_program(program);
    let error = type_checker.errors().first().cloned();
    (type_checker, error)
}

/// Hoists the declarations of a statement list, then validates every
/// statement whose declaration did not fail.
fn check_statements(type_checker: &mut TypeChecker, statements: &mut [Stmt]) {
    let failed = register_declarations(type_checker, statements);

    for (index, statement) in statements.iter_mut().enumerate() {
        if failed.contains(&index) {
            continue;
        }
        if let Err(error) = type_check_stmt(type_checker, statement) {
            type_checker.log_error(error.with_node(statement.kind_name()));
        }
    }
}

/// Registers the declarations of a statement list ahead of validation so
/// they can be referenced before their definition. Types and contracts go
/// first since signatures may name them. Returns the indices that failed.
pub fn register_declarations(type_checker: &mut TypeChecker, statements: &mut [Stmt]) -> HashSet<usize> {
    let mut failed = HashSet::new();
    let global = type_checker.procedure_stack.is_empty();

    for (index, statement) in statements.iter_mut().enumerate() {
        let result = match statement {
            Stmt::NewTypeDefinition(new_type) => register_new_type(type_checker, new_type),
            Stmt::ContractDefinition(contract) => register_contract(type_checker, contract),
            _ => Ok(()),
        };
        if let Err(error) = result {
            type_checker.log_error(error.with_node(statement.kind_name()));
            failed.insert(index);
        }
    }

    for (index, statement) in statements.iter_mut().enumerate() {
        let result = match statement {
            Stmt::ProcedureDefinition(procedure) => register_procedure(type_checker, procedure, global),
            Stmt::GenericFunctionDefinition(generic) => register_generic_function(type_checker, generic),
            Stmt::ContractImplementation(implementation) => {
                register_contract_implementation(type_checker, implementation)
            }
            Stmt::UnwrappersBlock(block) => register_unwrappers(type_checker, block),
            _ => Ok(()),
        };
        if let Err(error) = result {
            type_checker.log_error(error.with_node(statement.kind_name()));
            failed.insert(index);
        }
    }

    failed
}

/// Resolves a procedure's signature and declares it, at level 0 when `global`.
pub fn register_procedure(
    type_checker: &mut TypeChecker,
    procedure: &mut ProcedureDefinitionStmt,
    global: bool,
) -> Result<(), Error> {
    let procedure_type = type_checker.resolve_procedure_type(procedure)?;
    let level = if global { 0 } else { type_checker.symbols.level() };
    type_checker.symbols.declare_at_level(
        &procedure.name,
        Type::procedure(procedure_type.clone()),
        None,
        level,
        &procedure.span.start,
    )?;

    trace_dbg!(
        &type_checker.config,
        DebugTrace::TypeChecker,
        "registered {} `{}`",
        procedure.kind.name(),
        procedure.name
    );
    procedure.resolved_type = Some(procedure_type);
    Ok(())
}

fn register_new_type(type_checker: &mut TypeChecker, new_type: &mut NewTypeDefinitionStmt) -> Result<(), Error> {
    let position = new_type.span.start.clone();
    let wrapped = type_checker.resolve_type(&new_type.wrapped, &position)?;
    let ty = Type::user_defined(&new_type.name, wrapped);
    type_checker
        .symbols
        .declare_type_definition(&new_type.name, ty.clone(), &position)?;
    new_type.resolved_type = Some(ty);
    Ok(())
}

fn register_contract(type_checker: &mut TypeChecker, contract: &ContractDefinitionStmt) -> Result<(), Error> {
    let position = &contract.span.start;
    if type_checker.symbols.is_declared(&contract.name) {
        return Err(Error::new(
            ErrorImpl::Redeclaration {
                identifier: contract.name.clone(),
            },
            position.clone(),
        ));
    }

    bind_generic_placeholders(type_checker, &contract.name, &contract.type_params, position)?;
    let mut signatures = BTreeMap::new();
    let mut result = Ok(());
    for signature in &contract.signatures {
        let resolved = type_checker.resolve_signature(
            &signature.name,
            signature.kind,
            &signature.arguments,
            signature.return_type.as_ref(),
            position,
        );
        match resolved {
            Ok(_) if signatures.contains_key(&signature.name) => {
                result = Err(Error::new(
                    ErrorImpl::Redeclaration {
                        identifier: format!("{}::{}", contract.name, signature.name),
                    },
                    position.clone(),
                ));
                break;
            }
            Ok(procedure_type) => {
                signatures.insert(signature.name.clone(), procedure_type);
            }
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }
    unbind_generic_params(type_checker, &contract.type_params);
    result?;

    type_checker.symbols.declare_at_level(
        &contract.name,
        Type::Contract {
            name: contract.name.clone(),
            type_params: contract.type_params.clone(),
        },
        None,
        0,
        position,
    )?;
    type_checker.contracts.insert(
        contract.name.clone(),
        ContractInfo {
            type_params: contract.type_params.clone(),
            signatures,
        },
    );
    Ok(())
}

fn register_contract_implementation(
    type_checker: &mut TypeChecker,
    implementation: &mut ContractImplementationStmt,
) -> Result<(), Error> {
    let position = implementation.span.start.clone();
    let contract = type_checker
        .contracts
        .get(&implementation.contract)
        .cloned()
        .ok_or_else(|| {
            Error::new(
                ErrorImpl::UndeclaredContract {
                    contract: implementation.contract.clone(),
                    function: String::from("<implementation>"),
                },
                position.clone(),
            )
        })?;

    if contract.type_params.len() != implementation.concrete_types.len() {
        return Err(Error::new(
            ErrorImpl::ContractArityMismatch {
                contract: implementation.contract.clone(),
                expected: contract.type_params.len(),
                received: implementation.concrete_types.len(),
            },
            position,
        ));
    }

    let types = type_checker.resolve_types(&implementation.concrete_types, &position)?;
    let type_names = types.iter().map(Type::to_string).collect::<Vec<_>>();
    let implementation_key = (implementation.contract.clone(), types.clone());
    if type_checker.contract_implementations.contains_key(&implementation_key) {
        return Err(Error::new(
            ErrorImpl::Redeclaration {
                identifier: format!("{}<{}>", implementation.contract, type_names.join(", ")),
            },
            position,
        ));
    }

    let assignment = contract
        .type_params
        .iter()
        .cloned()
        .zip(types.iter().cloned())
        .collect::<TypeAssignment>();

    let mut registered = BTreeMap::new();
    for procedure in implementation.procedures.iter_mut() {
        let Some(signature) = contract.signatures.get(&procedure.name) else {
            return Err(Error::new(
                ErrorImpl::UndeclaredIdentifier {
                    identifier: format!("{}::{}", implementation.contract, procedure.name),
                },
                procedure.span.start.clone(),
            ));
        };

        let expected = signature.substitute(&assignment);
        let actual = type_checker.resolve_procedure_type(procedure)?;
        if actual != expected {
            return Err(Error::new(
                ErrorImpl::TypeMatchError {
                    expected: Type::procedure(expected).to_string(),
                    received: Type::procedure(actual).to_string(),
                },
                procedure.span.start.clone(),
            ));
        }

        let registered_name = canonical_procedure_name(&implementation.contract, &type_names, &procedure.name);
        type_checker.symbols.declare_at_level(
            &registered_name,
            Type::procedure(actual.clone()),
            None,
            0,
            &procedure.span.start,
        )?;
        registered.insert(procedure.name.clone(), registered_name.clone());
        procedure.name = registered_name;
        procedure.resolved_type = Some(actual);
    }

    if let Some(missing) = contract.signatures.keys().find(|name| !registered.contains_key(*name)) {
        return Err(Error::new(
            ErrorImpl::IncompleteContractImplementation {
                contract: implementation.contract.clone(),
                procedure: missing.clone(),
            },
            position,
        ));
    }

    implementation.resolved_types = Some(types);
    type_checker.contract_implementations.insert(implementation_key, registered);
    Ok(())
}

fn register_unwrappers(type_checker: &mut TypeChecker, block: &mut UnwrappersBlockStmt) -> Result<(), Error> {
    let global = type_checker.procedure_stack.is_empty();
    for procedure in block.procedures.iter_mut() {
        match procedure {
            UnwrapperProcedure::Procedure(procedure) => register_procedure(type_checker, procedure, global)?,
            UnwrapperProcedure::Generic(generic) => register_generic_function(type_checker, generic)?,
        }
    }

    type_checker
        .unwrappers
        .entry(block.type_name.clone())
        .or_default()
        .extend(block.procedures.iter().map(|procedure| procedure.name().to_string()));
    Ok(())
}

/// Validates a procedure body against its registered signature.
///
/// The body sees only its own arguments, injected keys and level-0 entries.
/// `origin` is the source-level procedure name used for unwrap permissions.
pub fn validate_procedure_body(
    type_checker: &mut TypeChecker,
    procedure: &mut ProcedureDefinitionStmt,
    origin: &str,
) -> Result<(), Error> {
    let position = procedure.span.start.clone();
    let Some(procedure_type) = procedure.resolved_type.clone() else {
        return Err(Error::new(
            ErrorImpl::UndeclaredIdentifier {
                identifier: procedure.name.clone(),
            },
            position,
        ));
    };

    type_checker.symbols.enter_frame();
    type_checker.symbols.push_scope();
    let declared = procedure_type
        .arg_types
        .iter()
        .chain(&procedure_type.injected_keys)
        .try_for_each(|(name, ty)| type_checker.symbols.declare(name, ty.clone(), None, &position));

    type_checker.procedure_stack.push(ProcedureContext {
        name: procedure.name.clone(),
        origin: origin.to_string(),
        kind: procedure_type.kind,
        return_type: procedure_type.return_type.clone(),
    });
    if declared.is_ok() {
        check_statements(type_checker, &mut procedure.body);
    }
    type_checker.procedure_stack.pop();
    type_checker.pop_scope(&position);
    type_checker.symbols.exit_frame();
    declared?;

    if procedure_type.return_type.is_some() && !always_returns(&procedure.body) {
        return Err(Error::new(
            ErrorImpl::MissingReturn {
                procedure: procedure.name.clone(),
            },
            position,
        ));
    }
    Ok(())
}

fn always_returns(statements: &[Stmt]) -> bool {
    statements.iter().any(|statement| match statement {
        Stmt::Return(_) => true,
        Stmt::If(if_stmt) => match &if_stmt.else_block {
            Some(else_block) => always_returns(&if_stmt.then_block) && always_returns(else_block),
            None => false,
        },
        _ => false,
    })
}

pub fn type_check_block(type_checker: &mut TypeChecker, statements: &mut [Stmt], position: &Position) {
    type_checker.symbols.push_scope();
    check_statements(type_checker, statements);
    type_checker.pop_scope(position);
}

pub fn type_check_stmt(type_checker: &mut TypeChecker, ast: &mut Stmt) -> Result<(), Error> {
    match ast {
        Stmt::VarDecl(declaration) => {
            let position = declaration.span.start.clone();
            let ty = match &declaration.declared_type {
                Some(declared) => {
                    let ty = type_checker.resolve_type(declared, &position)?;
                    assert_expected_type(type_checker, &mut declaration.value, &ty)?;
                    ty
                }
                None => type_check_expr(type_checker, &mut declaration.value)?,
            };
            type_checker
                .symbols
                .declare(&declaration.name, ty.clone(), None, &position)?;
            declaration.validated_type = Some(ty);
            Ok(())
        }
        Stmt::Assignment(assignment) => {
            let ty = type_checker
                .symbols
                .type_of(&assignment.name, &assignment.span.start)?;
            assert_expected_type(type_checker, &mut assignment.value, &ty)
        }
        Stmt::ListElementAssignment(assignment) => check_element_assignment(type_checker, assignment),
        Stmt::Expression(statement) => {
            let node = statement.expression.kind_name();
            let result = match &mut statement.expression {
                Expr::Call(call) => validate_call(type_checker, call, None, false),
                Expr::ContractCall(call) => validate_contract_call(type_checker, call, None, false),
                expression => type_check_expr(type_checker, expression),
            };
            result.map(|_| ()).map_err(|error| error.with_node(node))
        }
        Stmt::Return(statement) => {
            let Some(context) = type_checker.procedure_stack.last() else {
                return Err(Error::new(ErrorImpl::ReturnOutsideProcedure, statement.span.start.clone()));
            };
            let (name, return_type) = (context.name.clone(), context.return_type.clone());

            match (return_type, &mut statement.value) {
                (Some(ty), Some(value)) => assert_expected_type(type_checker, value, &ty),
                (Some(ty), None) => Err(Error::new(
                    ErrorImpl::TypeMatchError {
                        expected: ty.to_string(),
                        received: Type::Nothing.to_string(),
                    },
                    statement.span.start.clone(),
                )),
                (None, Some(_)) => Err(Error::new(
                    ErrorImpl::UnexpectedReturnValue { procedure: name },
                    statement.span.start.clone(),
                )),
                (None, None) => Ok(()),
            }
        }
        Stmt::Print(statement) => {
            statement.validated_type = Some(type_check_expr(type_checker, &mut statement.value)?);
            Ok(())
        }
        Stmt::If(statement) => {
            let position = statement.span.start.clone();
            assert_expected_type(type_checker, &mut statement.condition, &Type::Boolean)?;
            type_check_block(type_checker, &mut statement.then_block, &position);
            if let Some(else_block) = &mut statement.else_block {
                type_check_block(type_checker, else_block, &position);
            }
            Ok(())
        }
        Stmt::ProcedureDefinition(procedure) => {
            let origin = procedure.name.clone();
            validate_procedure_body(type_checker, procedure, &origin)
        }
        Stmt::GenericFunctionDefinition(generic) => validate_generic_body(type_checker, generic.name()),
        Stmt::ContractDefinition(_) | Stmt::NewTypeDefinition(_) => Ok(()),
        Stmt::ContractImplementation(implementation) => {
            for procedure in implementation.procedures.iter_mut() {
                let origin = procedure.name.clone();
                validate_procedure_body(type_checker, procedure, &origin)?;
            }
            Ok(())
        }
        Stmt::UnwrappersBlock(block) => {
            let position = block.span.start.clone();
            let ty = type_checker.symbols.type_of(&block.type_name, &position)?;
            if !matches!(ty, Type::UserDefined { .. }) {
                return Err(Error::new(
                    ErrorImpl::WrongBaseType {
                        expected: String::from("user-defined type"),
                        received: ty.to_string(),
                    },
                    position,
                ));
            }
            type_checker.symbols.mark_used(&block.type_name);

            for procedure in block.procedures.iter_mut() {
                match procedure {
                    UnwrapperProcedure::Procedure(procedure) => {
                        let origin = procedure.name.clone();
                        validate_procedure_body(type_checker, procedure, &origin)?;
                    }
                    UnwrapperProcedure::Generic(generic) => validate_generic_body(type_checker, generic.name())?,
                }
            }
            Ok(())
        }
    }
}

fn check_element_assignment(
    type_checker: &mut TypeChecker,
    assignment: &mut ListElementAssignmentStmt,
) -> Result<(), Error> {
    let position = assignment.span.start.clone();
    let target_type = type_check_expr(type_checker, &mut assignment.target)?;

    match &target_type {
        Type::Map(key, value) => {
            assert_expected_type(type_checker, &mut assignment.index, key)?;
            assert_expected_type(type_checker, &mut assignment.value, value)?;
        }
        Type::Tuple(elements) => {
            let index = tuple_index(&assignment.index, &target_type, elements.len(), &position)?;
            assert_expected_type(type_checker, &mut assignment.value, &elements[index])?;
        }
        Type::List(element) => {
            assert_expected_type(type_checker, &mut assignment.index, &Type::Integer)?;
            assert_expected_type(type_checker, &mut assignment.value, element)?;
        }
        other => {
            // Still walk the value so identifiers it reads count as used
            let _ = type_check_expr(type_checker, &mut assignment.value);
            return Err(Error::new(
                ErrorImpl::UnsupportedSubscriptTarget {
                    received: other.to_string(),
                },
                position,
            ));
        }
    }

    assignment.target_type = Some(target_type);
    Ok(())
}

/// Tuples are only indexed by integer literals within `0..arity`.
fn tuple_index(index: &Expr, tuple_type: &Type, arity: usize, position: &Position) -> Result<usize, Error> {
    let Some(value) = index.as_integer_literal() else {
        return Err(Error::new(ErrorImpl::NonLiteralTupleIndex, position.clone()));
    };
    if value < 0 || value as usize >= arity {
        return Err(Error::new(
            ErrorImpl::TupleIndexOutOfBounds {
                tuple_type: tuple_type.to_string(),
                arity,
                index: value,
            },
            position.clone(),
        ));
    }
    Ok(value as usize)
}

fn ensure_type_matches(expected: &Type, received: &Type, position: &Position) -> Result<(), Error> {
    if expected == received {
        Ok(())
    } else {
        Err(Error::new(
            ErrorImpl::TypeMatchError {
                expected: expected.to_string(),
                received: received.to_string(),
            },
            position.clone(),
        ))
    }
}

/// Infers the type of `ast` bottom-up.
pub fn type_check_expr(type_checker: &mut TypeChecker, ast: &mut Expr) -> Result<Type, Error> {
    let node = ast.kind_name();
    infer_expr(type_checker, ast).map_err(|error| error.with_node(node))
}

fn infer_expr(type_checker: &mut TypeChecker, ast: &mut Expr) -> Result<Type, Error> {
    match ast {
        Expr::Integer(_) => Ok(Type::Integer),
        Expr::Float(_) => Ok(Type::Float),
        Expr::Text(_) => Ok(Type::Text),
        Expr::Boolean(_) => Ok(Type::Boolean),
        Expr::Identifier(identifier) => {
            let ty = type_checker.symbols.type_of(&identifier.name, &identifier.span.start)?;
            // Generic functions only have a value per specialization, reached by calling them.
            if let Some(SymbolValue::Deferred(_)) = type_checker.symbols.value_of(&identifier.name) {
                return Err(Error::new(
                    ErrorImpl::WrongBaseType {
                        expected: String::from("concrete procedure value"),
                        received: ty.to_string(),
                    },
                    identifier.span.start.clone(),
                ));
            }
            type_checker.symbols.mark_used(&identifier.name);
            identifier.validated_type = Some(ty.clone());
            Ok(ty)
        }
        Expr::Tuple(tuple) => {
            let mut elements = Vec::with_capacity(tuple.elements.len());
            for element in tuple.elements.iter_mut() {
                elements.push(type_check_expr(type_checker, element)?);
            }
            let ty = Type::Tuple(elements);
            tuple.asserted_type = None;
            tuple.validated_type = Some(ty.clone());
            Ok(ty)
        }
        Expr::List(list) => {
            let Some((first, rest)) = list.elements.split_first_mut() else {
                return Err(Error::new(
                    ErrorImpl::AmbiguousEmptyCollection {
                        collection: String::from("list"),
                    },
                    list.span.start.clone(),
                ));
            };
            let element = type_check_expr(type_checker, first)?;
            for other in rest {
                assert_expected_type(type_checker, other, &element)?;
            }
            let ty = Type::list(element);
            list.validated_type = Some(ty.clone());
            Ok(ty)
        }
        Expr::Map(map) => {
            let Some(((first_key, first_value), rest)) = map.entries.split_first_mut() else {
                return Err(Error::new(
                    ErrorImpl::AmbiguousEmptyCollection {
                        collection: String::from("map"),
                    },
                    map.span.start.clone(),
                ));
            };
            let key = type_check_expr(type_checker, first_key)?;
            let value = type_check_expr(type_checker, first_value)?;
            for (other_key, other_value) in rest {
                assert_expected_type(type_checker, other_key, &key)?;
                assert_expected_type(type_checker, other_value, &value)?;
            }
            let ty = Type::map(key, value);
            map.validated_type = Some(ty.clone());
            Ok(ty)
        }
        Expr::Binary(binary) => check_binary(type_checker, binary),
        Expr::If(if_expr) => {
            assert_expected_type(type_checker, &mut if_expr.condition, &Type::Boolean)?;
            let ty = type_check_expr(type_checker, &mut if_expr.then_branch)?;
            assert_expected_type(type_checker, &mut if_expr.else_branch, &ty)?;
            if_expr.validated_type = Some(ty.clone());
            Ok(ty)
        }
        Expr::Call(call) => validate_call(type_checker, call, None, true),
        Expr::ContractCall(call) => validate_contract_call(type_checker, call, None, true),
        Expr::Subscript(subscript) => check_subscript(type_checker, subscript),
        Expr::Wrap(wrap) => {
            let position = wrap.span.start.clone();
            let ty = type_checker.symbols.type_of(&wrap.type_name, &position)?;
            let wrapped = match &ty {
                Type::UserDefined { wrapped, .. } => (**wrapped).clone(),
                other => {
                    return Err(Error::new(
                        ErrorImpl::WrongBaseType {
                            expected: String::from("user-defined type"),
                            received: other.to_string(),
                        },
                        position,
                    ))
                }
            };
            type_checker.symbols.mark_used(&wrap.type_name);
            assert_expected_type(type_checker, &mut wrap.value, &wrapped)?;
            wrap.validated_type = Some(ty.clone());
            Ok(ty)
        }
        Expr::Unwrap(unwrap) => {
            let position = unwrap.span.start.clone();
            let ty = type_check_expr(type_checker, &mut unwrap.value)?;
            let Type::UserDefined { name, wrapped } = &ty else {
                return Err(Error::new(
                    ErrorImpl::WrongBaseType {
                        expected: String::from("user-defined type"),
                        received: ty.to_string(),
                    },
                    position,
                ));
            };

            if let Some(allowed) = type_checker.unwrappers.get(name) {
                let permitted = type_checker
                    .procedure_stack
                    .last()
                    .is_some_and(|context| allowed.contains(&context.origin));
                if !permitted {
                    return Err(Error::new(ErrorImpl::IllegalUnwrap { type_: name.clone() }, position));
                }
            }

            let inner = (**wrapped).clone();
            unwrap.validated_type = Some(inner.clone());
            Ok(inner)
        }
    }
}

fn check_binary(type_checker: &mut TypeChecker, binary: &mut BinaryExpr) -> Result<Type, Error> {
    let position = binary.span.start.clone();
    let operand = type_check_expr(type_checker, &mut binary.left)?;

    let allowed = match binary.operator {
        BinaryOperator::Add => operand.is_numeric() || operand == Type::Text,
        BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Less
        | BinaryOperator::LessEqual
        | BinaryOperator::Greater
        | BinaryOperator::GreaterEqual => operand.is_numeric(),
        BinaryOperator::And | BinaryOperator::Or => operand == Type::Boolean,
        BinaryOperator::Equal | BinaryOperator::NotEqual => true,
    };
    if !allowed {
        let expected = match binary.operator {
            BinaryOperator::Add => "int, float or string",
            BinaryOperator::And | BinaryOperator::Or => "boolean",
            _ => "int or float",
        };
        return Err(Error::new(
            ErrorImpl::TypeMatchError {
                expected: expected.to_string(),
                received: operand.to_string(),
            },
            position,
        ));
    }

    assert_expected_type(type_checker, &mut binary.right, &operand)?;
    let ty = match binary.operator {
        BinaryOperator::Add | BinaryOperator::Subtract | BinaryOperator::Multiply | BinaryOperator::Divide => {
            operand.clone()
        }
        _ => Type::Boolean,
    };
    binary.operand_type = Some(operand);
    binary.validated_type = Some(ty.clone());
    Ok(ty)
}

fn check_subscript(type_checker: &mut TypeChecker, subscript: &mut SubscriptExpr) -> Result<Type, Error> {
    let position = subscript.span.start.clone();
    let target_type = type_check_expr(type_checker, &mut subscript.target)?;

    let ty = match &target_type {
        Type::List(element) => {
            assert_expected_type(type_checker, &mut subscript.index, &Type::Integer)?;
            (**element).clone()
        }
        Type::Map(key, value) => {
            assert_expected_type(type_checker, &mut subscript.index, key)?;
            (**value).clone()
        }
        Type::Tuple(elements) => {
            let index = tuple_index(&subscript.index, &target_type, elements.len(), &position)?;
            elements[index].clone()
        }
        other => {
            return Err(Error::new(
                ErrorImpl::UnsupportedSubscriptTarget {
                    received: other.to_string(),
                },
                position,
            ))
        }
    };

    subscript.target_type = Some(target_type);
    subscript.validated_type = Some(ty.clone());
    Ok(ty)
}

/// Checks `ast` top-down against `expected`.
pub fn assert_expected_type(type_checker: &mut TypeChecker, ast: &mut Expr, expected: &Type) -> Result<(), Error> {
    let node = ast.kind_name();
    assert_expr(type_checker, ast, expected).map_err(|error| error.with_node(node))
}

fn assert_expr(type_checker: &mut TypeChecker, ast: &mut Expr, expected: &Type) -> Result<(), Error> {
    match (ast, expected) {
        (Expr::Tuple(tuple), Type::Tuple(expected_elements)) => {
            tuple.asserted_type = Some(expected.clone());
            if tuple.elements.len() != expected_elements.len() {
                return Err(Error::new(
                    ErrorImpl::TypeMatchError {
                        expected: expected.to_string(),
                        received: format!("tuple of {} elements", tuple.elements.len()),
                    },
                    tuple.span.start.clone(),
                ));
            }
            for (element, element_type) in tuple.elements.iter_mut().zip(expected_elements) {
                assert_expected_type(type_checker, element, element_type)?;
            }
            tuple.validated_type = Some(expected.clone());
            Ok(())
        }
        (Expr::List(list), Type::List(element_type)) => {
            for element in list.elements.iter_mut() {
                assert_expected_type(type_checker, element, element_type)?;
            }
            list.validated_type = Some(expected.clone());
            Ok(())
        }
        (Expr::Map(map), Type::Map(key_type, value_type)) => {
            for (key, value) in map.entries.iter_mut() {
                assert_expected_type(type_checker, key, key_type)?;
                assert_expected_type(type_checker, value, value_type)?;
            }
            map.validated_type = Some(expected.clone());
            Ok(())
        }
        (Expr::If(if_expr), _) => {
            assert_expected_type(type_checker, &mut if_expr.condition, &Type::Boolean)?;
            assert_expected_type(type_checker, &mut if_expr.then_branch, expected)?;
            assert_expected_type(type_checker, &mut if_expr.else_branch, expected)?;
            if_expr.validated_type = Some(expected.clone());
            Ok(())
        }
        (Expr::Call(call), _) => {
            let received = validate_call(type_checker, call, Some(expected), true)?;
            ensure_type_matches(expected, &received, &call.span.start)
        }
        (Expr::ContractCall(call), _) => {
            let received = validate_contract_call(type_checker, call, Some(expected), true)?;
            ensure_type_matches(expected, &received, &call.span.start)
        }
        (ast, _) => {
            let received = type_check_expr(type_checker, ast)?;
            ensure_type_matches(expected, &received, &ast.span().start)
        }
    }
}

/// Validates a call to a named procedure.
///
/// Calls to generic functions infer the concrete type assignment from the
/// arguments (and the expected type, when asserted top-down), check the
/// required contracts and request the matching specialization.
pub fn validate_call(
    type_checker: &mut TypeChecker,
    call: &mut FunctionCallExpr,
    expected: Option<&Type>,
    as_expression: bool,
) -> Result<Type, Error> {
    let position = call.span.start.clone();
    let callee_type = type_checker.symbols.type_of(&call.name, &position)?;
    type_checker.symbols.mark_used(&call.name);

    let procedure = match callee_type {
        Type::Procedure(procedure) => *procedure,
        other => {
            return Err(Error::new(
                ErrorImpl::WrongBaseType {
                    expected: String::from("procedure"),
                    received: other.to_string(),
                },
                position,
            ))
        }
    };

    if as_expression && procedure.kind == ProcedureKind::Consumer {
        return Err(Error::new(
            ErrorImpl::NotAnExpression {
                procedure: call.name.clone(),
                kind: procedure.kind.name().to_string(),
            },
            position,
        ));
    }
    if call.args.len() != procedure.arg_count() {
        return Err(Error::new(
            ErrorImpl::ArityMismatch {
                expected: procedure.arg_count(),
                received: call.args.len(),
            },
            position,
        ));
    }

    let (return_type, specialized_name) = match &procedure.generic_params {
        Some(generic_params) => {
            let assignment = infer_generic_assignment(
                type_checker,
                &call.name,
                generic_params,
                &procedure.arg_types,
                procedure.return_type.as_ref(),
                &mut call.args,
                expected,
                &position,
            )?;

            for (contract, generic_args) in procedure.required_contracts.iter().flatten() {
                let types = generic_args
                    .iter()
                    .map(|arg| assignment.get(arg).cloned().unwrap_or_else(|| Type::generic(arg)))
                    .collect::<Vec<_>>();
                type_checker.check_contract_requirement(contract, &types, &position)?;
            }

            let return_type = procedure
                .return_type
                .as_ref()
                .map(|ty| ty.substitute(&assignment))
                .unwrap_or(Type::Nothing);
            let resolver = match type_checker.symbols.value_of(&call.name) {
                Some(SymbolValue::Deferred(resolver)) => resolver.clone(),
                _ => {
                    return Err(Error::new(
                        ErrorImpl::UndeclaredIdentifier {
                            identifier: call.name.clone(),
                        },
                        position,
                    ))
                }
            };
            let name = prepare_monomorphization(type_checker, &resolver, assignment, &position)?;
            (return_type, Some(name))
        }
        None => {
            for ((_, declared), arg) in procedure.arg_types.iter().zip(call.args.iter_mut()) {
                assert_expected_type(type_checker, arg, declared)?;
            }
            (procedure.return_type.clone().unwrap_or(Type::Nothing), None)
        }
    };

    call.specialized_name = specialized_name;
    call.validated_type = Some(return_type.clone());
    Ok(return_type)
}

/// Validates `Contract::procedure(args)`, inferring the contract's type
/// parameters from the arguments.
pub fn validate_contract_call(
    type_checker: &mut TypeChecker,
    call: &mut ContractProcedureCallExpr,
    expected: Option<&Type>,
    as_expression: bool,
) -> Result<Type, Error> {
    let position = call.span.start.clone();
    let qualified_name = format!("{}::{}", call.contract, call.procedure);
    let contract = type_checker.contracts.get(&call.contract).cloned().ok_or_else(|| {
        Error::new(
            ErrorImpl::UndeclaredContract {
                contract: call.contract.clone(),
                function: call.procedure.clone(),
            },
            position.clone(),
        )
    })?;
    type_checker.symbols.mark_used(&call.contract);

    let Some(signature) = contract.signatures.get(&call.procedure) else {
        return Err(Error::new(
            ErrorImpl::UndeclaredIdentifier {
                identifier: qualified_name,
            },
            position,
        ));
    };

    if as_expression && signature.kind == ProcedureKind::Consumer {
        return Err(Error::new(
            ErrorImpl::NotAnExpression {
                procedure: qualified_name,
                kind: signature.kind.name().to_string(),
            },
            position,
        ));
    }
    if call.args.len() != signature.arg_count() {
        return Err(Error::new(
            ErrorImpl::ArityMismatch {
                expected: signature.arg_count(),
                received: call.args.len(),
            },
            position,
        ));
    }

    let assignment = infer_generic_assignment(
        type_checker,
        &qualified_name,
        &contract.type_params,
        &signature.arg_types,
        signature.return_type.as_ref(),
        &mut call.args,
        expected,
        &position,
    )?;
    let types = contract
        .type_params
        .iter()
        .map(|param| assignment.get(param).cloned().unwrap_or_else(|| Type::generic(param)))
        .collect::<Vec<_>>();
    let implementation = type_checker.check_contract_requirement(&call.contract, &types, &position)?;

    let return_type = signature
        .return_type
        .as_ref()
        .map(|ty| ty.substitute(&assignment))
        .unwrap_or(Type::Nothing);
    call.resolved_name = implementation.and_then(|procedures| procedures.get(&call.procedure).cloned());
    call.validated_type = Some(return_type.clone());
    Ok(return_type)
}

/// Computes the assignment of `generic_params` for one call site.
///
/// The expected type binds the return type first. Arguments whose declared
/// type is then fully bound are checked top-down, the rest are inferred and
/// unified against their declared type.
#[allow(clippy::too_many_arguments)]
fn infer_generic_assignment(
    type_checker: &mut TypeChecker,
    function: &str,
    generic_params: &[String],
    declared_args: &[(String, Type)],
    declared_return: Option<&Type>,
    args: &mut [Expr],
    expected: Option<&Type>,
    position: &Position,
) -> Result<TypeAssignment, Error> {
    let mut assignment = TypeAssignment::new();

    if let (Some(expected), Some(declared_return)) = (expected, declared_return) {
        if declared_return.contains_generic_params() && !declared_return.unify(expected, &mut assignment) {
            return Err(Error::new(
                ErrorImpl::TypeMatchError {
                    expected: expected.to_string(),
                    received: declared_return.to_string(),
                },
                position.clone(),
            ));
        }
    }

    for ((_, declared), arg) in declared_args.iter().zip(args.iter_mut()) {
        let fully_bound = declared
            .generic_param_names()
            .iter()
            .all(|name| assignment.contains_key(name));
        if fully_bound {
            assert_expected_type(type_checker, arg, &declared.substitute(&assignment))?;
            continue;
        }

        let received = type_check_expr(type_checker, arg)?;
        if !declared.unify(&received, &mut assignment) {
            return Err(Error::new(
                ErrorImpl::TypeMatchError {
                    expected: declared.substitute(&assignment).to_string(),
                    received: received.to_string(),
                },
                arg.span().start.clone(),
            ));
        }
    }

    if let Some(unbound) = generic_params.iter().find(|param| !assignment.contains_key(*param)) {
        return Err(Error::new(
            ErrorImpl::UninferableGenericParam {
                param: unbound.clone(),
                function: function.to_string(),
            },
            position.clone(),
        ));
    }
    Ok(assignment)
}
