use std::{
    collections::{BTreeMap, BTreeSet},
    mem,
};

use crate::{
    ast::{
        statements::{GenericFunctionDefinitionStmt, ProcedureDefinitionStmt},
        types::{ProcedureType, Type, TypeAssignment},
    },
    config::config::DebugTrace,
    errors::errors::{Error, ErrorImpl},
    log_dbg, phase_log, trace_dbg,
    type_checker::{
        symbol_table::{SpecializationResolver, SymbolValue},
        type_checker::{validate_procedure_body, GenericContext, TypeChecker},
    },
    Position,
};

use super::naming::hashed_monomorphization_name;

/// A generic function together with one concrete type per parameter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonomorphizationKey {
    pub function: String,
    pub assignment: TypeAssignment,
}

#[derive(Debug, Clone)]
pub struct GenericTemplate {
    pub definition: GenericFunctionDefinitionStmt,
    pub procedure_type: ProcedureType,
    pub body_validated: bool,
}

#[derive(Debug, Clone)]
pub struct PendingSpecialization {
    pub verbose_name: String,
    /// Clone of the template body, named after the specialization
    pub procedure: ProcedureDefinitionStmt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmittedSpecialization {
    pub verbose_name: String,
    pub emitted_name: String,
    pub procedure_type: ProcedureType,
    /// Validated body, named `verbose_name`
    pub procedure: ProcedureDefinitionStmt,
}

/// A validated specialization handed to a backend.
#[derive(Debug, Clone)]
pub struct Specialization {
    pub key: MonomorphizationKey,
    pub verbose_name: String,
    pub emitted_name: String,
    /// Named `emitted_name` while the backend sees it
    pub procedure: ProcedureDefinitionStmt,
}

/// Generic templates and the specializations requested from them.
#[derive(Debug, Default)]
pub struct Monomorphizer {
    templates: BTreeMap<String, GenericTemplate>,
    pending: BTreeMap<MonomorphizationKey, PendingSpecialization>,
    already_emitted: BTreeMap<MonomorphizationKey, EmittedSpecialization>,
    /// Keys of `already_emitted` in the order they were validated
    emission_order: Vec<MonomorphizationKey>,
    in_progress: Vec<MonomorphizationKey>,
    within_generic_validation: bool,
}

impl Monomorphizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn template(&self, function: &str) -> Option<&GenericTemplate> {
        self.templates.get(function)
    }

    pub fn is_generic_function(&self, function: &str) -> bool {
        self.templates.contains_key(function)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, key: &MonomorphizationKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn emitted(&self, key: &MonomorphizationKey) -> Option<&EmittedSpecialization> {
        self.already_emitted.get(key)
    }

    pub fn emitted_count(&self) -> usize {
        self.already_emitted.len()
    }

    pub fn emitted_specializations(&self) -> impl Iterator<Item = (&MonomorphizationKey, &EmittedSpecialization)> {
        self.already_emitted.iter()
    }

    /// Every validated specialization, in validation order, named as a
    /// backend sees it.
    pub fn recorded_specializations(&self) -> Vec<Specialization> {
        self.emission_order
            .iter()
            .filter_map(|key| {
                let emitted = self.already_emitted.get(key)?;
                let mut procedure = emitted.procedure.clone();
                procedure.name = emitted.emitted_name.clone();
                Some(Specialization {
                    key: key.clone(),
                    verbose_name: emitted.verbose_name.clone(),
                    emitted_name: emitted.emitted_name.clone(),
                    procedure,
                })
            })
            .collect()
    }

    pub fn within_generic_validation(&self) -> bool {
        self.within_generic_validation
    }
}

/// Binds each generic parameter name to a placeholder type at level 0.
pub fn bind_generic_placeholders(
    type_checker: &mut TypeChecker,
    function: &str,
    generic_params: &[String],
    position: &Position,
) -> Result<(), Error> {
    for (bound, param) in generic_params.iter().enumerate() {
        if type_checker.symbols.is_declared(param) {
            unbind_generic_params(type_checker, &generic_params[..bound]);
            return Err(Error::new(
                ErrorImpl::GenericNameCollision {
                    name: param.clone(),
                    function: function.to_string(),
                },
                position.clone(),
            ));
        }
        type_checker
            .symbols
            .declare_type_definition(param, Type::generic(param), position)?;
    }
    Ok(())
}

pub fn unbind_generic_params(type_checker: &mut TypeChecker, generic_params: &[String]) {
    for param in generic_params {
        type_checker.symbols.delete_global(param);
    }
}

/// Registers a generic function: checks its parameters and contract
/// requirements, resolves its signature over placeholders and installs a
/// deferred resolver at level 0. Registering the same name twice is a no-op.
pub fn register_generic_function(
    type_checker: &mut TypeChecker,
    generic: &mut GenericFunctionDefinitionStmt,
) -> Result<(), Error> {
    let function = generic.name().to_string();
    if let Some(template) = type_checker.monomorphizer.templates.get(&function) {
        if template.definition == *generic {
            return Ok(());
        }
    }

    let position = generic.span.start.clone();
    if type_checker.symbols.is_declared(&function) {
        return Err(Error::new(
            ErrorImpl::Redeclaration { identifier: function },
            position,
        ));
    }

    bind_generic_placeholders(type_checker, &function, &generic.generic_params, &position)?;
    let resolved = check_required_contracts(type_checker, generic, &position)
        .and_then(|_| type_checker.resolve_procedure_type(&generic.procedure));
    unbind_generic_params(type_checker, &generic.generic_params);

    let procedure_type = resolved?.with_generics(generic.generic_params.clone(), generic.required_contracts.clone());
    let resolver = SpecializationResolver {
        function: function.clone(),
        generic_params: generic.generic_params.clone(),
    };
    type_checker.symbols.declare_at_level(
        &function,
        Type::procedure(procedure_type.clone()),
        Some(SymbolValue::Deferred(resolver)),
        0,
        &position,
    )?;
    generic.procedure.resolved_type = Some(procedure_type.clone());
    let definition = generic.clone();

    trace_dbg!(
        &type_checker.config,
        DebugTrace::Mono,
        "registered generic `{}` over <{}>",
        function,
        generic.generic_params.join(", ")
    );
    type_checker.monomorphizer.templates.insert(
        function,
        GenericTemplate {
            definition,
            procedure_type,
            body_validated: false,
        },
    );
    Ok(())
}

fn check_required_contracts(
    type_checker: &TypeChecker,
    generic: &GenericFunctionDefinitionStmt,
    position: &Position,
) -> Result<(), Error> {
    let function = generic.name();
    for (contract, generic_args) in &generic.required_contracts {
        let Some(info) = type_checker.contracts.get(contract) else {
            return Err(Error::new(
                ErrorImpl::UndeclaredContract {
                    contract: contract.clone(),
                    function: function.to_string(),
                },
                position.clone(),
            ));
        };
        if info.type_params.len() != generic_args.len() {
            return Err(Error::new(
                ErrorImpl::ContractArityMismatch {
                    contract: contract.clone(),
                    expected: info.type_params.len(),
                    received: generic_args.len(),
                },
                position.clone(),
            ));
        }
        if let Some(unknown) = generic_args.iter().find(|arg| !generic.generic_params.contains(arg)) {
            return Err(Error::new(
                ErrorImpl::UnknownGenericArg {
                    generic_arg: unknown.clone(),
                    contract: contract.clone(),
                    function: function.to_string(),
                },
                position.clone(),
            ));
        }
    }
    Ok(())
}

/// Validates a generic function's body once, over placeholder types. The
/// result is never emitted; specializations are validated again.
pub fn validate_generic_body(type_checker: &mut TypeChecker, function: &str) -> Result<(), Error> {
    let Some(template) = type_checker.monomorphizer.templates.get_mut(function) else {
        return Err(Error::new(
            ErrorImpl::UndeclaredIdentifier {
                identifier: function.to_string(),
            },
            Position::null(),
        ));
    };
    if template.body_validated {
        return Ok(());
    }
    template.body_validated = true;

    let definition = template.definition.clone();
    let mut procedure = definition.procedure.clone();
    procedure.resolved_type = Some(template.procedure_type.clone());
    let position = definition.span.start.clone();

    bind_generic_placeholders(type_checker, function, &definition.generic_params, &position)?;
    let was_within = mem::replace(&mut type_checker.monomorphizer.within_generic_validation, true);
    type_checker.generic_stack.push(GenericContext {
        function: function.to_string(),
        required_contracts: definition.required_contracts.clone(),
    });

    let result = validate_procedure_body(type_checker, &mut procedure, function);

    type_checker.generic_stack.pop();
    type_checker.monomorphizer.within_generic_validation = was_within;
    unbind_generic_params(type_checker, &definition.generic_params);
    result
}

/// Requests the specialization `resolver` names for `assignment` and
/// returns the name the call resolves to. `resolver` is the deferred value a
/// generic function's symbol holds.
///
/// Requests are memoized per key. Inside abstract validation, or while the
/// assignment still holds placeholders, the generic name is returned and
/// nothing is queued.
pub fn prepare_monomorphization(
    type_checker: &mut TypeChecker,
    resolver: &SpecializationResolver,
    assignment: TypeAssignment,
    position: &Position,
) -> Result<String, Error> {
    let function = resolver.function.as_str();
    let Some(template) = type_checker.monomorphizer.templates.get(function) else {
        return Err(Error::new(
            ErrorImpl::UndeclaredIdentifier {
                identifier: function.to_string(),
            },
            position.clone(),
        ));
    };

    let key = MonomorphizationKey {
        function: function.to_string(),
        assignment,
    };
    let monomorphizer = &type_checker.monomorphizer;
    if let Some(pending) = monomorphizer.pending.get(&key) {
        return Ok(pending.verbose_name.clone());
    }
    if let Some(emitted) = monomorphizer.already_emitted.get(&key) {
        return Ok(emitted.verbose_name.clone());
    }
    if monomorphizer.in_progress.contains(&key) {
        return Ok(resolver.resolve(&key.assignment));
    }
    if monomorphizer.within_generic_validation || key.assignment.values().any(Type::contains_generic_params) {
        return Ok(function.to_string());
    }

    let depth = key.assignment.values().map(Type::depth).max().unwrap_or(0);
    if depth > type_checker.config.max_specialization_depth {
        return Err(Error::new(
            ErrorImpl::UnboundedSpecialization {
                function: function.to_string(),
                depth,
            },
            position.clone(),
        ));
    }

    let verbose_name = resolver.resolve(&key.assignment);
    let specialized_type = template.procedure_type.specialize(&key.assignment);
    let mut procedure = template.definition.procedure.clone();
    procedure.name = verbose_name.clone();
    procedure.resolved_type = None;

    type_checker
        .symbols
        .put_global(&verbose_name, Type::procedure(specialized_type), None);
    trace_dbg!(&type_checker.config, DebugTrace::Mono, "queued {}", verbose_name);
    type_checker.monomorphizer.pending.insert(
        key,
        PendingSpecialization {
            verbose_name: verbose_name.clone(),
            procedure,
        },
    );
    Ok(verbose_name)
}

/// Validates every pending specialization and hands it to `sink`, until no
/// new ones are requested. Returns how many were produced.
pub fn drain_monomorphizations<F>(type_checker: &mut TypeChecker, mut sink: F) -> Result<usize, Error>
where
    F: FnMut(&mut TypeChecker, &Specialization) -> Result<(), Error>,
{
    let check_unused = type_checker.symbols.set_check_unused(false);
    let result = drain_pending(type_checker, &mut sink);
    type_checker.symbols.set_check_unused(check_unused);

    if let Ok(count) = &result {
        phase_log!(&type_checker.config, "Monomorphized {} specializations", count);
    }
    result
}

/// Drains whatever is still pending, then hands every specialization the
/// session has validated so far to `sink`. Backends go through this so each
/// one sees the full set no matter which of them ran first.
pub fn replay_specializations<F>(type_checker: &mut TypeChecker, mut sink: F) -> Result<usize, Error>
where
    F: FnMut(&mut TypeChecker, &Specialization) -> Result<(), Error>,
{
    drain_monomorphizations(type_checker, |_, _| Ok(()))?;

    let recorded = type_checker.monomorphizer.recorded_specializations();
    for specialization in &recorded {
        sink(type_checker, specialization)?;
    }
    trace_dbg!(
        &type_checker.config,
        DebugTrace::Mono,
        "replayed {} specializations",
        recorded.len()
    );
    Ok(recorded.len())
}

fn drain_pending<F>(type_checker: &mut TypeChecker, sink: &mut F) -> Result<usize, Error>
where
    F: FnMut(&mut TypeChecker, &Specialization) -> Result<(), Error>,
{
    let mut produced = 0;
    loop {
        let pending = mem::take(&mut type_checker.monomorphizer.pending);
        if pending.is_empty() {
            return Ok(produced);
        }
        log_dbg!(&type_checker.config, "draining {} pending specializations", pending.len());

        for (key, pending) in pending {
            if type_checker.monomorphizer.already_emitted.contains_key(&key) {
                continue;
            }

            let mut specialization = specialize(type_checker, key, pending)?;
            sink(type_checker, &specialization)?;
            specialization.procedure.name = specialization.verbose_name.clone();

            let procedure_type = specialization
                .procedure
                .resolved_type
                .clone()
                .unwrap_or_else(|| ProcedureType::new(specialization.procedure.kind, vec![], None));
            type_checker.monomorphizer.emission_order.push(specialization.key.clone());
            type_checker.monomorphizer.already_emitted.insert(
                specialization.key,
                EmittedSpecialization {
                    verbose_name: specialization.verbose_name,
                    emitted_name: specialization.emitted_name,
                    procedure_type,
                    procedure: specialization.procedure,
                },
            );
            produced += 1;
        }
    }
}

/// Validates one specialization with its parameters bound to concrete types.
fn specialize(
    type_checker: &mut TypeChecker,
    key: MonomorphizationKey,
    pending: PendingSpecialization,
) -> Result<Specialization, Error> {
    let PendingSpecialization {
        verbose_name,
        mut procedure,
    } = pending;
    let position = procedure.span.start.clone();
    let specialized_type = type_checker.symbols.type_of(&verbose_name, &position)?;
    procedure.resolved_type = specialized_type.as_procedure().cloned();

    for (param, ty) in &key.assignment {
        type_checker.symbols.put_type_definition(param, ty.clone());
    }
    type_checker.monomorphizer.in_progress.push(key.clone());
    let errors_before = type_checker.error_count();

    let result = validate_procedure_body(type_checker, &mut procedure, &key.function);

    type_checker.monomorphizer.in_progress.pop();
    let params = key.assignment.keys().cloned().collect::<BTreeSet<_>>();
    for param in &params {
        type_checker.symbols.delete_global(param);
    }

    result?;
    if let Some(error) = type_checker.errors().get(errors_before) {
        return Err(error.clone());
    }

    let emitted_name = hashed_monomorphization_name(&key.function, &verbose_name);
    trace_dbg!(
        &type_checker.config,
        DebugTrace::Mono,
        "specialized {} as {}",
        verbose_name,
        emitted_name
    );
    procedure.name = emitted_name.clone();
    Ok(Specialization {
        key,
        verbose_name,
        emitted_name,
        procedure,
    })
}
