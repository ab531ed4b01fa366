//! Type system definitions.
//!
//! This module defines the types the validator assigns to every node:
//!
//! - Primitive types (int, float, string, boolean, nothing)
//! - Collection types (lists, maps, tuples)
//! - Procedure types (functions, providers, consumers) with their generic metadata
//! - Contracts, generic type parameter placeholders and user-defined types
//! - `TypeExpr`, the unresolved annotation form handed over by the front-end
//!
//! Types are immutable once built. Equality is structural.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
    hash::Hash,
};

/// Concrete assignment of generic parameter names to types.
pub type TypeAssignment = BTreeMap<String, Type>;

/// The tag of a type, independent of its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Integer,
    Float,
    Text,
    Boolean,
    Nothing,
    List,
    Map,
    Tuple,
    Function,
    ProviderFunction,
    ConsumerFunction,
    Contract,
    GenericTypeParam,
    UserDefinedType,
}

impl Display for BaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BaseType::Integer => "int",
            BaseType::Float => "float",
            BaseType::Text => "string",
            BaseType::Boolean => "boolean",
            BaseType::Nothing => "nothing",
            BaseType::List => "list",
            BaseType::Map => "map",
            BaseType::Tuple => "tuple",
            BaseType::Function => "function",
            BaseType::ProviderFunction => "provider",
            BaseType::ConsumerFunction => "consumer",
            BaseType::Contract => "contract",
            BaseType::GenericTypeParam => "generic type parameter",
            BaseType::UserDefinedType => "user-defined type",
        };
        write!(f, "{}", name)
    }
}

/// The three procedure shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcedureKind {
    /// Takes arguments and returns a value
    Function,
    /// Takes no arguments and returns a value
    Provider,
    /// Takes arguments and returns nothing
    Consumer,
}

impl ProcedureKind {
    pub fn base_type(&self) -> BaseType {
        match self {
            ProcedureKind::Function => BaseType::Function,
            ProcedureKind::Provider => BaseType::ProviderFunction,
            ProcedureKind::Consumer => BaseType::ConsumerFunction,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProcedureKind::Function => "function",
            ProcedureKind::Provider => "provider",
            ProcedureKind::Consumer => "consumer",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcedureType {
    pub kind: ProcedureKind,
    /// Ordered argument names and types
    pub arg_types: Vec<(String, Type)>,
    /// `None` for consumers
    pub return_type: Option<Type>,
    /// Dependencies injected by key rather than passed as arguments
    pub injected_keys: Vec<(String, Type)>,
    pub explicitly_blocking: bool,
    /// Argument indices whose own blocking-ness decides this procedure's
    pub blocking_generic_args: Option<Vec<usize>>,
    pub generic_params: Option<Vec<String>>,
    /// Contract name to the generic parameter names it is required over
    pub required_contracts: Option<BTreeMap<String, Vec<String>>>,
}

type ComparisonKey<'a> = (
    ProcedureKind,
    Vec<&'a Type>,
    Option<&'a Type>,
    &'a [(String, Type)],
    bool,
    Option<&'a [usize]>,
    Option<&'a [String]>,
    Option<&'a BTreeMap<String, Vec<String>>>,
);

impl ProcedureType {
    pub fn new(kind: ProcedureKind, arg_types: Vec<(String, Type)>, return_type: Option<Type>) -> Self {
        ProcedureType {
            kind,
            arg_types,
            return_type,
            injected_keys: vec![],
            explicitly_blocking: false,
            blocking_generic_args: None,
            generic_params: None,
            required_contracts: None,
        }
    }

    pub fn with_injected_keys(mut self, injected_keys: Vec<(String, Type)>) -> Self {
        self.injected_keys = injected_keys;
        self
    }

    pub fn with_blocking(mut self, explicitly_blocking: bool, blocking_generic_args: Option<Vec<usize>>) -> Self {
        self.explicitly_blocking = explicitly_blocking;
        self.blocking_generic_args = blocking_generic_args;
        self
    }

    pub fn with_generics(
        mut self,
        generic_params: Vec<String>,
        required_contracts: BTreeMap<String, Vec<String>>,
    ) -> Self {
        self.generic_params = Some(generic_params);
        self.required_contracts = Some(required_contracts);
        self
    }

    pub fn is_generic(&self) -> bool {
        self.generic_params.is_some()
    }

    pub fn arg_count(&self) -> usize {
        self.arg_types.len()
    }

    pub fn substitute(&self, assignment: &TypeAssignment) -> ProcedureType {
        ProcedureType {
            kind: self.kind,
            arg_types: self
                .arg_types
                .iter()
                .map(|(name, ty)| (name.clone(), ty.substitute(assignment)))
                .collect(),
            return_type: self.return_type.as_ref().map(|ty| ty.substitute(assignment)),
            injected_keys: self
                .injected_keys
                .iter()
                .map(|(name, ty)| (name.clone(), ty.substitute(assignment)))
                .collect(),
            explicitly_blocking: self.explicitly_blocking,
            blocking_generic_args: self.blocking_generic_args.clone(),
            generic_params: self.generic_params.clone(),
            required_contracts: self.required_contracts.clone(),
        }
    }

    /// Substitutes `assignment` and drops the generic metadata. A procedure
    /// blocking-generic over some arguments becomes blocking when any of those
    /// arguments is specialized to a blocking procedure.
    pub fn specialize(&self, assignment: &TypeAssignment) -> ProcedureType {
        let mut specialized = self.substitute(assignment);
        if let Some(indices) = specialized.blocking_generic_args.take() {
            let blocking_arg = indices.iter().any(|index| {
                matches!(
                    specialized.arg_types.get(*index),
                    Some((_, Type::Procedure(procedure))) if procedure.explicitly_blocking
                )
            });
            specialized.explicitly_blocking |= blocking_arg;
        }
        specialized.generic_params = None;
        specialized.required_contracts = None;
        specialized
    }

    // Argument names are not part of a procedure's identity
    fn comparison_key(&self) -> ComparisonKey<'_> {
        (
            self.kind,
            self.arg_types.iter().map(|(_, ty)| ty).collect(),
            self.return_type.as_ref(),
            &self.injected_keys,
            self.explicitly_blocking,
            self.blocking_generic_args.as_deref(),
            self.generic_params.as_deref(),
            self.required_contracts.as_ref(),
        )
    }
}

impl PartialEq for ProcedureType {
    fn eq(&self, other: &Self) -> bool {
        self.comparison_key() == other.comparison_key()
    }
}

impl Eq for ProcedureType {}

impl Hash for ProcedureType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.comparison_key().hash(state);
    }
}

impl PartialOrd for ProcedureType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProcedureType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparison_key().cmp(&other.comparison_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Integer,
    Float,
    Text,
    Boolean,
    Nothing,
    List(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Tuple(Vec<Type>),
    Procedure(Box<ProcedureType>),
    Contract { name: String, type_params: Vec<String> },
    /// Placeholder for a generic parameter, only meaningful while bound
    GenericTypeParam(String),
    UserDefined { name: String, wrapped: Box<Type> },
}

impl Type {
    pub fn list(element: Type) -> Self {
        Type::List(Box::new(element))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn tuple(elements: Vec<Type>) -> Self {
        Type::Tuple(elements)
    }

    pub fn procedure(procedure: ProcedureType) -> Self {
        Type::Procedure(Box::new(procedure))
    }

    /// Function type with positional argument names.
    pub fn function(args: Vec<Type>, return_type: Type) -> Self {
        Type::procedure(ProcedureType::new(
            ProcedureKind::Function,
            positional_args(args),
            Some(return_type),
        ))
    }

    pub fn provider(return_type: Type) -> Self {
        Type::procedure(ProcedureType::new(ProcedureKind::Provider, vec![], Some(return_type)))
    }

    pub fn consumer(args: Vec<Type>) -> Self {
        Type::procedure(ProcedureType::new(ProcedureKind::Consumer, positional_args(args), None))
    }

    pub fn generic(name: &str) -> Self {
        Type::GenericTypeParam(name.to_string())
    }

    pub fn user_defined(name: &str, wrapped: Type) -> Self {
        Type::UserDefined {
            name: name.to_string(),
            wrapped: Box::new(wrapped),
        }
    }

    pub fn base_type(&self) -> BaseType {
        match self {
            Type::Integer => BaseType::Integer,
            Type::Float => BaseType::Float,
            Type::Text => BaseType::Text,
            Type::Boolean => BaseType::Boolean,
            Type::Nothing => BaseType::Nothing,
            Type::List(_) => BaseType::List,
            Type::Map(_, _) => BaseType::Map,
            Type::Tuple(_) => BaseType::Tuple,
            Type::Procedure(procedure) => procedure.kind.base_type(),
            Type::Contract { .. } => BaseType::Contract,
            Type::GenericTypeParam(_) => BaseType::GenericTypeParam,
            Type::UserDefined { .. } => BaseType::UserDefinedType,
        }
    }

    pub fn as_procedure(&self) -> Option<&ProcedureType> {
        match self {
            Type::Procedure(procedure) => Some(procedure),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Float)
    }

    pub fn contains_generic_params(&self) -> bool {
        match self {
            Type::GenericTypeParam(_) => true,
            Type::List(element) => element.contains_generic_params(),
            Type::Map(key, value) => key.contains_generic_params() || value.contains_generic_params(),
            Type::Tuple(elements) => elements.iter().any(Type::contains_generic_params),
            Type::Procedure(procedure) => {
                procedure.arg_types.iter().any(|(_, ty)| ty.contains_generic_params())
                    || procedure
                        .return_type
                        .as_ref()
                        .is_some_and(Type::contains_generic_params)
            }
            Type::UserDefined { wrapped, .. } => wrapped.contains_generic_params(),
            _ => false,
        }
    }

    /// Names of every generic parameter mentioned anywhere in this type.
    pub fn generic_param_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_generic_params(&mut names);
        names
    }

    fn collect_generic_params(&self, names: &mut BTreeSet<String>) {
        match self {
            Type::GenericTypeParam(name) => {
                names.insert(name.clone());
            }
            Type::List(element) => element.collect_generic_params(names),
            Type::Map(key, value) => {
                key.collect_generic_params(names);
                value.collect_generic_params(names);
            }
            Type::Tuple(elements) => elements.iter().for_each(|ty| ty.collect_generic_params(names)),
            Type::Procedure(procedure) => {
                for (_, ty) in &procedure.arg_types {
                    ty.collect_generic_params(names);
                }
                if let Some(return_type) = &procedure.return_type {
                    return_type.collect_generic_params(names);
                }
            }
            Type::UserDefined { wrapped, .. } => wrapped.collect_generic_params(names),
            _ => {}
        }
    }

    /// Nesting depth, where scalars and named types count as 1.
    pub fn depth(&self) -> usize {
        match self {
            Type::List(element) => 1 + element.depth(),
            Type::Map(key, value) => 1 + key.depth().max(value.depth()),
            Type::Tuple(elements) => 1 + elements.iter().map(Type::depth).max().unwrap_or(0),
            Type::Procedure(procedure) => {
                1 + procedure
                    .arg_types
                    .iter()
                    .map(|(_, ty)| ty)
                    .chain(procedure.return_type.as_ref())
                    .map(Type::depth)
                    .max()
                    .unwrap_or(0)
            }
            _ => 1,
        }
    }

    /// Replaces every bound generic parameter with its assigned type.
    pub fn substitute(&self, assignment: &TypeAssignment) -> Type {
        match self {
            Type::GenericTypeParam(name) => assignment.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::List(element) => Type::list(element.substitute(assignment)),
            Type::Map(key, value) => Type::map(key.substitute(assignment), value.substitute(assignment)),
            Type::Tuple(elements) => Type::Tuple(elements.iter().map(|ty| ty.substitute(assignment)).collect()),
            Type::Procedure(procedure) => Type::procedure(procedure.substitute(assignment)),
            Type::UserDefined { name, wrapped } => Type::UserDefined {
                name: name.clone(),
                wrapped: Box::new(wrapped.substitute(assignment)),
            },
            _ => self.clone(),
        }
    }

    /// Matches this declared type against `actual`, binding generic parameters
    /// into `assignment`. Returns false on any structural mismatch or on a
    /// parameter already bound to a different type.
    pub fn unify(&self, actual: &Type, assignment: &mut TypeAssignment) -> bool {
        match (self, actual) {
            (Type::GenericTypeParam(name), _) => match assignment.get(name) {
                Some(bound) => bound == actual,
                None => {
                    assignment.insert(name.clone(), actual.clone());
                    true
                }
            },
            (Type::List(declared), Type::List(actual)) => declared.unify(actual, assignment),
            (Type::Map(declared_key, declared_value), Type::Map(key, value)) => {
                declared_key.unify(key, assignment) && declared_value.unify(value, assignment)
            }
            (Type::Tuple(declared), Type::Tuple(actual)) => {
                declared.len() == actual.len()
                    && declared
                        .iter()
                        .zip(actual)
                        .all(|(declared, actual)| declared.unify(actual, assignment))
            }
            (Type::Procedure(declared), Type::Procedure(actual)) => {
                declared.kind == actual.kind
                    && declared.arg_types.len() == actual.arg_types.len()
                    && declared
                        .arg_types
                        .iter()
                        .zip(&actual.arg_types)
                        .all(|((_, declared), (_, actual))| declared.unify(actual, assignment))
                    && match (&declared.return_type, &actual.return_type) {
                        (Some(declared), Some(actual)) => declared.unify(actual, assignment),
                        (None, None) => true,
                        _ => false,
                    }
            }
            _ => self == actual,
        }
    }
}

fn positional_args(args: Vec<Type>) -> Vec<(String, Type)> {
    args.into_iter()
        .enumerate()
        .map(|(index, ty)| (format!("arg{}", index), ty))
        .collect()
}

fn join_types<'a>(types: impl Iterator<Item = &'a Type>) -> String {
    types.map(Type::to_string).collect::<Vec<_>>().join(", ")
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Integer => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Text => write!(f, "string"),
            Type::Boolean => write!(f, "boolean"),
            Type::Nothing => write!(f, "nothing"),
            Type::List(element) => write!(f, "[{}]", element),
            Type::Map(key, value) => write!(f, "{{{}: {}}}", key, value),
            Type::Tuple(elements) => write!(f, "tuple<{}>", join_types(elements.iter())),
            Type::Procedure(procedure) => {
                if procedure.explicitly_blocking {
                    write!(f, "blocking ")?;
                }
                let args = join_types(procedure.arg_types.iter().map(|(_, ty)| ty));
                match (&procedure.kind, &procedure.return_type) {
                    (ProcedureKind::Provider, Some(return_type)) => write!(f, "provider<{}>", return_type)?,
                    (ProcedureKind::Consumer, _) => write!(f, "consumer<{}>", args)?,
                    (_, Some(return_type)) => write!(f, "function<{} -> {}>", args, return_type)?,
                    (_, None) => write!(f, "function<{} -> nothing>", args)?,
                }
                if !procedure.injected_keys.is_empty() {
                    let keys = procedure
                        .injected_keys
                        .iter()
                        .map(|(key, ty)| format!("{}: {}", key, ty))
                        .collect::<Vec<_>>()
                        .join(", ");
                    write!(f, " using({})", keys)?;
                }
                Ok(())
            }
            Type::Contract { name, type_params } => write!(f, "{}<{}>", name, type_params.join(", ")),
            Type::GenericTypeParam(name) => write!(f, "{}", name),
            Type::UserDefined { name, .. } => write!(f, "{}", name),
        }
    }
}

/// A type annotation as written in source, resolved against the symbol table
/// during validation.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Integer,
    Float,
    Text,
    Boolean,
    Nothing,
    List(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    /// A user-defined type or a generic parameter
    Named(String),
    Function { args: Vec<TypeExpr>, ret: Box<TypeExpr> },
    Provider(Box<TypeExpr>),
    Consumer(Vec<TypeExpr>),
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        TypeExpr::Named(name.to_string())
    }

    pub fn list(element: TypeExpr) -> Self {
        TypeExpr::List(Box::new(element))
    }

    pub fn map(key: TypeExpr, value: TypeExpr) -> Self {
        TypeExpr::Map(Box::new(key), Box::new(value))
    }
}

/// Maps the argument names a procedure is blocking-generic over to their
/// indices. Returns the first name that is not an argument as the error.
pub fn blocking_arg_indices(blocking_on: &[String], arg_names: &[&str]) -> Result<Vec<usize>, String> {
    blocking_on
        .iter()
        .map(|name| {
            arg_names
                .iter()
                .position(|arg| arg == name)
                .ok_or_else(|| name.clone())
        })
        .collect()
}
