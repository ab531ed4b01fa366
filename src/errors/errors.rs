use std::fmt::Display;

use thiserror::Error;

use crate::Position;

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
    node: Option<String>,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
            node: None,
        }
    }

    /// Attaches the kind of IR node the error was raised on, keeping any
    /// node that was already recorded closer to the fault.
    pub fn with_node(mut self, node: &str) -> Self {
        if self.node.is_none() {
            self.node = Some(node.to_string());
        }
        self
    }

    pub fn kind(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UndeclaredIdentifier { .. } => "UndeclaredIdentifier",
            ErrorImpl::Redeclaration { .. } => "Redeclaration",
            ErrorImpl::ArityMismatch { .. } => "ArityMismatch",
            ErrorImpl::TypeMatchError { .. } => "TypeMatchError",
            ErrorImpl::WrongBaseType { .. } => "WrongBaseType",
            ErrorImpl::NotAnExpression { .. } => "NotAnExpression",
            ErrorImpl::NonLiteralTupleIndex => "NonLiteralTupleIndex",
            ErrorImpl::TupleIndexOutOfBounds { .. } => "TupleIndexOutOfBounds",
            ErrorImpl::UnsupportedSubscriptTarget { .. } => "UnsupportedSubscriptTarget",
            ErrorImpl::ContractArityMismatch { .. } => "ContractArityMismatch",
            ErrorImpl::UnknownGenericArg { .. } => "UnknownGenericArg",
            ErrorImpl::GenericNameCollision { .. } => "GenericNameCollision",
            ErrorImpl::UndeclaredContract { .. } => "UndeclaredContract",
            ErrorImpl::MissingContractImplementation { .. } => "MissingContractImplementation",
            ErrorImpl::IncompleteContractImplementation { .. } => {
                "IncompleteContractImplementation"
            }
            ErrorImpl::UnknownType { .. } => "UnknownType",
            ErrorImpl::UninferableGenericParam { .. } => "UninferableGenericParam",
            ErrorImpl::AmbiguousEmptyCollection { .. } => "AmbiguousEmptyCollection",
            ErrorImpl::UnboundedSpecialization { .. } => "UnboundedSpecialization",
            ErrorImpl::ReturnOutsideProcedure => "ReturnOutsideProcedure",
            ErrorImpl::MissingReturn { .. } => "MissingReturn",
            ErrorImpl::UnexpectedReturnValue { .. } => "UnexpectedReturnValue",
            ErrorImpl::IllegalUnwrap { .. } => "IllegalUnwrap",
            ErrorImpl::UnusedIdentifier { .. } => "UnusedIdentifier",
            ErrorImpl::ValidationFailed { .. } => "ValidationFailed",
            ErrorImpl::InvalidConfig { .. } => "InvalidConfig",
            ErrorImpl::DivisionByZero => "DivisionByZero",
            ErrorImpl::IndexOutOfBounds { .. } => "IndexOutOfBounds",
            ErrorImpl::MissingKey { .. } => "MissingKey",
            ErrorImpl::MissingInjectedValue { .. } => "MissingInjectedValue",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UndeclaredIdentifier { identifier } => {
                ErrorTip::Suggestion(format!("`{}` is not declared in this scope", identifier))
            }
            ErrorImpl::Redeclaration { identifier } => ErrorTip::Suggestion(format!(
                "`{}` is already declared, choose another name",
                identifier
            )),
            ErrorImpl::ArityMismatch { expected, received } => ErrorTip::Suggestion(format!(
                "Expected {} arguments, received {}",
                expected, received
            )),
            ErrorImpl::TypeMatchError { expected, received } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::WrongBaseType { expected, received } => ErrorTip::Suggestion(format!(
                "Expected a {}, received `{}`",
                expected, received
            )),
            ErrorImpl::NotAnExpression { procedure, kind } => ErrorTip::Suggestion(format!(
                "`{}` is a {} and produces no value, call it as a statement",
                procedure, kind
            )),
            ErrorImpl::NonLiteralTupleIndex => ErrorTip::Suggestion(String::from(
                "Tuples can only be indexed with an integer literal",
            )),
            ErrorImpl::TupleIndexOutOfBounds { arity, index, .. } => {
                ErrorTip::Suggestion(format!(
                    "Index {} is outside of 0..{} for this tuple",
                    index, arity
                ))
            }
            ErrorImpl::UnsupportedSubscriptTarget { received } => ErrorTip::Suggestion(format!(
                "Only lists, tuples and maps can be subscripted, found `{}`",
                received
            )),
            ErrorImpl::ContractArityMismatch { contract, expected, .. } => {
                ErrorTip::Suggestion(format!(
                    "Contract `{}` takes {} type parameters",
                    contract, expected
                ))
            }
            ErrorImpl::UnknownGenericArg { generic_arg, function, .. } => {
                ErrorTip::Suggestion(format!(
                    "Add `{}` to the generic parameters of `{}`",
                    generic_arg, function
                ))
            }
            ErrorImpl::GenericNameCollision { name, .. } => ErrorTip::Suggestion(format!(
                "Generic parameter `{}` shadows an existing declaration",
                name
            )),
            ErrorImpl::UndeclaredContract { contract, .. } => {
                ErrorTip::Suggestion(format!("Contract `{}` is not declared", contract))
            }
            ErrorImpl::MissingContractImplementation { contract, types } => {
                ErrorTip::Suggestion(format!("Implement `{}<{}>`", contract, types))
            }
            ErrorImpl::IncompleteContractImplementation { contract, procedure } => {
                ErrorTip::Suggestion(format!(
                    "Implement `{}` for contract `{}`",
                    procedure, contract
                ))
            }
            ErrorImpl::UnknownType { type_ } => {
                ErrorTip::Suggestion(format!("Unknown type `{}` found", type_))
            }
            ErrorImpl::UninferableGenericParam { param, .. } => ErrorTip::Suggestion(format!(
                "Assign the result to a variable with an explicit type so `{}` can be inferred",
                param
            )),
            ErrorImpl::AmbiguousEmptyCollection { collection } => ErrorTip::Suggestion(
                format!("Declare the type of this empty {} explicitly", collection),
            ),
            ErrorImpl::UnboundedSpecialization { function, .. } => ErrorTip::Suggestion(format!(
                "Recursive calls to `{}` keep growing their type arguments",
                function
            )),
            ErrorImpl::ReturnOutsideProcedure => ErrorTip::None,
            ErrorImpl::MissingReturn { procedure } => ErrorTip::Suggestion(format!(
                "Every path through `{}` must return a value",
                procedure
            )),
            ErrorImpl::UnexpectedReturnValue { procedure } => ErrorTip::Suggestion(format!(
                "`{}` has no return type, remove the returned value",
                procedure
            )),
            ErrorImpl::IllegalUnwrap { type_ } => ErrorTip::Suggestion(format!(
                "`{}` can only be unwrapped inside its unwrappers block",
                type_
            )),
            ErrorImpl::UnusedIdentifier { identifier } => {
                ErrorTip::Suggestion(format!("Remove `{}` or use it", identifier))
            }
            ErrorImpl::ValidationFailed { .. } => ErrorTip::None,
            ErrorImpl::InvalidConfig { .. } => ErrorTip::None,
            ErrorImpl::DivisionByZero => ErrorTip::None,
            ErrorImpl::IndexOutOfBounds { .. } => ErrorTip::None,
            ErrorImpl::MissingKey { .. } => ErrorTip::None,
            ErrorImpl::MissingInjectedValue { key } => {
                ErrorTip::Suggestion(format!("Bind a value for `{}` before running", key))
            }
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node {
            Some(node) => write!(f, "{} (in {} at {})", self.internal_error, node, self.position),
            None => write!(f, "{} (at {})", self.internal_error, self.position),
        }
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("identifier {identifier:?} not declared")]
    UndeclaredIdentifier { identifier: String },
    #[error("identifier {identifier:?} already declared")]
    Redeclaration { identifier: String },
    #[error("wrong number of arguments: expected {expected:?}, received {received:?}")]
    ArityMismatch { expected: usize, received: usize },
    #[error("types do not match: expected {expected:?}, received {received:?}")]
    TypeMatchError { expected: String, received: String },
    #[error("wrong base type: expected {expected}, received {received:?}")]
    WrongBaseType { expected: String, received: String },
    #[error("{kind} {procedure:?} does not produce a value")]
    NotAnExpression { procedure: String, kind: String },
    #[error("tuple subscript must be an integer literal")]
    NonLiteralTupleIndex,
    #[error("index {index} out of bounds for {tuple_type} of arity {arity}")]
    TupleIndexOutOfBounds {
        tuple_type: String,
        arity: usize,
        index: i64,
    },
    #[error("cannot subscript a value of type {received:?}")]
    UnsupportedSubscriptTarget { received: String },
    #[error("contract {contract:?} expects {expected:?} type parameters, received {received:?}")]
    ContractArityMismatch {
        contract: String,
        expected: usize,
        received: usize,
    },
    #[error("{generic_arg:?} required by contract {contract:?} is not a generic parameter of {function:?}")]
    UnknownGenericArg {
        generic_arg: String,
        contract: String,
        function: String,
    },
    #[error("generic parameter {name:?} of {function:?} collides with an existing declaration")]
    GenericNameCollision { name: String, function: String },
    #[error("contract {contract:?} required by {function:?} not declared")]
    UndeclaredContract { contract: String, function: String },
    #[error("no implementation of contract {contract:?} for <{types}>")]
    MissingContractImplementation { contract: String, types: String },
    #[error("implementation of contract {contract:?} is missing procedure {procedure:?}")]
    IncompleteContractImplementation { contract: String, procedure: String },
    #[error("unknown type {type_} found")]
    UnknownType { type_: String },
    #[error("cannot infer generic parameter {param:?} of {function:?}")]
    UninferableGenericParam { param: String, function: String },
    #[error("cannot infer the type of an empty {collection}")]
    AmbiguousEmptyCollection { collection: String },
    #[error("specializing {function:?} exceeds type depth {depth}")]
    UnboundedSpecialization { function: String, depth: usize },
    #[error("return outside of a procedure")]
    ReturnOutsideProcedure,
    #[error("procedure {procedure:?} may finish without returning a value")]
    MissingReturn { procedure: String },
    #[error("procedure {procedure:?} cannot return a value")]
    UnexpectedReturnValue { procedure: String },
    #[error("unwrapping {type_} is restricted to its unwrappers")]
    IllegalUnwrap { type_: String },
    #[error("identifier {identifier:?} is never used")]
    UnusedIdentifier { identifier: String },
    #[error("program failed validation with {errors} errors")]
    ValidationFailed { errors: usize },
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("index {index} out of bounds for length {length}")]
    IndexOutOfBounds { index: i64, length: usize },
    #[error("key {key} not present in map")]
    MissingKey { key: String },
    #[error("no value bound for injected key {key:?}")]
    MissingInjectedValue { key: String },
}
