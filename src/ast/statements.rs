//! Statement node definitions.

use std::collections::BTreeMap;

use crate::Span;

use super::{
    ast::{Expr, Stmt},
    types::{ProcedureKind, ProcedureType, Type, TypeExpr},
};

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclStmt {
    pub name: String,
    /// Validates the value top-down when present
    pub declared_type: Option<TypeExpr>,
    pub value: Expr,
    pub span: Span,
    pub validated_type: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentStmt {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

/// `target[index] = value` on a list, tuple or map.
#[derive(Debug, Clone, PartialEq)]
pub struct ListElementAssignmentStmt {
    pub target: Expr,
    pub index: Expr,
    pub value: Expr,
    pub span: Span,
    pub target_type: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStmt {
    pub expression: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintStmt {
    pub value: Expr,
    pub span: Span,
    pub validated_type: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Vec<Stmt>,
    pub else_block: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDefinitionStmt {
    pub name: String,
    pub kind: ProcedureKind,
    pub arguments: Vec<(String, TypeExpr)>,
    pub return_type: Option<TypeExpr>,
    pub injected_keys: Vec<(String, TypeExpr)>,
    pub explicitly_blocking: bool,
    /// Names of arguments whose blocking-ness this procedure inherits
    pub blocking_on_args: Option<Vec<String>>,
    pub body: Vec<Stmt>,
    pub span: Span,
    /// Signature resolved at registration
    pub resolved_type: Option<ProcedureType>,
}

impl ProcedureDefinitionStmt {
    fn new(
        name: &str,
        kind: ProcedureKind,
        arguments: Vec<(&str, TypeExpr)>,
        return_type: Option<TypeExpr>,
        body: Vec<Stmt>,
    ) -> Self {
        ProcedureDefinitionStmt {
            name: name.to_string(),
            kind,
            arguments: arguments
                .into_iter()
                .map(|(name, ty)| (name.to_string(), ty))
                .collect(),
            return_type,
            injected_keys: vec![],
            explicitly_blocking: false,
            blocking_on_args: None,
            body,
            span: Span::null(),
            resolved_type: None,
        }
    }

    pub fn function(name: &str, arguments: Vec<(&str, TypeExpr)>, return_type: TypeExpr, body: Vec<Stmt>) -> Self {
        Self::new(name, ProcedureKind::Function, arguments, Some(return_type), body)
    }

    pub fn provider(name: &str, return_type: TypeExpr, body: Vec<Stmt>) -> Self {
        Self::new(name, ProcedureKind::Provider, vec![], Some(return_type), body)
    }

    pub fn consumer(name: &str, arguments: Vec<(&str, TypeExpr)>, body: Vec<Stmt>) -> Self {
        Self::new(name, ProcedureKind::Consumer, arguments, None, body)
    }

    pub fn with_injected_keys(mut self, keys: Vec<(&str, TypeExpr)>) -> Self {
        self.injected_keys = keys.into_iter().map(|(key, ty)| (key.to_string(), ty)).collect();
        self
    }

    pub fn blocking(mut self) -> Self {
        self.explicitly_blocking = true;
        self
    }

    pub fn blocking_on(mut self, args: Vec<&str>) -> Self {
        self.blocking_on_args = Some(args.into_iter().map(String::from).collect());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericFunctionDefinitionStmt {
    pub generic_params: Vec<String>,
    /// Contract name to the generic parameters it must be implemented over
    pub required_contracts: BTreeMap<String, Vec<String>>,
    /// The body template, cloned for every specialization
    pub procedure: ProcedureDefinitionStmt,
    pub span: Span,
}

impl GenericFunctionDefinitionStmt {
    pub fn new(generic_params: Vec<&str>, procedure: ProcedureDefinitionStmt) -> Self {
        let span = procedure.span.clone();
        GenericFunctionDefinitionStmt {
            generic_params: generic_params.into_iter().map(String::from).collect(),
            required_contracts: BTreeMap::new(),
            procedure,
            span,
        }
    }

    pub fn requiring(mut self, contract: &str, generic_args: Vec<&str>) -> Self {
        self.required_contracts.insert(
            contract.to_string(),
            generic_args.into_iter().map(String::from).collect(),
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.procedure.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractSignature {
    pub name: String,
    pub kind: ProcedureKind,
    pub arguments: Vec<(String, TypeExpr)>,
    pub return_type: Option<TypeExpr>,
}

impl ContractSignature {
    pub fn new(name: &str, kind: ProcedureKind, arguments: Vec<(&str, TypeExpr)>, return_type: Option<TypeExpr>) -> Self {
        ContractSignature {
            name: name.to_string(),
            kind,
            arguments: arguments
                .into_iter()
                .map(|(name, ty)| (name.to_string(), ty))
                .collect(),
            return_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractDefinitionStmt {
    pub name: String,
    pub type_params: Vec<String>,
    pub signatures: Vec<ContractSignature>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractImplementationStmt {
    pub contract: String,
    pub concrete_types: Vec<TypeExpr>,
    pub procedures: Vec<ProcedureDefinitionStmt>,
    pub span: Span,
    pub resolved_types: Option<Vec<Type>>,
}

/// `newtype Name : wrapped`
#[derive(Debug, Clone, PartialEq)]
pub struct NewTypeDefinitionStmt {
    pub name: String,
    pub wrapped: TypeExpr,
    pub span: Span,
    pub resolved_type: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnwrapperProcedure {
    Procedure(ProcedureDefinitionStmt),
    Generic(GenericFunctionDefinitionStmt),
}

impl UnwrapperProcedure {
    pub fn name(&self) -> &str {
        match self {
            UnwrapperProcedure::Procedure(procedure) => &procedure.name,
            UnwrapperProcedure::Generic(generic) => generic.name(),
        }
    }
}

/// Procedures allowed to unwrap a user-defined type.
#[derive(Debug, Clone, PartialEq)]
pub struct UnwrappersBlockStmt {
    pub type_name: String,
    pub procedures: Vec<UnwrapperProcedure>,
    pub span: Span,
}
