//! Expression node definitions.
//!
//! Every expression node carries its source span. Nodes that need type
//! information at emission or evaluation time also carry `Option` slots the
//! validator fills in place.

use crate::Span;

use super::{ast::Expr, types::Type};

#[derive(Debug, Clone, PartialEq)]
pub struct IntegerExpr {
    pub value: i64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatExpr {
    pub value: f64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextExpr {
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanExpr {
    pub value: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierExpr {
    pub name: String,
    pub span: Span,
    pub validated_type: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleExpr {
    pub elements: Vec<Expr>,
    pub span: Span,
    /// The type asserted from above, when validated top-down
    pub asserted_type: Option<Type>,
    pub validated_type: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListExpr {
    pub elements: Vec<Expr>,
    pub span: Span,
    pub validated_type: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapExpr {
    pub entries: Vec<(Expr, Expr)>,
    pub span: Span,
    pub validated_type: Option<Type>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub operator: BinaryOperator,
    pub right: Box<Expr>,
    pub span: Span,
    /// Type both operands were checked against
    pub operand_type: Option<Type>,
    pub validated_type: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub condition: Box<Expr>,
    pub then_branch: Box<Expr>,
    pub else_branch: Box<Expr>,
    pub span: Span,
    pub validated_type: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallExpr {
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
    /// Name of the specialization this call resolved to, for generic callees
    pub specialized_name: Option<String>,
    pub validated_type: Option<Type>,
}

/// `Contract::procedure(args)`
#[derive(Debug, Clone, PartialEq)]
pub struct ContractProcedureCallExpr {
    pub contract: String,
    pub procedure: String,
    pub args: Vec<Expr>,
    pub span: Span,
    /// Registered name of the implementation procedure, once the contract's
    /// type parameters are concrete
    pub resolved_name: Option<String>,
    pub validated_type: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptExpr {
    pub target: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
    pub target_type: Option<Type>,
    pub validated_type: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrapExpr {
    pub type_name: String,
    pub value: Box<Expr>,
    pub span: Span,
    pub validated_type: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnwrapExpr {
    pub value: Box<Expr>,
    pub span: Span,
    pub validated_type: Option<Type>,
}
