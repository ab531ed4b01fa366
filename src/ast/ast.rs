use crate::{
    compiler::{
        compiler::Compiler,
        expr::gen_expression,
        generated::GeneratedSource,
        stmt::gen_statement,
    },
    errors::errors::{Error, ErrorImpl},
    interpreter::{
        interpreter::{interpret_expr, interpret_stmt, Flow, Interpreter},
        value::Value,
    },
    type_checker::type_checker::{assert_expected_type, type_check_expr, type_check_stmt, TypeChecker},
    Span,
};

use super::{
    expressions::{
        BinaryExpr, BinaryOperator, BooleanExpr, ContractProcedureCallExpr, FloatExpr, FunctionCallExpr,
        IdentifierExpr, IfExpr, IntegerExpr, ListExpr, MapExpr, SubscriptExpr, TextExpr, TupleExpr, UnwrapExpr,
        WrapExpr,
    },
    statements::{
        AssignmentStmt, ContractDefinitionStmt, ContractImplementationStmt, ContractSignature, ExpressionStmt,
        GenericFunctionDefinitionStmt, IfStmt, ListElementAssignmentStmt, NewTypeDefinitionStmt,
        ProcedureDefinitionStmt, PrintStmt, ReturnStmt, UnwrapperProcedure, UnwrappersBlockStmt, VarDeclStmt,
    },
    types::{Type, TypeExpr},
};

/// The contract every IR node fulfils: validate, emit target source and
/// interpret. Both backends assume `validate` succeeded on the node first.
pub trait Node {
    /// What validation yields: the node's type for expressions
    type Validated;
    /// What interpretation yields: a value for expressions, control flow for statements
    type Evaluated;

    /// Infers and checks the node's types bottom-up, annotating it in place.
    fn validate(&mut self, checker: &mut TypeChecker) -> Result<Self::Validated, Error>;
    /// Emits target source for the node.
    fn generate_source(&self, compiler: &Compiler) -> Result<GeneratedSource, Error>;
    /// Evaluates the node against live symbol table values.
    fn interpret(&self, interpreter: &mut Interpreter<'_>) -> Result<Self::Evaluated, Error>;
}

/// Expressions can additionally be validated top-down.
pub trait ExprNode: Node<Validated = Type, Evaluated = Value> {
    /// Checks the node against `expected`, propagating element expectations
    /// to children where the node kind allows it.
    fn assert_expected_type(&mut self, expected: &Type, checker: &mut TypeChecker) -> Result<(), Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(IntegerExpr),
    Float(FloatExpr),
    Text(TextExpr),
    Boolean(BooleanExpr),
    Identifier(IdentifierExpr),
    Tuple(TupleExpr),
    List(ListExpr),
    Map(MapExpr),
    Binary(BinaryExpr),
    If(IfExpr),
    Call(FunctionCallExpr),
    ContractCall(ContractProcedureCallExpr),
    Subscript(SubscriptExpr),
    Wrap(WrapExpr),
    Unwrap(UnwrapExpr),
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Expr::Integer(IntegerExpr { value, span: Span::null() })
    }

    pub fn float(value: f64) -> Self {
        Expr::Float(FloatExpr { value, span: Span::null() })
    }

    pub fn text(value: &str) -> Self {
        Expr::Text(TextExpr {
            value: value.to_string(),
            span: Span::null(),
        })
    }

    pub fn boolean(value: bool) -> Self {
        Expr::Boolean(BooleanExpr { value, span: Span::null() })
    }

    pub fn ident(name: &str) -> Self {
        Expr::Identifier(IdentifierExpr {
            name: name.to_string(),
            span: Span::null(),
            validated_type: None,
        })
    }

    pub fn tuple(elements: Vec<Expr>) -> Self {
        Expr::Tuple(TupleExpr {
            elements,
            span: Span::null(),
            asserted_type: None,
            validated_type: None,
        })
    }

    pub fn list(elements: Vec<Expr>) -> Self {
        Expr::List(ListExpr {
            elements,
            span: Span::null(),
            validated_type: None,
        })
    }

    pub fn map(entries: Vec<(Expr, Expr)>) -> Self {
        Expr::Map(MapExpr {
            entries,
            span: Span::null(),
            validated_type: None,
        })
    }

    pub fn binary(left: Expr, operator: BinaryOperator, right: Expr) -> Self {
        Expr::Binary(BinaryExpr {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span: Span::null(),
            operand_type: None,
            validated_type: None,
        })
    }

    pub fn if_else(condition: Expr, then_branch: Expr, else_branch: Expr) -> Self {
        Expr::If(IfExpr {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            span: Span::null(),
            validated_type: None,
        })
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Expr::Call(FunctionCallExpr {
            name: name.to_string(),
            args,
            span: Span::null(),
            specialized_name: None,
            validated_type: None,
        })
    }

    pub fn contract_call(contract: &str, procedure: &str, args: Vec<Expr>) -> Self {
        Expr::ContractCall(ContractProcedureCallExpr {
            contract: contract.to_string(),
            procedure: procedure.to_string(),
            args,
            span: Span::null(),
            resolved_name: None,
            validated_type: None,
        })
    }

    pub fn subscript(target: Expr, index: Expr) -> Self {
        Expr::Subscript(SubscriptExpr {
            target: Box::new(target),
            index: Box::new(index),
            span: Span::null(),
            target_type: None,
            validated_type: None,
        })
    }

    pub fn wrap(type_name: &str, value: Expr) -> Self {
        Expr::Wrap(WrapExpr {
            type_name: type_name.to_string(),
            value: Box::new(value),
            span: Span::null(),
            validated_type: None,
        })
    }

    pub fn unwrap(value: Expr) -> Self {
        Expr::Unwrap(UnwrapExpr {
            value: Box::new(value),
            span: Span::null(),
            validated_type: None,
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        *self.span_mut() = span;
        self
    }

    pub fn span(&self) -> &Span {
        match self {
            Expr::Integer(expr) => &expr.span,
            Expr::Float(expr) => &expr.span,
            Expr::Text(expr) => &expr.span,
            Expr::Boolean(expr) => &expr.span,
            Expr::Identifier(expr) => &expr.span,
            Expr::Tuple(expr) => &expr.span,
            Expr::List(expr) => &expr.span,
            Expr::Map(expr) => &expr.span,
            Expr::Binary(expr) => &expr.span,
            Expr::If(expr) => &expr.span,
            Expr::Call(expr) => &expr.span,
            Expr::ContractCall(expr) => &expr.span,
            Expr::Subscript(expr) => &expr.span,
            Expr::Wrap(expr) => &expr.span,
            Expr::Unwrap(expr) => &expr.span,
        }
    }

    fn span_mut(&mut self) -> &mut Span {
        match self {
            Expr::Integer(expr) => &mut expr.span,
            Expr::Float(expr) => &mut expr.span,
            Expr::Text(expr) => &mut expr.span,
            Expr::Boolean(expr) => &mut expr.span,
            Expr::Identifier(expr) => &mut expr.span,
            Expr::Tuple(expr) => &mut expr.span,
            Expr::List(expr) => &mut expr.span,
            Expr::Map(expr) => &mut expr.span,
            Expr::Binary(expr) => &mut expr.span,
            Expr::If(expr) => &mut expr.span,
            Expr::Call(expr) => &mut expr.span,
            Expr::ContractCall(expr) => &mut expr.span,
            Expr::Subscript(expr) => &mut expr.span,
            Expr::Wrap(expr) => &mut expr.span,
            Expr::Unwrap(expr) => &mut expr.span,
        }
    }

    /// Node kind reported in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Integer(_) => "IntegerLiteral",
            Expr::Float(_) => "FloatLiteral",
            Expr::Text(_) => "TextLiteral",
            Expr::Boolean(_) => "BooleanLiteral",
            Expr::Identifier(_) => "Identifier",
            Expr::Tuple(_) => "TupleExpr",
            Expr::List(_) => "ListExpr",
            Expr::Map(_) => "MapExpr",
            Expr::Binary(_) => "BinaryExpr",
            Expr::If(_) => "IfExpr",
            Expr::Call(_) => "FunctionCall",
            Expr::ContractCall(_) => "ContractProcedureCall",
            Expr::Subscript(_) => "SubscriptExpr",
            Expr::Wrap(_) => "WrapExpr",
            Expr::Unwrap(_) => "UnwrapExpr",
        }
    }

    pub fn as_integer_literal(&self) -> Option<i64> {
        match self {
            Expr::Integer(literal) => Some(literal.value),
            _ => None,
        }
    }

    /// Type recorded by the last validation of this node.
    pub fn validated_type(&self) -> Option<Type> {
        match self {
            Expr::Integer(_) => Some(Type::Integer),
            Expr::Float(_) => Some(Type::Float),
            Expr::Text(_) => Some(Type::Text),
            Expr::Boolean(_) => Some(Type::Boolean),
            Expr::Identifier(expr) => expr.validated_type.clone(),
            Expr::Tuple(expr) => expr.validated_type.clone(),
            Expr::List(expr) => expr.validated_type.clone(),
            Expr::Map(expr) => expr.validated_type.clone(),
            Expr::Binary(expr) => expr.validated_type.clone(),
            Expr::If(expr) => expr.validated_type.clone(),
            Expr::Call(expr) => expr.validated_type.clone(),
            Expr::ContractCall(expr) => expr.validated_type.clone(),
            Expr::Subscript(expr) => expr.validated_type.clone(),
            Expr::Wrap(expr) => expr.validated_type.clone(),
            Expr::Unwrap(expr) => expr.validated_type.clone(),
        }
    }

    /// Like `validated_type`, for backends that require the annotation.
    pub fn expect_validated_type(&self) -> Result<Type, Error> {
        self.validated_type().ok_or_else(|| {
            Error::new(
                ErrorImpl::UnknownType {
                    type_: format!("<unvalidated {}>", self.kind_name()),
                },
                self.span().start.clone(),
            )
        })
    }
}

impl Node for Expr {
    type Validated = Type;
    type Evaluated = Value;

    fn validate(&mut self, checker: &mut TypeChecker) -> Result<Type, Error> {
        type_check_expr(checker, self)
    }

    fn generate_source(&self, compiler: &Compiler) -> Result<GeneratedSource, Error> {
        gen_expression(compiler, self)
    }

    fn interpret(&self, interpreter: &mut Interpreter<'_>) -> Result<Value, Error> {
        interpret_expr(interpreter, self)
    }
}

impl ExprNode for Expr {
    fn assert_expected_type(&mut self, expected: &Type, checker: &mut TypeChecker) -> Result<(), Error> {
        assert_expected_type(checker, self, expected)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl(VarDeclStmt),
    Assignment(AssignmentStmt),
    ListElementAssignment(ListElementAssignmentStmt),
    Expression(ExpressionStmt),
    Return(ReturnStmt),
    Print(PrintStmt),
    If(IfStmt),
    ProcedureDefinition(ProcedureDefinitionStmt),
    GenericFunctionDefinition(GenericFunctionDefinitionStmt),
    ContractDefinition(ContractDefinitionStmt),
    ContractImplementation(ContractImplementationStmt),
    NewTypeDefinition(NewTypeDefinitionStmt),
    UnwrappersBlock(UnwrappersBlockStmt),
}

impl Stmt {
    pub fn var(name: &str, declared_type: Option<TypeExpr>, value: Expr) -> Self {
        Stmt::VarDecl(VarDeclStmt {
            name: name.to_string(),
            declared_type,
            value,
            span: Span::null(),
            validated_type: None,
        })
    }

    pub fn assign(name: &str, value: Expr) -> Self {
        Stmt::Assignment(AssignmentStmt {
            name: name.to_string(),
            value,
            span: Span::null(),
        })
    }

    pub fn set_element(target: Expr, index: Expr, value: Expr) -> Self {
        Stmt::ListElementAssignment(ListElementAssignmentStmt {
            target,
            index,
            value,
            span: Span::null(),
            target_type: None,
        })
    }

    pub fn expr(expression: Expr) -> Self {
        Stmt::Expression(ExpressionStmt {
            expression,
            span: Span::null(),
        })
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Stmt::Return(ReturnStmt {
            value,
            span: Span::null(),
        })
    }

    pub fn print(value: Expr) -> Self {
        Stmt::Print(PrintStmt {
            value,
            span: Span::null(),
            validated_type: None,
        })
    }

    pub fn if_else(condition: Expr, then_block: Vec<Stmt>, else_block: Option<Vec<Stmt>>) -> Self {
        Stmt::If(IfStmt {
            condition,
            then_block,
            else_block,
            span: Span::null(),
        })
    }

    pub fn procedure(procedure: ProcedureDefinitionStmt) -> Self {
        Stmt::ProcedureDefinition(procedure)
    }

    pub fn generic(generic: GenericFunctionDefinitionStmt) -> Self {
        Stmt::GenericFunctionDefinition(generic)
    }

    pub fn contract(name: &str, type_params: Vec<&str>, signatures: Vec<ContractSignature>) -> Self {
        Stmt::ContractDefinition(ContractDefinitionStmt {
            name: name.to_string(),
            type_params: type_params.into_iter().map(String::from).collect(),
            signatures,
            span: Span::null(),
        })
    }

    pub fn implement(contract: &str, concrete_types: Vec<TypeExpr>, procedures: Vec<ProcedureDefinitionStmt>) -> Self {
        Stmt::ContractImplementation(ContractImplementationStmt {
            contract: contract.to_string(),
            concrete_types,
            procedures,
            span: Span::null(),
            resolved_types: None,
        })
    }

    pub fn new_type(name: &str, wrapped: TypeExpr) -> Self {
        Stmt::NewTypeDefinition(NewTypeDefinitionStmt {
            name: name.to_string(),
            wrapped,
            span: Span::null(),
            resolved_type: None,
        })
    }

    pub fn unwrappers(type_name: &str, procedures: Vec<UnwrapperProcedure>) -> Self {
        Stmt::UnwrappersBlock(UnwrappersBlockStmt {
            type_name: type_name.to_string(),
            procedures,
            span: Span::null(),
        })
    }

    pub fn span(&self) -> &Span {
        match self {
            Stmt::VarDecl(stmt) => &stmt.span,
            Stmt::Assignment(stmt) => &stmt.span,
            Stmt::ListElementAssignment(stmt) => &stmt.span,
            Stmt::Expression(stmt) => &stmt.span,
            Stmt::Return(stmt) => &stmt.span,
            Stmt::Print(stmt) => &stmt.span,
            Stmt::If(stmt) => &stmt.span,
            Stmt::ProcedureDefinition(stmt) => &stmt.span,
            Stmt::GenericFunctionDefinition(stmt) => &stmt.span,
            Stmt::ContractDefinition(stmt) => &stmt.span,
            Stmt::ContractImplementation(stmt) => &stmt.span,
            Stmt::NewTypeDefinition(stmt) => &stmt.span,
            Stmt::UnwrappersBlock(stmt) => &stmt.span,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Stmt::VarDecl(_) => "VarDecl",
            Stmt::Assignment(_) => "Assignment",
            Stmt::ListElementAssignment(_) => "ListElementAssignment",
            Stmt::Expression(_) => "ExpressionStmt",
            Stmt::Return(_) => "Return",
            Stmt::Print(_) => "Print",
            Stmt::If(_) => "IfStmt",
            Stmt::ProcedureDefinition(_) => "ProcedureDefinition",
            Stmt::GenericFunctionDefinition(_) => "GenericFunctionDefinition",
            Stmt::ContractDefinition(_) => "ContractDefinition",
            Stmt::ContractImplementation(_) => "ContractImplementation",
            Stmt::NewTypeDefinition(_) => "NewTypeDefinition",
            Stmt::UnwrappersBlock(_) => "UnwrappersBlock",
        }
    }
}

impl Node for Stmt {
    type Validated = ();
    type Evaluated = Flow;

    fn validate(&mut self, checker: &mut TypeChecker) -> Result<(), Error> {
        type_check_stmt(checker, self)
    }

    fn generate_source(&self, compiler: &Compiler) -> Result<GeneratedSource, Error> {
        gen_statement(compiler, self)
    }

    fn interpret(&self, interpreter: &mut Interpreter<'_>) -> Result<Flow, Error> {
        interpret_stmt(interpreter, self)
    }
}

/// A whole compilation unit as handed over by the front-end.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Program { statements }
    }
}
