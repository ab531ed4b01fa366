use std::{collections::HashMap, rc::Rc};

use crate::{
    ast::{
        ast::{Expr, Node, Program, Stmt},
        expressions::{BinaryExpr, BinaryOperator, SubscriptExpr},
        statements::{ListElementAssignmentStmt, ProcedureDefinitionStmt, UnwrapperProcedure},
        types::Type,
    },
    config::config::DebugTrace,
    errors::errors::{Error, ErrorImpl},
    monomorphization::generics::replay_specializations,
    phase_log, trace_dbg,
    type_checker::{symbol_table::SymbolValue, type_checker::TypeChecker},
    Position,
};

use super::value::{Collection, ListValue, MapValue, TupleValue, Value};

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramOutput {
    /// Value of the last top-level expression statement, `Nothing` if none ran
    pub value: Value,
    /// Lines written by print statements
    pub printed: Vec<String>,
}

/// Evaluates validated IR against the session's symbol table.
pub struct Interpreter<'a> {
    pub checker: &'a mut TypeChecker,
    /// Values for injected keys
    bindings: HashMap<String, Value>,
    printed: Vec<String>,
}

impl<'a> Interpreter<'a> {
    pub fn new(checker: &'a mut TypeChecker, bindings: HashMap<String, Value>) -> Self {
        Interpreter {
            checker,
            bindings,
            printed: vec![],
        }
    }

    pub fn printed(&self) -> &[String] {
        &self.printed
    }

    fn lookup(&self, name: &str, position: &Position) -> Result<Value, Error> {
        self.checker.symbols.runtime_value(name).cloned().ok_or_else(|| {
            Error::new(
                ErrorImpl::UndeclaredIdentifier {
                    identifier: name.to_string(),
                },
                position.clone(),
            )
        })
    }

    fn declare(&mut self, name: &str, ty: Type, value: Value, position: &Position) -> Result<(), Error> {
        self.checker
            .symbols
            .declare(name, ty, Some(SymbolValue::Runtime(value)), position)
    }

    /// Makes a procedure callable: level-0 procedures already have an entry,
    /// nested ones are declared in the current scope.
    fn bind_procedure(&mut self, procedure: &ProcedureDefinitionStmt) -> Result<(), Error> {
        let value = Value::Procedure(Rc::new(procedure.clone()));
        if self
            .checker
            .symbols
            .set_value(&procedure.name, SymbolValue::Runtime(value.clone()))
        {
            return Ok(());
        }
        let procedure_type = procedure.resolved_type.clone().ok_or_else(|| {
            Error::new(
                ErrorImpl::UndeclaredIdentifier {
                    identifier: procedure.name.clone(),
                },
                procedure.span.start.clone(),
            )
        })?;
        self.declare(
            &procedure.name,
            Type::procedure(procedure_type),
            value,
            &procedure.span.start,
        )
    }

    fn hoist_procedures(&mut self, statements: &[Stmt]) -> Result<(), Error> {
        for statement in statements {
            match statement {
                Stmt::ProcedureDefinition(procedure) => self.bind_procedure(procedure)?,
                Stmt::ContractImplementation(implementation) => {
                    for procedure in &implementation.procedures {
                        self.bind_procedure(procedure)?;
                    }
                }
                Stmt::UnwrappersBlock(block) => {
                    for procedure in &block.procedures {
                        if let UnwrapperProcedure::Procedure(procedure) = procedure {
                            self.bind_procedure(procedure)?;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn run_statements(&mut self, statements: &[Stmt]) -> Result<Flow, Error> {
        self.hoist_procedures(statements)?;
        for statement in statements {
            if let Flow::Return(value) = statement.interpret(self)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn run_block(&mut self, statements: &[Stmt]) -> Result<Flow, Error> {
        self.checker.symbols.push_scope();
        let flow = self.run_statements(statements);
        self.checker.symbols.pop_scope();
        flow
    }

    /// Calls the procedure stored under `name` in a fresh frame.
    fn call(&mut self, name: &str, args: Vec<Value>, position: &Position) -> Result<Value, Error> {
        let procedure = match self.lookup(name, position)? {
            Value::Procedure(procedure) => procedure,
            other => {
                return Err(Error::new(
                    ErrorImpl::WrongBaseType {
                        expected: String::from("procedure"),
                        received: other.to_string(),
                    },
                    position.clone(),
                ))
            }
        };
        trace_dbg!(&self.checker.config, DebugTrace::Interpreter, "call {}", procedure.name);

        self.checker.symbols.enter_frame();
        self.checker.symbols.push_scope();
        let result = self.run_procedure(&procedure, args, position);
        self.checker.symbols.pop_scope();
        self.checker.symbols.exit_frame();

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nothing),
        }
    }

    fn run_procedure(
        &mut self,
        procedure: &ProcedureDefinitionStmt,
        args: Vec<Value>,
        position: &Position,
    ) -> Result<Flow, Error> {
        let procedure_type = procedure.resolved_type.clone().ok_or_else(|| {
            Error::new(
                ErrorImpl::UndeclaredIdentifier {
                    identifier: procedure.name.clone(),
                },
                position.clone(),
            )
        })?;
        if procedure_type.arg_count() != args.len() {
            return Err(Error::new(
                ErrorImpl::ArityMismatch {
                    expected: procedure_type.arg_count(),
                    received: args.len(),
                },
                position.clone(),
            ));
        }

        for ((name, ty), value) in procedure_type.arg_types.iter().zip(args) {
            self.declare(name, ty.clone(), value, position)?;
        }
        for (key, ty) in &procedure_type.injected_keys {
            let value = self.bindings.get(key).cloned().ok_or_else(|| {
                Error::new(ErrorImpl::MissingInjectedValue { key: key.clone() }, position.clone())
            })?;
            self.declare(key, ty.clone(), value, position)?;
        }

        self.run_statements(&procedure.body)
    }
}

/// Runs a validated program.
pub fn interpret_program(type_checker: &mut TypeChecker, program: &Program) -> Result<ProgramOutput, Error> {
    interpret_program_with_bindings(type_checker, program, HashMap::new())
}

/// Runs a validated program, supplying `bindings` to procedures that take
/// injected keys.
pub fn interpret_program_with_bindings(
    type_checker: &mut TypeChecker,
    program: &Program,
    bindings: HashMap<String, Value>,
) -> Result<ProgramOutput, Error> {
    if type_checker.has_errors() {
        return Err(Error::new(
            ErrorImpl::ValidationFailed {
                errors: type_checker.error_count(),
            },
            Position::null(),
        ));
    }

    replay_specializations(type_checker, |checker, specialization| {
        let value = Value::Procedure(Rc::new(specialization.procedure.clone()));
        if checker
            .symbols
            .set_value(&specialization.verbose_name, SymbolValue::Runtime(value))
        {
            Ok(())
        } else {
            Err(Error::new(
                ErrorImpl::UndeclaredIdentifier {
                    identifier: specialization.verbose_name.clone(),
                },
                specialization.procedure.span.start.clone(),
            ))
        }
    })?;

    phase_log!(&type_checker.config, "Interpreting {} statements", program.statements.len());
    let check_unused = type_checker.symbols.set_check_unused(false);
    let mut interpreter = Interpreter::new(type_checker, bindings);
    interpreter.checker.symbols.push_scope();
    let result = run_program(&mut interpreter, &program.statements);
    interpreter.checker.symbols.pop_scope();
    let printed = std::mem::take(&mut interpreter.printed);
    type_checker.symbols.set_check_unused(check_unused);

    Ok(ProgramOutput {
        value: result?,
        printed,
    })
}

fn run_program(interpreter: &mut Interpreter<'_>, statements: &[Stmt]) -> Result<Value, Error> {
    interpreter.hoist_procedures(statements)?;
    let mut last = Value::Nothing;
    for statement in statements {
        match statement {
            Stmt::Expression(statement) => last = statement.expression.interpret(interpreter)?,
            statement => {
                statement.interpret(interpreter)?;
            }
        }
    }
    Ok(last)
}

pub fn interpret_stmt(interpreter: &mut Interpreter<'_>, statement: &Stmt) -> Result<Flow, Error> {
    match statement {
        Stmt::VarDecl(declaration) => {
            let value = declaration.value.interpret(interpreter)?;
            let ty = declaration
                .validated_type
                .clone()
                .map_or_else(|| declaration.value.expect_validated_type(), Ok)?;
            interpreter.declare(&declaration.name, ty, value, &declaration.span.start)?;
            Ok(Flow::Normal)
        }
        Stmt::Assignment(assignment) => {
            let value = assignment.value.interpret(interpreter)?;
            if !interpreter
                .checker
                .symbols
                .set_value(&assignment.name, SymbolValue::Runtime(value))
            {
                return Err(Error::new(
                    ErrorImpl::UndeclaredIdentifier {
                        identifier: assignment.name.clone(),
                    },
                    assignment.span.start.clone(),
                ));
            }
            Ok(Flow::Normal)
        }
        Stmt::ListElementAssignment(assignment) => {
            assign_element(interpreter, assignment)?;
            Ok(Flow::Normal)
        }
        Stmt::Expression(statement) => {
            statement.expression.interpret(interpreter)?;
            Ok(Flow::Normal)
        }
        Stmt::Return(statement) => {
            let value = match &statement.value {
                Some(value) => value.interpret(interpreter)?,
                None => Value::Nothing,
            };
            Ok(Flow::Return(value))
        }
        Stmt::Print(statement) => {
            let value = statement.value.interpret(interpreter)?;
            interpreter.printed.push(value.to_string());
            Ok(Flow::Normal)
        }
        Stmt::If(statement) => {
            let condition = expect_boolean(statement.condition.interpret(interpreter)?, &statement.span.start)?;
            match (condition, &statement.else_block) {
                (true, _) => interpreter.run_block(&statement.then_block),
                (false, Some(else_block)) => interpreter.run_block(else_block),
                (false, None) => Ok(Flow::Normal),
            }
        }
        // Procedures are bound when their enclosing block starts
        Stmt::ProcedureDefinition(_)
        | Stmt::GenericFunctionDefinition(_)
        | Stmt::ContractDefinition(_)
        | Stmt::ContractImplementation(_)
        | Stmt::NewTypeDefinition(_)
        | Stmt::UnwrappersBlock(_) => Ok(Flow::Normal),
    }
}

fn expect_boolean(value: Value, position: &Position) -> Result<bool, Error> {
    value.as_boolean().ok_or_else(|| {
        Error::new(
            ErrorImpl::TypeMatchError {
                expected: Type::Boolean.to_string(),
                received: value.to_string(),
            },
            position.clone(),
        )
    })
}

fn expect_integer(value: &Value, position: &Position) -> Result<i64, Error> {
    value.as_integer().ok_or_else(|| {
        Error::new(
            ErrorImpl::TypeMatchError {
                expected: Type::Integer.to_string(),
                received: value.to_string(),
            },
            position.clone(),
        )
    })
}

fn interpret_args(interpreter: &mut Interpreter<'_>, args: &[Expr]) -> Result<Vec<Value>, Error> {
    args.iter().map(|arg| arg.interpret(interpreter)).collect()
}

pub fn interpret_expr(interpreter: &mut Interpreter<'_>, expression: &Expr) -> Result<Value, Error> {
    match expression {
        Expr::Integer(literal) => Ok(Value::Integer(literal.value)),
        Expr::Float(literal) => Ok(Value::Float(literal.value)),
        Expr::Text(literal) => Ok(Value::Text(literal.value.clone())),
        Expr::Boolean(literal) => Ok(Value::Boolean(literal.value)),
        Expr::Identifier(identifier) => interpreter.lookup(&identifier.name, &identifier.span.start),
        Expr::Tuple(tuple) => {
            let values = interpret_args(interpreter, &tuple.elements)?;
            let tuple_type = match &tuple.asserted_type {
                Some(asserted) => asserted.clone(),
                None => expression.expect_validated_type()?,
            };
            Ok(Value::Tuple(TupleValue::new(tuple_type, values)))
        }
        Expr::List(list) => {
            let values = interpret_args(interpreter, &list.elements)?;
            Ok(Value::List(ListValue::new(expression.expect_validated_type()?, values)))
        }
        Expr::Map(map) => {
            let mut value = MapValue::new(expression.expect_validated_type()?);
            for (key, entry) in &map.entries {
                let key = key.interpret(interpreter)?;
                let entry = entry.interpret(interpreter)?;
                value.insert(key, entry);
            }
            Ok(Value::Map(value))
        }
        Expr::Binary(binary) => interpret_binary(interpreter, binary),
        Expr::If(if_expr) => {
            let condition = expect_boolean(if_expr.condition.interpret(interpreter)?, &if_expr.span.start)?;
            if condition {
                if_expr.then_branch.interpret(interpreter)
            } else {
                if_expr.else_branch.interpret(interpreter)
            }
        }
        Expr::Call(call) => {
            let args = interpret_args(interpreter, &call.args)?;
            let name = call.specialized_name.as_deref().unwrap_or(&call.name);
            interpreter.call(name, args, &call.span.start)
        }
        Expr::ContractCall(call) => {
            let Some(resolved) = &call.resolved_name else {
                return Err(Error::new(
                    ErrorImpl::MissingContractImplementation {
                        contract: call.contract.clone(),
                        types: String::from("?"),
                    },
                    call.span.start.clone(),
                ));
            };
            let args = interpret_args(interpreter, &call.args)?;
            interpreter.call(resolved, args, &call.span.start)
        }
        Expr::Subscript(subscript) => interpret_subscript(interpreter, subscript),
        Expr::Wrap(wrap) => {
            let value = wrap.value.interpret(interpreter)?;
            Ok(Value::UserDefined {
                type_name: wrap.type_name.clone(),
                value: Box::new(value),
            })
        }
        Expr::Unwrap(unwrap) => match unwrap.value.interpret(interpreter)? {
            Value::UserDefined { value, .. } => Ok(*value),
            other => Err(Error::new(
                ErrorImpl::WrongBaseType {
                    expected: String::from("user-defined type"),
                    received: other.to_string(),
                },
                unwrap.span.start.clone(),
            )),
        },
    }
}

fn interpret_binary(interpreter: &mut Interpreter<'_>, binary: &BinaryExpr) -> Result<Value, Error> {
    let position = &binary.span.start;
    let left = binary.left.interpret(interpreter)?;

    match binary.operator {
        BinaryOperator::And | BinaryOperator::Or => {
            let left = expect_boolean(left, position)?;
            // Short-circuits
            if left == (binary.operator == BinaryOperator::Or) {
                return Ok(Value::Boolean(left));
            }
            let right = expect_boolean(binary.right.interpret(interpreter)?, position)?;
            return Ok(Value::Boolean(right));
        }
        _ => {}
    }

    let right = binary.right.interpret(interpreter)?;
    let value = match (binary.operator, &left, &right) {
        (BinaryOperator::Equal, _, _) => Value::Boolean(left == right),
        (BinaryOperator::NotEqual, _, _) => Value::Boolean(left != right),
        (BinaryOperator::Add, Value::Text(left), Value::Text(right)) => Value::Text(format!("{}{}", left, right)),
        (BinaryOperator::Divide, Value::Integer(_), Value::Integer(0)) => {
            return Err(Error::new(ErrorImpl::DivisionByZero, position.clone()))
        }
        (operator, Value::Integer(left), Value::Integer(right)) => match operator {
            BinaryOperator::Add => Value::Integer(left.wrapping_add(*right)),
            BinaryOperator::Subtract => Value::Integer(left.wrapping_sub(*right)),
            BinaryOperator::Multiply => Value::Integer(left.wrapping_mul(*right)),
            BinaryOperator::Divide => Value::Integer(left.wrapping_div(*right)),
            BinaryOperator::Less => Value::Boolean(left < right),
            BinaryOperator::LessEqual => Value::Boolean(left <= right),
            BinaryOperator::Greater => Value::Boolean(left > right),
            _ => Value::Boolean(left >= right),
        },
        (operator, Value::Float(left), Value::Float(right)) => match operator {
            BinaryOperator::Add => Value::Float(left + right),
            BinaryOperator::Subtract => Value::Float(left - right),
            BinaryOperator::Multiply => Value::Float(left * right),
            BinaryOperator::Divide => Value::Float(left / right),
            BinaryOperator::Less => Value::Boolean(left < right),
            BinaryOperator::LessEqual => Value::Boolean(left <= right),
            BinaryOperator::Greater => Value::Boolean(left > right),
            _ => Value::Boolean(left >= right),
        },
        _ => {
            return Err(Error::new(
                ErrorImpl::TypeMatchError {
                    expected: left.to_string(),
                    received: right.to_string(),
                },
                position.clone(),
            ))
        }
    };
    Ok(value)
}

fn interpret_subscript(interpreter: &mut Interpreter<'_>, subscript: &SubscriptExpr) -> Result<Value, Error> {
    let target = subscript.target.interpret(interpreter)?;
    let index = subscript.index.interpret(interpreter)?;
    let position = &subscript.span.start;

    let value = match &target {
        Value::List(list) => list.get(expect_integer(&index, position)?)?,
        Value::Tuple(tuple) => tuple.get(expect_integer(&index, position)?)?,
        Value::Map(map) => map.get(&index)?,
        other => {
            return Err(Error::new(
                ErrorImpl::UnsupportedSubscriptTarget {
                    received: other.to_string(),
                },
                position.clone(),
            ))
        }
    };
    Ok(value.clone())
}

/// Steps into `value` at `index`, for writes through nested subscripts.
fn element_mut<'v>(value: &'v mut Value, index: &Value, position: &Position) -> Result<&'v mut Value, Error> {
    match value {
        Value::List(list) => list.get_mut(expect_integer(index, position)?),
        Value::Tuple(tuple) => tuple.get_mut(expect_integer(index, position)?),
        Value::Map(map) => map.get_mut(index),
        other => Err(Error::new(
            ErrorImpl::UnsupportedSubscriptTarget {
                received: other.to_string(),
            },
            position.clone(),
        )),
    }
}

/// Resolves the assignment target to a root variable and the evaluated
/// indices leading from it to the collection being written.
fn resolve_place(interpreter: &mut Interpreter<'_>, target: &Expr, path: &mut Vec<Value>) -> Result<String, Error> {
    match target {
        Expr::Identifier(identifier) => Ok(identifier.name.clone()),
        Expr::Subscript(subscript) => {
            let root = resolve_place(interpreter, &subscript.target, path)?;
            path.push(subscript.index.interpret(interpreter)?);
            Ok(root)
        }
        other => Err(Error::new(
            ErrorImpl::UnsupportedSubscriptTarget {
                received: other.kind_name().to_string(),
            },
            other.span().start.clone(),
        )),
    }
}

fn assign_element(interpreter: &mut Interpreter<'_>, assignment: &ListElementAssignmentStmt) -> Result<(), Error> {
    let position = &assignment.span.start;
    let mut path = vec![];
    let root = resolve_place(interpreter, &assignment.target, &mut path)?;
    let index = assignment.index.interpret(interpreter)?;
    let value = assignment.value.interpret(interpreter)?;

    let Some(mut place) = interpreter.checker.symbols.runtime_value_mut(&root) else {
        return Err(Error::new(
            ErrorImpl::UndeclaredIdentifier { identifier: root },
            position.clone(),
        ));
    };
    for step in &path {
        place = element_mut(place, step, position)?;
    }

    match place {
        Value::List(list) => list.set(expect_integer(&index, position)?, value),
        Value::Tuple(tuple) => tuple.set(expect_integer(&index, position)?, value),
        Value::Map(map) => {
            map.insert(index, value);
            Ok(())
        }
        other => Err(Error::new(
            ErrorImpl::UnsupportedSubscriptTarget {
                received: other.to_string(),
            },
            position.clone(),
        )),
    }
}
