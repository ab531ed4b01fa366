use crate::{
    ast::{
        ast::{Expr, Node},
        expressions::{BinaryExpr, BinaryOperator, SubscriptExpr},
        types::Type,
    },
    errors::errors::{Error, ErrorImpl},
    monomorphization::naming::hashed_monomorphization_name,
};

use super::{
    compiler::{Compiler, HASH_MAP_IMPORT},
    generated::GeneratedSource,
};

/// Generates Rust source for the given expression. Every expression is
/// emitted as an owned value.
pub fn gen_expression(compiler: &Compiler, expression: &Expr) -> Result<GeneratedSource, Error> {
    match expression {
        Expr::Integer(literal) => Ok(GeneratedSource::for_body(format!("{}i64", literal.value))),
        Expr::Float(literal) => Ok(GeneratedSource::for_body(format!("{:?}f64", literal.value))),
        Expr::Text(literal) => Ok(GeneratedSource::for_body(format!("String::from({:?})", literal.value))),
        Expr::Boolean(literal) => Ok(GeneratedSource::for_body(literal.value.to_string())),
        Expr::Identifier(identifier) => {
            let name = compiler.rust_identifier(&identifier.name);
            match identifier.validated_type {
                Some(Type::Procedure(_)) => Ok(GeneratedSource::for_body(name)),
                _ => Ok(GeneratedSource::for_body(format!("{}.clone()", name))),
            }
        }
        Expr::Tuple(tuple) => {
            let (mut generated, elements) = gen_list(compiler, &tuple.elements)?;
            let mut body = String::from("(");
            for element in elements {
                body.push_str(&element);
                body.push_str(", ");
            }
            body.push(')');
            generated.push_body(&body);
            Ok(generated)
        }
        Expr::List(list) => {
            if list.elements.is_empty() {
                let mut list_type = compiler.type_source(&expression.expect_validated_type()?)?;
                let rendered = list_type.take_body();
                list_type.push_body(&format!("{}::new()", turbofish(&rendered)));
                return Ok(list_type);
            }
            let (mut generated, elements) = gen_list(compiler, &list.elements)?;
            generated.push_body(&format!("vec![{}]", elements.join(", ")));
            Ok(generated)
        }
        Expr::Map(map) => {
            let mut map_type = compiler.type_source(&expression.expect_validated_type()?)?;
            let rendered = map_type.take_body();
            if map.entries.is_empty() {
                map_type.push_body(&format!("{}::new()", turbofish(&rendered)));
                return Ok(map_type);
            }

            let mut entries = Vec::with_capacity(map.entries.len());
            for (key, value) in &map.entries {
                let mut key = key.generate_source(compiler)?;
                let mut value = value.generate_source(compiler)?;
                entries.push(format!("({}, {})", key.take_body(), value.take_body()));
                map_type.merge(key);
                map_type.merge(value);
            }
            map_type.push_body(&format!("{}::from([{}])", turbofish(&rendered), entries.join(", ")));
            Ok(map_type.with_preamble(HASH_MAP_IMPORT))
        }
        Expr::Binary(binary) => gen_binary(compiler, binary),
        Expr::If(if_expr) => {
            let mut condition = if_expr.condition.generate_source(compiler)?;
            let mut then_branch = if_expr.then_branch.generate_source(compiler)?;
            let mut else_branch = if_expr.else_branch.generate_source(compiler)?;
            let body = format!(
                "(if {} {{ {} }} else {{ {} }})",
                condition.take_body(),
                then_branch.take_body(),
                else_branch.take_body()
            );
            condition.merge(then_branch);
            condition.merge(else_branch);
            condition.push_body(&body);
            Ok(condition)
        }
        Expr::Call(call) => {
            let callee = match &call.specialized_name {
                Some(specialized) if specialized != &call.name => {
                    hashed_monomorphization_name(&call.name, specialized)
                }
                _ => compiler.rust_identifier(&call.name),
            };
            gen_call(compiler, &callee, &call.args)
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
            gen_call(compiler, &compiler.rust_identifier(resolved), &call.args)
        }
        Expr::Subscript(subscript) => gen_subscript(compiler, subscript),
        Expr::Wrap(wrap) => {
            let mut value = wrap.value.generate_source(compiler)?;
            let body = format!("{}({})", compiler.rust_identifier(&wrap.type_name), value.take_body());
            value.push_body(&body);
            Ok(value)
        }
        Expr::Unwrap(unwrap) => {
            let mut value = unwrap.value.generate_source(compiler)?;
            let body = format!("({}).0", value.take_body());
            value.push_body(&body);
            Ok(value)
        }
    }
}

/// Generates each expression, returning the merged hoisted parts and the
/// individual bodies.
fn gen_list(compiler: &Compiler, expressions: &[Expr]) -> Result<(GeneratedSource, Vec<String>), Error> {
    let mut generated = GeneratedSource::new();
    let mut bodies = Vec::with_capacity(expressions.len());
    for expression in expressions {
        let mut source = expression.generate_source(compiler)?;
        bodies.push(source.take_body());
        generated.merge(source);
    }
    Ok((generated, bodies))
}

fn gen_call(compiler: &Compiler, callee: &str, args: &[Expr]) -> Result<GeneratedSource, Error> {
    let (mut generated, args) = gen_list(compiler, args)?;
    generated.push_body(&format!("{}({})", callee, args.join(", ")));
    Ok(generated)
}

fn gen_binary(compiler: &Compiler, binary: &BinaryExpr) -> Result<GeneratedSource, Error> {
    let mut left = binary.left.generate_source(compiler)?;
    let mut right = binary.right.generate_source(compiler)?;
    let (left_body, right_body) = (left.take_body(), right.take_body());

    let wrapping = match &binary.operand_type {
        Some(Type::Integer) => wrapping_method(binary.operator),
        _ => None,
    };
    let body = match (binary.operator, &binary.operand_type, wrapping) {
        (_, _, Some(method)) => format!("({}).{}({})", left_body, method, right_body),
        (BinaryOperator::Add, Some(Type::Text), _) => format!("format!(\"{{}}{{}}\", {}, {})", left_body, right_body),
        (operator, _, _) => format!("({} {} {})", left_body, operator.symbol(), right_body),
    };
    left.merge(right);
    left.push_body(&body);
    Ok(left)
}

/// Integer arithmetic wraps on overflow, as in the interpreter.
fn wrapping_method(operator: BinaryOperator) -> Option<&'static str> {
    match operator {
        BinaryOperator::Add => Some("wrapping_add"),
        BinaryOperator::Subtract => Some("wrapping_sub"),
        BinaryOperator::Multiply => Some("wrapping_mul"),
        BinaryOperator::Divide => Some("wrapping_div"),
        _ => None,
    }
}

fn gen_subscript(compiler: &Compiler, subscript: &SubscriptExpr) -> Result<GeneratedSource, Error> {
    let mut target = subscript.target.generate_source(compiler)?;
    let target_body = target.take_body();

    let body = match &subscript.target_type {
        Some(Type::Tuple(_)) => {
            let index = subscript.index.as_integer_literal().ok_or_else(|| {
                Error::new(ErrorImpl::NonLiteralTupleIndex, subscript.span.start.clone())
            })?;
            format!("({}).{}.clone()", target_body, index)
        }
        Some(Type::Map(..)) => {
            let mut index = subscript.index.generate_source(compiler)?;
            let body = format!("({})[&{}].clone()", target_body, index.take_body());
            target.merge(index);
            body
        }
        Some(Type::List(_)) => {
            let mut index = subscript.index.generate_source(compiler)?;
            let body = format!("({})[({}) as usize].clone()", target_body, index.take_body());
            target.merge(index);
            body
        }
        other => {
            return Err(Error::new(
                ErrorImpl::UnsupportedSubscriptTarget {
                    received: other.as_ref().map(Type::to_string).unwrap_or_default(),
                },
                subscript.span.start.clone(),
            ))
        }
    };
    target.push_body(&body);
    Ok(target)
}

/// `Vec<i64>` to `Vec::<i64>`, for constructor calls.
fn turbofish(rendered: &str) -> String {
    match rendered.find('<') {
        Some(position) => format!("{}::{}", &rendered[..position], &rendered[position..]),
        None => rendered.to_string(),
    }
}
