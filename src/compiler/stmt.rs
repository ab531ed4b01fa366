use crate::{
    ast::{
        ast::{Expr, Node, Stmt},
        statements::{ListElementAssignmentStmt, ProcedureDefinitionStmt, UnwrapperProcedure},
        types::Type,
    },
    errors::errors::{Error, ErrorImpl},
};

use super::{
    compiler::{indent, Compiler},
    generated::GeneratedSource,
};

/// Generates Rust source for the given statement.
///
/// Procedure, contract implementation and type definitions are hoisted to
/// the static definitions; everything else is emitted in place.
pub fn gen_statement(compiler: &Compiler, statement: &Stmt) -> Result<GeneratedSource, Error> {
    match statement {
        Stmt::VarDecl(declaration) => {
            let ty = declaration.validated_type.as_ref().ok_or_else(|| unvalidated(statement))?;
            let mut ty = compiler.type_source(ty)?;
            let mut value = declaration.value.generate_source(compiler)?;
            let body = format!(
                "let mut {}: {} = {};\n",
                compiler.rust_identifier(&declaration.name),
                ty.take_body(),
                value.take_body()
            );
            ty.merge(value);
            ty.push_body(&body);
            Ok(ty)
        }
        Stmt::Assignment(assignment) => {
            let mut value = assignment.value.generate_source(compiler)?;
            let body = format!("{} = {};\n", compiler.rust_identifier(&assignment.name), value.take_body());
            value.push_body(&body);
            Ok(value)
        }
        Stmt::ListElementAssignment(assignment) => gen_element_assignment(compiler, assignment),
        Stmt::Expression(statement) => {
            let mut expression = statement.expression.generate_source(compiler)?;
            let body = format!("{};\n", expression.take_body());
            expression.push_body(&body);
            Ok(expression)
        }
        Stmt::Return(statement) => match &statement.value {
            Some(value) => {
                let mut value = value.generate_source(compiler)?;
                let body = format!("return {};\n", value.take_body());
                value.push_body(&body);
                Ok(value)
            }
            None => Ok(GeneratedSource::for_body("return;\n")),
        },
        Stmt::Print(print) => {
            let ty = print.validated_type.as_ref().ok_or_else(|| unvalidated(statement))?;
            let mut value = print.value.generate_source(compiler)?;
            let rendered = match ty {
                Type::Integer | Type::Text | Type::Boolean => value.take_body(),
                _ => compiler.render_value(ty, &value.take_body())?,
            };
            let body = format!("println!(\"{{}}\", {});\n", rendered);
            value.push_body(&body);
            Ok(value)
        }
        Stmt::If(statement) => {
            let mut generated = statement.condition.generate_source(compiler)?;
            let condition = generated.take_body();

            let mut then_block = gen_block(compiler, &statement.then_block)?;
            let mut body = format!("if {} {{\n{}}}", condition, indent(&then_block.take_body()));
            generated.merge(then_block);

            if let Some(else_block) = &statement.else_block {
                let mut else_block = gen_block(compiler, else_block)?;
                body.push_str(&format!(" else {{\n{}}}", indent(&else_block.take_body())));
                generated.merge(else_block);
            }
            body.push('\n');
            generated.push_body(&body);
            Ok(generated)
        }
        Stmt::ProcedureDefinition(procedure) => gen_procedure(compiler, procedure),
        // Generic functions are emitted per specialization; contracts have no runtime form
        Stmt::GenericFunctionDefinition(_) | Stmt::ContractDefinition(_) => Ok(GeneratedSource::new()),
        Stmt::ContractImplementation(implementation) => {
            let mut generated = GeneratedSource::new();
            for procedure in &implementation.procedures {
                generated.merge(gen_procedure(compiler, procedure)?);
            }
            Ok(generated)
        }
        Stmt::NewTypeDefinition(new_type) => {
            let Some(Type::UserDefined { wrapped, .. }) = &new_type.resolved_type else {
                return Err(unvalidated(statement));
            };
            let mut wrapped = compiler.type_source(wrapped)?;
            let definition = format!(
                "#[derive(Clone, Debug, PartialEq)]\nstruct {}({});\n\n",
                compiler.rust_identifier(&new_type.name),
                wrapped.take_body()
            );
            wrapped.merge(GeneratedSource::for_static_definitions(definition));
            Ok(wrapped)
        }
        Stmt::UnwrappersBlock(block) => {
            let mut generated = GeneratedSource::new();
            for procedure in &block.procedures {
                if let UnwrapperProcedure::Procedure(procedure) = procedure {
                    generated.merge(gen_procedure(compiler, procedure)?);
                }
            }
            Ok(generated)
        }
    }
}

fn unvalidated(statement: &Stmt) -> Error {
    Error::new(
        ErrorImpl::UnknownType {
            type_: format!("<unvalidated {}>", statement.kind_name()),
        },
        statement.span().start.clone(),
    )
}

fn gen_block(compiler: &Compiler, statements: &[Stmt]) -> Result<GeneratedSource, Error> {
    let mut generated = GeneratedSource::new();
    for statement in statements {
        generated.merge(statement.generate_source(compiler)?);
    }
    Ok(generated)
}

/// Emits a procedure as a module-level `fn`. Injected keys are read from the
/// `injected` module the embedding program provides.
pub fn gen_procedure(compiler: &Compiler, procedure: &ProcedureDefinitionStmt) -> Result<GeneratedSource, Error> {
    let Some(procedure_type) = &procedure.resolved_type else {
        return Err(Error::new(
            ErrorImpl::UndeclaredIdentifier {
                identifier: procedure.name.clone(),
            },
            procedure.span.start.clone(),
        ));
    };

    let mut generated = GeneratedSource::new();
    let mut arguments = Vec::with_capacity(procedure_type.arg_types.len());
    for (name, ty) in &procedure_type.arg_types {
        let mut ty = compiler.type_source(ty)?;
        arguments.push(format!("mut {}: {}", compiler.rust_identifier(name), ty.take_body()));
        generated.merge(ty);
    }
    let return_type = match &procedure_type.return_type {
        Some(ty) => {
            let mut ty = compiler.type_source(ty)?;
            let rendered = format!(" -> {}", ty.take_body());
            generated.merge(ty);
            rendered
        }
        None => String::new(),
    };

    let mut body = String::new();
    for (key, ty) in &procedure_type.injected_keys {
        let mut ty = compiler.type_source(ty)?;
        let key = compiler.rust_identifier(key);
        body.push_str(&format!("let {}: {} = injected::{}();\n", key, ty.take_body(), key));
        generated.merge(ty);
    }
    let mut block = gen_block(compiler, &procedure.body)?;
    body.push_str(&block.take_body());

    let definition = format!(
        "fn {}({}){} {{\n{}}}\n\n",
        compiler.rust_identifier(&procedure.name),
        arguments.join(", "),
        return_type,
        indent(&body)
    );
    // Nested procedures were hoisted into the block's static definitions
    generated.merge(block);
    generated.merge(GeneratedSource::for_static_definitions(definition));
    Ok(generated)
}

/// The assignable place an element assignment writes through.
fn gen_place(compiler: &Compiler, target: &Expr) -> Result<GeneratedSource, Error> {
    match target {
        Expr::Identifier(identifier) => Ok(GeneratedSource::for_body(compiler.rust_identifier(&identifier.name))),
        Expr::Subscript(subscript) => {
            let mut place = gen_place(compiler, &subscript.target)?;
            let place_body = place.take_body();
            let body = match &subscript.target_type {
                Some(Type::Tuple(_)) => {
                    let index = subscript.index.as_integer_literal().ok_or_else(|| {
                        Error::new(ErrorImpl::NonLiteralTupleIndex, subscript.span.start.clone())
                    })?;
                    format!("{}.{}", place_body, index)
                }
                Some(Type::List(_)) => {
                    let mut index = subscript.index.generate_source(compiler)?;
                    let body = format!("{}[({}) as usize]", place_body, index.take_body());
                    place.merge(index);
                    body
                }
                Some(Type::Map(..)) => {
                    let mut index = subscript.index.generate_source(compiler)?;
                    let body = format!("(*{}.get_mut(&{}).unwrap())", place_body, index.take_body());
                    place.merge(index);
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
            place.push_body(&body);
            Ok(place)
        }
        other => Err(Error::new(
            ErrorImpl::UnsupportedSubscriptTarget {
                received: other.kind_name().to_string(),
            },
            other.span().start.clone(),
        )),
    }
}

fn gen_element_assignment(
    compiler: &Compiler,
    assignment: &ListElementAssignmentStmt,
) -> Result<GeneratedSource, Error> {
    let mut generated = gen_place(compiler, &assignment.target)?;
    let place = generated.take_body();
    let mut value = assignment.value.generate_source(compiler)?;
    let value_body = value.take_body();
    generated.merge(value);

    let body = match &assignment.target_type {
        Some(Type::Tuple(_)) => {
            let index = assignment.index.as_integer_literal().ok_or_else(|| {
                Error::new(ErrorImpl::NonLiteralTupleIndex, assignment.span.start.clone())
            })?;
            format!("{}.{} = {};\n", place, index, value_body)
        }
        Some(Type::List(_)) => {
            let mut index = assignment.index.generate_source(compiler)?;
            let body = format!("{}[({}) as usize] = {};\n", place, index.take_body(), value_body);
            generated.merge(index);
            body
        }
        Some(Type::Map(..)) => {
            let mut index = assignment.index.generate_source(compiler)?;
            let body = format!("{}.insert({}, {});\n", place, index.take_body(), value_body);
            generated.merge(index);
            body
        }
        other => {
            return Err(Error::new(
                ErrorImpl::UnsupportedSubscriptTarget {
                    received: other.as_ref().map(Type::to_string).unwrap_or_default(),
                },
                assignment.span.start.clone(),
            ))
        }
    };
    generated.push_body(&body);
    Ok(generated)
}
