//! Rust source backend.
//!
//! This module contains the `Compiler` structure and the entry point that turns
//! a validated program into Rust source. Generic functions are emitted once per
//! specialization, after the monomorphization drain validated them.

use std::collections::HashSet;

use lazy_static::lazy_static;

use crate::{
    ast::{
        ast::{Node, Program},
        statements::ProcedureDefinitionStmt,
        types::Type,
    },
    config::config::{CompilerConfig, DebugTrace},
    errors::errors::{Error, ErrorImpl},
    monomorphization::{generics::replay_specializations, naming::mangled_identifier},
    phase_log, trace_dbg,
    type_checker::type_checker::TypeChecker,
    Position,
};

use super::{generated::GeneratedSource, stmt::gen_procedure};

pub const HASH_MAP_IMPORT: &str = "use std::collections::HashMap;";

lazy_static! {
    static ref RUST_KEYWORDS: HashSet<&'static str> = [
        "as", "async", "await", "box", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
        "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
        "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where", "while", "yield",
    ]
    .into_iter()
    .collect();
}

/// The code generator.
///
/// Holds only the configuration: every type the generator needs is annotated
/// on the validated IR, so the session stays free for the drain.
pub struct Compiler {
    /// Configuration controlling logging
    pub config: CompilerConfig,
}

impl Compiler {
    /// Creates a new Compiler instance.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration of the compilation session
    pub fn new(config: CompilerConfig) -> Self {
        Compiler { config }
    }

    /// Converts a type to its Rust spelling.
    ///
    /// Map types carry the `HashMap` import in the returned fragment's
    /// preamble. Placeholder and contract types have no Rust counterpart.
    pub fn type_source(&self, ty: &Type) -> Result<GeneratedSource, Error> {
        let mut source = GeneratedSource::for_body(self.render_type(ty)?);
        if mentions_map(ty) {
            source = source.with_preamble(HASH_MAP_IMPORT);
        }
        Ok(source)
    }

    fn render_type(&self, ty: &Type) -> Result<String, Error> {
        let rendered = match ty {
            Type::Integer => String::from("i64"),
            Type::Float => String::from("f64"),
            Type::Text => String::from("String"),
            Type::Boolean => String::from("bool"),
            Type::Nothing => String::from("()"),
            Type::List(element) => format!("Vec<{}>", self.render_type(element)?),
            Type::Map(key, value) => format!("HashMap<{}, {}>", self.render_type(key)?, self.render_type(value)?),
            Type::Tuple(elements) => {
                let mut rendered = String::from("(");
                for element in elements {
                    rendered.push_str(&self.render_type(element)?);
                    rendered.push_str(", ");
                }
                rendered.push(')');
                rendered
            }
            Type::Procedure(procedure) => {
                let args = procedure
                    .arg_types
                    .iter()
                    .map(|(_, ty)| self.render_type(ty))
                    .collect::<Result<Vec<_>, _>>()?;
                match &procedure.return_type {
                    Some(ret) => format!("fn({}) -> {}", args.join(", "), self.render_type(ret)?),
                    None => format!("fn({})", args.join(", ")),
                }
            }
            Type::UserDefined { name, .. } => self.rust_identifier(name),
            Type::GenericTypeParam(_) | Type::Contract { .. } => {
                return Err(Error::new(
                    ErrorImpl::UnknownType { type_: ty.to_string() },
                    Position::null(),
                ))
            }
        };
        Ok(rendered)
    }

    /// A Rust expression that renders `value`, of type `ty`, to a `String`
    /// exactly as the interpreter displays it. Text is unquoted inside
    /// composites and map entries are sorted.
    pub fn render_value(&self, ty: &Type, value: &str) -> Result<String, Error> {
        self.render_at(ty, value, 0)
    }

    fn render_at(&self, ty: &Type, value: &str, depth: usize) -> Result<String, Error> {
        let rendered = match ty {
            Type::Integer | Type::Text | Type::Boolean => format!("({}).to_string()", value),
            Type::Float => format!("format!(\"{{:?}}\", {})", value),
            Type::Nothing => format!("{{ let _ = &({}); String::from(\"()\") }}", value),
            Type::List(element) => format!(
                "format!(\"[{{}}]\", ({}).iter().map(|v{d}| {}).collect::<Vec<_>>().join(\", \"))",
                value,
                self.render_at(element, &format!("v{}", depth), depth + 1)?,
                d = depth
            ),
            Type::Map(key, element) => format!(
                "{{ let mut entries{d} = ({}).iter().map(|(k{d}, v{d})| format!(\"{{}}: {{}}\", {}, {})).collect::<Vec<_>>(); \
                 entries{d}.sort(); format!(\"{{{{{{}}}}}}\", entries{d}.join(\", \")) }}",
                value,
                self.render_at(key, &format!("k{}", depth), depth + 1)?,
                self.render_at(element, &format!("v{}", depth), depth + 1)?,
                d = depth
            ),
            Type::Tuple(elements) if elements.is_empty() => String::from("String::from(\"()\")"),
            Type::Tuple(elements) => {
                let parts = elements
                    .iter()
                    .enumerate()
                    .map(|(index, element)| self.render_at(element, &format!("t{}.{}", depth, index), depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                format!(
                    "{{ let t{d} = &({}); format!(\"({{}})\", [{}].join(\", \")) }}",
                    value,
                    parts.join(", "),
                    d = depth
                )
            }
            Type::UserDefined { name, wrapped } => format!(
                "format!(\"{}({{}})\", {})",
                name,
                self.render_at(wrapped, &format!("({}).0", value), depth)?
            ),
            Type::Procedure(procedure) => format!("String::from(\"<{}>\")", procedure.kind.name()),
            Type::GenericTypeParam(_) | Type::Contract { .. } => {
                return Err(Error::new(
                    ErrorImpl::UnknownType { type_: ty.to_string() },
                    Position::null(),
                ))
            }
        };
        Ok(rendered)
    }

    /// A registered name as a Rust identifier. Canonical contract and
    /// specialization names are mangled; keywords become raw identifiers.
    pub fn rust_identifier(&self, name: &str) -> String {
        let identifier = mangled_identifier(name);
        if RUST_KEYWORDS.contains(identifier.as_str()) {
            return format!("r#{}", identifier);
        }
        identifier
    }

    fn gen_program(&self, program: &Program) -> Result<GeneratedSource, Error> {
        let mut generated = GeneratedSource::new();
        for statement in &program.statements {
            generated.merge(statement.generate_source(self)?);
        }
        Ok(generated)
    }

    fn gen_specialization(&self, procedure: &ProcedureDefinitionStmt) -> Result<GeneratedSource, Error> {
        trace_dbg!(&self.config, DebugTrace::Codegen, "emitting {}", procedure.name);
        gen_procedure(self, procedure)
    }
}

fn mentions_map(ty: &Type) -> bool {
    match ty {
        Type::Map(..) => true,
        Type::List(element) => mentions_map(element),
        Type::Tuple(elements) => elements.iter().any(mentions_map),
        Type::Procedure(procedure) => {
            procedure.arg_types.iter().any(|(_, ty)| mentions_map(ty))
                || procedure.return_type.as_ref().is_some_and(mentions_map)
        }
        _ => false,
    }
}

/// Indents every non-empty line of `text` by one level.
pub fn indent(text: &str) -> String {
    text.lines()
        .map(|line| if line.is_empty() { String::from("\n") } else { format!("    {}\n", line) })
        .collect()
}

/// Emits Rust source for a validated program, including one procedure per
/// specialization the session has validated.
pub fn compile_program(type_checker: &mut TypeChecker, program: &Program) -> Result<GeneratedSource, Error> {
    if type_checker.has_errors() {
        return Err(Error::new(
            ErrorImpl::ValidationFailed {
                errors: type_checker.error_count(),
            },
            Position::null(),
        ));
    }

    let compiler = Compiler::new(type_checker.config.clone());
    phase_log!(&compiler.config, "Generating Rust source");

    let mut generated = compiler.gen_program(program)?;
    let specializations = replay_specializations(type_checker, |_, specialization| {
        generated.merge(compiler.gen_specialization(&specialization.procedure)?);
        Ok(())
    })?;

    trace_dbg!(
        &compiler.config,
        DebugTrace::Codegen,
        "emitted {} statements and {} specializations",
        program.statements.len(),
        specializations
    );
    Ok(generated)
}
