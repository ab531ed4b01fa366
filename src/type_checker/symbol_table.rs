use std::{collections::HashMap, mem};

use crate::{
    ast::types::{Type, TypeAssignment},
    errors::errors::{Error, ErrorImpl},
    interpreter::value::Value,
    monomorphization::naming::{canonical_procedure_name, MONOMORPHIZATION_PREFIX},
    Position,
};

/// Maps a concrete type assignment of a generic function to the name its
/// specialization is registered under.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecializationResolver {
    pub function: String,
    pub generic_params: Vec<String>,
}

impl SpecializationResolver {
    pub fn resolve(&self, assignment: &TypeAssignment) -> String {
        let types = self
            .generic_params
            .iter()
            .map(|param| {
                assignment
                    .get(param)
                    .map(Type::to_string)
                    .unwrap_or_else(|| param.clone())
            })
            .collect::<Vec<_>>();
        canonical_procedure_name(MONOMORPHIZATION_PREFIX, &types, &self.function)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolValue {
    /// A value produced by the interpreter
    Runtime(Value),
    /// Generic functions resolve their value per specialization
    Deferred(SpecializationResolver),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub symbol_type: Type,
    pub value: Option<SymbolValue>,
    pub used: bool,
    /// Names a type (user-defined types, bound generic parameters)
    pub is_type_definition: bool,
}

impl Symbol {
    fn new(symbol_type: Type, value: Option<SymbolValue>) -> Self {
        Symbol {
            symbol_type,
            value,
            used: false,
            is_type_definition: false,
        }
    }
}

/// Scoped identifier store.
///
/// Level 0 is a persistent global map holding procedures, types, contracts
/// and specializations. Every other level is a transient scope that dies when
/// popped. Lookups walk from the innermost scope outwards and end at level 0.
#[derive(Debug)]
pub struct SymbolTable {
    globals: HashMap<String, Symbol>,
    scopes: Vec<HashMap<String, Symbol>>,
    /// Scopes hidden while a procedure body runs
    saved_frames: Vec<Vec<HashMap<String, Symbol>>>,
    check_unused: bool,
}

impl SymbolTable {
    pub fn new(check_unused: bool) -> Self {
        SymbolTable {
            globals: HashMap::new(),
            scopes: vec![],
            saved_frames: vec![],
            check_unused,
        }
    }

    pub fn level(&self) -> usize {
        self.scopes.len()
    }

    pub fn check_unused(&self) -> bool {
        self.check_unused
    }

    /// Switches unused reporting, returning the previous setting.
    pub fn set_check_unused(&mut self, check_unused: bool) -> bool {
        mem::replace(&mut self.check_unused, check_unused)
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pops the innermost scope and returns the names it never read, sorted,
    /// when unused checking is on.
    pub fn pop_scope(&mut self) -> Vec<String> {
        debug_assert!(!self.scopes.is_empty(), "pop_scope without a matching push_scope");
        let Some(scope) = self.scopes.pop() else {
            return vec![];
        };
        if !self.check_unused {
            return vec![];
        }
        let mut unused = scope
            .into_iter()
            .filter(|(_, symbol)| !symbol.used && !symbol.is_type_definition)
            .map(|(name, _)| name)
            .collect::<Vec<_>>();
        unused.sort();
        unused
    }

    /// Hides every transient scope so only level 0 stays visible.
    pub fn enter_frame(&mut self) {
        let scopes = mem::take(&mut self.scopes);
        self.saved_frames.push(scopes);
    }

    pub fn exit_frame(&mut self) {
        self.scopes = self.saved_frames.pop().unwrap_or_default();
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.globals.get(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        match self.scopes.iter().rposition(|scope| scope.contains_key(name)) {
            Some(level) => self.scopes[level].get_mut(name),
            None => self.globals.get_mut(name),
        }
    }

    /// Declares `name` in the innermost scope.
    pub fn declare(&mut self, name: &str, symbol_type: Type, value: Option<SymbolValue>, position: &Position) -> Result<(), Error> {
        self.declare_at_level(name, symbol_type, value, self.level(), position)
    }

    /// Declares `name` at `level`, where 0 is the persistent global level.
    /// Fails if `name` is visible from the current scope.
    pub fn declare_at_level(
        &mut self,
        name: &str,
        symbol_type: Type,
        value: Option<SymbolValue>,
        level: usize,
        position: &Position,
    ) -> Result<(), Error> {
        if self.is_declared(name) {
            return Err(Error::new(
                ErrorImpl::Redeclaration {
                    identifier: name.to_string(),
                },
                position.clone(),
            ));
        }

        let symbol = Symbol::new(symbol_type, value);
        match level.checked_sub(1).and_then(|index| self.scopes.get_mut(index)) {
            Some(scope) => scope.insert(name.to_string(), symbol),
            None => self.globals.insert(name.to_string(), symbol),
        };
        Ok(())
    }

    /// Declares a type name at level 0.
    pub fn declare_type_definition(&mut self, name: &str, symbol_type: Type, position: &Position) -> Result<(), Error> {
        self.declare_at_level(name, symbol_type, None, 0, position)?;
        if let Some(symbol) = self.globals.get_mut(name) {
            symbol.is_type_definition = true;
        }
        Ok(())
    }

    /// Installs or replaces a level-0 entry.
    pub fn put_global(&mut self, name: &str, symbol_type: Type, value: Option<SymbolValue>) {
        self.globals.insert(name.to_string(), Symbol::new(symbol_type, value));
    }

    /// Installs or replaces a level-0 type name.
    pub fn put_type_definition(&mut self, name: &str, symbol_type: Type) {
        let mut symbol = Symbol::new(symbol_type, None);
        symbol.is_type_definition = true;
        self.globals.insert(name.to_string(), symbol);
    }

    pub fn delete_global(&mut self, name: &str) -> Option<Symbol> {
        self.globals.remove(name)
    }

    pub fn type_of(&self, name: &str, position: &Position) -> Result<Type, Error> {
        self.lookup(name)
            .map(|symbol| symbol.symbol_type.clone())
            .ok_or_else(|| {
                Error::new(
                    ErrorImpl::UndeclaredIdentifier {
                        identifier: name.to_string(),
                    },
                    position.clone(),
                )
            })
    }

    pub fn is_type_definition(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|symbol| symbol.is_type_definition)
    }

    pub fn value_of(&self, name: &str) -> Option<&SymbolValue> {
        self.lookup(name).and_then(|symbol| symbol.value.as_ref())
    }

    pub fn runtime_value(&self, name: &str) -> Option<&Value> {
        match self.value_of(name) {
            Some(SymbolValue::Runtime(value)) => Some(value),
            _ => None,
        }
    }

    pub fn runtime_value_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self.lookup_mut(name).and_then(|symbol| symbol.value.as_mut()) {
            Some(SymbolValue::Runtime(value)) => Some(value),
            _ => None,
        }
    }

    /// Replaces the value of a visible entry. Returns false if `name` is undeclared.
    pub fn set_value(&mut self, name: &str, value: SymbolValue) -> bool {
        match self.lookup_mut(name) {
            Some(symbol) => {
                symbol.value = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn mark_used(&mut self, name: &str) {
        if let Some(symbol) = self.lookup_mut(name) {
            symbol.used = true;
        }
    }

    /// Removes the innermost visible entry for `name`.
    pub fn delete(&mut self, name: &str) -> Option<Symbol> {
        match self.scopes.iter().rposition(|scope| scope.contains_key(name)) {
            Some(level) => self.scopes[level].remove(name),
            None => self.globals.remove(name),
        }
    }
}
