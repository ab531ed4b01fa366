/// AST (Abstract Syntax Tree) module
/// Contains the IR the validator, the interpreter and the code generator share
///
/// Submodules:
/// - ast: The `Expr`/`Stmt` sum types and the `Node` contract
/// - expressions: Definitions for the expression node kinds
/// - statements: Definitions for the statement node kinds
/// - types: Resolved types and unresolved type annotations
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;

#[cfg(test)]
mod tests;
