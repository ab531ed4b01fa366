//! Validation of the IR.
//!
//! Validation annotates the IR in place with the types both backends rely
//! on. It runs in phases over each statement list:
//!
//! - Type definitions and contracts are registered
//! - Procedure signatures, generic functions, contract implementations and
//!   unwrappers are registered, so calls may precede definitions
//! - Every statement is validated in order
//!
//! Errors are collected in the `TypeChecker` session and validation carries
//! on with sibling statements.

pub mod symbol_table;
pub mod type_checker;

#[cfg(test)]
mod tests;
