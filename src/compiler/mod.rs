//! Code generation module for the compiler.
//!
//! This module contains the backend that transforms the validated IR into
//! Rust source. It handles:
//!
//! - Compilation of expressions and statements
//! - Type conversion from IR types to Rust types
//! - Hoisting of procedures and type definitions to module level
//! - Emission of generic specializations produced by the drain

pub mod compiler;
pub mod expr;
pub mod generated;
pub mod stmt;

#[cfg(test)]
mod tests;
