//! Error types and error handling for the compiler.
//!
//! This module defines the error types used by every phase:
//!
//! - Error structures carrying source position and the offending node kind
//! - Validation errors raised while inferring and asserting types
//! - Monomorphization errors raised while registering or specializing generics
//! - Runtime errors raised by the interpreter
//! - Helpful error messages and suggestions

pub mod errors;
