//! Direct evaluation of validated IR.
//!
//! The interpreter is the second backend: it runs a validated program
//! against live symbol table values instead of emitting source. Generic
//! calls resolve to the specializations the monomorphization drain kept.

pub mod interpreter;
pub mod value;
