//! Template-instantiation of generic functions.
//!
//! A generic function is registered once, its body validated once over
//! placeholder types, and every call site with a concrete type assignment
//! requests a specialization. The drain validates queued specializations
//! until no new ones appear and hands each one to a backend:
//!
//! - `generics` - Registration, specialization requests and the drain
//! - `naming` - Canonical and hash-derived specialization names

pub mod generics;
pub mod naming;
