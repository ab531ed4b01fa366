//! Compiler configuration.
//!
//! Holds the settings shared by every phase: log gating, per-component
//! debug traces, unused-identifier checking and the specialization depth
//! limit. Configs deserialize from TOML.

pub mod config;
