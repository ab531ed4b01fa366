use serde::{Deserialize, Serialize};

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position,
};

/// Components that can emit debug traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugTrace {
    TypeChecker,
    Mono,
    Codegen,
    Interpreter,
}

impl DebugTrace {
    /// Lowercase name used as the trace prefix.
    pub fn name(&self) -> &'static str {
        match self {
            DebugTrace::TypeChecker => "typeck",
            DebugTrace::Mono => "mono",
            DebugTrace::Codegen => "codegen",
            DebugTrace::Interpreter => "interp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Suppresses all log output.
    pub quiet: bool,
    pub verbose: u8,
    /// Enables every debug trace and raises verbosity to at least 2.
    pub debug: bool,
    pub debug_trace: Vec<DebugTrace>,
    /// Reports identifiers that are declared but never read.
    pub check_unused: bool,
    /// Deepest concrete type a generic parameter may be specialized with.
    pub max_specialization_depth: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            quiet: true,
            verbose: 0,
            debug: false,
            debug_trace: vec![],
            check_unused: true,
            max_specialization_depth: 32,
        }
    }
}

impl CompilerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, Error> {
        toml::from_str(source).map_err(|error| {
            Error::new(
                ErrorImpl::InvalidConfig {
                    message: error.message().to_string(),
                },
                Position::null(),
            )
        })
    }

    pub fn effective_verbose(&self) -> u8 {
        if self.quiet {
            return 0;
        }

        if self.debug && self.verbose < 2 {
            return 2;
        }

        self.verbose
    }

    pub fn log_phase(&self) -> bool {
        !self.quiet
    }

    pub fn log_debug(&self) -> bool {
        self.effective_verbose() >= 2
    }

    pub fn debug_trace_enabled(&self, trace: DebugTrace) -> bool {
        !self.quiet && (self.debug || self.debug_trace.contains(&trace))
    }
}
