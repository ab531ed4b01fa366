//! Logging macros for the compiler.
//!
//! This module defines the macros every compilation phase logs through:
//!
//! - `phase_log!` - Announces a compilation phase
//! - `phase_warn!` - Reports a non-fatal diagnostic
//! - `trace_dbg!` - Debug trace for a single component (see `DebugTrace`)
//! - `log_dbg!` - Verbose debug output
//!
//! Everything goes to stderr so emitted source and program output stay clean.
//! Gating is decided by `CompilerConfig`.

/// Logs a compilation phase with an arrow prefix.
///
/// # Example
///
/// ```ignore
/// phase_log!(&checker.config, "Validating {} statements", program.statements.len());
/// ```
#[macro_export]
macro_rules! phase_log {
    ($config:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        if $config.log_phase() {
            use colored::Colorize;
            eprintln!("    {} {}", "-->".bright_green().bold(), format!($fmt $(, $arg)*));
        }
    }};
}

/// Logs a warning (yellow arrow, no indent).
///
/// # Example
///
/// ```ignore
/// phase_warn!(&checker.config, "unused identifier `{}`", name);
/// ```
#[macro_export]
macro_rules! phase_warn {
    ($config:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        if $config.log_phase() {
            use colored::Colorize;
            eprintln!("{} {}", "-->".bright_yellow().bold(), format!($fmt $(, $arg)*));
        }
    }};
}

/// Logs a debug trace for one compiler component.
///
/// Output format: `debug[component]: message`
///
/// # Example
///
/// ```ignore
/// trace_dbg!(&checker.config, DebugTrace::Mono, "queued {}", verbose_name);
/// // Output: debug[mono]: queued $MONOMORPHIZATION$int$identity
/// ```
#[macro_export]
macro_rules! trace_dbg {
    ($config:expr, $trace:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        if $config.debug_trace_enabled($trace) {
            use colored::Colorize;
            eprintln!(
                "{}: {}",
                format!("debug[{}]", $trace.name()).dimmed(),
                format!($fmt $(, $arg)*)
            );
        }
    }};
}

/// Logs a verbose debug message (verbosity >= 2).
#[macro_export]
macro_rules! log_dbg {
    ($config:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        if $config.log_debug() {
            eprintln!("debug: {}", format!($fmt $(, $arg)*));
        }
    }};
}
