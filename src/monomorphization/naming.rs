use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Prefix of every verbose specialization name.
pub const MONOMORPHIZATION_PREFIX: &str = "$MONOMORPHIZATION";

lazy_static! {
    static ref NON_IDENTIFIER_CHARS: Regex = Regex::new("[^A-Za-z0-9_]+").unwrap();
    static ref IDENTIFIER: Regex = Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// `prefix$type$...$procedure`, the name a procedure specialized over
/// `types` is registered under.
pub fn canonical_procedure_name(prefix: &str, types: &[String], procedure: &str) -> String {
    let mut parts = Vec::with_capacity(types.len() + 2);
    parts.push(prefix);
    parts.extend(types.iter().map(String::as_str));
    parts.push(procedure);
    parts.join("$")
}

pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Identifier a specialization is emitted under: the generic function's name
/// followed by the hash of its verbose name.
pub fn hashed_monomorphization_name(function: &str, verbose_name: &str) -> String {
    format!("{}__{}", function, sha256_hex(verbose_name))
}

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Turns an arbitrary registered name into an identifier. Names that already
/// are identifiers pass through unchanged.
pub fn mangled_identifier(name: &str) -> String {
    if is_identifier(name) {
        return name.to_string();
    }
    let readable = NON_IDENTIFIER_CHARS.replace_all(name, "_");
    let readable = readable.trim_matches('_');
    let hash = sha256_hex(name);
    if readable.is_empty() || readable.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{}__{}", readable, &hash[..16]);
    }
    format!("{}__{}", readable, &hash[..16])
}
