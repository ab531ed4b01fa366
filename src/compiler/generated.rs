use std::collections::BTreeSet;

/// A fragment of emitted Rust source.
///
/// `body` is the code at the fragment's own position. Items that must live at
/// module level (procedures, struct definitions) go to `static_definitions`,
/// and `use` lines to `preamble`. Fragments compose by concatenating bodies
/// and uniting the hoisted parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedSource {
    body: String,
    static_definitions: String,
    preamble: BTreeSet<String>,
}

impl GeneratedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_body(body: impl Into<String>) -> Self {
        GeneratedSource {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn for_static_definitions(static_definitions: impl Into<String>) -> Self {
        GeneratedSource {
            static_definitions: static_definitions.into(),
            ..Self::default()
        }
    }

    pub fn with_preamble(mut self, line: &str) -> Self {
        self.preamble.insert(line.to_string());
        self
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn static_definitions(&self) -> &str {
        &self.static_definitions
    }

    pub fn preamble(&self) -> &BTreeSet<String> {
        &self.preamble
    }

    /// Moves the body text out, leaving it empty. Hoisted parts stay.
    pub fn take_body(&mut self) -> String {
        std::mem::take(&mut self.body)
    }

    pub fn push_body(&mut self, text: &str) {
        self.body.push_str(text);
    }

    /// Appends `other`'s body and static definitions and unites the preambles.
    pub fn merge(&mut self, other: GeneratedSource) {
        self.body.push_str(&other.body);
        self.static_definitions.push_str(&other.static_definitions);
        self.preamble.extend(other.preamble);
    }

    /// Assembles a complete program: preamble, static definitions, then the
    /// body as `main`.
    pub fn into_program(self) -> String {
        let mut program = String::new();
        for line in &self.preamble {
            program.push_str(line);
            program.push('\n');
        }
        if !self.preamble.is_empty() {
            program.push('\n');
        }
        program.push_str(&self.static_definitions);
        program.push_str("fn main() {\n");
        program.push_str(&self.body);
        program.push_str("}\n");
        program
    }
}
