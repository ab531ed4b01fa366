#![allow(clippy::module_inception)]

use std::rc::Rc;

pub mod ast;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod interpreter;
pub mod macros;
pub mod monomorphization;
pub mod type_checker;

extern crate regex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position(pub u32, pub Rc<String>);

impl Position {
    pub fn null() -> Self {
        Position(0, Rc::new(String::from("<null>")))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.1, self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn null() -> Self {
        Span {
            start: Position::null(),
            end: Position::null(),
        }
    }

    /// Span covering `start..end` in `file`.
    pub fn new(start: u32, end: u32, file: &Rc<String>) -> Self {
        Span {
            start: Position(start, Rc::clone(file)),
            end: Position(end, Rc::clone(file)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::{Position, Span};

    #[test]
    fn test_span_positions() {
        let file = Rc::new(String::from("main.mf"));
        let span = Span::new(4, 9, &file);
        assert_eq!(span.start.0, 4);
        assert_eq!(span.end.0, 9);
        assert_eq!(span.start.to_string(), "main.mf:4");
        assert_eq!(Span::null().start, Position::null());
    }
}
