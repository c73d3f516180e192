//! # Molt Scan
//!
//! Module specifier scanning for ECMAScript/TypeScript sources.
//! Locates the literal specifier of every static import declaration and
//! every re-export declaration, together with the exact byte range of the
//! quoted literal, so callers can splice in replacement specifiers.

use std::fmt;

pub mod lexer;
pub mod scanner;

pub use lexer::{Lexer, Token, TokenKind};
pub use scanner::scan;

/// Half-open byte range into a scanned source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A module specifier found in a source string.
///
/// `value` is the unescaped literal contents; `span` covers the full quoted
/// token (quotes included), so replacing `span` with a new quoted literal
/// substitutes the specifier wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub value: String,
    pub span: Span,
}

/// Lexical failure while scanning a source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scan error at bytes {}..{}: {}",
            self.span.start, self.span.end, self.message
        )
    }
}

impl std::error::Error for ScanError {}
