//! Token-stream pass extracting module specifiers.
//!
//! Recognized forms:
//!
//! - `import defaultBinding from "m"` / `import { a, b as c } from "m"` /
//!   `import * as ns from "m"` and combinations thereof
//! - `import "m"` (side-effect import)
//! - `export * from "m"` / `export * as ns from "m"`
//! - `export { a, b as c } from "m"`
//!
//! Dynamic `import(...)` expressions and `import.meta` are skipped; only
//! literal string specifiers are reported.

use crate::lexer::{Lexer, Token, TokenKind};
use crate::{ScanError, Specifier};

/// Scans a source string for module specifiers.
///
/// Returns specifiers in source order. Any lexical error (unterminated
/// string, template, or block comment) is fatal.
pub fn scan(source: &str) -> Result<Vec<Specifier>, ScanError> {
    let tokens = Lexer::new(source).tokenize();

    if let Some(err) = tokens.iter().find(|t| t.kind == TokenKind::Error) {
        return Err(ScanError {
            message: err.value.clone(),
            span: err.span,
        });
    }

    let mut specifiers = Vec::new();
    let mut i = 0;

    while tokens[i].kind != TokenKind::Eof {
        // `a.import(...)` and `a.export` are member accesses, not statements.
        let after_dot = i > 0 && tokens[i - 1].kind == TokenKind::Dot;

        match tokens[i].kind {
            TokenKind::Import if !after_dot => {
                if let Some(spec) = match_import(&tokens, i) {
                    specifiers.push(spec);
                }
            }
            TokenKind::Export if !after_dot => {
                if let Some(spec) = match_export(&tokens, i) {
                    specifiers.push(spec);
                }
            }
            _ => {}
        }
        i += 1;
    }

    Ok(specifiers)
}

fn specifier_from(token: &Token) -> Specifier {
    Specifier {
        value: token.value.clone(),
        span: token.span,
    }
}

/// Matches an import declaration starting at `tokens[at]`.
fn match_import(tokens: &[Token], at: usize) -> Option<Specifier> {
    match tokens[at + 1].kind {
        // import "m";
        TokenKind::StringLiteral => return Some(specifier_from(&tokens[at + 1])),
        // import(...) — dynamic, out of scope
        TokenKind::LParen => return None,
        // import.meta
        TokenKind::Dot => return None,
        _ => {}
    }

    // Walk the import clause until `from "m"`. Anything that cannot belong
    // to an import clause means this `import` token is not a declaration
    // (e.g. an object key in minified output).
    let mut j = at + 1;
    loop {
        match tokens[j].kind {
            TokenKind::From => {
                if tokens[j + 1].kind == TokenKind::StringLiteral {
                    return Some(specifier_from(&tokens[j + 1]));
                }
                return None;
            }
            TokenKind::Ident
            | TokenKind::As
            | TokenKind::Star
            | TokenKind::Comma
            | TokenKind::LBrace
            | TokenKind::RBrace
            | TokenKind::StringLiteral => j += 1,
            _ => return None,
        }
    }
}

/// Matches a re-export declaration starting at `tokens[at]`.
fn match_export(tokens: &[Token], at: usize) -> Option<Specifier> {
    match tokens[at + 1].kind {
        // export * from "m";  /  export * as ns from "m";
        TokenKind::Star => {
            let mut j = at + 2;
            if tokens[j].kind == TokenKind::As {
                // Binding may be an identifier or (ES2022) a string name.
                match tokens[j + 1].kind {
                    TokenKind::Ident | TokenKind::StringLiteral => j += 2,
                    _ => return None,
                }
            }
            if tokens[j].kind == TokenKind::From
                && tokens[j + 1].kind == TokenKind::StringLiteral
            {
                return Some(specifier_from(&tokens[j + 1]));
            }
            None
        }
        // export { a, b as c } from "m";
        TokenKind::LBrace => {
            let mut j = at + 2;
            while tokens[j].kind != TokenKind::RBrace {
                match tokens[j].kind {
                    TokenKind::Ident
                    | TokenKind::As
                    | TokenKind::Comma
                    | TokenKind::StringLiteral => j += 1,
                    _ => return None,
                }
            }
            if tokens[j + 1].kind == TokenKind::From
                && tokens[j + 2].kind == TokenKind::StringLiteral
            {
                return Some(specifier_from(&tokens[j + 2]));
            }
            None
        }
        // export const / export function / export default ...
        _ => None,
    }
}
