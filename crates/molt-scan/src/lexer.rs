use crate::Span;

/// Token kinds the specifier scanner distinguishes.
///
/// This is deliberately much coarser than a full ECMAScript lexer: only the
/// tokens that can appear in an import/export clause are classified, and
/// everything else collapses into `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords relevant to module statements
    Import,
    Export,
    From,
    As,

    // Literals
    StringLiteral,
    TemplateLiteral,
    Number,
    Regex,

    // Clause punctuation
    Star,
    LBrace,
    RBrace,
    LParen,
    Semicolon,
    Dot,
    Comma,

    Ident,
    /// Any other punctuation or operator character.
    Other,

    /// Lexical error; `value` holds the message.
    Error,
    Eof,
}

/// A lexed token with its source span and text value.
///
/// For string literals `value` is the unescaped contents; the span still
/// covers the quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, value: String) -> Self {
        Self { kind, span, value }
    }
}

/// The lexer feeding the specifier scanner.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current_pos: usize,
    current_char: Option<char>,
    /// Whether a `/` at the current position starts a regex literal rather
    /// than a division operator; decided by the previous significant token.
    regex_allowed: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer from source code.
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.char_indices();
        let current_char = chars.next().map(|(_, c)| c);
        Self {
            source,
            chars,
            current_pos: 0,
            current_char,
            regex_allowed: true,
        }
    }

    /// Tokenizes the entire source and returns all tokens, ending with `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Gets the next token from the source.
    pub fn next_token(&mut self) -> Token {
        if let Some(error_token) = self.skip_whitespace_and_comments() {
            return error_token;
        }

        let start = self.current_pos;

        let token = match self.current_char {
            None => Token::new(TokenKind::Eof, Span::new(start, start), String::new()),
            Some(ch) => match ch {
                '"' | '\'' => self.read_string_literal(ch),
                '`' => self.read_template_literal(),
                '0'..='9' => self.read_number(),
                'a'..='z' | 'A'..='Z' | '_' | '$' => self.read_identifier_or_keyword(),

                '/' if self.regex_allowed => self.read_regex_literal(),

                '*' => self.single_char(TokenKind::Star, ch),
                '{' => self.single_char(TokenKind::LBrace, ch),
                '}' => self.single_char(TokenKind::RBrace, ch),
                '(' => self.single_char(TokenKind::LParen, ch),
                ';' => self.single_char(TokenKind::Semicolon, ch),
                '.' => self.single_char(TokenKind::Dot, ch),
                ',' => self.single_char(TokenKind::Comma, ch),

                _ if ch.is_alphabetic() => self.read_identifier_or_keyword(),
                _ => self.single_char(TokenKind::Other, ch),
            },
        };
        self.regex_allowed = regex_can_follow(&token);
        token
    }

    // Helper methods

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos;
            self.current_char = Some(ch);
        } else {
            self.current_pos = self.source.len();
            self.current_char = None;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next().map(|(_, c)| c)
    }

    fn single_char(&mut self, kind: TokenKind, ch: char) -> Token {
        let start = self.current_pos;
        self.advance();
        Token::new(kind, Span::new(start, self.current_pos), ch.to_string())
    }

    fn skip_whitespace_and_comments(&mut self) -> Option<Token> {
        loop {
            match self.current_char {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek() == Some('/') {
                        self.skip_single_line_comment();
                    } else if self.peek() == Some('*') {
                        let start = self.current_pos;
                        if !self.skip_multi_line_comment() {
                            return Some(Token::new(
                                TokenKind::Error,
                                Span::new(start, self.current_pos),
                                "Unterminated multi-line comment".to_string(),
                            ));
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        None
    }

    fn skip_single_line_comment(&mut self) {
        // consume "//"
        self.advance();
        self.advance();

        while let Some(ch) = self.current_char {
            if ch == '\n' {
                self.advance();
                break;
            }
            self.advance();
        }
    }

    fn skip_multi_line_comment(&mut self) -> bool {
        // consume "/*"
        self.advance();
        self.advance();

        while let Some(ch) = self.current_char {
            if ch == '*' && self.peek() == Some('/') {
                self.advance(); // *
                self.advance(); // /
                return true;
            }
            self.advance();
        }
        false
    }

    fn read_string_literal(&mut self, quote: char) -> Token {
        let start = self.current_pos;
        self.advance(); // opening quote

        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch == quote {
                self.advance(); // closing quote
                return Token::new(
                    TokenKind::StringLiteral,
                    Span::new(start, self.current_pos),
                    value,
                );
            } else if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    value.push(unescape(escaped));
                    self.advance();
                }
            } else if ch == '\n' {
                return Token::new(
                    TokenKind::Error,
                    Span::new(start, self.current_pos),
                    "Unterminated string literal".to_string(),
                );
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Token::new(
            TokenKind::Error,
            Span::new(start, self.current_pos),
            "Unterminated string literal".to_string(),
        )
    }

    fn read_template_literal(&mut self) -> Token {
        let start = self.current_pos;
        self.advance(); // opening backtick

        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch == '`' {
                self.advance(); // closing backtick
                return Token::new(
                    TokenKind::TemplateLiteral,
                    Span::new(start, self.current_pos),
                    value,
                );
            } else if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    value.push(escaped);
                    self.advance();
                }
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Token::new(
            TokenKind::Error,
            Span::new(start, self.current_pos),
            "Unterminated template literal".to_string(),
        )
    }

    fn read_regex_literal(&mut self) -> Token {
        let start = self.current_pos;
        self.advance(); // opening slash

        let mut in_class = false;
        while let Some(ch) = self.current_char {
            match ch {
                '\\' => {
                    self.advance();
                    if self.current_char.is_some() {
                        self.advance();
                    }
                }
                '[' => {
                    in_class = true;
                    self.advance();
                }
                ']' => {
                    in_class = false;
                    self.advance();
                }
                // A slash inside a character class does not terminate.
                '/' if !in_class => {
                    self.advance(); // closing slash
                    while let Some(flag) = self.current_char {
                        if flag.is_ascii_alphabetic() {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    let span = Span::new(start, self.current_pos);
                    return Token::new(
                        TokenKind::Regex,
                        span,
                        self.source[span.start..span.end].to_string(),
                    );
                }
                // Regex literals cannot span lines.
                '\n' => break,
                _ => self.advance(),
            }
        }

        Token::new(
            TokenKind::Error,
            Span::new(start, self.current_pos),
            "Unterminated regular expression literal".to_string(),
        )
    }

    fn read_number(&mut self) -> Token {
        let start = self.current_pos;
        let mut value = String::new();

        // Numeric literal shapes do not matter here; consume the maximal run
        // of characters that can belong to one.
        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::new(TokenKind::Number, Span::new(start, self.current_pos), value)
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let start = self.current_pos;
        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match value.as_str() {
            "import" => TokenKind::Import,
            "export" => TokenKind::Export,
            "from" => TokenKind::From,
            "as" => TokenKind::As,
            _ => TokenKind::Ident,
        };

        Token::new(kind, Span::new(start, self.current_pos), value)
    }
}

/// Whether a `/` immediately after `token` starts a regex literal.
///
/// Division can only follow an expression: an identifier, a literal, or a
/// closing `)`/`]`. Keywords that end a statement prefix (`return`,
/// `typeof`, ...) lex as `Ident` here but cannot be divided, so they keep
/// regexes allowed.
fn regex_can_follow(token: &Token) -> bool {
    match token.kind {
        TokenKind::Ident => matches!(
            token.value.as_str(),
            "return"
                | "typeof"
                | "instanceof"
                | "in"
                | "of"
                | "new"
                | "delete"
                | "void"
                | "throw"
                | "case"
                | "do"
                | "else"
                | "yield"
                | "await"
        ),
        TokenKind::Number
        | TokenKind::StringLiteral
        | TokenKind::TemplateLiteral
        | TokenKind::Regex => false,
        TokenKind::Other => !matches!(token.value.as_str(), ")" | "]"),
        _ => true,
    }
}

/// Resolves a single-character escape sequence. Specifiers in practice
/// contain none of these, but the lexer must still consume them correctly
/// to find the closing quote.
fn unescape(escaped: char) -> char {
    match escaped {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '0' => '\0',
        other => other,
    }
}
