//! Lexer implementation

use super::token::*;
use crate::grammar::{default_grammar, GrammarConfig};
use cvu_core::LexError;
use std::iter::Peekable;
use std::str::CharIndices;

/// Scanner mode, reported in [`LexError::UnexpectedCharacter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Number,
    NamedIdentifier,
    Comment,
}

impl Mode {
    fn as_str(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Number => "number",
            Mode::NamedIdentifier => "named identifier",
            Mode::Comment => "comment",
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-')
}

// ============================================================================
// LEXER IMPLEMENTATION
// ============================================================================

/// Lexer for CVU source.
pub struct Lexer<'a> {
    source: &'a str,
    grammar: &'a GrammarConfig,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source using the default grammar.
    pub fn new(source: &'a str) -> Self {
        Self::with_grammar(source, default_grammar())
    }

    /// Create a lexer with an explicit keyword table.
    pub fn with_grammar(source: &'a str, grammar: &'a GrammarConfig) -> Self {
        Self {
            source,
            grammar,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            pos: 0,
        }
    }

    /// Tokenize the entire source. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments()?;

        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.column;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '\n' => self.single(TokenKind::Newline),
                '{' => {
                    self.advance();
                    if self.peek_char() == Some('{') {
                        self.advance();
                        self.scan_expression(start_line, start_col)?
                    } else {
                        TokenKind::LBrace
                    }
                }
                '}' => self.single(TokenKind::RBrace),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                ',' => self.single(TokenKind::Comma),
                ':' => self.single(TokenKind::Colon),
                ';' => self.single(TokenKind::SemiColon),
                '*' => self.single(TokenKind::Identifier("*".to_string())),

                '=' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                    }
                    TokenKind::Operator(Operator::Equals)
                }

                '!' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Operator(Operator::NotEquals)
                    } else {
                        TokenKind::Negation
                    }
                }

                '"' | '\'' => self.scan_string(c, start_line, start_col)?,

                '#' => self.scan_color(start_line, start_col)?,

                '.' => match self.peek_next_char() {
                    Some(d) if d.is_ascii_digit() => self.scan_number()?,
                    Some(n) if is_identifier_start(n) => self.scan_named_identifier(),
                    _ => return Err(self.unexpected('.', Mode::NamedIdentifier)),
                },

                // A leading '-' only ever starts a number; inside identifiers it
                // is consumed by scan_identifier.
                '-' => match self.peek_next_char() {
                    Some(d) if d.is_ascii_digit() || d == '.' => self.scan_number()?,
                    _ => return Err(self.unexpected('-', Mode::Idle)),
                },

                c if c.is_ascii_digit() => self.scan_number()?,

                c if is_identifier_start(c) => self.scan_identifier(),

                c => return Err(self.unexpected(c, Mode::Idle)),
            },
        };

        Ok(Token {
            kind,
            span: Span {
                start: start_pos,
                end: self.pos,
                line: start_line,
                column: start_col,
            },
        })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if is_identifier_char(c) {
                self.advance();
            } else {
                break;
            }
        }

        let ident = &self.source[start..self.pos];

        if !ident.contains('.') {
            if let Some(keyword) = self.grammar.keyword(ident) {
                return keyword.token();
            }
        }

        TokenKind::Identifier(ident.to_string())
    }

    /// Scan `.name`, dropping the leading dot.
    fn scan_named_identifier(&mut self) -> TokenKind {
        self.advance(); // consume '.'
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if is_identifier_char(c) {
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::NamedIdentifier(self.source[start..self.pos].to_string())
    }

    /// Scan a quoted string. An unescaped `{` turns it into a string expression
    /// whose raw text (escapes intact) is kept for the template compiler.
    fn scan_string(
        &mut self,
        quote: char,
        start_line: usize,
        start_col: usize,
    ) -> Result<TokenKind, LexError> {
        self.advance(); // consume opening quote
        let mut value = String::new();
        let mut raw = String::new();
        let mut interpolated = false;

        let missing = || LexError::MissingQuoteClose {
            line: start_line,
            column: start_col,
        };

        loop {
            match self.peek_char() {
                None => return Err(missing()),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    raw.push('\\');
                    let escaped = self.advance().ok_or_else(missing)?;
                    raw.push(escaped);
                    value.push(unescape(escaped));
                }
                Some(c) => {
                    self.advance();
                    if c == '{' {
                        interpolated = true;
                    }
                    raw.push(c);
                    value.push(c);
                }
            }
        }

        if interpolated {
            Ok(TokenKind::StringExpression(raw))
        } else {
            Ok(TokenKind::String(value))
        }
    }

    /// Capture the raw text of a `{{ ... }}` block. The opening braces are
    /// already consumed. Braces inside quoted strings do not close the block.
    fn scan_expression(&mut self, start_line: usize, start_col: usize) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let mut quote: Option<char> = None;

        loop {
            match self.peek_char() {
                None => {
                    return Err(LexError::MissingExpressionClose {
                        line: start_line,
                        column: start_col,
                    })
                }
                Some('\\') if quote.is_some() => {
                    self.advance();
                    self.advance();
                }
                Some(c) if Some(c) == quote => {
                    self.advance();
                    quote = None;
                }
                Some(c @ ('"' | '\'')) if quote.is_none() => {
                    self.advance();
                    quote = Some(c);
                }
                Some('}') if quote.is_none() && self.peek_next_char() == Some('}') => {
                    let text = self.source[start..self.pos].trim().to_string();
                    self.advance();
                    self.advance();
                    return Ok(TokenKind::Expression(text));
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// Scan a number; the caller guarantees the first char starts one.
    fn scan_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let (line, column) = (self.line, self.column);

        if self.peek_char() == Some('-') {
            self.advance();
        }
        self.scan_digits();
        if self.peek_char() == Some('.')
            && self.peek_next_char().map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            self.advance();
            self.scan_digits();
        }

        let text = &self.source[start..self.pos];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| LexError::UnexpectedCharacter {
                character: text.chars().last().unwrap_or('-'),
                mode: Mode::Number.as_str().to_string(),
                line,
                column,
            })
    }

    fn scan_digits(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Scan `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
    fn scan_color(&mut self, start_line: usize, start_col: usize) -> Result<TokenKind, LexError> {
        self.advance(); // consume '#'
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() {
                self.advance();
            } else {
                break;
            }
        }

        let hex = &self.source[start..self.pos];
        let valid = matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(LexError::InvalidColor {
                value: format!("#{}", hex),
                line: start_line,
                column: start_col,
            });
        }

        Ok(TokenKind::Color(hex.to_string()))
    }

    /// Skip blanks and block comments. Newlines are tokens and stop here.
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('/') if self.peek_next_char() == Some('*') => {
                    let (line, column) = (self.line, self.column);
                    self.advance(); // /
                    self.advance(); // *
                    loop {
                        match self.peek_char() {
                            None => return Err(LexError::MissingCommentClose { line, column }),
                            Some('*') if self.peek_next_char() == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            _ => {
                                self.advance();
                            }
                        }
                    }
                }
                Some('/') => return Err(self.unexpected('/', Mode::Comment)),
                _ => return Ok(()),
            }
        }
    }

    fn unexpected(&self, character: char, mode: Mode) -> LexError {
        LexError::UnexpectedCharacter {
            character,
            mode: mode.as_str().to_string(),
            line: self.line,
            column: self.column,
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.source[self.pos..].chars();
        iter.next();
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((i, c)) = self.chars.next() {
            self.pos = i + c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            Some(c)
        } else {
            None
        }
    }
}

/// Single-character escape mapping shared with the template compiler.
pub(crate) fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

/// Tokenize with the default grammar.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_integers_lex_as_single_number(n in -1_000_000i64..1_000_000) {
            let tokens = tokenize(&n.to_string()).expect("lex failed");
            prop_assert_eq!(tokens.len(), 2);
            prop_assert_eq!(&tokens[0].kind, &TokenKind::Number(n as f64));
        }

        #[test]
        fn prop_dashed_identifiers_stay_whole(name in "[a-z][a-z0-9]{0,6}(-[a-z0-9]{1,4}){0,3}") {
            prop_assume!(default_grammar().keyword(&name).is_none());
            let tokens = tokenize(&name).expect("lex failed");
            prop_assert_eq!(&tokens[0].kind, &TokenKind::Identifier(name.clone()));
            prop_assert_eq!(&tokens[1].kind, &TokenKind::Eof);
        }

        #[test]
        fn prop_lone_minus_is_rejected(prefix in "[ \n]{0,3}", suffix in "[ a-z]{0,3}") {
            let source = format!("{}-{}", prefix, suffix);
            let is_unexpected_minus = matches!(
                tokenize(&source),
                Err(LexError::UnexpectedCharacter { character: '-', .. })
            );
            prop_assert!(is_unexpected_minus);
        }

        #[test]
        fn prop_token_stream_ends_in_eof(source in "[a-z0-9 \n{}:\\[\\],.]{0,40}") {
            if let Ok(tokens) = tokenize(&source) {
                prop_assert_eq!(&tokens.last().map(|t| t.kind.clone()), &Some(TokenKind::Eof));
                for token in &tokens {
                    prop_assert!(token.span.start <= token.span.end);
                    prop_assert!(token.span.line >= 1);
                    prop_assert!(token.span.column >= 1);
                }
            }
        }
    }
}
