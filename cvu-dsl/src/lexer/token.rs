//! Lexer token types

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// LEXER TYPES
// ============================================================================

/// Binary operators of the expression sub-language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    And,
    Or,
    Equals,
    NotEquals,
}

impl Operator {
    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::And => 20,
            Operator::Or => 30,
            Operator::Equals | Operator::NotEquals => 35,
        }
    }

    /// Canonical spelling used when printing expressions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
        }
    }
}

/// Token kinds for CVU source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    Operator(Operator),
    Bool(bool),
    Number(f64),
    /// Quoted string with escapes already applied
    String(String),
    Identifier(String),
    /// `.name`, stored without the leading dot
    NamedIdentifier(String),
    /// Quoted string containing an unescaped `{`, stored raw
    StringExpression(String),
    /// Contents of a `{{ ... }}` block, trimmed
    Expression(String),
    Negation,
    Comma,
    Colon,
    SemiColon,
    /// Hex digits of a `#...` color, without the `#`
    Color(String),
    Newline,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Nil,
    Eof,
}

impl TokenKind {
    /// Short human-readable form used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Operator(op) => format!("operator {}", op.as_str()),
            TokenKind::Bool(b) => format!("bool {}", b),
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::String(s) => format!("string \"{}\"", s),
            TokenKind::Identifier(s) => format!("identifier {}", s),
            TokenKind::NamedIdentifier(s) => format!("named identifier .{}", s),
            TokenKind::StringExpression(s) => format!("string expression \"{}\"", s),
            TokenKind::Expression(s) => format!("expression {{{{{}}}}}", s),
            TokenKind::Negation => "'!'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::SemiColon => "';'".to_string(),
            TokenKind::Color(hex) => format!("color #{}", hex),
            TokenKind::Newline => "newline".to_string(),
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Nil => "nil".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Source location span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

/// A token with its kind and source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}
