//! Error types for CVU operations

use crate::Domain;
use thiserror::Error;

/// Lexer errors. Each variant carries the position of the offending input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("Missing quote close for string starting at line {line}, column {column}")]
    MissingQuoteClose { line: usize, column: usize },

    #[error("Missing expression close for expression starting at line {line}, column {column}")]
    MissingExpressionClose { line: usize, column: usize },

    #[error("Missing comment close for comment starting at line {line}, column {column}")]
    MissingCommentClose { line: usize, column: usize },

    #[error("Invalid color '{value}' at line {line}, column {column}")]
    InvalidColor {
        value: String,
        line: usize,
        column: usize,
    },

    #[error("Unexpected character '{character}' in {mode} mode at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        mode: String,
        line: usize,
        column: usize,
    },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::MissingQuoteClose { line, .. }
            | LexError::MissingExpressionClose { line, .. }
            | LexError::MissingCommentClose { line, .. }
            | LexError::InvalidColor { line, .. }
            | LexError::UnexpectedCharacter { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            LexError::MissingQuoteClose { column, .. }
            | LexError::MissingExpressionClose { column, .. }
            | LexError::MissingCommentClose { column, .. }
            | LexError::InvalidColor { column, .. }
            | LexError::UnexpectedCharacter { column, .. } => *column,
        }
    }
}

/// Parser errors. A single error aborts the whole parse unit.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("Unexpected token at line {line}, column {column}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },

    #[error("Unknown definition '{name}' at line {line}, column {column}")]
    UnknownDefinition {
        name: String,
        line: usize,
        column: usize,
    },

    #[error("Invalid expression at line {line}, column {column}: {message}")]
    InvalidExpression {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Definition kind '{kind}' cannot be nested at line {line}, column {column}")]
    NestedDefinition {
        kind: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::Lex(err) => err.line(),
            ParseError::UnexpectedToken { line, .. }
            | ParseError::UnknownDefinition { line, .. }
            | ParseError::InvalidExpression { line, .. }
            | ParseError::NestedDefinition { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            ParseError::Lex(err) => err.column(),
            ParseError::UnexpectedToken { column, .. }
            | ParseError::UnknownDefinition { column, .. }
            | ParseError::InvalidExpression { column, .. }
            | ParseError::NestedDefinition { column, .. } => *column,
        }
    }
}

/// Expression compilation and evaluation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("Property not found: {path}")]
    PropertyNotFound { path: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("Expression syntax error at column {column}: {message}")]
    Syntax { message: String, column: usize },
}

/// Errors raised when a merged view fails validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("Missing required field '{field}' in resolved view for {situation}")]
    MissingField { field: String, situation: String },

    #[error("No renderer could be determined for {situation}")]
    NoRenderer { situation: String },

    #[error("Invalid cascadeOrder entry '{entry}' in {selector}")]
    InvalidCascadeOrder { entry: String, selector: String },

    #[error("Conflicting cascadeOrder in {domain} domain: {first} and {second}")]
    ConflictingCascadeOrder {
        domain: Domain,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// Errors raised when a value cannot be written back as CVU text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SerializationError {
    #[error("Number for '{key}' is not finite")]
    NonFiniteNumber { key: String },

    #[error("Key '{key}' is not a valid CVU identifier")]
    InvalidKey { key: String },

    #[error("Value for '{key}' has no CVU text form: {reason}")]
    Unrepresentable { key: String, reason: String },
}

/// Configuration loading errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read configuration: {reason}")]
    Malformed { reason: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all CVU errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CvuError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for CVU operations.
pub type CvuResult<T> = Result<T, CvuError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_error_display_missing_quote() {
        let err = LexError::MissingQuoteClose { line: 3, column: 7 };
        let msg = format!("{}", err);
        assert!(msg.contains("Missing quote close"));
        assert!(msg.contains("line 3"));
        assert!(msg.contains("column 7"));
    }

    #[test]
    fn test_parse_error_position_from_lex() {
        let err = ParseError::from(LexError::InvalidColor {
            value: "#zz".to_string(),
            line: 2,
            column: 5,
        });
        assert_eq!(err.line(), 2);
        assert_eq!(err.column(), 5);
    }

    #[test]
    fn test_parse_error_display_unexpected_token() {
        let err = ParseError::UnexpectedToken {
            expected: "'{'".to_string(),
            found: "number 3".to_string(),
            line: 1,
            column: 9,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("expected '{'"));
        assert!(msg.contains("found number 3"));
    }

    #[test]
    fn test_merge_error_display_conflict() {
        let err = MergeError::ConflictingCascadeOrder {
            domain: Domain::User,
            first: "Note".to_string(),
            second: "[renderer = \"list\"]".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("user domain"));
        assert!(msg.contains("Note"));
    }

    #[test]
    fn test_cvu_error_from_variants() {
        let lex = CvuError::from(LexError::MissingCommentClose { line: 1, column: 1 });
        assert!(matches!(lex, CvuError::Lex(_)));

        let expression = CvuError::from(ExpressionError::UnknownFunction {
            name: "sum".to_string(),
        });
        assert!(matches!(expression, CvuError::Expression(_)));

        let merge = CvuError::from(MergeError::NoRenderer {
            situation: "Note".to_string(),
        });
        assert!(matches!(merge, CvuError::Merge(_)));

        let serialization = CvuError::from(SerializationError::InvalidKey {
            key: "two words".to_string(),
        });
        assert!(matches!(serialization, CvuError::Serialization(_)));
    }
}
