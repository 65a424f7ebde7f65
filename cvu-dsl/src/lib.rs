//! CVU DSL - lexer, parser, expression engine and serializer
//!
//! CVU is a declarative language for describing how data items are shown:
//! selectors (`Note`, `Person[]`, `.allNotes`, `[renderer = "list"]`) carry
//! property dictionaries with nested UI elements, actions and expressions.
//!
//! Architecture:
//! ```text
//! CVU Source
//!     ↓
//! Lexer (GrammarConfig keyword table)
//!     ↓
//! Parser (ViewSelector / UIElement / Action trees)
//!     ↓                     ↘
//! Expression compiler       Serializer (canonical text, round-trips)
//!     ↓
//! Evaluation against an ExpressionHost
//! ```

pub mod expression;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod pretty_printer;
pub mod value;

// Re-export key types for convenience
pub use expression::{
    DefaultHost, EvalContext, EvalMode, ExprNode, Expression, ExpressionHost, ExpressionKind, ItemRef, LookupPath,
    PathRoot, TemplatePart, ViewArguments,
};
pub use grammar::{default_grammar, BracketKind, GrammarConfig, Keyword};
pub use lexer::{tokenize, Lexer, Operator, Span, Token, TokenKind};
pub use parser::*;
pub use pretty_printer::{round_trip, serialize, serialize_element, serialize_selector, serialize_value};
pub use value::{Color, CvuValue, PropertyDict};
