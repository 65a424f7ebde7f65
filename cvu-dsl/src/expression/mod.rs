//! Expression sub-language
//!
//! Expressions appear as `{{ ... }}` blocks and as string templates
//! (`"Hello {.name}"`). They are compiled once at parse time into an
//! [`ExprNode`] tree and evaluated later against an [`ExpressionHost`],
//! which supplies property lookup and function execution.
//!
//! Operator precedence follows the numeric binding strengths on
//! [`Operator::precedence`]: `AND` (20) < `OR` (30) < `=` / `!=` (35).
//! `OR` therefore binds tighter than `AND`, so `a AND b OR c` groups as
//! `a AND (b OR c)`.

mod context;
mod eval;
mod parser;

pub use context::*;
pub use eval::*;

use crate::grammar::{default_grammar, GrammarConfig};
use crate::lexer::Operator;
use crate::value::CvuValue;
use cvu_core::ExpressionError;
use serde::{Deserialize, Serialize};

/// Where a lookup path starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathRoot {
    /// `.name` or `dataItem.name`
    Item,
    /// `name`: a view argument
    Argument,
}

/// A dotted property path such as `.author.name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupPath {
    pub root: PathRoot,
    pub segments: Vec<String>,
}

impl LookupPath {
    pub fn item(segments: &[&str]) -> Self {
        Self {
            root: PathRoot::Item,
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn argument(segments: &[&str]) -> Self {
        Self {
            root: PathRoot::Argument,
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Source form, used in error messages.
    pub fn display(&self) -> String {
        match self.root {
            PathRoot::Item if self.segments.is_empty() => "dataItem".to_string(),
            PathRoot::Item => format!(".{}", self.segments.join(".")),
            PathRoot::Argument => self.segments.join("."),
        }
    }
}

/// Literal text or an embedded expression inside a string template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplatePart {
    Text(String),
    Expr(ExprNode),
}

/// Compiled expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprNode {
    Literal(CvuValue),
    Lookup(LookupPath),
    Negation(Box<ExprNode>),
    Binary {
        op: Operator,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
    Call {
        name: String,
        args: Vec<ExprNode>,
    },
    Template(Vec<TemplatePart>),
}

/// Coarse classification of an expression's top-level node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    /// A bare property path; eligible for two-way binding
    Path,
    Template,
    Operator,
}

/// A compiled expression together with the text it was compiled from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// Raw text: the inside of `{{ }}`, or the template body with escapes intact
    pub source: String,
    /// True for `"..."` string templates
    pub template: bool,
    pub root: Box<ExprNode>,
}

impl Expression {
    /// Compile the inside of a `{{ ... }}` block.
    pub fn compile(source: &str) -> Result<Self, ExpressionError> {
        Self::compile_with(source, default_grammar())
    }

    pub fn compile_with(source: &str, grammar: &GrammarConfig) -> Result<Self, ExpressionError> {
        Ok(Self {
            source: source.to_string(),
            template: false,
            root: Box::new(parser::parse_expression(source, grammar)?),
        })
    }

    /// Compile a string template body such as `Hello {.name}`.
    pub fn compile_template(raw: &str) -> Result<Self, ExpressionError> {
        Self::compile_template_with(raw, default_grammar())
    }

    pub fn compile_template_with(raw: &str, grammar: &GrammarConfig) -> Result<Self, ExpressionError> {
        Ok(Self {
            source: raw.to_string(),
            template: true,
            root: Box::new(ExprNode::Template(parser::parse_template(raw, grammar)?)),
        })
    }

    pub fn kind(&self) -> ExpressionKind {
        match self.root.as_ref() {
            ExprNode::Lookup(_) => ExpressionKind::Path,
            ExprNode::Template(_) => ExpressionKind::Template,
            _ => ExpressionKind::Operator,
        }
    }

    /// The lookup path if this expression is a bare property path.
    pub fn path(&self) -> Option<&LookupPath> {
        match self.root.as_ref() {
            ExprNode::Lookup(path) => Some(path),
            _ => None,
        }
    }
}
