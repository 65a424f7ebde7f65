//! Expression evaluation against an injected host

use super::{EvalContext, ExprNode, Expression, LookupPath, PathRoot, TemplatePart};
use crate::lexer::Operator;
use crate::value::CvuValue;
use cvu_core::ExpressionError;
use std::collections::BTreeMap;
use std::fmt;

/// Property lookup and function execution supplied by the embedding
/// application.
pub trait ExpressionHost {
    fn lookup(&self, path: &LookupPath, context: &EvalContext<'_>) -> Result<CvuValue, ExpressionError>;

    fn exec(&self, name: &str, args: &[CvuValue], context: &EvalContext<'_>) -> Result<CvuValue, ExpressionError>;
}

/// How missing properties are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvalMode {
    /// Missing properties read as `nil` (empty text in templates)
    #[default]
    Display,
    /// Missing properties are errors
    Strict,
}

impl Expression {
    /// Evaluate with errors propagated.
    pub fn execute(&self, host: &dyn ExpressionHost, context: &EvalContext<'_>) -> Result<CvuValue, ExpressionError> {
        self.evaluate(host, context, EvalMode::Strict)
    }

    pub fn evaluate(
        &self,
        host: &dyn ExpressionHost,
        context: &EvalContext<'_>,
        mode: EvalMode,
    ) -> Result<CvuValue, ExpressionError> {
        Evaluator { host, context, mode }.eval(self.root.as_ref())
    }

    /// Evaluate and require a boolean result. `nil` counts as false.
    pub fn evaluate_bool(
        &self,
        host: &dyn ExpressionHost,
        context: &EvalContext<'_>,
        mode: EvalMode,
    ) -> Result<bool, ExpressionError> {
        match self.evaluate(host, context, mode)? {
            CvuValue::Bool(b) => Ok(b),
            CvuValue::Nil => Ok(false),
            other => Err(ExpressionError::TypeMismatch {
                expected: "bool".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Evaluate to display text.
    pub fn evaluate_string(
        &self,
        host: &dyn ExpressionHost,
        context: &EvalContext<'_>,
        mode: EvalMode,
    ) -> Result<String, ExpressionError> {
        Ok(self.evaluate(host, context, mode)?.display_string())
    }
}

struct Evaluator<'h, 'c> {
    host: &'h dyn ExpressionHost,
    context: &'c EvalContext<'c>,
    mode: EvalMode,
}

impl Evaluator<'_, '_> {
    fn eval(&self, node: &ExprNode) -> Result<CvuValue, ExpressionError> {
        match node {
            ExprNode::Literal(value) => Ok(value.clone()),
            ExprNode::Lookup(path) => match self.host.lookup(path, self.context) {
                Err(ExpressionError::PropertyNotFound { .. }) if self.mode == EvalMode::Display => Ok(CvuValue::Nil),
                result => result,
            },
            ExprNode::Negation(inner) => Ok(CvuValue::Bool(!self.eval(inner)?.is_truthy())),
            ExprNode::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs),
            ExprNode::Call { name, args } => {
                let args = args.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>, _>>()?;
                self.host.exec(name, &args, self.context)
            }
            ExprNode::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(expr) => out.push_str(&self.eval(expr)?.display_string()),
                    }
                }
                Ok(CvuValue::String(out))
            }
        }
    }

    /// `AND` yields a bool; `OR` yields the first truthy operand, so
    /// `.title OR "Untitled"` works as a fallback. Both short-circuit.
    fn eval_binary(&self, op: Operator, lhs: &ExprNode, rhs: &ExprNode) -> Result<CvuValue, ExpressionError> {
        let left = self.eval(lhs)?;
        match op {
            Operator::And => {
                if !left.is_truthy() {
                    return Ok(CvuValue::Bool(false));
                }
                Ok(CvuValue::Bool(self.eval(rhs)?.is_truthy()))
            }
            Operator::Or => {
                if left.is_truthy() {
                    return Ok(left);
                }
                self.eval(rhs)
            }
            Operator::Equals => Ok(CvuValue::Bool(values_equal(&left, &self.eval(rhs)?))),
            Operator::NotEquals => Ok(CvuValue::Bool(!values_equal(&left, &self.eval(rhs)?))),
        }
    }
}

/// Structural equality, except numbers compare against numeric strings.
fn values_equal(a: &CvuValue, b: &CvuValue) -> bool {
    match (a, b) {
        (CvuValue::Number(n), CvuValue::String(s)) | (CvuValue::String(s), CvuValue::Number(n)) => {
            s.trim().parse::<f64>().map(|parsed| parsed == *n).unwrap_or(false)
        }
        _ => a == b,
    }
}

/// Function callable from expressions.
pub type HostFunction = Box<dyn Fn(&[CvuValue]) -> Result<CvuValue, ExpressionError> + Send + Sync>;

/// Host backed by the context's item and arguments plus a registry of
/// named functions.
#[derive(Default)]
pub struct DefaultHost {
    functions: BTreeMap<String, HostFunction>,
}

impl fmt::Debug for DefaultHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultHost")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DefaultHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[CvuValue]) -> Result<CvuValue, ExpressionError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Box::new(function));
        self
    }

    /// Host with `count`, `uppercase`, `lowercase` and `join` registered.
    pub fn with_builtins() -> Self {
        Self::new()
            .with_function("count", |args| match args.first() {
                Some(CvuValue::Array(items)) => Ok(CvuValue::from(items.len() as i64)),
                Some(CvuValue::String(s)) => Ok(CvuValue::from(s.chars().count() as i64)),
                Some(CvuValue::Nil) | None => Ok(CvuValue::from(0i64)),
                Some(other) => Err(mismatch("array or string", other)),
            })
            .with_function("uppercase", |args| match args.first() {
                Some(CvuValue::String(s)) => Ok(CvuValue::String(s.to_uppercase())),
                Some(other) => Err(mismatch("string", other)),
                None => Ok(CvuValue::Nil),
            })
            .with_function("lowercase", |args| match args.first() {
                Some(CvuValue::String(s)) => Ok(CvuValue::String(s.to_lowercase())),
                Some(other) => Err(mismatch("string", other)),
                None => Ok(CvuValue::Nil),
            })
            .with_function("join", |args| {
                let separator = args.get(1).and_then(CvuValue::as_str).unwrap_or(", ");
                match args.first() {
                    Some(CvuValue::Array(items)) => Ok(CvuValue::String(
                        items
                            .iter()
                            .map(CvuValue::display_string)
                            .collect::<Vec<_>>()
                            .join(separator),
                    )),
                    Some(other) => Err(mismatch("array", other)),
                    None => Ok(CvuValue::Nil),
                }
            })
    }
}

fn mismatch(expected: &str, found: &CvuValue) -> ExpressionError {
    ExpressionError::TypeMismatch {
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

impl ExpressionHost for DefaultHost {
    fn lookup(&self, path: &LookupPath, context: &EvalContext<'_>) -> Result<CvuValue, ExpressionError> {
        let not_found = || ExpressionError::PropertyNotFound { path: path.display() };

        let mut segments = path.segments.iter();
        let mut current = match path.root {
            PathRoot::Item => {
                let item = context.item.ok_or_else(not_found)?;
                match segments.next() {
                    Some(first) => item.get(first).ok_or_else(not_found)?,
                    None => CvuValue::Dictionary(item.properties.clone()),
                }
            }
            PathRoot::Argument => {
                let first = segments.next().ok_or_else(not_found)?;
                context.arguments.get(first).cloned().ok_or_else(not_found)?
            }
        };

        for segment in segments {
            current = match current {
                CvuValue::Dictionary(mut dict) => dict.remove(segment.as_str()).ok_or_else(not_found)?,
                CvuValue::Array(mut items) => {
                    let index = segment.parse::<usize>().map_err(|_| not_found())?;
                    if index >= items.len() {
                        return Err(not_found());
                    }
                    items.swap_remove(index)
                }
                other => return Err(mismatch("dictionary or array", &other)),
            };
        }

        Ok(current)
    }

    fn exec(&self, name: &str, args: &[CvuValue], _context: &EvalContext<'_>) -> Result<CvuValue, ExpressionError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| ExpressionError::UnknownFunction { name: name.to_string() })?;
        function(args)
    }
}
