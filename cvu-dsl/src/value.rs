//! Property values carried by parsed CVU dictionaries

use crate::expression::Expression;
use crate::parser::ast::{Action, UIElement, ViewSelector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Property dictionary. Iteration order is alphabetical, which the
/// serializer relies on for canonical output.
pub type PropertyDict = BTreeMap<String, CvuValue>;

/// A validated hex color, stored lowercase without the leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    hex: String,
}

impl Color {
    /// Accepts `rgb`, `rgba`, `rrggbb` or `rrggbbaa`, with or without `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let valid = matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
        valid.then(|| Self {
            hex: hex.to_ascii_lowercase(),
        })
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Expand to 8-bit RGBA channels. Missing alpha is opaque.
    pub fn rgba(&self) -> (u8, u8, u8, u8) {
        let expanded: String = match self.hex.len() {
            3 | 4 => self.hex.chars().flat_map(|c| [c, c]).collect(),
            _ => self.hex.clone(),
        };
        let channel = |i: usize| {
            expanded
                .get(i * 2..i * 2 + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .unwrap_or(255)
        };
        (channel(0), channel(1), channel(2), channel(3))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.hex)
    }
}

/// Any value a CVU property can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CvuValue {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Color(Color),
    Array(Vec<CvuValue>),
    Dictionary(PropertyDict),
    Expression(Expression),
    Action(Action),
    Element(UIElement),
    /// Nested selector, e.g. an entry of `renderDefinitions`
    Definition(Box<ViewSelector>),
}

impl CvuValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            CvuValue::Nil => "nil",
            CvuValue::Bool(_) => "bool",
            CvuValue::Number(_) => "number",
            CvuValue::String(_) => "string",
            CvuValue::Color(_) => "color",
            CvuValue::Array(_) => "array",
            CvuValue::Dictionary(_) => "dictionary",
            CvuValue::Expression(_) => "expression",
            CvuValue::Action(_) => "action",
            CvuValue::Element(_) => "element",
            CvuValue::Definition(_) => "definition",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, CvuValue::Nil)
    }

    /// Truthiness used by `AND`, `OR` and `NOT`.
    pub fn is_truthy(&self) -> bool {
        match self {
            CvuValue::Nil => false,
            CvuValue::Bool(b) => *b,
            CvuValue::Number(n) => *n != 0.0,
            CvuValue::String(s) => !s.is_empty(),
            CvuValue::Array(items) => !items.is_empty(),
            CvuValue::Dictionary(dict) => !dict.is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CvuValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CvuValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CvuValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CvuValue]> {
        match self {
            CvuValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&PropertyDict> {
        match self {
            CvuValue::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Text shown when the value is interpolated into a string template.
    pub fn display_string(&self) -> String {
        match self {
            CvuValue::Nil => String::new(),
            CvuValue::Bool(b) => b.to_string(),
            CvuValue::Number(n) => n.to_string(),
            CvuValue::String(s) => s.clone(),
            CvuValue::Color(c) => c.to_string(),
            CvuValue::Array(items) => items
                .iter()
                .map(CvuValue::display_string)
                .collect::<Vec<_>>()
                .join(", "),
            CvuValue::Action(action) => action.title().to_string(),
            CvuValue::Expression(expr) => expr.source.clone(),
            CvuValue::Dictionary(_) | CvuValue::Element(_) | CvuValue::Definition(_) => String::new(),
        }
    }
}

impl From<bool> for CvuValue {
    fn from(b: bool) -> Self {
        CvuValue::Bool(b)
    }
}

impl From<f64> for CvuValue {
    fn from(n: f64) -> Self {
        CvuValue::Number(n)
    }
}

impl From<i64> for CvuValue {
    fn from(n: i64) -> Self {
        CvuValue::Number(n as f64)
    }
}

impl From<&str> for CvuValue {
    fn from(s: &str) -> Self {
        CvuValue::String(s.to_string())
    }
}

impl From<String> for CvuValue {
    fn from(s: String) -> Self {
        CvuValue::String(s)
    }
}

impl From<Vec<CvuValue>> for CvuValue {
    fn from(items: Vec<CvuValue>) -> Self {
        CvuValue::Array(items)
    }
}

impl From<PropertyDict> for CvuValue {
    fn from(dict: PropertyDict) -> Self {
        CvuValue::Dictionary(dict)
    }
}
