//! Property dictionary parsing and compound-property folding

use super::ast::*;
use super::parser::Parser;
use crate::lexer::{Span, TokenKind};
use crate::value::{CvuValue, PropertyDict};
use cvu_core::ParseError;

/// Keys folded into `frame`, in array order.
pub const FRAME_KEYS: [&str; 5] = ["minWidth", "maxWidth", "minHeight", "maxHeight", "align"];

/// Keys folded into `cornerborder` as `[border, cornerRadius]`.
pub const CORNER_BORDER_KEYS: [&str; 2] = ["border", "cornerRadius"];

/// Key receiving UI elements declared without a property name.
pub const CHILDREN_KEY: &str = "children";
pub const RENDER_DEFINITIONS_KEY: &str = "renderDefinitions";
pub const SESSION_DEFINITIONS_KEY: &str = "sessionDefinitions";

/// Accumulates key/value pairs while scanning a `{ ... }` body.
#[derive(Default)]
struct DictBuilder {
    properties: PropertyDict,
    key: Option<(String, Span)>,
    values: Vec<CvuValue>,
}

impl DictBuilder {
    /// Store the pending key. Several values become an array.
    fn flush(&mut self) {
        if let Some((key, _)) = self.key.take() {
            let value = if self.values.len() == 1 {
                self.values.pop().unwrap_or(CvuValue::Nil)
            } else {
                CvuValue::Array(std::mem::take(&mut self.values))
            };
            self.values.clear();
            self.properties.insert(key, value);
        }
    }

    fn append(&mut self, key: &str, value: CvuValue) {
        let slot = self
            .properties
            .entry(key.to_string())
            .or_insert_with(|| CvuValue::Array(Vec::new()));
        match slot {
            CvuValue::Array(items) => items.push(value),
            other => {
                let previous = std::mem::replace(other, CvuValue::Nil);
                *other = CvuValue::Array(vec![previous, value]);
            }
        }
    }
}

impl Parser<'_> {
    /// Parse dictionary entries up to and including the closing `}`.
    /// The opening `{` is already consumed.
    pub(crate) fn parse_dict(&mut self) -> Result<PropertyDict, ParseError> {
        let mut dict = DictBuilder::default();

        loop {
            let token = self.current().clone();
            match token.kind {
                TokenKind::RBrace => {
                    if let Some((key, span)) = &dict.key {
                        if dict.values.is_empty() {
                            return Err(ParseError::UnexpectedToken {
                                expected: format!("value for '{}'", key),
                                found: token.kind.describe(),
                                line: span.line,
                                column: span.column,
                            });
                        }
                    }
                    dict.flush();
                    self.advance();
                    break;
                }
                TokenKind::Eof => return Err(self.unexpected("'}'")),
                TokenKind::Newline | TokenKind::SemiColon => {
                    if !dict.values.is_empty() {
                        dict.flush();
                    }
                    self.advance();
                }
                TokenKind::Comma => self.advance(),
                TokenKind::Identifier(name) => self.parse_dict_identifier(&mut dict, name, token.span)?,
                TokenKind::LBracket if dict.key.is_none() || !dict.values.is_empty() => {
                    dict.flush();
                    let definition = self.parse_nested_definition()?;
                    let key = match definition.kind {
                        SelectorKind::Session => SESSION_DEFINITIONS_KEY,
                        _ => RENDER_DEFINITIONS_KEY,
                    };
                    dict.append(key, CvuValue::Definition(Box::new(definition)));
                }
                _ if dict.key.is_some() => {
                    let value = self.parse_value()?;
                    dict.values.push(value);
                }
                _ => return Err(self.unexpected("property name")),
            }
        }

        let mut properties = dict.properties;
        fold_compound_properties(&mut properties);
        Ok(properties)
    }

    fn parse_dict_identifier(&mut self, dict: &mut DictBuilder, name: String, span: Span) -> Result<(), ParseError> {
        let starts_key = self.peek_kind(1) == Some(&TokenKind::Colon);
        let starts_block = self.peek_kind(1) == Some(&TokenKind::LBrace) && self.grammar.action(&name).is_none();

        // A new entry on the same line as the previous value
        if (starts_key || starts_block) && dict.key.is_some() && !dict.values.is_empty() {
            dict.flush();
        }

        if dict.key.is_some() {
            let value = self.parse_value()?;
            dict.values.push(value);
            return Ok(());
        }

        if starts_key {
            self.advance();
            self.advance();
            dict.key = Some((name, span));
            return Ok(());
        }

        if let Some(kind) = self.grammar.ui_element(&name) {
            let child = self.parse_ui_element(kind)?;
            dict.append(CHILDREN_KEY, CvuValue::Element(child));
            return Ok(());
        }

        // `style { ... }`: a key whose colon is omitted before a dictionary
        self.advance();
        if !self.check(&TokenKind::LBrace) {
            return Err(self.unexpected("':'"));
        }
        dict.key = Some((name, span));
        Ok(())
    }

    /// `[renderer = name] { ... }` or `[session ...] { ... }` inside a body.
    fn parse_nested_definition(&mut self) -> Result<ViewSelector, ParseError> {
        let span = self.current().span;
        let (kind, name) = self.parse_bracket_selector()?;
        if !matches!(kind, SelectorKind::Renderer | SelectorKind::Session) {
            return Err(ParseError::NestedDefinition {
                kind: kind.bracket_kind().map(|k| k.as_str()).unwrap_or_default().to_string(),
                line: span.line,
                column: span.column,
            });
        }
        let properties = self.parse_block()?;
        Ok(ViewSelector::new(kind, name, self.domain).with_properties(properties))
    }
}

/// Fold layout keys into their compound forms.
///
/// Any of [`FRAME_KEYS`] produces a five-element `frame` with `nil` for the
/// missing entries. `cornerborder` is produced only when both `border` and
/// `cornerRadius` are present.
pub fn fold_compound_properties(properties: &mut PropertyDict) {
    if FRAME_KEYS.iter().any(|k| properties.contains_key(*k)) {
        let frame = FRAME_KEYS
            .iter()
            .map(|k| properties.remove(*k).unwrap_or(CvuValue::Nil))
            .collect();
        properties.insert("frame".to_string(), CvuValue::Array(frame));
    }

    if CORNER_BORDER_KEYS.iter().all(|k| properties.contains_key(*k)) {
        let parts = CORNER_BORDER_KEYS
            .iter()
            .filter_map(|k| properties.remove(*k))
            .collect();
        properties.insert("cornerborder".to_string(), CvuValue::Array(parts));
    }
}

/// Split `frame` and `cornerborder` back into their layout keys, the
/// inverse of [`fold_compound_properties`]. Nil frame slots are dropped.
pub fn unfold_compound_properties(properties: &mut PropertyDict) {
    if let Some(CvuValue::Array(parts)) = properties.get("frame") {
        if parts.len() == FRAME_KEYS.len() {
            if let Some(CvuValue::Array(parts)) = properties.remove("frame") {
                for (key, part) in FRAME_KEYS.iter().zip(parts) {
                    if !part.is_nil() {
                        properties.insert(key.to_string(), part);
                    }
                }
            }
        }
    }

    if let Some(CvuValue::Array(parts)) = properties.get("cornerborder") {
        if parts.len() == CORNER_BORDER_KEYS.len() {
            if let Some(CvuValue::Array(parts)) = properties.remove("cornerborder") {
                for (key, part) in CORNER_BORDER_KEYS.iter().zip(parts) {
                    properties.insert(key.to_string(), part);
                }
            }
        }
    }
}
