//! Canonical serializer for CVU definitions
//!
//! Output is deterministic: keys are alphabetical, compound layout
//! properties (`frame`, `cornerborder`) are written back as their individual
//! keys, and child elements and nested definitions are emitted as trailing
//! sections. Parsing the output yields a structurally equal tree.

use crate::grammar::default_grammar;
use crate::parser::*;
use crate::value::{CvuValue, PropertyDict};
use cvu_core::{CvuResult, SerializationError};

const INDENT: &str = "    ";

/// Serialize selectors, separated by blank lines.
pub fn serialize(selectors: &[ViewSelector]) -> Result<String, SerializationError> {
    let mut out = String::new();
    for (i, selector) in selectors.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&write_selector(selector, 0)?);
        out.push('\n');
    }
    Ok(out)
}

pub fn serialize_selector(selector: &ViewSelector) -> Result<String, SerializationError> {
    write_selector(selector, 0)
}

pub fn serialize_element(element: &UIElement) -> Result<String, SerializationError> {
    write_element(element, 0)
}

/// Serialize a single value as it would appear after `key:`.
pub fn serialize_value(key: &str, value: &CvuValue) -> Result<String, SerializationError> {
    write_value(key, value, 0)
}

/// Parse and re-serialize CVU source.
pub fn round_trip(source: &str) -> CvuResult<String> {
    let selectors = parse(source)?;
    Ok(serialize(&selectors)?)
}

/// True if `key` lexes back as a single non-keyword identifier.
pub fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
        && (key.contains('.') || default_grammar().keyword(key).is_none())
}

fn indent(depth: usize) -> String {
    INDENT.repeat(depth)
}

fn write_selector(selector: &ViewSelector, depth: usize) -> Result<String, SerializationError> {
    if let Some(type_name) = selector.type_name() {
        if type_name != "*" && !is_valid_key(type_name) {
            return Err(SerializationError::InvalidKey {
                key: type_name.to_string(),
            });
        }
    }
    let pattern = selector_pattern(&selector.kind, selector.name.as_deref());
    let body = write_block(&selector.properties, &[], depth, true)?;
    Ok(format!("{} {}", pattern, body))
}

fn write_element(element: &UIElement, depth: usize) -> Result<String, SerializationError> {
    let body = write_block(&element.properties, &element.children, depth, false)?;
    Ok(format!("{} {}", element.kind.as_str(), body))
}

/// Entries rendered as `key: value`, plus trailing child/definition blocks.
struct BlockParts {
    entries: Vec<String>,
    trailing: Vec<String>,
}

fn write_block(
    properties: &PropertyDict,
    children: &[UIElement],
    depth: usize,
    force_multiline: bool,
) -> Result<String, SerializationError> {
    let parts = block_parts(properties, children, depth)?;

    if parts.entries.is_empty() && parts.trailing.is_empty() {
        return Ok("{}".to_string());
    }

    let inline = !force_multiline && parts.trailing.is_empty() && parts.entries.iter().all(|e| !e.contains('\n'));
    if inline {
        return Ok(format!("{{ {} }}", parts.entries.join(", ")));
    }

    let inner = indent(depth + 1);
    let mut out = String::from("{\n");
    for entry in &parts.entries {
        out.push_str(&inner);
        out.push_str(entry);
        out.push('\n');
    }
    if !parts.entries.is_empty() && !parts.trailing.is_empty() {
        out.push('\n');
    }
    for block in &parts.trailing {
        out.push_str(&inner);
        out.push_str(block);
        out.push('\n');
    }
    out.push_str(&indent(depth));
    out.push('}');
    Ok(out)
}

fn block_parts(properties: &PropertyDict, children: &[UIElement], depth: usize) -> Result<BlockParts, SerializationError> {
    let mut entries: Vec<(&str, &CvuValue)> = Vec::new();
    let mut trailing_children: Vec<&UIElement> = children.iter().collect();
    let mut trailing_definitions: Vec<&ViewSelector> = Vec::new();

    for (key, value) in properties {
        match (key.as_str(), value) {
            ("frame", CvuValue::Array(parts)) if parts.len() == FRAME_KEYS.len() && parts.iter().any(|p| !p.is_nil()) => {
                for (name, part) in FRAME_KEYS.iter().zip(parts) {
                    if !part.is_nil() {
                        entries.push((*name, part));
                    }
                }
            }
            ("cornerborder", CvuValue::Array(parts)) if parts.len() == 2 => {
                entries.push(("border", &parts[0]));
                entries.push(("cornerRadius", &parts[1]));
            }
            (CHILDREN_KEY, CvuValue::Array(items)) if !items.is_empty() && items.iter().all(|v| matches!(v, CvuValue::Element(_))) => {
                trailing_children.extend(items.iter().filter_map(|v| match v {
                    CvuValue::Element(element) => Some(element),
                    _ => None,
                }));
            }
            (RENDER_DEFINITIONS_KEY | SESSION_DEFINITIONS_KEY, CvuValue::Array(items)) if !items.is_empty() => {
                let expected = if key == RENDER_DEFINITIONS_KEY {
                    SelectorKind::Renderer
                } else {
                    SelectorKind::Session
                };
                for item in items {
                    match item {
                        CvuValue::Definition(definition) if definition.kind == expected => {
                            trailing_definitions.push(definition.as_ref())
                        }
                        other => {
                            return Err(SerializationError::Unrepresentable {
                                key: key.clone(),
                                reason: format!("{} entry in a definition list", other.type_name()),
                            })
                        }
                    }
                }
            }
            _ => entries.push((key.as_str(), value)),
        }
    }

    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut rendered = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        if !is_valid_key(key) {
            return Err(SerializationError::InvalidKey { key: key.to_string() });
        }
        rendered.push(format!("{}: {}", key, write_value(key, value, depth + 1)?));
    }

    let mut trailing = Vec::new();
    for child in trailing_children {
        trailing.push(write_element(child, depth + 1)?);
    }
    for definition in trailing_definitions {
        trailing.push(write_selector(definition, depth + 1)?);
    }

    Ok(BlockParts {
        entries: rendered,
        trailing,
    })
}

fn write_value(key: &str, value: &CvuValue, depth: usize) -> Result<String, SerializationError> {
    match value {
        CvuValue::Nil => Ok("nil".to_string()),
        CvuValue::Bool(b) => Ok(b.to_string()),
        CvuValue::Number(n) if n.is_finite() => Ok(n.to_string()),
        CvuValue::Number(_) => Err(SerializationError::NonFiniteNumber { key: key.to_string() }),
        CvuValue::String(s) => Ok(format!("\"{}\"", escape_string(s))),
        CvuValue::Color(color) => Ok(color.to_string()),
        CvuValue::Array(items) => write_array(key, items, depth),
        CvuValue::Dictionary(dict) => write_block(dict, &[], depth, false),
        CvuValue::Expression(expr) if expr.template => {
            let quote = if has_unescaped(&expr.source, '"') { '\'' } else { '"' };
            Ok(format!("{}{}{}", quote, expr.source, quote))
        }
        CvuValue::Expression(expr) => Ok(format!("{{{{ {} }}}}", expr.source)),
        CvuValue::Action(action) => {
            if action.arguments.is_empty() && action.options.is_empty() {
                return Ok(action.kind.as_str().to_string());
            }
            let mut options = action.options.clone();
            if !action.arguments.is_empty() {
                options.insert("arguments".to_string(), CvuValue::Array(action.arguments.clone()));
            }
            Ok(format!("{} {}", action.kind.as_str(), write_block(&options, &[], depth, false)?))
        }
        CvuValue::Element(element) => write_element(element, depth),
        CvuValue::Definition(_) => Err(SerializationError::Unrepresentable {
            key: key.to_string(),
            reason: "definitions are only written inside renderDefinitions or sessionDefinitions".to_string(),
        }),
    }
}

fn write_array(key: &str, items: &[CvuValue], depth: usize) -> Result<String, SerializationError> {
    if items.is_empty() {
        return Ok("[]".to_string());
    }

    let rendered = items
        .iter()
        .map(|item| write_value(key, item, depth + 1))
        .collect::<Result<Vec<_>, _>>()?;

    if rendered.iter().all(|r| !r.contains('\n')) {
        return Ok(format!("[{}]", rendered.join(", ")));
    }

    let inner = indent(depth + 1);
    let mut out = String::from("[\n");
    for (i, item) in rendered.iter().enumerate() {
        out.push_str(&inner);
        out.push_str(item);
        if i + 1 < rendered.len() {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str(&indent(depth));
    out.push(']');
    Ok(out)
}

fn has_unescaped(raw: &str, quote: char) -> bool {
    let mut escaped = false;
    for c in raw.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return true;
        }
    }
    false
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::expression::Expression;
    use cvu_core::{ActionKind, Domain, UIElementKind};
    use proptest::prelude::*;

    const RESERVED: [&str; 13] = [
        "minWidth",
        "maxWidth",
        "minHeight",
        "maxHeight",
        "align",
        "frame",
        "border",
        "cornerRadius",
        "cornerborder",
        "children",
        "renderDefinitions",
        "sessionDefinitions",
        "arguments",
    ];

    fn arb_key() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9_]{0,8}".prop_filter("reserved or keyword", |k| {
            !RESERVED.contains(&k.as_str()) && default_grammar().keyword(k).is_none()
        })
    }

    fn arb_type_name() -> impl Strategy<Value = String> {
        "[A-Z][a-zA-Z]{0,8}".prop_filter("keyword", |k| default_grammar().keyword(k).is_none())
    }

    fn arb_leaf() -> impl Strategy<Value = CvuValue> {
        prop_oneof![
            Just(CvuValue::Nil),
            any::<bool>().prop_map(CvuValue::Bool),
            (-1.0e6f64..1.0e6f64).prop_map(CvuValue::Number),
            "[ -~]{0,12}".prop_map(CvuValue::String),
            "[0-9a-f]{6}".prop_map(|hex| CvuValue::Color(crate::value::Color::from_hex(&hex).unwrap())),
            prop::sample::select(vec![".title", "!.starred AND .a", "count(.items) = 3"])
                .prop_map(|src| CvuValue::Expression(Expression::compile(src).unwrap())),
            prop::sample::select(vec!["Hi {.name}", "{.a} of {.b}"])
                .prop_map(|src| CvuValue::Expression(Expression::compile_template(src).unwrap())),
        ]
    }

    fn arb_leaf_dict() -> impl Strategy<Value = PropertyDict> {
        prop::collection::btree_map(arb_key(), arb_leaf(), 0..4)
    }

    fn arb_action() -> impl Strategy<Value = Action> {
        (
            prop::sample::select(vec![ActionKind::Back, ActionKind::OpenViewByName, ActionKind::Star]),
            prop::collection::vec(arb_leaf(), 0..2),
            arb_leaf_dict(),
        )
            .prop_map(|(kind, arguments, options)| Action {
                kind,
                arguments,
                options,
            })
    }

    fn arb_element() -> impl Strategy<Value = UIElement> {
        let leaf_element = (
            prop::sample::select(vec![UIElementKind::Text, UIElementKind::Spacer, UIElementKind::Image]),
            arb_leaf_dict(),
        )
            .prop_map(|(kind, properties)| UIElement {
                kind,
                properties,
                children: vec![],
            });
        (
            prop::sample::select(vec![UIElementKind::VStack, UIElementKind::HStack]),
            arb_leaf_dict(),
            prop::collection::vec(leaf_element, 0..3),
        )
            .prop_map(|(kind, properties, children)| UIElement {
                kind,
                properties,
                children,
            })
    }

    fn arb_value() -> impl Strategy<Value = CvuValue> {
        prop_oneof![
            4 => arb_leaf(),
            1 => prop::collection::vec(arb_leaf(), 0..4).prop_map(CvuValue::Array),
            1 => arb_leaf_dict().prop_map(CvuValue::Dictionary),
            1 => arb_action().prop_map(CvuValue::Action),
            1 => arb_element().prop_map(CvuValue::Element),
        ]
    }

    fn arb_kind() -> impl Strategy<Value = (SelectorKind, Option<String>)> {
        prop_oneof![
            (arb_type_name(), any::<bool>())
                .prop_map(|(type_name, list)| (SelectorKind::View(ViewTarget::Type { type_name, list }), None)),
            "[ -~]{1,12}".prop_map(|name| (SelectorKind::View(ViewTarget::Named), Some(name))),
            arb_key().prop_map(|name| (SelectorKind::Renderer, Some(name))),
            arb_key().prop_map(|name| (SelectorKind::Style, Some(name))),
        ]
    }

    fn arb_selector() -> impl Strategy<Value = ViewSelector> {
        (
            arb_kind(),
            prop::collection::btree_map(arb_key(), arb_value(), 0..5),
            prop::collection::vec(arb_element(), 0..2),
            prop::collection::vec((arb_key(), arb_leaf_dict()), 0..2),
        )
            .prop_map(|((kind, name), mut properties, children, renderers)| {
                if !children.is_empty() {
                    properties.insert(
                        CHILDREN_KEY.to_string(),
                        CvuValue::Array(children.into_iter().map(CvuValue::Element).collect()),
                    );
                }
                if !renderers.is_empty() {
                    let definitions = renderers
                        .into_iter()
                        .map(|(name, props)| {
                            CvuValue::Definition(Box::new(
                                ViewSelector::new(SelectorKind::Renderer, Some(name), Domain::Defaults)
                                    .with_properties(props),
                            ))
                        })
                        .collect();
                    properties.insert(RENDER_DEFINITIONS_KEY.to_string(), CvuValue::Array(definitions));
                }
                ViewSelector::new(kind, name, Domain::Defaults).with_properties(properties)
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Serializing then parsing yields a structurally equal tree.
        #[test]
        fn prop_round_trip_preserves_structure(selectors in prop::collection::vec(arb_selector(), 1..4)) {
            let printed = serialize(&selectors).unwrap();
            match parse(&printed) {
                Ok(parsed) => {
                    prop_assert_eq!(selectors, parsed, "printed:\n{}", printed);
                }
                Err(err) => {
                    prop_assert!(false, "failed to parse {:?}\nprinted:\n{}", err, printed);
                }
            }
        }

        /// Serialization is idempotent through a parse.
        #[test]
        fn prop_serialize_is_stable(selectors in prop::collection::vec(arb_selector(), 1..3)) {
            let first = serialize(&selectors).unwrap();
            let second = serialize(&parse(&first).unwrap()).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
