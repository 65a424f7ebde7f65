//! CVU Test Utilities
//!
//! Centralized test infrastructure for the CVU workspace:
//! - Proptest generators for values, elements and selectors
//! - A recording expression host
//! - CVU source fixtures for the defaults and user domains
//! - Custom assertions for parse positions, round-trips and merge errors

// Re-export the types tests reach for most
pub use cvu_core::{
    ActionKind, CvuError, CvuResult, Domain, ExpressionError, LexError, MergeError, ParseError,
    SerializationError, UIElementKind,
};
pub use cvu_dsl::{
    default_grammar, parse, parse_with, serialize, Action, Color, CvuValue, DefaultHost, EvalContext, EvalMode,
    Expression, ExpressionHost, GrammarConfig, ItemRef, LookupPath, PropertyDict, SelectorKind, UIElement,
    ViewArguments, ViewSelector, ViewTarget,
};

use std::sync::{Mutex, PoisonError};

// ============================================================================
// MOCK HOST
// ============================================================================

/// Expression host that records every lookup and call before delegating to
/// a [`DefaultHost`] with the builtin functions.
#[derive(Debug)]
pub struct RecordingHost {
    inner: DefaultHost,
    lookups: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::with_host(DefaultHost::with_builtins())
    }

    pub fn with_host(inner: DefaultHost) -> Self {
        Self {
            inner,
            lookups: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Paths looked up so far, as `.x` / `x` text.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Function names called so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionHost for RecordingHost {
    fn lookup(&self, path: &LookupPath, context: &EvalContext<'_>) -> Result<CvuValue, ExpressionError> {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.display());
        self.inner.lookup(path, context)
    }

    fn exec(&self, name: &str, args: &[CvuValue], context: &EvalContext<'_>) -> Result<CvuValue, ExpressionError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.to_string());
        self.inner.exec(name, args, context)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies producing trees the serializer can write and the
    //! parser reads back unchanged.

    use super::*;
    use cvu_dsl::{CHILDREN_KEY, RENDER_DEFINITIONS_KEY};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    /// Keys the parser folds or moves around.
    pub const RESERVED_KEYS: [&str; 13] = [
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

    const LEAF_ELEMENTS: [UIElementKind; 4] = [
        UIElementKind::Text,
        UIElementKind::Spacer,
        UIElementKind::Image,
        UIElementKind::Divider,
    ];

    const CONTAINER_ELEMENTS: [UIElementKind; 3] = [UIElementKind::VStack, UIElementKind::HStack, UIElementKind::ZStack];

    const ACTIONS: [ActionKind; 4] = [
        ActionKind::Back,
        ActionKind::OpenViewByName,
        ActionKind::Star,
        ActionKind::ToggleEditMode,
    ];

    pub fn arb_key() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9_]{0,8}".prop_filter("reserved or keyword", |k| {
            !RESERVED_KEYS.contains(&k.as_str()) && default_grammar().keyword(k).is_none()
        })
    }

    pub fn arb_type_name() -> impl Strategy<Value = String> {
        "[A-Z][a-zA-Z]{0,8}".prop_filter("keyword", |k| default_grammar().keyword(k).is_none())
    }

    pub fn arb_renderer_name() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["list", "grid", "map", "generalEditor", "timeline"]).prop_map(str::to_string)
    }

    pub fn arb_color() -> impl Strategy<Value = Color> {
        prop_oneof!["[0-9a-f]{3}", "[0-9a-f]{6}", "[0-9a-f]{8}"].prop_filter_map("valid hex", |hex| Color::from_hex(&hex))
    }

    pub fn arb_expression() -> impl Strategy<Value = Expression> {
        prop_oneof![
            prop::sample::select(vec![
                ".title",
                "!.starred AND .archived",
                ".title OR \"Untitled\"",
                "count(.items) = 3",
                "dataItem.owner.name != \"me\"",
            ])
            .prop_filter_map("compiles", |src| Expression::compile(src).ok()),
            prop::sample::select(vec!["Hi {.name}", "{.a} of {.b}", "{count(.items)} items"])
                .prop_filter_map("compiles", |src| Expression::compile_template(src).ok()),
        ]
    }

    /// Scalar values, expressions and `nil`.
    pub fn arb_leaf() -> impl Strategy<Value = CvuValue> {
        prop_oneof![
            Just(CvuValue::Nil),
            any::<bool>().prop_map(CvuValue::Bool),
            (-1.0e6f64..1.0e6f64).prop_map(CvuValue::Number),
            (-1000i64..1000).prop_map(CvuValue::from),
            "[ -~]{0,12}".prop_map(CvuValue::String),
            arb_color().prop_map(CvuValue::Color),
            arb_expression().prop_map(CvuValue::Expression),
        ]
    }

    pub fn arb_leaf_dict() -> impl Strategy<Value = PropertyDict> {
        prop::collection::btree_map(arb_key(), arb_leaf(), 0..4)
    }

    pub fn arb_action() -> impl Strategy<Value = Action> {
        (
            prop::sample::select(ACTIONS.to_vec()),
            prop::collection::vec(arb_leaf(), 0..2),
            arb_leaf_dict(),
        )
            .prop_map(|(kind, arguments, options)| Action {
                kind,
                arguments,
                options,
            })
    }

    /// Element trees up to three levels deep.
    pub fn arb_element() -> impl Strategy<Value = UIElement> {
        let leaf = (prop::sample::select(LEAF_ELEMENTS.to_vec()), arb_leaf_dict()).prop_map(|(kind, properties)| {
            UIElement {
                kind,
                properties,
                children: vec![],
            }
        });

        leaf.prop_recursive(3, 16, 3, |inner| {
            (
                prop::sample::select(CONTAINER_ELEMENTS.to_vec()),
                arb_leaf_dict(),
                prop::collection::vec(inner, 0..3),
            )
                .prop_map(|(kind, properties, children)| UIElement {
                    kind,
                    properties,
                    children,
                })
        })
    }

    pub fn arb_value() -> impl Strategy<Value = CvuValue> {
        prop_oneof![
            4 => arb_leaf(),
            1 => prop::collection::vec(arb_leaf(), 0..4).prop_map(CvuValue::Array),
            1 => arb_leaf_dict().prop_map(CvuValue::Dictionary),
            1 => arb_action().prop_map(CvuValue::Action),
            1 => arb_element().prop_map(CvuValue::Element),
        ]
    }

    /// Selector kinds valid at the top level of the default grammar.
    pub fn arb_selector_kind() -> impl Strategy<Value = (SelectorKind, Option<String>)> {
        prop_oneof![
            3 => (prop_oneof![arb_type_name(), Just("*".to_string())], any::<bool>())
                .prop_map(|(type_name, list)| (SelectorKind::View(ViewTarget::Type { type_name, list }), None)),
            1 => "[ -~]{1,12}".prop_map(|name| (SelectorKind::View(ViewTarget::Named), Some(name))),
            1 => arb_renderer_name().prop_map(|name| (SelectorKind::Renderer, Some(name))),
            1 => arb_key().prop_map(|name| (SelectorKind::Style, Some(name))),
        ]
    }

    pub fn arb_selector() -> impl Strategy<Value = ViewSelector> {
        (
            arb_selector_kind(),
            prop::collection::btree_map(arb_key(), arb_value(), 0..5),
            prop::collection::vec(arb_element(), 0..3),
            prop::collection::vec((arb_renderer_name(), arb_leaf_dict()), 0..2),
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

    pub fn arb_selectors() -> impl Strategy<Value = Vec<ViewSelector>> {
        prop::collection::vec(arb_selector(), 1..4)
    }

    /// Numeric properties for cascade tests, drawn from a small key space so
    /// layers overlap.
    pub fn arb_numeric_layer() -> impl Strategy<Value = BTreeMap<String, i64>> {
        prop::collection::btree_map("[a-e]{1,2}", -100i64..100, 0..6)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! CVU sources and values for common scenarios.

    use super::*;
    use std::collections::BTreeMap;

    /// System definitions, parsed into the defaults domain.
    pub const DEFAULT_DEFINITIONS: &str = r#"/* System defaults */
* {
    editable: true
}

*[] {
    defaultRenderer: "list"
}

[renderer = "list"] {
    spacing: 10
    edgeInset: [5, 10]
}

[renderer = "grid"] {
    columns: 3
    spacing: 5
}

[renderer = "generalEditor"] {
    groups: { other: "Other" }
}

Note {
    title: {{.title OR "Untitled"}}
    editActionButton: toggleEditMode

    VStack {
        Text {
            text: {{.title}}
            font: 18
        }
        Text { text: {{.content}} }
    }
}

Note[] {
    query: "Note"
    title: "All Notes"

    [renderer = "list"] {
        VStack {
            Text { text: {{.title}} }
        }
    }
}

Person {
    title: "{.firstName} {.lastName}"
}

Person[] {
    query: "Person"
    defaultRenderer: "grid"
}

.allNotes {
    title: "All Notes"
    query: "Note"
    sortProperty: "dateModified"
}
"#;

    /// User customizations, parsed into the user domain.
    pub const USER_OVERRIDES: &str = r#"Note[] {
    title: "My Notes"

    [renderer = "list"] {
        spacing: 4
    }
}

[renderer = "grid"] {
    columns: 4
}

Note {
    Button { press: star }
}
"#;

    /// An active session view that switches to the grid renderer.
    pub const SESSION_VIEW: &str = r#"[session] {
    defaultRenderer: "grid"
    title: "Pinned"

    [renderer = "grid"] {
        columns: 2
    }
}
"#;

    pub fn default_selectors() -> Result<Vec<ViewSelector>, ParseError> {
        parse_with(DEFAULT_DEFINITIONS, default_grammar(), Domain::Defaults)
    }

    pub fn user_selectors() -> Result<Vec<ViewSelector>, ParseError> {
        parse_with(USER_OVERRIDES, default_grammar(), Domain::User)
    }

    /// Grammar with `[session]` and `[sessions]` enabled.
    pub fn session_grammar() -> GrammarConfig {
        default_grammar().clone().with_session_definitions()
    }

    pub fn session_view() -> Result<ViewSelector, ParseError> {
        let mut parsed = parse_with(SESSION_VIEW, &session_grammar(), Domain::User)?;
        Ok(parsed.remove(0))
    }

    /// `Note { k: v ... }` style source for a numeric layer.
    pub fn numeric_source(selector: &str, properties: &BTreeMap<String, i64>) -> String {
        let body: Vec<String> = properties.iter().map(|(k, v)| format!("    {}: {}", k, v)).collect();
        format!("{} {{\n{}\n}}\n", selector, body.join("\n"))
    }

    pub fn note_item() -> ItemRef {
        ItemRef::new("Note")
            .with_uid(42)
            .with_property("title", "Groceries")
            .with_property("content", "Milk, eggs")
            .with_property("starred", true)
    }

    pub fn person_item() -> ItemRef {
        ItemRef::new("Person")
            .with_uid(7)
            .with_property("firstName", "Ada")
            .with_property("lastName", "Lovelace")
    }

    pub fn view_arguments() -> ViewArguments {
        ViewArguments::new().with("readOnly", true).with("searchText", "milk")
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for CVU-specific validation.

    use super::*;
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use std::fmt::Debug;

    /// Assert that a parse failed at the given position.
    #[track_caller]
    pub fn assert_parse_error_at<T: Debug>(result: &Result<T, ParseError>, line: usize, column: usize) {
        match result {
            Err(err) => assert_eq!(
                (err.line(), err.column()),
                (line, column),
                "Wrong position for error: {}",
                err
            ),
            Ok(value) => panic!("Expected parse error at {}:{}, got: {:?}", line, column, value),
        }
    }

    /// Assert that a lex failure surfaced through the parser.
    #[track_caller]
    pub fn assert_lex_error<T: Debug>(result: &Result<T, ParseError>) {
        match result {
            Err(ParseError::Lex(_)) => {}
            other => panic!("Expected Lex error, got: {:?}", other),
        }
    }

    /// Assert that `source` parses, and that its canonical text parses back
    /// to an equal tree and re-serializes to the same text.
    #[track_caller]
    pub fn assert_round_trip(source: &str) -> String {
        let parsed = match parse(source) {
            Ok(parsed) => parsed,
            Err(err) => panic!("Source does not parse: {}\n{}", err, source),
        };
        let printed = match serialize(&parsed) {
            Ok(printed) => printed,
            Err(err) => panic!("Parsed tree does not serialize: {}", err),
        };
        let reparsed = match parse(&printed) {
            Ok(reparsed) => reparsed,
            Err(err) => panic!("Canonical text does not parse: {}\n{}", err, printed),
        };
        assert_eq!(parsed, reparsed, "Round trip changed the tree:\n{}", printed);
        assert_eq!(
            serialize(&reparsed).ok().as_deref(),
            Some(printed.as_str()),
            "Canonical text is not stable"
        );
        printed
    }

    /// Assert that a value survives a JSON round trip unchanged.
    #[track_caller]
    pub fn assert_json_round_trip<T: Serialize + DeserializeOwned + PartialEq + Debug>(value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(err) => panic!("Value does not serialize to JSON: {}", err),
        };
        match serde_json::from_str::<T>(&json) {
            Ok(back) => assert_eq!(&back, value, "JSON round trip changed the value"),
            Err(err) => panic!("JSON does not deserialize: {}\n{}", err, json),
        }
    }

    /// Assert that a resolution failed for a missing field.
    #[track_caller]
    pub fn assert_missing_field<T: Debug>(result: &Result<T, MergeError>, field: &str) {
        match result {
            Err(MergeError::MissingField { field: f, .. }) => {
                assert_eq!(f, field, "Wrong field in MissingField error");
            }
            other => panic!("Expected MissingField({}), got: {:?}", field, other),
        }
    }

    /// Assert the kinds of a list of elements, in order.
    #[track_caller]
    pub fn assert_element_kinds(elements: &[&UIElement], expected: &[UIElementKind]) {
        let kinds: Vec<UIElementKind> = elements.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, expected, "Unexpected element kinds");
    }
}

// ============================================================================
// TESTS
// ============================================================================
