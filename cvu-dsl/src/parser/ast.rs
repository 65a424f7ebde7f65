//! Abstract Syntax Tree types

use crate::grammar::BracketKind;
use crate::value::{CvuValue, PropertyDict};
use cvu_core::{ActionKind, Domain, UIElementKind};
use serde::{Deserialize, Serialize};

// ============================================================================
// SELECTORS
// ============================================================================

/// What a view definition's primary selector targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewTarget {
    /// `Note`, `Note[]`, `*` or `*[]`
    Type { type_name: String, list: bool },
    /// `.allNotes` or `"All Notes"`; the name lives on the selector
    Named,
}

/// Kind of a top-level or nested selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorKind {
    View(ViewTarget),
    Style,
    Color,
    Renderer,
    Language,
    Session,
    Sessions,
}

impl SelectorKind {
    pub fn bracket_kind(&self) -> Option<BracketKind> {
        match self {
            SelectorKind::View(_) => None,
            SelectorKind::Style => Some(BracketKind::Style),
            SelectorKind::Color => Some(BracketKind::Color),
            SelectorKind::Renderer => Some(BracketKind::Renderer),
            SelectorKind::Language => Some(BracketKind::Language),
            SelectorKind::Session => Some(BracketKind::Session),
            SelectorKind::Sessions => Some(BracketKind::Sessions),
        }
    }

    pub fn from_bracket(kind: BracketKind) -> Self {
        match kind {
            BracketKind::Style => SelectorKind::Style,
            BracketKind::Color => SelectorKind::Color,
            BracketKind::Renderer => SelectorKind::Renderer,
            BracketKind::Language => SelectorKind::Language,
            BracketKind::Session => SelectorKind::Session,
            BracketKind::Sessions => SelectorKind::Sessions,
        }
    }
}

/// A parsed selector with its property dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSelector {
    pub kind: SelectorKind,
    /// Named view or bracket definition name
    pub name: Option<String>,
    /// Canonical selector text, e.g. `Note[]` or `[renderer = "list"]`
    pub selector: String,
    pub domain: Domain,
    pub properties: PropertyDict,
}

impl ViewSelector {
    pub fn new(kind: SelectorKind, name: Option<String>, domain: Domain) -> Self {
        let selector = selector_pattern(&kind, name.as_deref());
        Self {
            kind,
            name,
            selector,
            domain,
            properties: PropertyDict::new(),
        }
    }

    pub fn with_properties(mut self, properties: PropertyDict) -> Self {
        self.properties = properties;
        self
    }

    pub fn get(&self, key: &str) -> Option<&CvuValue> {
        self.properties.get(key)
    }

    /// Item type for type selectors (`*` for wildcards).
    pub fn type_name(&self) -> Option<&str> {
        match &self.kind {
            SelectorKind::View(ViewTarget::Type { type_name, .. }) => Some(type_name),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self.kind,
            SelectorKind::View(ViewTarget::Type { list: true, .. })
        )
    }

    pub fn is_wildcard(&self) -> bool {
        self.type_name() == Some("*")
    }

    pub fn is_named_view(&self) -> bool {
        matches!(self.kind, SelectorKind::View(ViewTarget::Named))
    }

    pub fn query(&self) -> Option<&str> {
        self.properties.get("query").and_then(CvuValue::as_str)
    }
}

/// Canonical selector text for a kind and optional name.
pub fn selector_pattern(kind: &SelectorKind, name: Option<&str>) -> String {
    match (kind, name) {
        (SelectorKind::View(ViewTarget::Type { type_name, list }), _) => {
            if *list {
                format!("{}[]", type_name)
            } else {
                type_name.clone()
            }
        }
        (SelectorKind::View(ViewTarget::Named), Some(name)) if is_plain_name(name) => {
            format!(".{}", name)
        }
        (SelectorKind::View(ViewTarget::Named), name) => {
            format!("\"{}\"", escape_string(name.unwrap_or_default()))
        }
        (bracket, Some(name)) => format!(
            "[{} = \"{}\"]",
            bracket.bracket_kind().map(|k| k.as_str()).unwrap_or_default(),
            escape_string(name)
        ),
        (bracket, None) => format!(
            "[{}]",
            bracket.bracket_kind().map(|k| k.as_str()).unwrap_or_default()
        ),
    }
}

/// True if `name` lexes back as a single `.name` token.
fn is_plain_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-'))
}

/// Escape a string for a double-quoted CVU literal. `{` is escaped so the
/// literal never turns into a string expression.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '{' => out.push_str("\\{"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// UI ELEMENTS AND ACTIONS
// ============================================================================

/// A node of the rendered UI tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UIElement {
    pub kind: UIElementKind,
    pub properties: PropertyDict,
    pub children: Vec<UIElement>,
}

impl UIElement {
    pub fn new(kind: UIElementKind) -> Self {
        Self {
            kind,
            properties: PropertyDict::new(),
            children: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<CvuValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: UIElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn get(&self, key: &str) -> Option<&CvuValue> {
        self.properties.get(key)
    }
}

/// A user-triggerable action, e.g. `openView { arguments: ["x"] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub arguments: Vec<CvuValue>,
    pub options: PropertyDict,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            arguments: Vec::new(),
            options: PropertyDict::new(),
        }
    }

    pub fn title(&self) -> &str {
        self.options
            .get("title")
            .and_then(CvuValue::as_str)
            .unwrap_or(self.kind.defaults().title)
    }

    pub fn icon(&self) -> &str {
        self.options
            .get("icon")
            .and_then(CvuValue::as_str)
            .unwrap_or(self.kind.defaults().icon)
    }

    pub fn has_state(&self) -> bool {
        self.options
            .get("hasState")
            .and_then(CvuValue::as_bool)
            .unwrap_or(self.kind.defaults().has_state)
    }

    pub fn opens_view(&self) -> bool {
        self.kind.defaults().opens_view
    }

    pub fn show_title(&self) -> bool {
        self.options
            .get("showTitle")
            .and_then(CvuValue::as_bool)
            .unwrap_or(self.kind.defaults().show_title)
    }
}
