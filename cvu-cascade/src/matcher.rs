//! Selector matching
//!
//! A [`Situation`] describes what is about to be rendered. Matching collects
//! the definitions that apply to it, per domain and per axis, ordered from
//! least to most specific.

use crate::config::CascadeAxis;
use crate::store::DefinitionStore;
use cvu_core::Domain;
use cvu_dsl::{CvuValue, SelectorKind, ViewSelector, ViewTarget, RENDER_DEFINITIONS_KEY};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// SITUATION
// ============================================================================

/// The rendering situation a view is resolved for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Situation {
    /// Item type, or the element type of a homogeneous collection
    pub type_name: Option<String>,
    /// True when a collection is rendered
    pub list: bool,
    /// Named view requested, e.g. `allNotes` for `.allNotes`
    pub view_name: Option<String>,
    /// Renderer explicitly requested by the host
    pub renderer: Option<String>,
    /// Query the host already holds for the collection
    pub query: Option<String>,
    /// Active session-level view, merged last
    pub session: Option<ViewSelector>,
}

impl Situation {
    pub fn item(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            list: false,
            view_name: None,
            renderer: None,
            query: None,
            session: None,
        }
    }

    pub fn list(type_name: impl Into<String>) -> Self {
        Self {
            list: true,
            ..Self::item(type_name)
        }
    }

    /// A named view. Named views render collections unless `with_type`
    /// narrows them to a single item.
    pub fn named(view_name: impl Into<String>) -> Self {
        Self {
            type_name: None,
            list: true,
            view_name: Some(view_name.into()),
            renderer: None,
            query: None,
            session: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>, list: bool) -> Self {
        self.type_name = Some(type_name.into());
        self.list = list;
        self
    }

    pub fn with_renderer(mut self, renderer: impl Into<String>) -> Self {
        self.renderer = Some(renderer.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_session(mut self, session: ViewSelector) -> Self {
        self.session = Some(session);
        self
    }
}

impl fmt::Display for Situation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_part = self.type_name.as_deref().unwrap_or("*");
        let brackets = if self.list { "[]" } else { "" };
        match &self.view_name {
            Some(name) => write!(f, ".{} ({}{})", name, type_part, brackets)?,
            None => write!(f, "{}{}", type_part, brackets)?,
        }
        if let Some(renderer) = &self.renderer {
            write!(f, " with renderer {}", renderer)?;
        }
        Ok(())
    }
}

// ============================================================================
// LAYERS
// ============================================================================

/// How specific a matched definition is. Later variants win ties between
/// definitions of the same domain and axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
    /// Top-level `[renderer = "x"]`
    Renderer,
    /// `*` or `*[]`
    Wildcard,
    /// `Note` or `Note[]`
    Type,
    /// `.allNotes`
    Named,
    /// The active session view
    Session,
}

/// One matched definition, ready to merge.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    pub domain: Domain,
    pub axis: CascadeAxis,
    pub specificity: Specificity,
    pub selector: &'a ViewSelector,
    /// Selector this definition is nested in, for `renderDefinitions`
    pub owner: Option<&'a ViewSelector>,
}

impl Layer<'_> {
    /// Human readable origin, e.g. `Note[] [renderer = "list"]`.
    pub fn label(&self) -> String {
        match self.owner {
            Some(owner) => format!("{} {}", owner.selector, self.selector.selector),
            None => self.selector.selector.clone(),
        }
    }

    /// Rank used to pick the most specific `cascadeOrder`.
    pub fn rank(&self) -> (bool, Domain, Specificity) {
        (
            self.specificity == Specificity::Session,
            self.domain,
            self.specificity,
        )
    }
}

/// Datatype-axis specificity of `selector` for `situation`, if it matches.
pub fn datatype_match(selector: &ViewSelector, situation: &Situation) -> Option<Specificity> {
    match &selector.kind {
        SelectorKind::View(ViewTarget::Type { type_name, list }) => {
            if *list != situation.list {
                return None;
            }
            if type_name == "*" {
                Some(Specificity::Wildcard)
            } else if situation.type_name.as_deref() == Some(type_name.as_str()) {
                Some(Specificity::Type)
            } else {
                None
            }
        }
        SelectorKind::View(ViewTarget::Named) => {
            let requested = situation.view_name.as_deref()?;
            (selector.name.as_deref() == Some(requested)).then_some(Specificity::Named)
        }
        _ => None,
    }
}

/// True if `selector` is `[renderer = "<renderer>"]`.
pub fn renderer_match(selector: &ViewSelector, renderer: &str) -> bool {
    selector.kind == SelectorKind::Renderer && selector.name.as_deref() == Some(renderer)
}

/// Datatype-axis layers of one domain, least specific first. Definitions
/// of equal specificity keep the order they were added in.
pub fn datatype_layers<'a>(store: &'a DefinitionStore, domain: Domain, situation: &Situation) -> Vec<Layer<'a>> {
    let mut layers: Vec<Layer<'a>> = store
        .selectors(domain)
        .iter()
        .filter_map(|selector| {
            datatype_match(selector, situation).map(|specificity| Layer {
                domain,
                axis: CascadeAxis::Datatype,
                specificity,
                selector,
                owner: None,
            })
        })
        .collect();
    layers.sort_by_key(|layer| layer.specificity);
    layers
}

/// Renderer-axis layers of one domain: top-level renderer definitions,
/// then definitions nested in the matched datatype layers.
pub fn renderer_layers<'a>(
    store: &'a DefinitionStore,
    domain: Domain,
    datatype: &[Layer<'a>],
    renderer: &str,
) -> Vec<Layer<'a>> {
    let mut layers: Vec<Layer<'a>> = store
        .selectors(domain)
        .iter()
        .filter(|selector| renderer_match(selector, renderer))
        .map(|selector| Layer {
            domain,
            axis: CascadeAxis::Renderer,
            specificity: Specificity::Renderer,
            selector,
            owner: None,
        })
        .collect();

    for owner in datatype {
        layers.extend(nested_renderers(owner.selector, renderer).into_iter().map(|selector| Layer {
            domain,
            axis: CascadeAxis::Renderer,
            specificity: owner.specificity,
            selector,
            owner: Some(owner.selector),
        }));
    }

    layers.sort_by_key(|layer| layer.specificity);
    layers
}

/// `[renderer = "<renderer>"]` definitions nested in `owner`.
pub fn nested_renderers<'a>(owner: &'a ViewSelector, renderer: &str) -> Vec<&'a ViewSelector> {
    owner
        .get(RENDER_DEFINITIONS_KEY)
        .and_then(CvuValue::as_array)
        .unwrap_or_default()
        .iter()
        .filter_map(|value| match value {
            CvuValue::Definition(definition) => Some(definition.as_ref()),
            _ => None,
        })
        .filter(|definition| renderer_match(definition, renderer))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvu_core::ParseError;

    fn store(defaults: &str, user: &str) -> Result<DefinitionStore, ParseError> {
        let mut store = DefinitionStore::new();
        store.add_source(Domain::Defaults, defaults)?;
        store.add_source(Domain::User, user)?;
        Ok(store)
    }

    #[test]
    fn test_datatype_match_specificity() -> Result<(), ParseError> {
        let store = store("* {}\nNote {}\nNote[] {}\nPerson {}\n.allNotes {}", "")?;
        let selectors = store.selectors(Domain::Defaults);

        let item = Situation::item("Note");
        let matched: Vec<Option<Specificity>> = selectors.iter().map(|s| datatype_match(s, &item)).collect();
        assert_eq!(
            matched,
            vec![Some(Specificity::Wildcard), Some(Specificity::Type), None, None, None]
        );

        let named = Situation::named("allNotes").with_type("Note", true);
        assert_eq!(datatype_match(&selectors[2], &named), Some(Specificity::Type));
        assert_eq!(datatype_match(&selectors[4], &named), Some(Specificity::Named));
        Ok(())
    }

    #[test]
    fn test_datatype_layers_sorted_by_specificity() -> Result<(), ParseError> {
        let store = store("", ".allNotes {}\nNote[] {}\n*[] {}")?;
        let situation = Situation::named("allNotes").with_type("Note", true);
        let labels: Vec<String> = datatype_layers(&store, Domain::User, &situation)
            .iter()
            .map(Layer::label)
            .collect();
        assert_eq!(labels, vec!["*[]", "Note[]", ".allNotes"]);
        Ok(())
    }

    #[test]
    fn test_renderer_layers_include_nested() -> Result<(), ParseError> {
        let store = store(
            "[renderer = \"list\"] { spacing: 1 }\n[renderer = \"grid\"] {}\nNote[] {\n  [renderer = \"list\"] { spacing: 2 }\n}",
            "",
        )?;
        let situation = Situation::list("Note");
        let datatype = datatype_layers(&store, Domain::Defaults, &situation);
        let layers = renderer_layers(&store, Domain::Defaults, &datatype, "list");

        let labels: Vec<String> = layers.iter().map(Layer::label).collect();
        assert_eq!(labels, vec!["[renderer = \"list\"]", "Note[] [renderer = \"list\"]"]);
        assert_eq!(layers[1].specificity, Specificity::Type);
        assert!(layers.iter().all(|l| l.axis == CascadeAxis::Renderer));
        Ok(())
    }

    #[test]
    fn test_situation_display() {
        assert_eq!(Situation::list("Note").to_string(), "Note[]");
        assert_eq!(
            Situation::item("Person").with_renderer("generalEditor").to_string(),
            "Person with renderer generalEditor"
        );
        assert_eq!(Situation::named("allNotes").to_string(), ".allNotes (*[])");
    }
}
