//! Resolved views

use crate::config::CascadeAxis;
use crate::matcher::Situation;
use crate::merge::MergeDecision;
use cvu_core::{Domain, ExpressionError};
use cvu_dsl::{
    Action, Color, CvuValue, EvalContext, EvalMode, ExpressionHost, PropertyDict, UIElement, ViewArguments,
    CHILDREN_KEY,
};
use serde::{Deserialize, Serialize};

/// Key holding the default arguments a view passes to its expressions.
pub const VIEW_ARGUMENTS_KEY: &str = "viewArguments";

/// The merged result of a cascade. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedView {
    pub situation: Situation,
    pub renderer: String,
    pub cascade_order: Vec<CascadeAxis>,
    /// Labels of the merged definitions, in merge order
    pub chain: Vec<String>,
    pub properties: PropertyDict,
    /// Properties contributed by renderer definitions only
    pub renderer_properties: PropertyDict,
    /// Merge audit trail, in merge order
    pub trace: Vec<MergeDecision>,
}

impl ResolvedView {
    pub fn get(&self, key: &str) -> Option<&CvuValue> {
        self.properties.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(CvuValue::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(CvuValue::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(CvuValue::as_bool)
    }

    pub fn get_color(&self, key: &str) -> Option<&Color> {
        match self.get(key) {
            Some(CvuValue::Color(color)) => Some(color),
            _ => None,
        }
    }

    pub fn get_array(&self, key: &str) -> Option<&[CvuValue]> {
        self.get(key).and_then(CvuValue::as_array)
    }

    pub fn get_dict(&self, key: &str) -> Option<&PropertyDict> {
        self.get(key).and_then(CvuValue::as_dict)
    }

    pub fn renderer_property(&self, key: &str) -> Option<&CvuValue> {
        self.renderer_properties.get(key)
    }

    /// Query of the resolved view, falling back to the one the host supplied.
    pub fn query(&self) -> Option<&str> {
        self.get_str("query")
            .filter(|q| !q.is_empty())
            .or(self.situation.query.as_deref())
    }

    /// Top-level UI elements, in merge order.
    pub fn children(&self) -> Vec<&UIElement> {
        self.get_array(CHILDREN_KEY)
            .unwrap_or_default()
            .iter()
            .filter_map(|value| match value {
                CvuValue::Element(element) => Some(element),
                _ => None,
            })
            .collect()
    }

    /// Every action reachable from the merged properties, depth first.
    pub fn actions(&self) -> Vec<&Action> {
        let mut found = Vec::new();
        for value in self.properties.values() {
            collect_actions(value, &mut found);
        }
        found
    }

    /// Evaluate the property `key`. Non-expression values are returned as
    /// they are; a missing key is `nil` in display mode.
    pub fn evaluate(
        &self,
        key: &str,
        host: &dyn ExpressionHost,
        context: &EvalContext<'_>,
        mode: EvalMode,
    ) -> Result<CvuValue, ExpressionError> {
        match self.get(key) {
            Some(CvuValue::Expression(expression)) => expression.evaluate(host, context, mode),
            Some(value) => Ok(value.clone()),
            None => match mode {
                EvalMode::Display => Ok(CvuValue::Nil),
                EvalMode::Strict => Err(ExpressionError::PropertyNotFound { path: key.to_string() }),
            },
        }
    }

    /// Arguments for this view's expressions: the merged `viewArguments`
    /// with the caller's values taking precedence.
    pub fn view_arguments(&self, caller: &ViewArguments) -> ViewArguments {
        let mut defaults = ViewArguments::new();
        if let Some(dict) = self.get_dict(VIEW_ARGUMENTS_KEY) {
            for (name, value) in dict {
                defaults.set(name.clone(), value.clone());
            }
        }
        defaults.merged_with(caller)
    }

    /// Definitions that contributed to `key`, in merge order.
    pub fn contributors(&self, key: &str) -> Vec<(Domain, &str)> {
        self.trace
            .iter()
            .filter(|decision| decision.key == key)
            .map(|decision| (decision.domain, decision.selector.as_str()))
            .collect()
    }
}

fn collect_actions<'a>(value: &'a CvuValue, found: &mut Vec<&'a Action>) {
    match value {
        CvuValue::Action(action) => {
            found.push(action);
            for argument in &action.arguments {
                collect_actions(argument, found);
            }
        }
        CvuValue::Array(items) => {
            for item in items {
                collect_actions(item, found);
            }
        }
        CvuValue::Dictionary(dict) => {
            for item in dict.values() {
                collect_actions(item, found);
            }
        }
        CvuValue::Element(element) => collect_element_actions(element, found),
        _ => {}
    }
}

fn collect_element_actions<'a>(element: &'a UIElement, found: &mut Vec<&'a Action>) {
    for value in element.properties.values() {
        collect_actions(value, found);
    }
    for child in &element.children {
        collect_element_actions(child, found);
    }
}
