//! Cascade planning and merging
//!
//! A [`CascadePlan`] is the ordered list of layers for one situation. Layers
//! are merged domain by domain (`defaults` then `user`); inside a domain the
//! axes follow the effective cascade order, and inside an axis less specific
//! definitions merge first. The session view merges last.
//!
//! Per-key rules:
//! - `nil` removes the key
//! - concatenating keys (`children`, `renderDefinitions`) append, and an
//!   explicit empty array clears them
//! - dictionaries merge key by key with the same rules
//! - everything else is replaced

use crate::config::{CascadeAxis, CascadeConflictPolicy, ResolverConfig};
use crate::matcher::{datatype_layers, nested_renderers, renderer_layers, Layer, Situation, Specificity};
use crate::store::DefinitionStore;
use cvu_core::{Domain, MergeError, SerializationError};
use cvu_dsl::{serialize_selector, CvuValue, PropertyDict, ViewSelector};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::btree_map::Entry;
use tracing::{trace, warn};

/// Key declaring a definition's own merge order.
pub const CASCADE_ORDER_KEY: &str = "cascadeOrder";

/// Key naming the renderer a datatype prefers.
pub const DEFAULT_RENDERER_KEY: &str = "defaultRenderer";

// ============================================================================
// MERGE TRACE
// ============================================================================

/// What a layer did to a top-level key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeAction {
    Insert,
    Replace,
    Concat,
    Clear,
    Merge,
    Remove,
}

/// One entry of the merge audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeDecision {
    pub key: String,
    pub domain: Domain,
    /// Label of the contributing definition, e.g. `Note[]`
    pub selector: String,
    pub action: MergeAction,
}

// ============================================================================
// MERGE RULES
// ============================================================================

/// Merge `source` into `target`, reporting each top-level key touched.
pub fn merge_dict(
    target: &mut PropertyDict,
    source: &PropertyDict,
    config: &ResolverConfig,
    record: &mut dyn FnMut(&str, MergeAction),
) {
    for (key, incoming) in source {
        let action = merge_entry(target, key, incoming, config);
        record(key, action);
    }
}

fn merge_entry(target: &mut PropertyDict, key: &str, incoming: &CvuValue, config: &ResolverConfig) -> MergeAction {
    if incoming.is_nil() {
        target.remove(key);
        return MergeAction::Remove;
    }

    let mut slot = match target.entry(key.to_string()) {
        Entry::Vacant(vacant) => {
            vacant.insert(incoming.clone());
            return MergeAction::Insert;
        }
        Entry::Occupied(occupied) => occupied,
    };

    match (slot.get_mut(), incoming) {
        (CvuValue::Array(items), CvuValue::Array(added)) if config.is_concat_key(key) => {
            if added.is_empty() {
                items.clear();
                MergeAction::Clear
            } else {
                items.extend(added.iter().cloned());
                MergeAction::Concat
            }
        }
        (CvuValue::Dictionary(nested), CvuValue::Dictionary(added)) => {
            merge_dict(nested, added, config, &mut |_: &str, _: MergeAction| {});
            MergeAction::Merge
        }
        (existing, value) => {
            *existing = value.clone();
            MergeAction::Replace
        }
    }
}

// ============================================================================
// CASCADE ORDER
// ============================================================================

/// Parse a `cascadeOrder` value. `Ok(None)` means "not declared".
pub fn declared_cascade_order(layer: &Layer<'_>) -> Result<Option<Vec<CascadeAxis>>, MergeError> {
    let Some(value) = layer.selector.get(CASCADE_ORDER_KEY) else {
        return Ok(None);
    };

    let invalid = |entry: String| MergeError::InvalidCascadeOrder {
        entry,
        selector: layer.label(),
    };

    let entries = match value {
        CvuValue::Array(entries) => entries.as_slice(),
        CvuValue::Nil => return Ok(None),
        // A single entry parses as a scalar
        single => std::slice::from_ref(single),
    };

    let mut order = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = entry.as_str().ok_or_else(|| invalid(entry.display_string()))?;
        let axis: CascadeAxis = name.parse().map_err(|_| invalid(name.to_string()))?;
        if order.contains(&axis) {
            return Err(invalid(name.to_string()));
        }
        order.push(axis);
    }

    Ok((!order.is_empty()).then_some(order))
}

/// Effective merge order for a set of layers: the declaration of the most
/// specific declaring layer, completed with any axis it leaves out.
pub fn effective_cascade_order(layers: &[Layer<'_>], config: &ResolverConfig) -> Result<Vec<CascadeAxis>, MergeError> {
    let mut best: Option<(Layer<'_>, Vec<CascadeAxis>)> = None;

    for layer in layers {
        let Some(order) = declared_cascade_order(layer)? else {
            continue;
        };

        let replace = match &best {
            None => true,
            Some((current, current_order)) => {
                if layer.rank() < current.rank() {
                    false
                } else if layer.rank() == current.rank() && *current_order != order {
                    if config.conflict_policy == CascadeConflictPolicy::Reject {
                        return Err(MergeError::ConflictingCascadeOrder {
                            domain: layer.domain,
                            first: current.label(),
                            second: layer.label(),
                        });
                    }
                    warn!(
                        domain = %layer.domain,
                        first = %current.label(),
                        second = %layer.label(),
                        "Conflicting cascadeOrder, later definition wins"
                    );
                    true
                } else {
                    true
                }
            }
        };

        if replace {
            best = Some((*layer, order));
        }
    }

    let declared = match best {
        Some((_, order)) => order,
        None => config.default_cascade_order.clone(),
    };

    // Axes left out merge first, in default order
    let mut order: Vec<CascadeAxis> = Vec::with_capacity(CascadeAxis::ALL.len());
    for axis in config.default_cascade_order.iter().chain(CascadeAxis::ALL.iter()) {
        if !declared.contains(axis) && !order.contains(axis) {
            order.push(*axis);
        }
    }
    order.extend(declared);
    Ok(order)
}

// ============================================================================
// CASCADE PLAN
// ============================================================================

/// Ordered layers for one situation.
#[derive(Debug, Clone)]
pub struct CascadePlan<'a> {
    pub renderer: Option<String>,
    pub cascade_order: Vec<CascadeAxis>,
    /// Layers in merge order, session last
    pub layers: Vec<Layer<'a>>,
}

impl<'a> CascadePlan<'a> {
    /// Match the store against `situation` and order the result.
    pub fn build(
        store: &'a DefinitionStore,
        situation: &'a Situation,
        config: &ResolverConfig,
    ) -> Result<Self, MergeError> {
        let datatype: Vec<(Domain, Vec<Layer<'a>>)> = Domain::CASCADE
            .into_iter()
            .map(|domain| (domain, datatype_layers(store, domain, situation)))
            .collect();

        let renderer = situation
            .renderer
            .clone()
            .or_else(|| preferred_renderer(&datatype, situation.session.as_ref()))
            .or_else(|| config.fallback_for(situation.list).map(str::to_string));

        let mut per_domain: Vec<(Vec<Layer<'a>>, Vec<Layer<'a>>)> = Vec::with_capacity(datatype.len());
        for (domain, datatype_axis) in datatype {
            let renderer_axis = match &renderer {
                Some(name) => renderer_layers(store, domain, &datatype_axis, name),
                None => Vec::new(),
            };
            per_domain.push((renderer_axis, datatype_axis));
        }

        let session = session_layers(situation.session.as_ref(), renderer.as_deref());

        let candidates: Vec<Layer<'a>> = per_domain
            .iter()
            .flat_map(|(r, d)| r.iter().chain(d.iter()).copied())
            .chain(session.iter().copied())
            .collect();
        let cascade_order = effective_cascade_order(&candidates, config)?;

        let mut layers = Vec::with_capacity(candidates.len());
        for (renderer_axis, datatype_axis) in &per_domain {
            for axis in &cascade_order {
                match axis {
                    CascadeAxis::Renderer => layers.extend(renderer_axis.iter().copied()),
                    CascadeAxis::Datatype => layers.extend(datatype_axis.iter().copied()),
                }
            }
        }
        layers.extend(session);

        trace!(
            situation = %situation,
            renderer = ?renderer,
            layers = layers.len(),
            "Planned cascade"
        );

        Ok(Self {
            renderer,
            cascade_order,
            layers,
        })
    }

    /// SHA-256 over the canonical text of every layer plus the situation.
    pub fn cache_key(&self, situation: &Situation) -> Result<String, SerializationError> {
        let mut hasher = Sha256::new();
        hasher.update(situation.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(situation.query.as_deref().unwrap_or_default().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.renderer.as_deref().unwrap_or_default().as_bytes());
        for layer in &self.layers {
            hasher.update([0u8]);
            hasher.update(layer.domain.as_str().as_bytes());
            hasher.update(layer.label().as_bytes());
            hasher.update(serialize_selector(layer.selector)?.as_bytes());
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Merge every layer, returning the merged properties, the
    /// renderer-axis-only properties and the audit trail.
    pub fn merge(&self, config: &ResolverConfig) -> (PropertyDict, PropertyDict, Vec<MergeDecision>) {
        let mut properties = PropertyDict::new();
        let mut renderer_properties = PropertyDict::new();
        let mut decisions = Vec::new();

        for layer in &self.layers {
            let label = layer.label();
            merge_dict(&mut properties, &layer.selector.properties, config, &mut |key: &str, action: MergeAction| {
                decisions.push(MergeDecision {
                    key: key.to_string(),
                    domain: layer.domain,
                    selector: label.clone(),
                    action,
                });
            });
            if layer.axis == CascadeAxis::Renderer {
                merge_dict(&mut renderer_properties, &layer.selector.properties, config, &mut |_: &str, _: MergeAction| {});
            }
        }

        (properties, renderer_properties, decisions)
    }
}

/// `defaultRenderer` of the datatype chain, the session having the last word.
fn preferred_renderer(datatype: &[(Domain, Vec<Layer<'_>>)], session: Option<&ViewSelector>) -> Option<String> {
    datatype
        .iter()
        .flat_map(|(_, layers)| layers.iter().map(|layer| layer.selector))
        .chain(session)
        .filter_map(|selector| selector.get(DEFAULT_RENDERER_KEY).and_then(CvuValue::as_str))
        .filter(|name| !name.is_empty())
        .last()
        .map(str::to_string)
}

/// Session renderer definitions followed by the session view itself.
fn session_layers<'a>(session: Option<&'a ViewSelector>, renderer: Option<&str>) -> Vec<Layer<'a>> {
    let Some(session) = session else {
        return Vec::new();
    };

    let mut layers: Vec<Layer<'a>> = renderer
        .map(|name| nested_renderers(session, name))
        .unwrap_or_default()
        .into_iter()
        .map(|selector| Layer {
            domain: session.domain,
            axis: CascadeAxis::Renderer,
            specificity: Specificity::Session,
            selector,
            owner: Some(session),
        })
        .collect();

    layers.push(Layer {
        domain: session.domain,
        axis: CascadeAxis::Datatype,
        specificity: Specificity::Session,
        selector: session,
        owner: None,
    });
    layers
}
