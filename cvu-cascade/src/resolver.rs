//! View resolver - cascade, validation and the per-slot cache

use crate::config::ResolverConfig;
use crate::matcher::Situation;
use crate::merge::CascadePlan;
use crate::resolved::ResolvedView;
use crate::store::DefinitionStore;
use cvu_core::{ConfigError, CvuResult, MergeError};
use cvu_dsl::CvuValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Live view of one slot and the cache key it was built from.
#[derive(Debug, Clone)]
struct Slot {
    key: Option<String>,
    view: Arc<ResolvedView>,
}

/// Resolves situations against a [`DefinitionStore`].
///
/// Each slot (typically one per open session view) holds at most one live
/// [`ResolvedView`]. A failed resolution leaves the slot's previous view in
/// place.
#[derive(Debug, Clone)]
pub struct ViewResolver {
    config: ResolverConfig,
    store: DefinitionStore,
    slots: BTreeMap<String, Slot>,
}

impl ViewResolver {
    pub fn new(store: DefinitionStore) -> Self {
        Self {
            config: ResolverConfig::default(),
            store,
            slots: BTreeMap::new(),
        }
    }

    pub fn with_config(store: DefinitionStore, config: ResolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            slots: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn store(&self) -> &DefinitionStore {
        &self.store
    }

    /// Mutable access to the definitions. Cached views notice changes
    /// through their cache key on the next `resolve`.
    pub fn store_mut(&mut self) -> &mut DefinitionStore {
        &mut self.store
    }

    /// See [`DefinitionStore::set_property`].
    pub fn set_property(&mut self, pattern: &str, key: &str, value: CvuValue) -> CvuResult<String> {
        self.store.set_property(pattern, key, value)
    }

    /// Resolve `situation` for `slot`, reusing the live view when nothing
    /// it depends on has changed.
    pub fn resolve(&mut self, slot: &str, situation: &Situation) -> Result<Arc<ResolvedView>, MergeError> {
        let plan = CascadePlan::build(&self.store, situation, &self.config)?;
        let key = plan.cache_key(situation)?;

        if let Some(live) = self.slots.get(slot) {
            if live.key.as_deref() == Some(key.as_str()) {
                debug!(slot, situation = %situation, "Resolved view cache hit");
                return Ok(Arc::clone(&live.view));
            }
        }

        let view = match build_view(&plan, situation, &self.config) {
            Ok(view) => Arc::new(view),
            Err(err) => {
                warn!(
                    slot,
                    situation = %situation,
                    error = %err,
                    "View resolution failed, keeping previous view"
                );
                return Err(err);
            }
        };

        debug!(
            slot,
            situation = %situation,
            renderer = %view.renderer,
            layers = view.chain.len(),
            "Resolved view"
        );
        self.slots.insert(
            slot.to_string(),
            Slot {
                key: Some(key),
                view: Arc::clone(&view),
            },
        );
        Ok(view)
    }

    /// Resolve without touching any slot.
    pub fn resolve_uncached(&self, situation: &Situation) -> Result<ResolvedView, MergeError> {
        let plan = CascadePlan::build(&self.store, situation, &self.config)?;
        build_view(&plan, situation, &self.config)
    }

    /// The live view of `slot`, if any.
    pub fn live(&self, slot: &str) -> Option<Arc<ResolvedView>> {
        self.slots.get(slot).map(|s| Arc::clone(&s.view))
    }

    /// Force the next `resolve` of `slot` to merge again. The live view
    /// stays readable until then. Returns false for an unknown slot.
    pub fn invalidate(&mut self, slot: &str) -> bool {
        match self.slots.get_mut(slot) {
            Some(live) => {
                live.key = None;
                true
            }
            None => false,
        }
    }

    pub fn invalidate_all(&mut self) {
        for live in self.slots.values_mut() {
            live.key = None;
        }
        debug!(slots = self.slots.len(), "Invalidated all resolved views");
    }

    /// Drop `slot` and its live view.
    pub fn release(&mut self, slot: &str) -> Option<Arc<ResolvedView>> {
        self.slots.remove(slot).map(|s| s.view)
    }

    /// True if `slot`'s live view would be reused by the next `resolve`.
    pub fn is_cached(&self, slot: &str) -> bool {
        self.slots.get(slot).is_some_and(|s| s.key.is_some())
    }
}

fn build_view(plan: &CascadePlan<'_>, situation: &Situation, config: &ResolverConfig) -> Result<ResolvedView, MergeError> {
    let renderer = plan
        .renderer
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| MergeError::NoRenderer {
            situation: situation.to_string(),
        })?;

    let (properties, renderer_properties, trace) = plan.merge(config);

    let view = ResolvedView {
        situation: situation.clone(),
        renderer,
        cascade_order: plan.cascade_order.clone(),
        chain: plan.layers.iter().map(|layer| layer.label()).collect(),
        properties,
        renderer_properties,
        trace,
    };

    validate(&view, config)?;
    Ok(view)
}

/// Post-merge consistency checks.
fn validate(view: &ResolvedView, config: &ResolverConfig) -> Result<(), MergeError> {
    let missing = |field: &str| MergeError::MissingField {
        field: field.to_string(),
        situation: view.situation.to_string(),
    };

    if view.situation.list {
        let has_query = match view.get("query") {
            Some(CvuValue::Expression(_)) => true,
            _ => view.query().is_some_and(|q| !q.trim().is_empty()),
        };
        if !has_query {
            return Err(missing("query"));
        }
    }

    for key in &config.required_keys {
        if view.get(key).map_or(true, CvuValue::is_nil) {
            return Err(missing(key));
        }
    }

    Ok(())
}
