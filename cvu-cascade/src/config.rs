//! Resolver configuration

use cvu_core::ConfigError;
use cvu_dsl::{CHILDREN_KEY, RENDER_DEFINITIONS_KEY};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One axis of the cascade. Renderer-axis definitions are `[renderer = "x"]`
/// blocks; datatype-axis definitions are type, wildcard and named selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CascadeAxis {
    Renderer,
    Datatype,
}

impl CascadeAxis {
    pub const ALL: [CascadeAxis; 2] = [CascadeAxis::Renderer, CascadeAxis::Datatype];

    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeAxis::Renderer => "renderer",
            CascadeAxis::Datatype => "datatype",
        }
    }
}

impl fmt::Display for CascadeAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CascadeAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "renderer" => Ok(CascadeAxis::Renderer),
            "datatype" => Ok(CascadeAxis::Datatype),
            other => Err(format!("unknown cascade axis '{}'", other)),
        }
    }
}

/// What to do when two equally specific definitions declare different
/// `cascadeOrder` arrays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeConflictPolicy {
    /// The definition added last wins; a warning is logged.
    #[default]
    LastWins,
    /// Resolution fails with `MergeError::ConflictingCascadeOrder`.
    Reject,
}

/// Cascade behavior for a [`crate::ViewResolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Merge order when no matched definition declares `cascadeOrder`.
    /// Later axes win.
    pub default_cascade_order: Vec<CascadeAxis>,
    pub conflict_policy: CascadeConflictPolicy,
    /// Array-valued keys that concatenate across the cascade instead of
    /// being replaced.
    pub concat_keys: Vec<String>,
    /// Renderer used for a single item when nothing else names one.
    pub fallback_renderer: Option<String>,
    /// Renderer used for a collection when nothing else names one.
    pub fallback_list_renderer: Option<String>,
    /// Keys every resolved view must carry.
    pub required_keys: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_cascade_order: vec![CascadeAxis::Renderer, CascadeAxis::Datatype],
            conflict_policy: CascadeConflictPolicy::LastWins,
            concat_keys: vec![CHILDREN_KEY.to_string(), RENDER_DEFINITIONS_KEY.to_string()],
            fallback_renderer: Some("generalEditor".to_string()),
            fallback_list_renderer: Some("list".to_string()),
            required_keys: Vec::new(),
        }
    }
}

impl ResolverConfig {
    /// Load from TOML. Omitted fields keep their defaults.
    ///
    /// ```toml
    /// default_cascade_order = ["datatype", "renderer"]
    /// conflict_policy = "reject"
    /// fallback_list_renderer = "grid"
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: ResolverConfig = toml::from_str(source).map_err(|e| ConfigError::Malformed {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_cascade_order.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "default_cascade_order".to_string(),
                value: "[]".to_string(),
                reason: "at least one axis is required".to_string(),
            });
        }

        for (i, axis) in self.default_cascade_order.iter().enumerate() {
            if self.default_cascade_order[..i].contains(axis) {
                return Err(ConfigError::InvalidValue {
                    field: "default_cascade_order".to_string(),
                    value: axis.to_string(),
                    reason: "axis listed twice".to_string(),
                });
            }
        }

        for (field, renderer) in [
            ("fallback_renderer", &self.fallback_renderer),
            ("fallback_list_renderer", &self.fallback_list_renderer),
        ] {
            if matches!(renderer, Some(name) if name.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: String::new(),
                    reason: "renderer name must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn is_concat_key(&self, key: &str) -> bool {
        self.concat_keys.iter().any(|k| k == key)
    }

    pub fn fallback_for(&self, list: bool) -> Option<&str> {
        if list {
            self.fallback_list_renderer.as_deref()
        } else {
            self.fallback_renderer.as_deref()
        }
    }
}
