//! Declarative description of virtual models and engine-wide defaults
//!
//! Deserializable with `serde`, following this lineage's config-struct
//! convention (`deny_unknown_fields`, `#[serde(default)]`, const-fn defaults)
//! even though reading the bytes off disk is a façade concern.

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while validating a `RaceConfig`
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `default_virtual_model` names a model that isn't in `virtual_models`
    #[error("default virtual model not found: {0}")]
    DefaultModelNotFound(String),
    /// A virtual model has no participants
    #[error("virtual model {0} has no providers")]
    EmptyParticipants(String),
    /// A participant's name is empty
    #[error("virtual model {0} has a participant with an empty name")]
    EmptyParticipantName(String),
    /// The engine-wide default timeout must be positive
    #[error("engine default timeout_ms must be > 0")]
    InvalidDefaultTimeout,
}

/// Selection strategy used to pick a race winner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// First usable stream wins
    #[default]
    FirstWins,
    /// Best adjusted score within a grace window wins
    Weighted,
    /// Synonym for `Weighted`, kept distinct for forward compatibility
    Quality,
}

/// One provider participating in a virtual model's race
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderRef {
    /// Name of an attached provider
    pub name: String,
    /// Model identifier override sent to this participant, if any
    #[serde(default)]
    pub model: Option<String>,
    /// Priority hint (currently unused by any strategy, reserved)
    #[serde(default)]
    pub priority: Option<u32>,
    /// Opaque per-participant configuration passed through untouched
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

/// A named virtual model: a set of participants raced under a shared policy
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VirtualModel {
    /// Display name surfaced via `get_models`
    #[serde(default)]
    pub display_name: String,
    /// Description surfaced via `get_models` and stream annotation
    #[serde(default)]
    pub description: String,
    /// Strategy override; falls back to the engine default when absent
    #[serde(default)]
    pub strategy: Option<Strategy>,
    /// Timeout override in milliseconds; falls back to the engine default when 0 or absent
    #[serde(default)]
    pub timeout_ms: u64,
    /// Participants to race
    #[serde(default)]
    pub providers: Vec<ProviderRef>,
}

/// Engine-wide defaults applied when a virtual model doesn't override them
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineDefaults {
    /// Default per-race timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Grace period for the weighted/quality strategy, in milliseconds
    #[serde(default = "default_grace_ms")]
    pub grace_period_ms: u64,
    /// Default selection strategy
    #[serde(default)]
    pub strategy: Strategy,
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            grace_period_ms: default_grace_ms(),
            strategy: Strategy::default(),
        }
    }
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_grace_ms() -> u64 {
    200
}

/// Top-level racing engine configuration
///
/// `defaults` is `#[serde(flatten)]`-ed so the on-the-wire shape is flat
/// (`timeout_ms`, `grace_period_ms`, `strategy` sit alongside
/// `default_virtual_model`/`providers`/`virtual_models`, per §6), matching
/// the structured map `configure()` accepts. Serde does not support
/// `deny_unknown_fields` on a struct that itself flattens a field, so typo
/// detection for the flattened keys happens in `EngineDefaults` instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RaceConfig {
    /// Engine-wide defaults
    #[serde(flatten)]
    pub defaults: EngineDefaults,
    /// Name of the virtual model used when a request doesn't specify one
    #[serde(default)]
    pub default_virtual_model: String,
    /// Virtual models keyed by identifier
    #[serde(default)]
    pub virtual_models: IndexMap<String, VirtualModel>,
    /// Legacy-mode participant names, raced when `virtual_models` is empty
    #[serde(default)]
    pub providers: Vec<String>,
    /// Persistence path for `PerformanceTracker` state, reserved for future use
    #[serde(default)]
    pub performance_file: Option<String>,
}

impl RaceConfig {
    /// Validate internal consistency
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first inconsistency found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.timeout_ms == 0 {
            return Err(ConfigError::InvalidDefaultTimeout);
        }

        if !self.default_virtual_model.is_empty() && !self.virtual_models.contains_key(&self.default_virtual_model) {
            return Err(ConfigError::DefaultModelNotFound(self.default_virtual_model.clone()));
        }

        for (id, model) in &self.virtual_models {
            if model.providers.is_empty() {
                return Err(ConfigError::EmptyParticipants(id.clone()));
            }
            for participant in &model.providers {
                if participant.name.is_empty() {
                    return Err(ConfigError::EmptyParticipantName(id.clone()));
                }
            }
        }

        Ok(())
    }

    /// Whether any virtual models are configured
    #[must_use]
    pub fn has_virtual_models(&self) -> bool {
        !self.virtual_models.is_empty()
    }

    /// Resolve a virtual model by name, filling unset fields from the engine defaults
    ///
    /// An empty `name` resolves to `default_virtual_model`, if that itself names
    /// an existing model; otherwise `None` is returned for both an empty name
    /// with no default and an unknown non-empty name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<ResolvedModel<'_>> {
        let key = if name.is_empty() { &self.default_virtual_model } else { name };
        let model = self.virtual_models.get(key)?;
        Some(ResolvedModel {
            id: key,
            model,
            defaults: &self.defaults,
        })
    }

    /// The identifier `get_default_model` should report: `default_virtual_model`
    /// if it names an existing model, else the alphabetically first virtual
    /// model, else empty
    #[must_use]
    pub fn default_model_id(&self) -> &str {
        if self.virtual_models.contains_key(&self.default_virtual_model) {
            return &self.default_virtual_model;
        }
        self.virtual_models.keys().min().map_or("", String::as_str)
    }
}

/// A virtual model resolved against engine defaults
#[derive(Debug, Clone, Copy)]
pub struct ResolvedModel<'a> {
    /// Identifier this model was resolved under
    pub id: &'a str,
    model: &'a VirtualModel,
    defaults: &'a EngineDefaults,
}

impl<'a> ResolvedModel<'a> {
    /// The underlying virtual model definition
    #[must_use]
    pub const fn model(&self) -> &'a VirtualModel {
        self.model
    }

    /// Effective timeout: the model's override if set, else the engine default
    #[must_use]
    pub const fn effective_timeout_ms(&self) -> u64 {
        if self.model.timeout_ms > 0 {
            self.model.timeout_ms
        } else {
            self.defaults.timeout_ms
        }
    }

    /// Effective strategy: the model's override if set, else the engine default
    #[must_use]
    pub fn effective_strategy(&self) -> Strategy {
        self.model.strategy.unwrap_or(self.defaults.strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(providers: Vec<&str>) -> VirtualModel {
        VirtualModel {
            display_name: String::new(),
            description: String::new(),
            strategy: None,
            timeout_ms: 0,
            providers: providers
                .into_iter()
                .map(|name| ProviderRef {
                    name: name.to_owned(),
                    model: None,
                    priority: None,
                    config: serde_json::Map::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn validates_default_timeout() {
        let mut config = RaceConfig::default();
        config.defaults.timeout_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidDefaultTimeout));
    }

    #[test]
    fn validates_default_virtual_model_exists() {
        let mut config = RaceConfig::default();
        config.default_virtual_model = "missing".to_owned();
        assert_eq!(
            config.validate(),
            Err(ConfigError::DefaultModelNotFound("missing".to_owned()))
        );
    }

    #[test]
    fn validates_virtual_model_has_participants() {
        let mut config = RaceConfig::default();
        config.virtual_models.insert("empty".to_owned(), model(vec![]));
        assert_eq!(config.validate(), Err(ConfigError::EmptyParticipants("empty".to_owned())));
    }

    #[test]
    fn resolves_named_model_with_defaults() {
        let mut config = RaceConfig::default();
        config.virtual_models.insert("fast".to_owned(), model(vec!["a", "b"]));
        let resolved = config.resolve("fast").unwrap();
        assert_eq!(resolved.effective_timeout_ms(), config.defaults.timeout_ms);
        assert_eq!(resolved.effective_strategy(), Strategy::FirstWins);
    }

    #[test]
    fn empty_name_falls_back_to_default() {
        let mut config = RaceConfig::default();
        config.virtual_models.insert("fast".to_owned(), model(vec!["a"]));
        config.default_virtual_model = "fast".to_owned();
        assert!(config.resolve("").is_some());
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        let config = RaceConfig::default();
        assert!(config.resolve("nope").is_none());
    }

    #[test]
    fn default_model_id_falls_back_to_alphabetically_first() {
        let mut config = RaceConfig::default();
        config.virtual_models.insert("zeta".to_owned(), model(vec!["a"]));
        config.virtual_models.insert("alpha".to_owned(), model(vec!["a"]));
        assert_eq!(config.default_model_id(), "alpha");
    }

    #[test]
    fn default_model_id_prefers_the_configured_default() {
        let mut config = RaceConfig::default();
        config.virtual_models.insert("alpha".to_owned(), model(vec!["a"]));
        config.virtual_models.insert("zeta".to_owned(), model(vec!["a"]));
        config.default_virtual_model = "zeta".to_owned();
        assert_eq!(config.default_model_id(), "zeta");
    }
}
