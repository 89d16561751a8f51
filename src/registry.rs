//! Model registry: resolves configured model identifiers to implementations
//!
//! The registry is built once and never mutated afterwards, so a single
//! instance can be shared by every thread of the host.

use crate::config::EngineConfig;
use crate::descriptor::ConfigDescriptor;
use crate::error::{ChangeDetectionError, Result};
use crate::models::{
    ChangeDetectionModel, EDivisiveModel, FixedThresholdModel, ModelType,
    RelativeDifferenceModel,
};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Registry of change detection models keyed by identifier
///
/// # Example
/// ```
/// use changewatch::registry::ModelRegistry;
///
/// let model = ModelRegistry::global().resolve("relativeDifference")?;
/// assert_eq!(model.model_type().as_str(), "relativeDifference");
/// assert!(ModelRegistry::global().resolve("bogus").is_err());
/// # Ok::<(), changewatch::error::ChangeDetectionError>(())
/// ```
pub struct ModelRegistry {
    models: BTreeMap<ModelType, Box<dyn ChangeDetectionModel>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.models.keys()).finish()
    }
}

impl ModelRegistry {
    /// Registry with every built-in model, using `config` for the external tool
    pub fn with_settings(config: &EngineConfig) -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(FixedThresholdModel::new()));
        registry.register(Box::new(RelativeDifferenceModel::new()));
        registry.register(Box::new(EDivisiveModel::new(&config.edivisive)));
        registry
    }

    /// Registry without any model
    pub fn empty() -> Self {
        Self {
            models: BTreeMap::new(),
        }
    }

    /// Add (or replace) the model registered under its own type
    pub fn register(&mut self, model: Box<dyn ChangeDetectionModel>) {
        let model_type = model.model_type();
        if self.models.insert(model_type, model).is_some() {
            tracing::debug!("Replaced registered model {}", model_type);
        }
    }

    /// Process-wide registry with default settings
    pub fn global() -> &'static ModelRegistry {
        static GLOBAL: OnceLock<ModelRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| ModelRegistry::with_settings(&EngineConfig::default()))
    }

    /// Look up the model for an identifier such as "fixedThreshold"
    ///
    /// # Errors
    /// `UnknownModel` if the identifier names no registered model.
    pub fn resolve(&self, identifier: &str) -> Result<&dyn ChangeDetectionModel> {
        let model_type: ModelType = identifier.parse()?;
        self.models
            .get(&model_type)
            .map(|m| m.as_ref())
            .ok_or_else(|| ChangeDetectionError::UnknownModel(identifier.to_string()))
    }

    /// Every registered model, keyed by identifier
    pub fn all_models(&self) -> BTreeMap<&'static str, &dyn ChangeDetectionModel> {
        self.models
            .iter()
            .map(|(t, m)| (t.as_str(), m.as_ref()))
            .collect()
    }

    /// Config descriptors of every registered model, keyed by identifier
    pub fn descriptors(&self) -> BTreeMap<String, ConfigDescriptor> {
        self.models
            .iter()
            .map(|(t, m)| (t.as_str().to_string(), m.descriptor()))
            .collect()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_settings(&EngineConfig::default())
    }
}
