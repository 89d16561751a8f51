// Pluggable change detection models
//
// Each model is a pure function of (newest-first history, JSON config) that
// emits zero or more changes through a consumer callback. Continuous models
// look at the newest point(s) against what came before; bulk models
// reprocess the whole series at once.

pub mod edivisive;
mod fixed_threshold;
mod relative_difference;

pub use edivisive::EDivisiveModel;
pub use fixed_threshold::{Bound, FixedThresholdConfig, FixedThresholdModel};
pub use relative_difference::{Aggregation, RelativeDifferenceConfig, RelativeDifferenceModel};

use crate::descriptor::ConfigDescriptor;
use crate::error::{ChangeDetectionError, Result};
use crate::types::{Change, DataPoint};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Callback receiving every emitted change
pub type ChangeConsumer<'a> = dyn FnMut(Change) + 'a;

/// Identifier of a registered detection model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "fixedThreshold")]
    FixedThreshold,
    #[serde(rename = "relativeDifference")]
    RelativeDifference,
    #[serde(rename = "eDivisive")]
    EDivisive,
}

impl ModelType {
    pub const ALL: [ModelType; 3] = [
        ModelType::FixedThreshold,
        ModelType::RelativeDifference,
        ModelType::EDivisive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::FixedThreshold => "fixedThreshold",
            ModelType::RelativeDifference => "relativeDifference",
            ModelType::EDivisive => "eDivisive",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = ChangeDetectionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ChangeDetectionError::UnknownModel(s.to_string()))
    }
}

/// How a model consumes history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Judges the newest point(s) against preceding history
    Continuous,
    /// Reprocesses the entire series in one go
    Bulk,
}

/// A change detection algorithm
///
/// Implementations hold no mutable state and may be shared across threads.
pub trait ChangeDetectionModel: Send + Sync {
    fn model_type(&self) -> ModelType;

    fn kind(&self) -> ModelKind;

    /// UI/validation schema for this model's parameters
    fn descriptor(&self) -> ConfigDescriptor;

    /// Analyze a newest-first history and report changes to `consumer`
    ///
    /// Returning `Ok(())` without calling the consumer means the model
    /// abstained or found nothing.
    fn analyze(
        &self,
        history: &[DataPoint],
        config: &serde_json::Value,
        consumer: &mut ChangeConsumer<'_>,
    ) -> Result<()>;
}

/// Deserialize a model configuration, treating `null` as `{}`
pub(crate) fn parse_config<T: DeserializeOwned>(
    model: ModelType,
    config: &serde_json::Value,
) -> Result<T> {
    let value = if config.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        config.clone()
    };
    serde_json::from_value(value).map_err(|e| ChangeDetectionError::invalid_config(model.as_str(), e))
}
