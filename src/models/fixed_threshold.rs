// Fixed threshold model: memoryless bound check on the newest data point

use super::{parse_config, ChangeConsumer, ChangeDetectionModel, ModelKind, ModelType};
use crate::descriptor::{disabled_bound, ComponentTemplate, ComponentType, ConfigDescriptor};
use crate::error::Result;
use crate::types::{Change, DataPoint};
use serde::{Deserialize, Serialize};

/// One side of the acceptable value range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bound {
    pub enabled: bool,
    /// Whether a value exactly at the bound is acceptable
    pub inclusive: bool,
    pub value: f64,
}

impl Default for Bound {
    fn default() -> Self {
        Self {
            enabled: false,
            inclusive: true,
            value: 0.0,
        }
    }
}

impl Bound {
    fn mode(&self) -> &'static str {
        if self.inclusive {
            "inclusive"
        } else {
            "exclusive"
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedThresholdConfig {
    pub min: Bound,
    pub max: Bound,
}

/// Checks that the newest value lies within fixed bounds
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedThresholdModel;

impl FixedThresholdModel {
    pub fn new() -> Self {
        Self
    }
}

impl ChangeDetectionModel for FixedThresholdModel {
    fn model_type(&self) -> ModelType {
        ModelType::FixedThreshold
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Continuous
    }

    fn descriptor(&self) -> ConfigDescriptor {
        ConfigDescriptor {
            name: ModelType::FixedThreshold.as_str().to_string(),
            title: "Fixed Threshold".to_string(),
            description: "This model checks that the datapoint value is within fixed bounds."
                .to_string(),
            components: vec![
                ComponentTemplate::new(
                    "min",
                    "Minimum",
                    "Lower bound for acceptable datapoint values.",
                    ComponentType::NumberBound,
                    disabled_bound(),
                    serde_json::Value::Null,
                ),
                ComponentTemplate::new(
                    "max",
                    "Maximum",
                    "Upper bound for acceptable datapoint values.",
                    ComponentType::NumberBound,
                    disabled_bound(),
                    serde_json::Value::Null,
                ),
            ],
        }
    }

    fn analyze(
        &self,
        history: &[DataPoint],
        config: &serde_json::Value,
        consumer: &mut ChangeConsumer<'_>,
    ) -> Result<()> {
        let config: FixedThresholdConfig = parse_config(self.model_type(), config)?;
        let Some(newest) = history.first() else {
            return Ok(());
        };
        let value = newest.value;

        let min = config.min;
        if min.enabled && (value < min.value || (value == min.value && !min.inclusive)) {
            tracing::debug!(
                "Variable {}: value {} violates lower bound {}",
                newest.variable_id,
                value,
                min.value
            );
            consumer(Change::from_data_point(
                newest,
                format!(
                    "{} is below lower bound {} ({})",
                    value,
                    min.value,
                    min.mode()
                ),
            ));
            return Ok(());
        }

        let max = config.max;
        if max.enabled && (value > max.value || (value == max.value && !max.inclusive)) {
            tracing::debug!(
                "Variable {}: value {} violates upper bound {}",
                newest.variable_id,
                value,
                max.value
            );
            consumer(Change::from_data_point(
                newest,
                format!(
                    "{} is above upper bound {} ({})",
                    value,
                    max.value,
                    max.mode()
                ),
            ));
        }

        Ok(())
    }
}
