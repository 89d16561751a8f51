//! Data model consumed and produced by the change detection engine
//!
//! Variables and data points are owned by the host repository and are
//! read-only here. Changes are created by the detection models and handed
//! to the host by value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a tracked variable
pub type VariableId = i64;

/// Identifier of a single data point
pub type DataPointId = i64;

/// Reference to the dataset (and run) a data point was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRef {
    /// Dataset id
    pub id: i64,
    /// Run that produced the dataset
    pub run_id: i64,
    /// Position of the dataset within its run
    #[serde(default)]
    pub ordinal: i32,
}

impl std::fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.run_id, self.ordinal)
    }
}

/// One scalar observation of a variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub id: DataPointId,
    pub variable_id: VariableId,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub dataset: DatasetRef,
}

/// Model identifier plus its JSON parameters, attached to a variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    /// Registered model identifier (e.g. "relativeDifference")
    pub model: String,
    /// Parameters, shaped by the model's config descriptor
    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl DetectionConfig {
    pub fn new(model: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            model: model.into(),
            config,
        }
    }
}

/// A tracked metric of a test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub id: VariableId,
    pub test_id: i64,
    pub name: String,
    /// Optional grouping label used by the UI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub order: i32,
    /// One entry per model that should run against this variable
    #[serde(default)]
    pub detection: Vec<DetectionConfig>,
}

/// A detected deviation, attributed to one data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub variable_id: VariableId,
    pub data_point_id: DataPointId,
    pub dataset: DatasetRef,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    /// Only ever set by a human reviewer
    #[serde(default)]
    pub confirmed: bool,
}

impl Change {
    /// Create an unconfirmed change attributed to `point`
    pub fn from_data_point(point: &DataPoint, description: impl Into<String>) -> Self {
        Self {
            variable_id: point.variable_id,
            data_point_id: point.id,
            dataset: point.dataset,
            timestamp: point.timestamp,
            description: description.into(),
            confirmed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point() -> DataPoint {
        DataPoint {
            id: 42,
            variable_id: 7,
            value: 130.0,
            timestamp: Utc.with_ymd_and_hms(2023, 1, 27, 11, 9, 50).unwrap(),
            dataset: DatasetRef {
                id: 3,
                run_id: 100,
                ordinal: 0,
            },
        }
    }

    #[test]
    fn test_change_from_data_point() {
        let dp = point();
        let change = Change::from_data_point(&dp, "above");

        assert_eq!(change.variable_id, 7);
        assert_eq!(change.data_point_id, 42);
        assert_eq!(change.dataset.id, 3);
        assert_eq!(change.timestamp, dp.timestamp);
        assert!(!change.confirmed);
    }

    #[test]
    fn test_data_point_json_is_camel_case() {
        let json = serde_json::to_value(point()).unwrap();
        assert_eq!(json["variableId"], 7);
        assert_eq!(json["dataset"]["runId"], 100);
    }

    #[test]
    fn test_variable_defaults() {
        let var: Variable =
            serde_json::from_str(r#"{"id": 1, "testId": 2, "name": "throughput"}"#).unwrap();
        assert!(var.group.is_none());
        assert!(var.detection.is_empty());
        assert_eq!(var.order, 0);
    }

    #[test]
    fn test_detection_config_defaults_to_empty_object() {
        let cfg: DetectionConfig = serde_json::from_str(r#"{"model": "eDivisive"}"#).unwrap();
        assert!(cfg.config.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_dataset_display() {
        assert_eq!(point().dataset.to_string(), "100/0");
    }
}
