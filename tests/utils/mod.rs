// Shared fixtures for the integration tests
//
// Series are given oldest first (the order they were recorded in) and
// returned newest first, the order the models consume them in.

#![allow(dead_code)]

use changewatch::types::{DataPoint, DatasetRef, DetectionConfig, Variable};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};

/// Newest-first history for variable `variable_id`, one point per day
///
/// Data point ids are `1..=n` in recording order.
pub fn series(variable_id: i64, oldest_first: &[f64]) -> Vec<DataPoint> {
    let start = Utc.with_ymd_and_hms(2023, 1, 27, 11, 9, 50).unwrap();
    let mut points: Vec<DataPoint> = oldest_first
        .iter()
        .enumerate()
        .map(|(i, &value)| DataPoint {
            id: i as i64 + 1,
            variable_id,
            value,
            timestamp: start + Duration::days(i as i64),
            dataset: DatasetRef {
                id: i as i64 + 1,
                run_id: 100 + i as i64,
                ordinal: 0,
            },
        })
        .collect();
    points.reverse();
    points
}

pub fn variable(id: i64, name: &str, detection: Vec<DetectionConfig>) -> Variable {
    Variable {
        id,
        test_id: 1,
        name: name.to_string(),
        group: None,
        order: 0,
        detection,
    }
}

pub fn relative_difference(window: i64, min_previous: i64, threshold: f64) -> DetectionConfig {
    DetectionConfig::new(
        "relativeDifference",
        json!({ "window": window, "minPrevious": min_previous, "threshold": threshold, "filter": "mean" }),
    )
}

/// Input document understood by `changewatch analyze --input`
pub fn analysis_input(variables: &[Variable], points: &[DataPoint]) -> Value {
    json!({ "variables": variables, "dataPoints": points })
}
