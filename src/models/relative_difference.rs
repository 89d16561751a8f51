// Relative difference model: floating window vs. preceding baseline
//
// The newest `window` points are aggregated (mean/min/max) and compared to
// the mean of everything older. If the ratio leaves [1 - threshold,
// 1 + threshold] a change is reported, attributed to the oldest point of
// the window that sits on the deviating side of the baseline mean.

use super::{parse_config, ChangeConsumer, ChangeDetectionModel, ModelKind, ModelType};
use crate::descriptor::{ComponentTemplate, ComponentType, ConfigDescriptor};
use crate::error::Result;
use crate::stats::SummaryStatistics;
use crate::types::{Change, DataPoint};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Aggregation applied to the floating window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Mean,
    Min,
    Max,
}

impl Aggregation {
    fn apply(&self, points: &[DataPoint]) -> f64 {
        let stats: SummaryStatistics = points.iter().map(|dp| dp.value).collect();
        match self {
            Aggregation::Mean => stats.mean(),
            Aggregation::Min => stats.min(),
            Aggregation::Max => stats.max(),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Aggregation::Mean => "mean",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelativeDifferenceConfig {
    /// Maximum tolerated relative difference (0.2 = 20%)
    pub threshold: f64,
    /// Number of newest points aggregated into the compared value
    ///
    /// Sliders store numbers as floats; the count is truncated when used.
    pub window: f64,
    /// Minimum number of points preceding the window
    pub min_previous: f64,
    pub filter: Aggregation,
}

impl Default for RelativeDifferenceConfig {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            window: 1.0,
            min_previous: 5.0,
            filter: Aggregation::Mean,
        }
    }
}

impl RelativeDifferenceConfig {
    /// Clamp every field to its floor: threshold >= 0, window >= 1,
    /// minPrevious >= window. Fractional counts are truncated.
    pub fn clamped(&self) -> (f64, usize, usize) {
        let threshold = self.threshold.max(0.0);
        let window = (self.window.max(1.0) as usize).max(1);
        let min_previous = (self.min_previous.max(0.0) as usize).max(window);
        (threshold, window, min_previous)
    }
}

/// Compares the newest points with the mean of preceding ones
#[derive(Debug, Default, Clone, Copy)]
pub struct RelativeDifferenceModel;

impl RelativeDifferenceModel {
    pub fn new() -> Self {
        Self
    }
}

impl ChangeDetectionModel for RelativeDifferenceModel {
    fn model_type(&self) -> ModelType {
        ModelType::RelativeDifference
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Continuous
    }

    fn descriptor(&self) -> ConfigDescriptor {
        ConfigDescriptor {
            name: ModelType::RelativeDifference.as_str().to_string(),
            title: "Relative difference of means".to_string(),
            description: "This is a generic filter that checks whether the last datapoint is \
                          within some range of the mean of past datapoints. The aggregation \
                          of the most recent datapoints can use a floating window to dampen \
                          the effect of a single outlier."
                .to_string(),
            components: vec![
                ComponentTemplate::new(
                    "threshold",
                    "Threshold",
                    "Maximum difference between the aggregated value of last <window> \
                     datapoints and the mean of preceding values.",
                    ComponentType::LogSlider,
                    json!(0.2),
                    json!({ "scale": 0.01, "min": 0.001, "max": 10, "unit": "%", "discrete": false }),
                ),
                ComponentTemplate::new(
                    "window",
                    "Minimum window",
                    "Number of most recent datapoints used for aggregating the value for \
                     comparison.",
                    ComponentType::LogSlider,
                    json!(1),
                    json!({ "scale": 1, "min": 1, "max": 1000, "unit": " ", "discrete": true }),
                ),
                ComponentTemplate::new(
                    "minPrevious",
                    "Minimal history",
                    "Minimal number of preceding datapoints",
                    ComponentType::LogSlider,
                    json!(5),
                    json!({ "scale": 1, "min": 1, "max": 1000, "unit": " ", "discrete": true }),
                ),
                ComponentTemplate::new(
                    "filter",
                    "Aggregation function for the floating window",
                    "Function used to aggregate datapoints from the floating window.",
                    ComponentType::Enum,
                    json!("mean"),
                    json!({ "options": { "mean": "Mean value", "min": "Minimum value", "max": "Maximum value" } }),
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
        let config: RelativeDifferenceConfig = parse_config(self.model_type(), config)?;
        let (threshold, window, min_previous) = config.clamped();

        let Some(newest) = history.first() else {
            return Ok(());
        };

        if history.len() < min_previous + window {
            tracing::debug!(
                "Too few ({}) previous datapoints for variable {}, skipping analysis",
                history.len().saturating_sub(window),
                newest.variable_id
            );
            return Ok(());
        }

        let (window_slice, baseline_slice) = history.split_at(window);
        let baseline: SummaryStatistics = baseline_slice.iter().map(|dp| dp.value).collect();
        let mean = baseline.mean();
        let filtered = config.filter.apply(window_slice);
        let ratio = filtered / mean;

        tracing::trace!(
            "Previous mean {}, filtered value {}, ratio {}",
            mean,
            filtered,
            ratio
        );

        if !(ratio < 1.0 - threshold || ratio > 1.0 + threshold) {
            return Ok(());
        }

        let attributed = attribute(window_slice, mean, ratio);
        let description = format!(
            "Dataset {} ({} of last {} datapoints): {} ({:+.2}%), previous mean {} (stddev {}), {} previous datapoints",
            newest.dataset,
            config.filter,
            window,
            filtered,
            (ratio - 1.0) * 100.0,
            mean,
            baseline.stddev(),
            baseline.count(),
        );

        tracing::debug!(
            "Variable {}: change attributed to datapoint {} (ratio {})",
            newest.variable_id,
            attributed.id,
            ratio
        );
        consumer(Change::from_data_point(attributed, description));
        Ok(())
    }
}

/// Pick the data point that best marks where the deviation started
///
/// Scans the window oldest to newest and returns the first point on the
/// deviating side of the baseline mean. Ties at exactly the mean never
/// qualify; if nothing qualifies the newest point is used.
fn attribute(window_slice: &[DataPoint], mean: f64, ratio: f64) -> &DataPoint {
    window_slice
        .iter()
        .rev()
        .find(|dp| (ratio < 1.0 && dp.value < mean) || (ratio > 1.0 && dp.value > mean))
        .unwrap_or(&window_slice[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::history;

    fn run(values: &[f64], config: serde_json::Value) -> Vec<Change> {
        let mut changes = Vec::new();
        RelativeDifferenceModel
            .analyze(&history(values), &config, &mut |c| changes.push(c))
            .unwrap();
        changes
    }

    fn config(window: i64, min_previous: i64, threshold: f64, filter: &str) -> serde_json::Value {
        json!({ "window": window, "minPrevious": min_previous, "threshold": threshold, "filter": filter })
    }

    #[test]
    fn test_increase_detected() {
        let changes = run(
            &[100.0, 100.0, 100.0, 100.0, 100.0, 130.0],
            config(1, 5, 0.2, "mean"),
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].data_point_id, 6);
        assert!(changes[0].description.contains("+30.00%"));
        assert!(changes[0].description.contains("previous mean 100"));
    }

    #[test]
    fn test_small_increase_ignored() {
        let changes = run(
            &[100.0, 100.0, 100.0, 100.0, 100.0, 115.0],
            config(1, 5, 0.2, "mean"),
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn test_drop_detected() {
        let changes = run(&[100.0, 100.0, 100.0, 100.0, 100.0, 70.0], json!({}));
        assert_eq!(changes.len(), 1);
        assert!(changes[0].description.contains("-30.00%"));
    }

    #[test]
    fn test_abstains_with_short_history() {
        // minPrevious 5 + window 1 = 6 points required
        assert!(run(&[100.0, 100.0, 100.0, 100.0, 500.0], json!({})).is_empty());
        assert!(run(&[], json!({})).is_empty());
    }

    #[test]
    fn test_min_previous_clamped_to_window() {
        // window 3 forces minPrevious >= 3, so 5 points are not enough
        let cfg = config(3, 1, 0.2, "mean");
        assert!(run(&[100.0, 100.0, 500.0, 500.0, 500.0], cfg.clone()).is_empty());
        assert_eq!(
            run(&[100.0, 100.0, 100.0, 500.0, 500.0, 500.0], cfg).len(),
            1
        );
    }

    #[test]
    fn test_clamping() {
        let cfg = RelativeDifferenceConfig {
            threshold: -1.0,
            window: 0.0,
            min_previous: -4.0,
            filter: Aggregation::Max,
        };
        assert_eq!(cfg.clamped(), (0.0, 1, 1));

        let cfg = RelativeDifferenceConfig {
            window: 4.0,
            min_previous: 2.0,
            ..Default::default()
        };
        assert_eq!(cfg.clamped(), (0.2, 4, 4));

        let cfg = RelativeDifferenceConfig {
            window: 2.9,
            min_previous: 5.5,
            ..Default::default()
        };
        assert_eq!(cfg.clamped(), (0.2, 2, 5));
    }

    #[test]
    fn test_float_counts_accepted() {
        // Slider values arrive as floats; they must pass both the
        // descriptor and the model
        let cfg = json!({ "window": 2.0, "minPrevious": 5.0, "threshold": 0.2, "filter": "mean" });
        assert!(RelativeDifferenceModel.descriptor().validate(&cfg).is_ok());

        let changes = run(
            &[100.0, 100.0, 100.0, 100.0, 100.0, 130.0, 130.0],
            cfg.clone(),
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].data_point_id, 6);

        // Six points cannot satisfy window 2 + minPrevious 5
        assert!(run(&[100.0, 100.0, 100.0, 100.0, 130.0, 130.0], cfg).is_empty());
    }

    #[test]
    fn test_window_attribution_picks_first_deviating_point() {
        // Window of 3 newest: 101 (oldest), 150, 160; first above mean is 101
        let changes = run(
            &[100.0, 100.0, 100.0, 100.0, 100.0, 101.0, 150.0, 160.0],
            config(3, 5, 0.2, "mean"),
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].data_point_id, 6);
    }

    #[test]
    fn test_window_attribution_skips_points_on_wrong_side() {
        let changes = run(
            &[100.0, 100.0, 100.0, 100.0, 100.0, 99.0, 150.0, 160.0],
            config(3, 5, 0.2, "mean"),
        );
        assert_eq!(changes[0].data_point_id, 7);
    }

    #[test]
    fn test_min_filter_dampens_single_outlier() {
        let values = [100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 200.0];
        assert!(run(&values, config(2, 5, 0.2, "min")).is_empty());
        assert_eq!(run(&values, config(2, 5, 0.2, "max")).len(), 1);
    }

    #[test]
    fn test_attribution_falls_back_to_newest() {
        let window = history(&[100.0, 100.0]);
        // Every window value equals the mean, nothing qualifies
        let dp = attribute(&window, 100.0, 1.5);
        assert_eq!(dp.id, 2);
    }

    #[test]
    fn test_zero_baseline_mean() {
        // filtered 0 / mean 0 = NaN: never fires
        assert!(run(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0], json!({})).is_empty());
        // positive value over zero mean = +inf: fires
        assert_eq!(run(&[0.0, 0.0, 0.0, 0.0, 0.0, 1.0], json!({})).len(), 1);
    }

    #[test]
    fn test_unknown_filter_is_configuration_error() {
        let err = RelativeDifferenceModel
            .analyze(
                &history(&[1.0; 6]),
                &json!({ "filter": "median" }),
                &mut |_| {},
            )
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("median"));
    }

    #[test]
    fn test_descriptor_defaults_match_config_defaults() {
        let d = RelativeDifferenceModel.descriptor();
        let cfg: RelativeDifferenceConfig =
            parse_config(ModelType::RelativeDifference, &d.defaults()).unwrap();
        assert_eq!(cfg, RelativeDifferenceConfig::default());
        assert!(d.validate(&d.defaults()).is_ok());
    }
}
