//! Analysis driver: runs the configured models of a variable over its history
//!
//! The driver is stateless. The host supplies history through a
//! [`HistorySource`] and receives every change through a consumer callback;
//! persisting changes (and deciding what happens to a failed variable) is
//! the host's business.

use crate::error::{ChangeDetectionError, Result};
use crate::models::{ChangeConsumer, ChangeDetectionModel, ModelKind};
use crate::registry::ModelRegistry;
use crate::types::{DataPoint, DetectionConfig, Variable, VariableId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Where the driver loads a variable's data points from
pub trait HistorySource {
    /// Every data point of `variable`, in any order
    fn load_history(&self, variable: &Variable) -> anyhow::Result<Vec<DataPoint>>;
}

/// History source backed by a map, used by the CLI and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    points: HashMap<VariableId, Vec<DataPoint>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, point: DataPoint) {
        self.points.entry(point.variable_id).or_default().push(point);
    }

    pub fn len(&self) -> usize {
        self.points.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<DataPoint> for InMemoryHistory {
    fn from_iter<I: IntoIterator<Item = DataPoint>>(iter: I) -> Self {
        let mut history = Self::new();
        for point in iter {
            history.insert(point);
        }
        history
    }
}

impl HistorySource for InMemoryHistory {
    fn load_history(&self, variable: &Variable) -> anyhow::Result<Vec<DataPoint>> {
        Ok(self.points.get(&variable.id).cloned().unwrap_or_default())
    }
}

/// Per-invocation options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Timestamp of the latest known change of the variable
    ///
    /// Continuous models only see points at or after it, so a confirmed
    /// shift becomes the new baseline. Bulk models always see everything.
    pub since: Option<DateTime<Utc>>,
}

/// What one driver call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub variable_id: VariableId,
    pub models_run: usize,
    pub changes: usize,
}

/// Runs detection models for variables
#[derive(Debug, Clone, Copy)]
pub struct AnalysisDriver<'r> {
    registry: &'r ModelRegistry,
}

impl Default for AnalysisDriver<'static> {
    fn default() -> Self {
        Self::new(ModelRegistry::global())
    }
}

impl<'r> AnalysisDriver<'r> {
    pub fn new(registry: &'r ModelRegistry) -> Self {
        Self { registry }
    }

    /// Analyze the newest data of `variable` with each configured model
    ///
    /// # Errors
    /// Fails on the first model that cannot be resolved (before any model
    /// runs), on history loading failures, and on model failures.
    pub fn analyze_variable(
        &self,
        variable: &Variable,
        source: &dyn HistorySource,
        request: &AnalysisRequest,
        consumer: &mut ChangeConsumer<'_>,
    ) -> Result<AnalysisSummary> {
        let models = self.resolve_all(variable)?;
        let history = load_sorted(variable, source)?;
        let mut changes = 0;

        for (model, detection) in &models {
            let input = match (model.kind(), request.since) {
                (ModelKind::Continuous, Some(since)) => since_prefix(&history, since),
                _ => &history[..],
            };

            tracing::debug!(
                "Running {} on variable {} ({}) with {} datapoints",
                model.model_type(),
                variable.id,
                variable.name,
                input.len()
            );

            model.analyze(input, &detection.config, &mut |change| {
                changes += 1;
                consumer(change);
            })?;
        }

        Ok(AnalysisSummary {
            variable_id: variable.id,
            models_run: models.len(),
            changes,
        })
    }

    /// Recompute all changes of `variable` from scratch
    ///
    /// Continuous models are replayed point by point from the oldest, as if
    /// each point had just arrived, restarting their baseline at every
    /// change they report. Bulk models run once over the whole series.
    pub fn recalculate(
        &self,
        variable: &Variable,
        source: &dyn HistorySource,
        consumer: &mut ChangeConsumer<'_>,
    ) -> Result<AnalysisSummary> {
        let models = self.resolve_all(variable)?;
        let history = load_sorted(variable, source)?;
        let mut changes = 0;

        for (model, detection) in &models {
            tracing::debug!(
                "Recalculating {} for variable {} ({} datapoints)",
                model.model_type(),
                variable.id,
                history.len()
            );

            match model.kind() {
                ModelKind::Bulk => {
                    model.analyze(&history, &detection.config, &mut |change| {
                        changes += 1;
                        consumer(change);
                    })?;
                }
                ModelKind::Continuous => {
                    // history[newest..regime_end] is what the model sees at each step
                    let mut regime_end = history.len();
                    for newest in (0..history.len()).rev() {
                        let mut latest: Option<DateTime<Utc>> = None;
                        model.analyze(
                            &history[newest..regime_end],
                            &detection.config,
                            &mut |change| {
                                latest = latest.max(Some(change.timestamp));
                                changes += 1;
                                consumer(change);
                            },
                        )?;

                        if let Some(since) = latest {
                            regime_end = newest + since_prefix(&history[newest..], since).len();
                        }
                    }
                }
            }
        }

        Ok(AnalysisSummary {
            variable_id: variable.id,
            models_run: models.len(),
            changes,
        })
    }

    fn resolve_all<'v>(
        &self,
        variable: &'v Variable,
    ) -> Result<Vec<(&'r dyn ChangeDetectionModel, &'v DetectionConfig)>> {
        variable
            .detection
            .iter()
            .map(|detection| {
                self.registry
                    .resolve(&detection.model)
                    .map(|model| (model, detection))
            })
            .collect()
    }
}

/// Load history and order it newest first
fn load_sorted(variable: &Variable, source: &dyn HistorySource) -> Result<Vec<DataPoint>> {
    let mut history = source
        .load_history(variable)
        .map_err(|e| ChangeDetectionError::History {
            variable_id: variable.id,
            message: format!("{:#}", e),
        })?;
    history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    Ok(history)
}

/// Newest-first prefix of points at or after `since`
fn since_prefix(newest_first: &[DataPoint], since: DateTime<Utc>) -> &[DataPoint] {
    let n = newest_first
        .iter()
        .take_while(|dp| dp.timestamp >= since)
        .count();
    &newest_first[..n]
}
