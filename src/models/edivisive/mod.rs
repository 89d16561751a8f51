// E-divisive change point detection through an external tool
//
// Unlike the continuous models this one is batch: the whole series is
// written out, handed to the tool, and every change point the tool reports
// is mapped back to an input data point. The tool is reached through the
// `ChangePointTool` port so the protocol handling can run without a real
// process.

pub mod protocol;
pub mod tool;
mod workspace;

pub use protocol::ParsedChangePoint;
pub use tool::{ChangePointTool, HunterProcess, ToolCommand, ToolOutput};
pub use workspace::ToolWorkspace;

use super::{ChangeConsumer, ChangeDetectionModel, ModelKind, ModelType};
use crate::config::EDivisiveSettings;
use crate::descriptor::ConfigDescriptor;
use crate::error::{ChangeDetectionError, Result};
use crate::types::{Change, DataPoint};

/// Batch model delegating to the external e-divisive implementation
pub struct EDivisiveModel {
    test_name: String,
    tool: Box<dyn ChangePointTool>,
}

impl std::fmt::Debug for EDivisiveModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EDivisiveModel")
            .field("test_name", &self.test_name)
            .finish_non_exhaustive()
    }
}

impl Default for EDivisiveModel {
    fn default() -> Self {
        Self::new(&EDivisiveSettings::default())
    }
}

impl EDivisiveModel {
    /// Model spawning the executable named in `settings`
    pub fn new(settings: &EDivisiveSettings) -> Self {
        Self::with_tool(
            &settings.test_name,
            Box::new(HunterProcess::new(settings.clone())),
        )
    }

    /// Model using an arbitrary tool implementation
    pub fn with_tool(test_name: &str, tool: Box<dyn ChangePointTool>) -> Self {
        Self {
            test_name: test_name.to_string(),
            tool,
        }
    }

    fn validate(&self, workspace: &ToolWorkspace) -> Result<()> {
        let output = self.tool.run(workspace, ToolCommand::Validate)?;
        let lines = output.combined();

        let verdict = protocol::check_validation(&lines).and_then(|()| {
            if output.success() {
                Ok(())
            } else {
                Err(format!("validate ended with {}", output.status_string()))
            }
        });

        verdict.map_err(|reason| {
            tracing::error!(
                "Could not validate {}: {}",
                workspace.input_file().display(),
                reason
            );
            ChangeDetectionError::Validation {
                input: workspace.input_file().to_path_buf(),
                reason,
            }
        })
    }

    fn change_points(&self, workspace: &ToolWorkspace, since: i64) -> Result<Vec<ParsedChangePoint>> {
        let output = self.tool.run(workspace, ToolCommand::Analyze { since })?;
        if !output.success() {
            tracing::error!(
                "Change point tool failed with {}",
                output.status_string()
            );
            return Err(ChangeDetectionError::ToolFailed {
                command: output.command.clone(),
                status: output.status_string(),
                stderr: output.stderr.join("\n"),
            });
        }

        Ok(protocol::parse_change_points(&output.stdout))
    }
}

impl ChangeDetectionModel for EDivisiveModel {
    fn model_type(&self) -> ModelType {
        ModelType::EDivisive
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Bulk
    }

    fn descriptor(&self) -> ConfigDescriptor {
        ConfigDescriptor {
            name: ModelType::EDivisive.as_str().to_string(),
            title: "eDivisive - Hunter".to_string(),
            description: "This model uses the Hunter implementation of the e-divisive \
                          algorithm to find all change points in the whole series."
                .to_string(),
            components: Vec::new(),
        }
    }

    fn analyze(
        &self,
        history: &[DataPoint],
        _config: &serde_json::Value,
        consumer: &mut ChangeConsumer<'_>,
    ) -> Result<()> {
        let Some(oldest) = history.last() else {
            return Ok(());
        };

        // Dropping the workspace removes the temp directory on every path
        let workspace = ToolWorkspace::create(&self.test_name)?;
        workspace.write_series(history.iter().rev())?;
        tracing::debug!(
            "Created change point input {} ({} datapoints)",
            workspace.input_file().display(),
            history.len()
        );

        self.validate(&workspace)?;

        for point in self.change_points(&workspace, oldest.timestamp.timestamp())? {
            match history.iter().find(|dp| dp.id == point.data_point_id) {
                Some(dp) => consumer(Change::from_data_point(
                    dp,
                    format!(
                        "eDivisive detected change {} at {}",
                        point.summary, point.timestamp
                    ),
                )),
                None => tracing::error!(
                    "Could not find datapoint ({}) in set!",
                    point.data_point_id
                ),
            }
        }

        Ok(())
    }
}
