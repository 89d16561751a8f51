// Port to the external change point tool, and its process adapter

use super::protocol;
use super::workspace::ToolWorkspace;
use crate::config::EDivisiveSettings;
use crate::error::{ChangeDetectionError, Result};
use std::fmt;
use std::process::{Command, Stdio};

/// Environment variable through which the tool finds its configuration
pub const CONFIG_ENV: &str = "HUNTER_CONFIG";

/// Sub-command to run against a prepared workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCommand {
    /// Check the generated input
    Validate,
    /// Compute change points for points at or after `since` (epoch seconds)
    Analyze { since: i64 },
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolCommand::Validate => write!(f, "validate"),
            ToolCommand::Analyze { since } => {
                write!(f, "analyze --since {}", protocol::since_argument(*since))
            }
        }
    }
}

/// Captured result of one tool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Command line, for diagnostics
    pub command: String,
    /// Exit code; `None` if the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// stdout followed by stderr
    pub fn combined(&self) -> Vec<String> {
        self.stdout.iter().chain(&self.stderr).cloned().collect()
    }

    pub(crate) fn status_string(&self) -> String {
        match self.status {
            Some(code) => format!("exit code {}", code),
            None => "signal".to_string(),
        }
    }
}

/// Anything that can run the change point tool against a workspace
///
/// Runs block until the tool exits; the host imposes any deadline.
pub trait ChangePointTool: Send + Sync {
    fn run(&self, workspace: &ToolWorkspace, command: ToolCommand) -> Result<ToolOutput>;
}

/// Spawns the configured executable
#[derive(Debug, Clone)]
pub struct HunterProcess {
    settings: EDivisiveSettings,
}

impl HunterProcess {
    pub fn new(settings: EDivisiveSettings) -> Self {
        Self { settings }
    }

    fn command_line(&self, command: ToolCommand) -> String {
        match command {
            ToolCommand::Validate => format!("{} validate", self.settings.command),
            ToolCommand::Analyze { since } => format!(
                "{} analyze {} --since {}",
                self.settings.command,
                self.settings.test_name,
                protocol::since_argument(since)
            ),
        }
    }
}

impl ChangePointTool for HunterProcess {
    fn run(&self, workspace: &ToolWorkspace, command: ToolCommand) -> Result<ToolOutput> {
        let mut cmd = Command::new(&self.settings.command);
        match command {
            ToolCommand::Validate => {
                cmd.arg("validate");
            }
            ToolCommand::Analyze { since } => {
                cmd.arg("analyze")
                    .arg(&self.settings.test_name)
                    .arg("--since")
                    .arg(protocol::since_argument(since));
            }
        }
        cmd.env(CONFIG_ENV, workspace.config_file())
            .envs(&self.settings.env)
            .current_dir(workspace.path())
            .stdin(Stdio::null());

        let command_line = self.command_line(command);
        tracing::debug!("Running command: {}", command_line);

        // output() drains stdout and stderr concurrently before waiting
        let output = cmd.output().map_err(|source| ChangeDetectionError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        Ok(ToolOutput {
            command: command_line,
            status: output.status.code(),
            stdout: lines(&output.stdout),
            stderr: lines(&output.stderr),
        })
    }
}

fn lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}
