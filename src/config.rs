// Engine configuration
//
// Only the external divisive model has deployment-specific settings: which
// executable implements the change point tool and how the generated test is
// named in its configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Settings for the external change point tool
///
/// # Example TOML
/// ```toml
/// [edivisive]
/// command = "/opt/hunter/bin/hunter"
/// test_name = "horreum"
///
/// [edivisive.env]
/// PYTHONUNBUFFERED = "1"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EDivisiveSettings {
    /// Executable invoked as `<command> validate` / `<command> analyze <test>`
    pub command: String,

    /// Name of the CSV test inside the generated tool configuration
    pub test_name: String,

    /// Extra environment passed to the tool
    pub env: BTreeMap<String, String>,
}

impl Default for EDivisiveSettings {
    fn default() -> Self {
        Self {
            command: "hunter".to_string(),
            test_name: "horreum".to_string(),
            env: BTreeMap::new(),
        }
    }
}

/// Top-level engine configuration
///
/// # Example
/// ```
/// use changewatch::config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.edivisive.command, "hunter");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub edivisive: EDivisiveSettings,
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read engine config: {}", path.as_ref().display())
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).context("Failed to parse engine configuration")?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.edivisive.command.trim().is_empty() {
            return Err("edivisive.command must not be empty".to_string());
        }

        let name = &self.edivisive.test_name;
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(format!(
                "edivisive.test_name must be a non-empty identifier, got '{}'",
                name
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.edivisive.command, "hunter");
        assert_eq!(config.edivisive.test_name, "horreum");
        assert!(config.edivisive.env.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            r#"
[edivisive]
command = "/opt/hunter/bin/hunter"

[edivisive.env]
PYTHONUNBUFFERED = "1"
"#
        )?;
        file.flush()?;

        let config = EngineConfig::from_toml(file.path())?;
        assert_eq!(config.edivisive.command, "/opt/hunter/bin/hunter");
        assert_eq!(config.edivisive.test_name, "horreum");
        assert_eq!(
            config.edivisive.env.get("PYTHONUNBUFFERED").map(String::as_str),
            Some("1")
        );
        Ok(())
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_toml("/nonexistent/changewatch.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read engine config"));
    }

    #[test]
    fn test_invalid_command() {
        let result = EngineConfig::from_toml_str("[edivisive]\ncommand = \"  \"\n");
        assert!(result.is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_test_name() {
        let mut config = EngineConfig::default();
        config.edivisive.test_name = "has space".to_string();
        assert!(config.validate().is_err());
    }
}
