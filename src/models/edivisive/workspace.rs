// Scoped working directory for one external tool invocation
//
// Every invocation gets a fresh, uniquely named temp directory holding the
// CSV series and the tool configuration. The directory is removed when the
// workspace is dropped, on success and error paths alike.

use super::protocol;
use crate::types::DataPoint;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const INPUT_FILE: &str = "tests.csv";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug)]
pub struct ToolWorkspace {
    dir: TempDir,
    input_file: PathBuf,
    config_file: PathBuf,
}

impl ToolWorkspace {
    /// Create the temp directory and write the tool configuration into it
    pub fn create(test_name: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("changewatch-edivisive-")
            .tempdir()?;
        let input_file = dir.path().join(INPUT_FILE);
        let config_file = dir.path().join(CONFIG_FILE);

        fs::write(&config_file, protocol::tool_config(test_name, &input_file))?;

        Ok(Self {
            dir,
            input_file,
            config_file,
        })
    }

    /// Write the series (oldest point first) as the tool input
    pub fn write_series<'a>(
        &self,
        oldest_first: impl IntoIterator<Item = &'a DataPoint>,
    ) -> io::Result<()> {
        let file = File::create(&self.input_file)?;
        protocol::write_csv(BufWriter::new(file), oldest_first)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn input_file(&self) -> &Path {
        &self.input_file
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }
}
