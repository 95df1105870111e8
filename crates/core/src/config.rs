//! Configuration types for office-to-pdf conversion.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default output sub-directory, created inside the input directory.
pub const DEFAULT_OUTPUT_SUBDIR: &str = "converted_pdf";

/// Default log file written by the command line tool.
pub const DEFAULT_LOG_FILE: &str = "conversion_log.txt";

/// Configuration for the conversion backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Path to soffice binary. If None, searches well-known locations and PATH.
    pub soffice_path: Option<PathBuf>,

    /// Timeout for a single conversion. Copies are not timed out.
    /// A conversion that exceeds it gets its backend terminated and restarted.
    /// Default: 120 seconds.
    pub conversion_timeout: Duration,

    /// Maximum number of documents a backend converts before it is recycled.
    /// Default: 100 documents.
    pub max_docs_per_instance: u32,

    /// Directory for backend profiles and staging files.
    /// Default: system temp directory.
    pub temp_dir: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            soffice_path: None,
            conversion_timeout: Duration::from_secs(120),
            max_docs_per_instance: 100,
            temp_dir: None,
        }
    }
}

impl BackendConfig {
    /// Set the per-task timeout.
    pub fn conversion_timeout(mut self, timeout: Duration) -> Self {
        self.conversion_timeout = timeout;
        self
    }

    /// Set the maximum documents per instance before recycling.
    pub fn max_docs_per_instance(mut self, max: u32) -> Self {
        self.max_docs_per_instance = max;
        self
    }

    /// Set the temporary directory.
    pub fn temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = Some(dir);
        self
    }

    /// Set the soffice binary path.
    pub fn soffice_path(mut self, path: PathBuf) -> Self {
        self.soffice_path = Some(path);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.conversion_timeout.is_zero() {
            return Err(crate::error::ConversionError::InvalidConfig(
                "conversion_timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_docs_per_instance == 0 {
            return Err(crate::error::ConversionError::InvalidConfig(
                "max_docs_per_instance must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Combined configuration for the converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Backend configuration.
    pub backend: BackendConfig,

    /// Output sub-directory used when no output directory is given.
    pub output_subdir: String,

    /// Longest file name shown in progress output before truncation.
    pub max_label_len: usize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            output_subdir: DEFAULT_OUTPUT_SUBDIR.to_string(),
            max_label_len: 40,
        }
    }
}

impl ConverterConfig {
    /// Validate the entire configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        self.backend.validate()?;
        if self.output_subdir.trim().is_empty() {
            return Err(crate::error::ConversionError::InvalidConfig(
                "output_subdir must not be empty".to_string(),
            ));
        }
        if self.max_label_len == 0 {
            return Err(crate::error::ConversionError::InvalidConfig(
                "max_label_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Progress information for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionProgress {
    /// Index of the current task.
    pub task_index: usize,

    /// Total number of planned tasks.
    pub total_tasks: usize,

    /// Name of the current file.
    pub current_file: String,

    /// Tasks finished successfully so far.
    pub succeeded: usize,

    /// Tasks failed so far.
    pub failed: usize,

    /// Current stage of the task.
    pub stage: ConversionStage,
}

impl ConversionProgress {
    /// Tasks finished so far, regardless of outcome.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Stage of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStage {
    /// Copying a PDF into the output directory.
    Copying,
    /// Converting to PDF through a backend.
    Converting,
    /// Completed successfully.
    Completed,
    /// Failed with error.
    Failed,
}
