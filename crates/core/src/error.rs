//! Error types for office-to-pdf conversion.

use crate::task::DocumentFamily;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the office-to-pdf library.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Input directory is missing or is not a directory.
    #[error("Input directory does not exist: {0}")]
    InvalidInput(PathBuf),

    /// LibreOffice is not installed or not found in PATH.
    #[error("LibreOffice not found. Please install LibreOffice and ensure 'soffice' is in PATH")]
    LibreOfficeNotFound,

    /// A backend could not be started.
    #[error("Failed to start {family} backend: {message}")]
    BackendStartFailed {
        family: DocumentFamily,
        message: String,
    },

    /// A backend did not shut down cleanly.
    #[error("Error while quitting {family} backend: {message}")]
    BackendShutdownFailed {
        family: DocumentFamily,
        message: String,
    },

    /// A conversion was requested for a family with no running backend.
    #[error("{family} backend not initialized")]
    BackendNotInitialized { family: DocumentFamily },

    /// The backend failed to open, save or close a document.
    #[error("Conversion failed for '{path}': {message}")]
    ConversionFailed { path: PathBuf, message: String },

    /// A single task exceeded its time budget.
    #[error("Task timed out after {timeout:?} for '{path}'")]
    Timeout { path: PathBuf, timeout: Duration },

    /// Input file not found.
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    /// Unsupported file format.
    #[error("Unsupported file format: {extension}. Supported: .ppt, .pptx, .doc, .docx")]
    UnsupportedFormat { extension: String },

    /// The backend does not know the requested save format.
    #[error("Unsupported PDF format code: {0}")]
    UnsupportedFormatCode(i32),

    /// Output directory creation failed.
    #[error("Failed to create output directory '{path}': {message}")]
    OutputDirError { path: PathBuf, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The run was cancelled between tasks.
    #[error("Operation cancelled by user after {completed} of {total} tasks")]
    Interrupted { completed: usize, total: usize },

    /// Filesystem error.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, ConversionError>;
