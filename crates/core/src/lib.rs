//! # office-to-pdf-core
//!
//! Batch conversion of Office documents to PDF.
//!
//! A run scans one input directory and:
//!
//! - **converts** presentations (`.ppt`, `.pptx`) and word-processor
//!   documents (`.doc`, `.docx`) to PDF by driving an external application
//!   (LibreOffice by default),
//! - **copies** files that already are PDFs,
//! - **skips** anything whose output already exists, so re-running is cheap.
//!
//! Backends are started lazily, only for the document families a run needs,
//! and are always shut down when the run ends. A failing file never stops
//! the batch; it is counted in the [`RunSummary`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use office_to_pdf_core::{Converter, ConverterConfig, NoProgress};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let converter = Converter::new(ConverterConfig::default())?;
//!     let summary = converter
//!         .run(Path::new("./documents"), None, &NoProgress)
//!         .await?;
//!
//!     println!("{} of {} files processed", summary.succeeded, summary.total);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod converter;
pub mod error;
pub mod executor;
pub mod libreoffice;
pub mod planner;
pub mod pool;
pub mod progress;
pub mod task;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use backend::{Backend, BackendFactory};
pub use config::{
    BackendConfig, ConversionProgress, ConversionStage, ConverterConfig, DEFAULT_LOG_FILE,
    DEFAULT_OUTPUT_SUBDIR,
};
pub use converter::{CancelHandle, Converter, ConverterBuilder};
pub use error::{ConversionError, Result};
pub use executor::TaskExecutor;
pub use libreoffice::{LibreOfficeBackend, LibreOfficeFactory};
pub use planner::{plan, Plan};
pub use pool::BackendPool;
pub use progress::{truncate_label, NoProgress, ProgressReporter};
pub use task::{DocumentFamily, RunSummary, Task, TaskKind, TaskResult};

/// Presentation file extensions.
pub const PRESENTATION_EXTENSIONS: &[&str] = &["ppt", "pptx"];

/// Word-processor file extensions.
pub const WORD_PROCESSOR_EXTENSIONS: &[&str] = &["doc", "docx"];

/// Extension of files copied through unchanged.
pub const PDF_EXTENSION: &str = "pdf";

/// Check if a file extension can be converted.
pub fn is_supported_extension(ext: &str) -> bool {
    PRESENTATION_EXTENSIONS
        .iter()
        .chain(WORD_PROCESSOR_EXTENSIONS)
        .any(|&e| e.eq_ignore_ascii_case(ext))
}

/// Initialize the library's logging into `log_file`.
///
/// The file is truncated first. The level comes from `RUST_LOG` and
/// defaults to `info`. Call this once at application startup.
pub fn init_logging(log_file: &std::path::Path) -> Result<()> {
    use std::sync::Mutex;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file = std::fs::File::create(log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .with(filter)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_extension("pptx"));
        assert!(is_supported_extension("PPT"));
        assert!(is_supported_extension("docx"));
        assert!(is_supported_extension("Doc"));
        assert!(!is_supported_extension("pdf"));
        assert!(!is_supported_extension("xlsx"));
        assert!(!is_supported_extension(""));
    }
}
