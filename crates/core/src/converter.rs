//! Main converter orchestrator that ties together the planner, the backend
//! pool and the task executor.
//!
//! A run plans the input directory, starts only the backends the plan needs,
//! executes tasks one at a time in plan order, always releases the backends
//! and finally summarizes the results.

use crate::backend::BackendFactory;
use crate::config::{ConversionProgress, ConversionStage, ConverterConfig};
use crate::error::{ConversionError, Result};
use crate::executor::TaskExecutor;
use crate::libreoffice::LibreOfficeFactory;
use crate::planner::{self, Plan};
use crate::pool::BackendPool;
use crate::progress::ProgressReporter;
use crate::task::{RunSummary, TaskKind, TaskResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Cooperative cancellation flag, checked before each task starts.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Batch converter for a directory of Office documents.
pub struct Converter<F: BackendFactory = LibreOfficeFactory> {
    factory: F,
    config: ConverterConfig,
    cancel: CancelHandle,
}

impl Converter<LibreOfficeFactory> {
    /// Create a converter backed by LibreOffice.
    pub fn new(config: ConverterConfig) -> Result<Self> {
        let factory = LibreOfficeFactory::new(config.backend.clone())?;
        Self::with_factory(factory, config)
    }
}

impl<F: BackendFactory> Converter<F> {
    /// Create a converter that starts its backends through `factory`.
    pub fn with_factory(factory: F, config: ConverterConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            "Converter configured with timeout={:?}, max_docs_per_instance={}",
            config.backend.conversion_timeout, config.backend.max_docs_per_instance
        );
        Ok(Self {
            factory,
            config,
            cancel: CancelHandle::default(),
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Handle that stops the run before its next task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Output directory used when none is given: `<input>/converted_pdf`.
    pub fn default_output_dir(&self, input_dir: &Path) -> PathBuf {
        input_dir.join(&self.config.output_subdir)
    }

    /// Convert and copy everything pending in `input_dir`.
    ///
    /// Individual task failures are counted in the summary. Only an invalid
    /// input directory, an output directory that cannot be created, a backend
    /// that cannot be started, or cancellation make the run itself fail.
    ///
    /// Stop a run through [`Converter::cancel_handle`]. Dropping this future
    /// before it completes skips the orderly backend shutdown.
    pub async fn run<P>(
        &self,
        input_dir: &Path,
        output_dir: Option<&Path>,
        progress: &P,
    ) -> Result<RunSummary>
    where
        P: ProgressReporter + ?Sized,
    {
        let start = Instant::now();

        if !input_dir.is_dir() {
            return Err(ConversionError::InvalidInput(input_dir.to_path_buf()));
        }
        let output_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_output_dir(input_dir));
        std::fs::create_dir_all(&output_dir).map_err(|e| ConversionError::OutputDirError {
            path: output_dir.clone(),
            message: e.to_string(),
        })?;

        info!("Processing {:?} into {:?}", input_dir, output_dir);

        let plan = planner::plan(input_dir, &output_dir)?;
        for filename in &plan.skipped {
            progress.skipped(filename);
        }

        if plan.is_empty() {
            info!("No files to copy or convert.");
            let summary = RunSummary {
                duration: start.elapsed(),
                ..Default::default()
            };
            progress.finish(&summary);
            return Ok(summary);
        }

        let mut pool = BackendPool::acquire(
            &self.factory,
            &plan.required_families(),
            self.config.backend.max_docs_per_instance,
        )
        .await?;

        let results = self
            .execute_all(&plan, input_dir, &output_dir, &mut pool, progress)
            .await;
        pool.release().await;
        let results = results?;

        let summary = RunSummary::from_results(&results, start.elapsed());
        info!(
            "Processed {} files in {:?}: {} succeeded, {} failed",
            summary.total, summary.duration, summary.succeeded, summary.failed
        );
        progress.finish(&summary);
        Ok(summary)
    }

    async fn execute_all<P>(
        &self,
        plan: &Plan,
        input_dir: &Path,
        output_dir: &Path,
        pool: &mut BackendPool<'_, F>,
        progress: &P,
    ) -> Result<Vec<TaskResult>>
    where
        P: ProgressReporter + ?Sized,
    {
        let executor = TaskExecutor::new(input_dir, output_dir);
        let timeout = self.config.backend.conversion_timeout;
        let total = plan.len();
        let mut results = Vec::with_capacity(total);
        let (mut succeeded, mut failed) = (0, 0);

        progress.start(total);

        for (task_index, task) in plan.tasks.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!("Run cancelled before '{}'", task.filename);
                return Err(ConversionError::Interrupted {
                    completed: results.len(),
                    total,
                });
            }

            let mut snapshot = ConversionProgress {
                task_index,
                total_tasks: total,
                current_file: task.filename.clone(),
                succeeded,
                failed,
                stage: match task.kind {
                    TaskKind::Copy => ConversionStage::Copying,
                    TaskKind::Convert => ConversionStage::Converting,
                },
            };
            progress.task_started(&snapshot);

            let result = executor.run(task, pool, timeout).await;
            if result.ok {
                succeeded += 1;
                snapshot.stage = ConversionStage::Completed;
            } else {
                failed += 1;
                snapshot.stage = ConversionStage::Failed;
            }
            snapshot.succeeded = succeeded;
            snapshot.failed = failed;
            progress.advance(&snapshot, &result);
            results.push(result);
        }

        Ok(results)
    }
}

/// Builder for creating a LibreOffice-backed Converter with custom settings.
pub struct ConverterBuilder {
    config: ConverterConfig,
}

impl ConverterBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ConverterConfig::default(),
        }
    }

    /// Start from an existing configuration, e.g. one loaded from a file.
    pub fn from_config(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Set the per-task timeout.
    pub fn conversion_timeout(mut self, timeout: Duration) -> Self {
        self.config.backend.conversion_timeout = timeout;
        self
    }

    /// Set the conversions per backend before it is recycled.
    pub fn max_docs_per_instance(mut self, max: u32) -> Self {
        self.config.backend.max_docs_per_instance = max;
        self
    }

    /// Set the path to soffice binary.
    pub fn soffice_path(mut self, path: PathBuf) -> Self {
        self.config.backend.soffice_path = Some(path);
        self
    }

    /// Set the temporary directory.
    pub fn temp_dir(mut self, dir: PathBuf) -> Self {
        self.config.backend.temp_dir = Some(dir);
        self
    }

    /// Set the default output sub-directory name.
    pub fn output_subdir(mut self, name: impl Into<String>) -> Self {
        self.config.output_subdir = name.into();
        self
    }

    /// Build the converter.
    pub fn build(self) -> Result<Converter> {
        Converter::new(self.config)
    }
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::testing::{SpyEvent, SpyFactory};
    use tempfile::TempDir;

    // ========== ConverterBuilder tests ==========

    #[test]
    fn test_builder_default() {
        let builder = ConverterBuilder::new();
        let default_config = ConverterConfig::default();
        assert_eq!(builder.config.output_subdir, default_config.output_subdir);
        assert_eq!(
            builder.config.backend.conversion_timeout,
            default_config.backend.conversion_timeout
        );
    }

    #[test]
    fn test_builder_chaining() {
        let builder = ConverterBuilder::new()
            .conversion_timeout(Duration::from_secs(90))
            .max_docs_per_instance(10)
            .soffice_path(PathBuf::from("/custom/soffice"))
            .temp_dir(PathBuf::from("/custom/temp"))
            .output_subdir("pdfs");

        assert_eq!(
            builder.config.backend.conversion_timeout,
            Duration::from_secs(90)
        );
        assert_eq!(builder.config.backend.max_docs_per_instance, 10);
        assert_eq!(
            builder.config.backend.soffice_path,
            Some(PathBuf::from("/custom/soffice"))
        );
        assert_eq!(
            builder.config.backend.temp_dir,
            Some(PathBuf::from("/custom/temp"))
        );
        assert_eq!(builder.config.output_subdir, "pdfs");
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = ConverterBuilder::new()
            .conversion_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(ConversionError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_output_dir() {
        let converter =
            Converter::with_factory(SpyFactory::default(), ConverterConfig::default()).unwrap();
        assert_eq!(
            converter.default_output_dir(Path::new("/docs")),
            PathBuf::from("/docs/converted_pdf")
        );
    }

    #[test]
    fn test_cancel_handle_is_shared() {
        let converter =
            Converter::with_factory(SpyFactory::default(), ConverterConfig::default()).unwrap();
        let handle = converter.cancel_handle();
        assert!(!converter.cancel.is_cancelled());
        handle.cancel();
        assert!(converter.cancel.is_cancelled());
    }

    // ========== run tests ==========

    #[tokio::test]
    async fn test_run_creates_default_output_dir() {
        let input = TempDir::new().unwrap();
        std::fs::write(input.path().join("scan.pdf"), b"%PDF").unwrap();
        let factory = SpyFactory::default();
        let converter = Converter::with_factory(factory.clone(), ConverterConfig::default()).unwrap();

        let summary = converter.run(input.path(), None, &NoProgress).await.unwrap();
        assert_eq!(summary.total, 1);
        assert!(input.path().join("converted_pdf").join("scan.pdf").exists());
        assert!(factory.events().is_empty());
    }

    #[tokio::test]
    async fn test_run_cancelled_before_first_task_still_releases() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        std::fs::write(input.path().join("deck.pptx"), b"x").unwrap();
        let factory = SpyFactory::default();
        let converter = Converter::with_factory(factory.clone(), ConverterConfig::default()).unwrap();
        converter.cancel_handle().cancel();

        let result = converter
            .run(input.path(), Some(output.path()), &NoProgress)
            .await;
        assert!(matches!(
            result,
            Err(ConversionError::Interrupted {
                completed: 0,
                total: 1
            })
        ));
        assert_eq!(
            factory.count(|e| matches!(e, SpyEvent::Open(_))),
            0
        );
        assert_eq!(factory.quits(crate::DocumentFamily::Presentation), 1);
    }

    #[tokio::test]
    async fn test_libreoffice_converter_copies_without_soffice() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        std::fs::write(input.path().join("scan.pdf"), b"%PDF").unwrap();

        let converter = ConverterBuilder::new()
            .soffice_path(PathBuf::from("/nonexistent/soffice"))
            .build()
            .unwrap();
        let summary = converter
            .run(input.path(), Some(output.path()), &NoProgress)
            .await
            .unwrap();
        assert_eq!(summary.succeeded, 1);
    }

    #[tokio::test]
    async fn test_libreoffice_converter_fails_without_soffice() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        std::fs::write(input.path().join("letter.docx"), b"x").unwrap();

        let converter = ConverterBuilder::new()
            .soffice_path(PathBuf::from("/nonexistent/soffice"))
            .build()
            .unwrap();
        let result = converter
            .run(input.path(), Some(output.path()), &NoProgress)
            .await;
        assert!(matches!(result, Err(ConversionError::LibreOfficeNotFound)));
    }
}
