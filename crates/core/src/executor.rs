//! Executes single tasks. Every failure is captured in the returned
//! [`TaskResult`]; nothing propagates past this module.

use crate::backend::{Backend, BackendFactory};
use crate::error::{ConversionError, Result};
use crate::pool::BackendPool;
use crate::task::{DocumentFamily, Task, TaskKind, TaskResult};
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

/// Runs tasks from one input directory into one output directory.
#[derive(Debug, Clone, Copy)]
pub struct TaskExecutor<'a> {
    input_dir: &'a Path,
    output_dir: &'a Path,
}

impl<'a> TaskExecutor<'a> {
    pub fn new(input_dir: &'a Path, output_dir: &'a Path) -> Self {
        Self {
            input_dir,
            output_dir,
        }
    }

    /// Execute `task` with read-only access to the running backends.
    pub async fn execute<F: BackendFactory>(
        &self,
        task: &Task,
        pool: &BackendPool<'_, F>,
    ) -> TaskResult {
        let start = Instant::now();
        let outcome = match task.kind {
            TaskKind::Copy => self.copy(task).await,
            TaskKind::Convert => self.convert(task, pool).await,
        };

        match outcome {
            Ok(()) => {
                match task.kind {
                    TaskKind::Copy => info!("Copied '{}' to output directory.", task.filename),
                    TaskKind::Convert => {
                        info!("Successfully converted '{}' to PDF.", task.filename)
                    }
                }
                TaskResult::succeeded(task.clone(), start.elapsed())
            }
            Err(e) => {
                log_failure(task, &e);
                TaskResult::failed(task.clone(), e, start.elapsed())
            }
        }
    }

    /// Execute `task` and keep the pool healthy afterwards.
    ///
    /// Conversions run under `timeout`; one that times out gets its backend
    /// terminated and restarted. Successful conversions count towards the
    /// backend's recycling budget. Copies are not timed out: a blocking copy
    /// cannot be abandoned midway, so it always runs to completion.
    pub async fn run<F: BackendFactory>(
        &self,
        task: &Task,
        pool: &mut BackendPool<'_, F>,
        timeout: Duration,
    ) -> TaskResult {
        if task.kind == TaskKind::Copy {
            return self.execute(task, &*pool).await;
        }

        let start = Instant::now();
        match tokio::time::timeout(timeout, self.execute(task, &*pool)).await {
            Ok(result) => {
                if result.ok {
                    if let Some(family) = task.family() {
                        pool.record_conversion(family).await;
                    }
                }
                result
            }
            Err(_) => {
                let e = ConversionError::Timeout {
                    path: task.source_path(self.input_dir),
                    timeout,
                };
                log_failure(task, &e);
                if let Some(family) = task.family() {
                    if pool.recycle(family).await.is_err() {
                        warn!(
                            "{} tasks will fail until the backend can be started again",
                            family
                        );
                    }
                }
                TaskResult::failed(task.clone(), e, start.elapsed())
            }
        }
    }

    async fn copy(&self, task: &Task) -> Result<()> {
        let source = task.source_path(self.input_dir);
        let target = task.output_path(self.output_dir);
        tokio::task::spawn_blocking(move || copy_with_metadata(&source, &target))
            .await
            .map_err(io::Error::other)??;
        Ok(())
    }

    async fn convert<F: BackendFactory>(&self, task: &Task, pool: &BackendPool<'_, F>) -> Result<()> {
        let source = task.source_path(self.input_dir);
        let family = DocumentFamily::from_path(&source).ok_or_else(|| {
            ConversionError::UnsupportedFormat {
                extension: source
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            }
        })?;

        let backend = pool.get(family).ok_or_else(|| {
            error!(
                "No {} backend for '{}'; the pool was acquired for the wrong families",
                family, task.filename
            );
            ConversionError::BackendNotInitialized { family }
        })?;

        let output = task.output_path(self.output_dir);
        let document = backend.open(&source).await?;
        let saved = backend
            .save_as_pdf(&document, &output, family.pdf_format_code())
            .await;
        let closed = backend.close(document).await;

        match (saved, closed) {
            (Ok(()), closed) => closed,
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!(
                    "Could not close '{}' after failed save: {}",
                    task.filename, close_err
                );
                Err(e)
            }
        }
    }
}

fn log_failure(task: &Task, e: &ConversionError) {
    match task.kind {
        TaskKind::Copy => error!("Could not copy '{}': {}", task.filename, e),
        TaskKind::Convert => error!("Failed to convert '{}': {}", task.filename, e),
    }
}

/// Temporary file next to `target`, renamed onto it once complete.
///
/// Dropping it removes the file, so an interrupted write never leaves a
/// partial output that a later run would mistake for a finished one.
pub(crate) fn staging_file(target: &Path) -> io::Result<NamedTempFile> {
    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    tempfile::Builder::new()
        .prefix(".office-to-pdf-")
        .suffix(".part")
        .tempfile_in(dir)
}

/// Copy `source` to `target`, keeping permissions and timestamps where the
/// platform allows it. `target` only appears once the copy is complete.
pub fn copy_with_metadata(source: &Path, target: &Path) -> io::Result<()> {
    let staged = staging_file(target)?;
    fs::copy(source, staged.path())?;

    let metadata = fs::metadata(source)?;
    let mut times = fs::FileTimes::new();
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    // Some filesystems reject timestamp updates.
    if let Err(e) = staged.as_file().set_times(times) {
        debug!("Could not preserve timestamps of {:?}: {}", target, e);
    }

    staged.persist(target).map_err(|e| e.error)?;
    Ok(())
}
