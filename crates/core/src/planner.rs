//! Scans an input directory and decides which files to copy or convert.

use crate::error::{ConversionError, Result};
use crate::task::{DocumentFamily, Task, TaskKind};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Ordered list of pending tasks plus the files that were skipped.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub tasks: Vec<Task>,
    /// Input files left alone because their output already exists or is claimed.
    pub skipped: Vec<String>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Families whose backend must be running to execute this plan.
    pub fn required_families(&self) -> BTreeSet<DocumentFamily> {
        self.tasks.iter().filter_map(Task::family).collect()
    }
}

/// Build the plan for `input_dir`, writing into `output_dir`.
///
/// Only direct entries are considered. Tasks keep the directory's iteration
/// order. Files with unsupported extensions are ignored without notice.
pub fn plan(input_dir: &Path, output_dir: &Path) -> Result<Plan> {
    if !input_dir.is_dir() {
        return Err(ConversionError::InvalidInput(input_dir.to_path_buf()));
    }

    let same_dir = canonical(input_dir) == canonical(output_dir);
    let mut plan = Plan::default();
    // output name -> input file that claimed it
    let mut claimed: HashMap<String, String> = HashMap::new();

    for entry in fs::read_dir(input_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() && !entry.path().is_file() {
            continue;
        }

        let Ok(filename) = entry.file_name().into_string() else {
            warn!("Skipping '{}': file name is not valid UTF-8", entry.path().display());
            continue;
        };

        let kind = match classify(&filename) {
            Some(kind) => kind,
            None => continue,
        };

        if kind == TaskKind::Copy && same_dir {
            debug!("'{}' is already in the output directory", filename);
            continue;
        }

        let task = Task { kind, filename };
        let output_name = task.output_filename();

        if let Some(owner) = claimed.get(&output_name) {
            info!(
                "Skipping '{}', '{}' already produces '{}'.",
                task.filename, owner, output_name
            );
            plan.skipped.push(task.filename);
            continue;
        }

        if output_dir.join(&output_name).exists() {
            match task.kind {
                TaskKind::Convert => info!(
                    "Skipping conversion for '{}', PDF already exists.",
                    task.filename
                ),
                TaskKind::Copy => info!(
                    "Skipping copy for '{}', file already exists in output directory.",
                    task.filename
                ),
            }
            plan.skipped.push(task.filename);
            continue;
        }

        claimed.insert(output_name, task.filename.clone());
        plan.tasks.push(task);
    }

    debug!(
        "Planned {} tasks, skipped {} files in {:?}",
        plan.tasks.len(),
        plan.skipped.len(),
        input_dir
    );

    Ok(plan)
}

fn classify(filename: &str) -> Option<TaskKind> {
    let ext = Path::new(filename).extension()?.to_str()?;
    if ext.eq_ignore_ascii_case(crate::PDF_EXTENSION) {
        Some(TaskKind::Copy)
    } else if crate::is_supported_extension(ext) {
        Some(TaskKind::Convert)
    } else {
        None
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
