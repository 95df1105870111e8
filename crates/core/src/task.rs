//! Units of work produced by the planner and their outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Word's `wdFormatPDF` save code.
pub const WORD_PDF_FORMAT: i32 = 17;

/// PowerPoint's `ppSaveAsPDF` save code.
pub const PRESENTATION_PDF_FORMAT: i32 = 32;

/// Document category, which decides the backend and save code used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentFamily {
    /// `.ppt`, `.pptx`
    Presentation,
    /// `.doc`, `.docx`
    WordProcessor,
}

impl DocumentFamily {
    /// Every family, in a stable order.
    pub const ALL: [DocumentFamily; 2] = [DocumentFamily::Presentation, DocumentFamily::WordProcessor];

    /// Resolve the family from a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        if crate::PRESENTATION_EXTENSIONS
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
        {
            Some(DocumentFamily::Presentation)
        } else if crate::WORD_PROCESSOR_EXTENSIONS
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
        {
            Some(DocumentFamily::WordProcessor)
        } else {
            None
        }
    }

    /// Resolve the family from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// The save code that asks the family's application for PDF output.
    pub fn pdf_format_code(self) -> i32 {
        match self {
            DocumentFamily::Presentation => PRESENTATION_PDF_FORMAT,
            DocumentFamily::WordProcessor => WORD_PDF_FORMAT,
        }
    }

    /// Name of the application that handles this family.
    pub fn display_name(self) -> &'static str {
        match self {
            DocumentFamily::Presentation => "PowerPoint",
            DocumentFamily::WordProcessor => "Word",
        }
    }
}

impl fmt::Display for DocumentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What a task does with its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Copy an existing PDF to the output directory.
    Copy,
    /// Convert an Office document to PDF through a backend.
    Convert,
}

/// One planned operation on one file of the input directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    /// File name relative to the input directory.
    pub filename: String,
}

impl Task {
    pub fn copy(filename: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::Copy,
            filename: filename.into(),
        }
    }

    pub fn convert(filename: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::Convert,
            filename: filename.into(),
        }
    }

    /// Family of the backend this task needs, `None` for copies.
    pub fn family(&self) -> Option<DocumentFamily> {
        match self.kind {
            TaskKind::Copy => None,
            TaskKind::Convert => DocumentFamily::from_path(Path::new(&self.filename)),
        }
    }

    /// Name of the file this task writes into the output directory.
    pub fn output_filename(&self) -> String {
        match self.kind {
            TaskKind::Copy => self.filename.clone(),
            TaskKind::Convert => pdf_filename(&self.filename),
        }
    }

    pub fn source_path(&self, input_dir: &Path) -> PathBuf {
        input_dir.join(&self.filename)
    }

    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.output_filename())
    }
}

/// `report.docx` -> `report.pdf`
pub(crate) fn pdf_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    format!("{}.{}", stem, crate::PDF_EXTENSION)
}

/// Outcome of executing one task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub task: Task,
    pub ok: bool,
    /// Failure reason, set when `ok` is false.
    pub error: Option<String>,
    /// Wall-clock time spent on the task.
    pub duration: Duration,
}

impl TaskResult {
    pub fn succeeded(task: Task, duration: Duration) -> Self {
        Self {
            task,
            ok: true,
            error: None,
            duration,
        }
    }

    pub fn failed(task: Task, reason: impl fmt::Display, duration: Duration) -> Self {
        Self {
            task,
            ok: false,
            error: Some(reason.to_string()),
            duration,
        }
    }
}

/// Aggregated outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl RunSummary {
    pub fn from_results(results: &[TaskResult], duration: Duration) -> Self {
        let succeeded = results.iter().filter(|r| r.ok).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_extension_is_case_insensitive() {
        assert_eq!(
            DocumentFamily::from_extension("PPTX"),
            Some(DocumentFamily::Presentation)
        );
        assert_eq!(
            DocumentFamily::from_extension("ppt"),
            Some(DocumentFamily::Presentation)
        );
        assert_eq!(
            DocumentFamily::from_extension("Doc"),
            Some(DocumentFamily::WordProcessor)
        );
        assert_eq!(
            DocumentFamily::from_extension("docx"),
            Some(DocumentFamily::WordProcessor)
        );
        assert_eq!(DocumentFamily::from_extension("pdf"), None);
        assert_eq!(DocumentFamily::from_extension("xlsx"), None);
    }

    #[test]
    fn test_family_format_codes() {
        assert_eq!(DocumentFamily::WordProcessor.pdf_format_code(), 17);
        assert_eq!(DocumentFamily::Presentation.pdf_format_code(), 32);
    }

    #[test]
    fn test_convert_task_output_uses_stem() {
        let task = Task::convert("quarterly.report.docx");
        assert_eq!(task.output_filename(), "quarterly.report.pdf");
        assert_eq!(task.family(), Some(DocumentFamily::WordProcessor));
        assert_eq!(
            task.output_path(Path::new("/out")),
            PathBuf::from("/out/quarterly.report.pdf")
        );
    }

    #[test]
    fn test_copy_task_keeps_name_and_needs_no_backend() {
        let task = Task::copy("Scan.PDF");
        assert_eq!(task.output_filename(), "Scan.PDF");
        assert_eq!(task.family(), None);
        assert_eq!(
            task.source_path(Path::new("/in")),
            PathBuf::from("/in/Scan.PDF")
        );
    }

    #[test]
    fn test_summary_from_results() {
        let results = vec![
            TaskResult::succeeded(Task::copy("a.pdf"), Duration::ZERO),
            TaskResult::failed(Task::convert("b.docx"), "boom", Duration::ZERO),
            TaskResult::succeeded(Task::convert("c.pptx"), Duration::ZERO),
        ];
        let summary = RunSummary::from_results(&results, Duration::from_secs(1));
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_failed_result_keeps_reason() {
        let result = TaskResult::failed(Task::copy("a.pdf"), "disk full", Duration::ZERO);
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("disk full"));
    }
}
