//! Progress reporting hooks for a run.

use crate::config::ConversionProgress;
use crate::task::{RunSummary, TaskResult};

/// Receives progress events while the converter works through a plan.
///
/// Events arrive in order: `skipped` for each file left alone by the
/// planner, `start` once, then `task_started`/`advance` for every task,
/// then `finish`. A run with nothing to do calls `finish` directly.
pub trait ProgressReporter {
    /// A file was skipped because its output already exists.
    fn skipped(&self, _filename: &str) {}

    /// Number of tasks about to run.
    fn start(&self, total: usize);

    /// A task is about to run.
    fn task_started(&self, progress: &ConversionProgress);

    /// A task finished, successfully or not.
    fn advance(&self, progress: &ConversionProgress, result: &TaskResult);

    /// The run is over.
    fn finish(&self, summary: &RunSummary);
}

/// Reporter that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&self, _total: usize) {}
    fn task_started(&self, _progress: &ConversionProgress) {}
    fn advance(&self, _progress: &ConversionProgress, _result: &TaskResult) {}
    fn finish(&self, _summary: &RunSummary) {}
}

/// Shorten a file name for display, appending "..." when cut.
pub fn truncate_label(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_label_short_text_unchanged() {
        assert_eq!(truncate_label("deck.pptx", 40), "deck.pptx");
    }

    #[test]
    fn test_truncate_label_long_text() {
        let name = "a".repeat(45) + ".docx";
        let label = truncate_label(&name, 40);
        assert_eq!(label, "a".repeat(40) + "...");
    }

    #[test]
    fn test_truncate_label_counts_chars_not_bytes() {
        assert_eq!(truncate_label("報告書.docx", 3), "報告書...");
    }
}
