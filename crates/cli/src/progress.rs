use indicatif::{ProgressBar, ProgressStyle};
use office_to_pdf_core::{
    truncate_label, ConversionProgress, ProgressReporter, RunSummary, TaskResult,
};
use std::sync::Mutex;

const BAR_TEMPLATE: &str = "{msg} [{bar:40}] {pos}/{len} ETA: {eta_precise}";

/// Terminal progress bar that also remembers which files failed.
pub struct BarReporter {
    pb: ProgressBar,
    max_label_len: usize,
    failed: Mutex<Vec<(String, String)>>,
}

impl BarReporter {
    pub fn new(no_progress: bool, max_label_len: usize) -> Self {
        let pb = if no_progress {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("##-"),
            );
            pb
        };
        Self {
            pb,
            max_label_len,
            failed: Mutex::new(Vec::new()),
        }
    }

    /// Failed file names with their error messages, in task order.
    pub fn failures(&self) -> Vec<(String, String)> {
        self.failed
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }
}

impl ProgressReporter for BarReporter {
    fn skipped(&self, filename: &str) {
        self.pb.println(format!(
            "Skipping '{}', PDF already exists.",
            truncate_label(filename, self.max_label_len)
        ));
    }

    fn start(&self, total: usize) {
        self.pb.set_length(total as u64);
        self.pb.set_position(0);
    }

    fn task_started(&self, progress: &ConversionProgress) {
        self.pb.set_message(format!(
            "Processing {}",
            truncate_label(&progress.current_file, self.max_label_len)
        ));
    }

    fn advance(&self, _progress: &ConversionProgress, result: &TaskResult) {
        if !result.ok {
            if let Ok(mut failed) = self.failed.lock() {
                failed.push((
                    result.task.filename.clone(),
                    result.error.clone().unwrap_or_default(),
                ));
            }
        }
        self.pb.inc(1);
    }

    fn finish(&self, _summary: &RunSummary) {
        self.pb.finish_and_clear();
    }
}
