use indicatif::{ProgressBar, ProgressStyle};
use music_duper_core::ProgressReporter;
use std::sync::Mutex;
use std::time::Duration;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// indicatif reporter: a spinner while scanning (total unknown), bars for
/// resolution and placement.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }

    fn spinner(message: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(TICKS),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    fn bar(label: &str, total: usize) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        let template = format!(
            "  {{spinner:.cyan}} {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}}",
            label
        );
        pb.set_style(
            ProgressStyle::with_template(&template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("━╸─")
                .tick_chars(TICKS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, root: &str) {
        self.set_bar(Self::spinner(format!("Scanning {}...", root)));
    }

    fn on_file_indexed(&self, files_done: usize, _path: &str) {
        self.with_bar(|pb| pb.set_message(format!("Indexing... {} files", files_done)));
    }

    fn on_file_failed(&self, path: &str, reason: &str) {
        self.with_bar(|pb| pb.println(format!("  \x1b[31m✗\x1b[0m {}: {}", path, reason)));
    }

    fn on_scan_complete(&self, indexed: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} indexed, {} failed in {:.2}s",
            indexed, failed, duration_secs
        );
    }

    fn on_resolve_start(&self, pass: &str, clusters: usize) {
        self.set_bar(Self::bar(&format!("Resolving {}", pass), clusters));
    }

    fn on_cluster_resolved(&self, done: usize, _total: usize) {
        self.with_bar(|pb| pb.set_position(done as u64));
    }

    fn on_resolve_complete(&self, pass: &str, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m {} pass complete in {:.2}s",
            pass, duration_secs
        );
    }

    fn on_place_start(&self, records: usize) {
        self.set_bar(Self::bar("Placing", records));
    }

    fn on_place_progress(&self, done: usize, _total: usize) {
        self.with_bar(|pb| pb.set_position(done as u64));
    }

    fn on_place_complete(&self, moved: usize, skipped: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Placement complete: {} moved, {} skipped in {:.2}s",
            moved, skipped, duration_secs
        );
    }
}
