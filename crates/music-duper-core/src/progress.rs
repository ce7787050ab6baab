/// Trait for reporting pipeline progress.
///
/// The CLI implements it with indicatif bars. Scanner workers call it from
/// several threads at once. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _root: &str) {}
    fn on_file_indexed(&self, _files_done: usize, _path: &str) {}
    fn on_file_failed(&self, _path: &str, _reason: &str) {}
    fn on_scan_complete(&self, _indexed: usize, _failed: usize, _duration_secs: f64) {}
    fn on_resolve_start(&self, _pass: &str, _clusters: usize) {}
    fn on_cluster_resolved(&self, _done: usize, _total: usize) {}
    fn on_resolve_complete(&self, _pass: &str, _duration_secs: f64) {}
    fn on_place_start(&self, _records: usize) {}
    fn on_place_progress(&self, _done: usize, _total: usize) {}
    fn on_place_complete(&self, _moved: usize, _skipped: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
