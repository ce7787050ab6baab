//! Populates the index from a directory tree.
//!
//! One thread walks the tree and feeds a bounded queue; `readers` workers
//! drain it, each reading tags, hashing and inserting one record per file.

pub mod walk;

pub use walk::{walk_files, IgnoreFilter, WalkEntry};

use crate::analysis::classifier::{ClassifyReport, Classifier};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::hasher::digest_reader;
use crate::metadata::{MetadataReader, TrackTags};
use crate::progress::ProgressReporter;
use crate::storage::models::FileRecord;
use crate::storage::Index;
use crossbeam_channel::{bounded, Receiver};
use std::fs::{self, File};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A file that was dispatched but produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub path: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct ScanReport {
    /// Files handed to the workers.
    pub dispatched: usize,
    pub ignored: usize,
    /// Entries the walk itself could not read.
    pub unreadable: usize,
    pub indexed: usize,
    pub failures: Vec<ScanFailure>,
    pub classification: ClassifyReport,
    pub duration: Duration,
}

pub struct Scanner<'a> {
    index: &'a Index,
    config: &'a AppConfig,
    reader: Arc<dyn MetadataReader>,
}

impl<'a> Scanner<'a> {
    pub fn new(index: &'a Index, config: &'a AppConfig, reader: Arc<dyn MetadataReader>) -> Self {
        Scanner {
            index,
            config,
            reader,
        }
    }

    /// Walk `root`, index every candidate file with `concurrency` workers, then classify.
    ///
    /// Returns only after every dispatched file is either indexed or reported
    /// as a failure. Storage errors abort the run.
    pub fn populate(
        &self,
        root: &Path,
        concurrency: usize,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanReport> {
        if !root.is_dir() {
            return Err(Error::Other(format!("{} is not a directory", root.display())));
        }
        let start = Instant::now();
        let concurrency = concurrency.max(1);
        let root_str = root.display().to_string();
        info!("Scanning {} with {} readers", root_str, concurrency);
        reporter.on_scan_start(&root_str);

        let filter = IgnoreFilter::new(&self.config.ignore_suffixes, &self.config.ignore_patterns);
        let (sender, receiver) = bounded::<PathBuf>(self.config.queue_capacity.max(1));

        let halt = AtomicBool::new(false);
        let indexed = AtomicUsize::new(0);
        let failures = Mutex::new(Vec::new());
        let mut dispatched = 0usize;
        let mut ignored = 0usize;
        let mut unreadable = 0usize;

        let worker_results: Vec<Result<()>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..concurrency)
                .map(|_| {
                    let receiver = receiver.clone();
                    let ctx = WorkerContext {
                        index: self.index,
                        reader: self.reader.as_ref(),
                        reporter,
                        halt: &halt,
                        indexed: &indexed,
                        failures: &failures,
                    };
                    scope.spawn(move || ctx.run(receiver))
                })
                .collect();
            drop(receiver);

            for entry in walk_files(root, &filter) {
                if halt.load(Ordering::Relaxed) {
                    break;
                }
                match entry {
                    WalkEntry::Candidate(path) => {
                        if sender.send(path).is_err() {
                            // every worker has stopped
                            break;
                        }
                        dispatched += 1;
                    }
                    WalkEntry::Ignored(_) => ignored += 1,
                    WalkEntry::Unreadable(_) => unreadable += 1,
                }
            }
            drop(sender);

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(Error::Other("scanner worker panicked".to_string())))
                })
                .collect()
        });
        for result in worker_results {
            result?;
        }

        let indexed = indexed.into_inner();
        let failures = failures
            .into_inner()
            .map_err(|e| Error::Other(format!("failure list poisoned: {}", e)))?;
        if indexed + failures.len() != dispatched {
            return Err(Error::inconsistent(
                "scan accounting",
                dispatched,
                indexed + failures.len(),
            ));
        }
        let duration = start.elapsed();
        reporter.on_scan_complete(indexed, failures.len(), duration.as_secs_f64());
        info!(
            "Indexed {} of {} files in {:.2}s ({} failed, {} ignored)",
            indexed,
            dispatched,
            duration.as_secs_f64(),
            failures.len(),
            ignored
        );

        let classification = Classifier::new(self.index, self.config).classify()?;

        Ok(ScanReport {
            dispatched,
            ignored,
            unreadable,
            indexed,
            failures,
            classification,
            duration,
        })
    }
}

struct WorkerContext<'s> {
    index: &'s Index,
    reader: &'s dyn MetadataReader,
    reporter: &'s dyn ProgressReporter,
    halt: &'s AtomicBool,
    indexed: &'s AtomicUsize,
    failures: &'s Mutex<Vec<ScanFailure>>,
}

impl WorkerContext<'_> {
    fn run(&self, receiver: Receiver<PathBuf>) -> Result<()> {
        for path in receiver.iter() {
            match read_record(self.reader, &path) {
                Ok(record) => {
                    if let Err(e) = self.index.insert_file_record(&record) {
                        self.halt.store(true, Ordering::Relaxed);
                        return Err(e);
                    }
                    let done = self.indexed.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!("Indexed {}", record.path);
                    self.reporter.on_file_indexed(done, &record.path);
                }
                Err(reason) => {
                    let path = path.display().to_string();
                    error!("Failed to index {}: {}", path, reason);
                    self.reporter.on_file_failed(&path, &reason);
                    self.failures
                        .lock()
                        .map_err(|e| Error::Other(format!("failure list poisoned: {}", e)))?
                        .push(ScanFailure { path, reason });
                }
            }
        }
        Ok(())
    }
}

/// Build the record for one file. `Err` carries the per-file failure reason.
pub fn read_record(reader: &dyn MetadataReader, path: &Path) -> std::result::Result<FileRecord, String> {
    let canonical = fs::canonicalize(path).map_err(|e| format!("canonicalize: {}", e))?;
    let mut file = File::open(&canonical).map_err(|e| format!("open: {}", e))?;
    let size = file.metadata().ok().map(|m| m.len() as i64);

    let tags = match reader.read(&mut file) {
        Ok(tags) => tags,
        Err(e) => {
            warn!("No tags for {}: {}", canonical.display(), e);
            TrackTags::default()
        }
    };

    file.seek(SeekFrom::Start(0))
        .map_err(|e| format!("rewind: {}", e))?;
    let digest = digest_reader(&mut file).map_err(|e| format!("hash: {}", e))?;

    let filename = canonical
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = canonical
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()));

    Ok(FileRecord::new(
        canonical.to_string_lossy().into_owned(),
        filename,
        extension,
        tags,
        size,
        digest.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataError;
    use tempfile::tempdir;

    struct NoTags;

    impl MetadataReader for NoTags {
        fn read(&self, _file: &mut File) -> std::result::Result<TrackTags, MetadataError> {
            Err(MetadataError::Parse("no tags here".to_string()))
        }
    }

    #[test]
    fn test_metadata_failure_keeps_record_with_empty_tags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Track.MP3");
        fs::write(&path, b"not really audio").unwrap();

        let record = read_record(&NoTags, &path).unwrap();
        assert_eq!(record.extension.as_deref(), Some(".mp3"));
        assert_eq!(record.filename, "Track.MP3");
        assert_eq!(record.size, Some(16));
        assert_eq!(record.title, None);
        assert_eq!(record.digest.len(), crate::hasher::DIGEST_WIDTH);
    }

    #[test]
    fn test_missing_file_is_a_failure() {
        let dir = tempdir().unwrap();
        let result = read_record(&NoTags, &dir.path().join("gone.mp3"));
        assert!(result.is_err());
    }
}
