//! Moves surviving records into `<root>/<artist>/<album>/<NN> <title><ext>`.
//!
//! Files are moved first; the index is updated afterwards in one transaction.
//! If the process dies between the two, the moved records stay active and
//! show up as `SourceMissing` on the next run until the tree is re-scanned.

use crate::error::{Error, Result};
use crate::hasher::{digest_file, Digest};
use crate::metadata::{MP4_FORMAT, UNKNOWN_FILE_TYPE, UNKNOWN_FORMAT};
use crate::progress::ProgressReporter;
use crate::storage::models::{FileRecord, MoveRecord};
use crate::storage::Index;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

const UNKNOWN_COMPONENT: &str = "Unknown";

/// Why a record was left where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    UnknownFormat,
    MissingTags,
    SourceMissing,
    DestinationExists,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::UnknownFormat => "unrecognized format",
            SkipReason::MissingTags => "missing artist, album or title",
            SkipReason::SourceMissing => "source is not a regular file",
            SkipReason::DestinationExists => "destination already exists",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub record_id: i64,
    pub path: String,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct PlacementReport {
    /// Completed moves, or planned ones on a dry run.
    pub moved: Vec<MoveRecord>,
    pub skipped: Vec<Skipped>,
    /// Moves that hit an IO error; their records stay active.
    pub failed: usize,
    pub dry_run: bool,
}

impl PlacementReport {
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|s| s.reason == reason).count()
    }
}

pub struct PlacementEngine<'a> {
    index: &'a Index,
}

impl<'a> PlacementEngine<'a> {
    pub fn new(index: &'a Index) -> Self {
        PlacementEngine { index }
    }

    /// Move every placeable active record under `dest_root`, then drop the moved
    /// records from the active set. With `dry_run` nothing on disk or in the
    /// index changes.
    pub fn place(
        &self,
        dest_root: &Path,
        dry_run: bool,
        reporter: &dyn ProgressReporter,
    ) -> Result<PlacementReport> {
        let start = Instant::now();
        let records = self.index.active_records()?;
        let total = records.len();
        info!(
            "Placing {} record(s) under {}{}",
            total,
            dest_root.display(),
            if dry_run { " (dry run)" } else { "" }
        );
        reporter.on_place_start(total);

        let mut report = PlacementReport {
            dry_run,
            ..PlacementReport::default()
        };
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        for (done, record) in records.iter().enumerate() {
            match plan(dest_root, record, &claimed) {
                Err(reason) => {
                    warn!("Skipping {}: {}", record.path, reason);
                    report.skipped.push(Skipped {
                        record_id: record.id,
                        path: record.path.clone(),
                        reason,
                    });
                }
                Ok(destination) => {
                    let source = Path::new(&record.path);
                    let outcome = if dry_run {
                        Ok(())
                    } else {
                        move_into_place(source, &destination)
                    };
                    match outcome {
                        Ok(()) => {
                            debug!("{} -> {}", record.path, destination.display());
                            report.moved.push(MoveRecord {
                                record_id: record.id,
                                source: record.path.clone(),
                                destination: destination.to_string_lossy().into_owned(),
                            });
                            claimed.insert(destination);
                        }
                        Err(e) => {
                            error!(
                                "Failed to move {} to {}: {}",
                                record.path,
                                destination.display(),
                                e
                            );
                            report.failed += 1;
                        }
                    }
                }
            }
            reporter.on_place_progress(done + 1, total);
        }

        if !dry_run {
            let marked = self.index.mark_moved(&report.moved)?;
            if marked != report.moved.len() {
                return Err(Error::inconsistent("placement", report.moved.len(), marked));
            }
        }

        reporter.on_place_complete(
            report.moved.len(),
            report.skipped.len(),
            start.elapsed().as_secs_f64(),
        );
        info!(
            "Placement: {} moved, {} skipped, {} failed",
            report.moved.len(),
            report.skipped.len(),
            report.failed
        );
        Ok(report)
    }
}

fn plan(dest_root: &Path, record: &FileRecord, claimed: &HashSet<PathBuf>) -> std::result::Result<PathBuf, SkipReason> {
    if !has_known_format(record) {
        return Err(SkipReason::UnknownFormat);
    }
    let destination = destination_for(dest_root, record)?;
    if !Path::new(&record.path).is_file() {
        return Err(SkipReason::SourceMissing);
    }
    if destination.is_file() || claimed.contains(&destination) {
        return Err(SkipReason::DestinationExists);
    }
    Ok(destination)
}

/// Unknown format is never placeable; MP4 needs no file type; anything
/// else needs a recognized file type.
pub fn has_known_format(record: &FileRecord) -> bool {
    match record.format.as_deref() {
        None | Some(UNKNOWN_FORMAT) => false,
        Some(MP4_FORMAT) => true,
        Some(_) => matches!(record.file_type.as_deref(), Some(t) if t != UNKNOWN_FILE_TYPE),
    }
}

/// Canonical location of `record` under `root`. Album artist wins over album
/// when non-empty; a missing track number renders as `00`.
pub fn destination_for(root: &Path, record: &FileRecord) -> std::result::Result<PathBuf, SkipReason> {
    let (artist, album, title) = match (&record.artist, &record.album, &record.title) {
        (Some(artist), Some(album), Some(title)) => (artist, album, title),
        _ => return Err(SkipReason::MissingTags),
    };
    let album_dir = match record.album_artist.as_deref() {
        Some(album_artist) if !album_artist.is_empty() => album_artist,
        _ => album.as_str(),
    };
    let track = record.track_no.unwrap_or(0);
    let file_name = format!(
        "{:02} {}{}",
        track,
        sanitize_component(title),
        record.extension.as_deref().unwrap_or("")
    );
    Ok(root
        .join(sanitize_component(artist))
        .join(sanitize_component(album_dir))
        .join(file_name))
}

fn sanitize_component(value: &str) -> String {
    let cleaned = value.replace(['/', '\\'], "_");
    match cleaned.as_str() {
        "" | "." | ".." => UNKNOWN_COMPONENT.to_string(),
        _ => cleaned,
    }
}

/// Rename, or copy, verify and remove the source when rename fails
/// (e.g. across filesystems).
fn move_into_place(source: &Path, destination: &Path) -> io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }

    let expected = digest_file(source)?;
    fs::copy(source, destination)?;
    undo_copy_on_error(destination, finish_copy(source, destination, expected))
}

/// Verify the copy at `destination` against the source digest, then remove the source.
fn finish_copy(source: &Path, destination: &Path, expected: Digest) -> io::Result<()> {
    if digest_file(destination)? != expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("copy of {} failed verification", source.display()),
        ));
    }
    fs::remove_file(source)
}

/// Drop the copy of a move that did not complete, so the record stays
/// placeable on the next run.
fn undo_copy_on_error(destination: &Path, result: io::Result<()>) -> io::Result<()> {
    if result.is_err() {
        if let Err(e) = fs::remove_file(destination) {
            error!("Failed to remove partial copy {}: {}", destination.display(), e);
        }
    }
    result
}
