use crate::error::Result;
use crate::storage::Index;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info, warn};

const RESULT_DELETED: &str = "deleted";
const RESULT_MISSING: &str = "missing";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NukeReport {
    pub deleted: usize,
    pub missing: usize,
    pub failed: usize,
}

/// Deletes the files behind duplicate rows.
///
/// Each row is stamped with `nuked_at` and its outcome, so a later run only
/// touches rows that have not been processed.
pub struct DupNuker<'a> {
    index: &'a Index,
}

impl<'a> DupNuker<'a> {
    pub fn new(index: &'a Index) -> Self {
        DupNuker { index }
    }

    pub fn nuke(&self) -> Result<NukeReport> {
        let pending = self.index.pending_duplicates()?;
        info!("Nuking {} duplicate file(s)", pending.len());
        let mut report = NukeReport::default();

        for entry in &pending {
            let path = Path::new(&entry.path);
            let result = if !path.is_file() {
                warn!("[gone] {}", entry.path);
                report.missing += 1;
                RESULT_MISSING.to_string()
            } else {
                match fs::remove_file(path) {
                    Ok(()) => {
                        debug!("Deleted {} (duplicate of {})", entry.path, entry.duplicate_of);
                        report.deleted += 1;
                        RESULT_DELETED.to_string()
                    }
                    Err(e) => {
                        error!("Failed to remove '{}': {}", entry.path, e);
                        report.failed += 1;
                        format!("error: {}", e)
                    }
                }
            };
            self.index.mark_nuked(entry.rowid, &result)?;
        }

        info!(
            "Nuke complete: {} deleted, {} already gone, {} failed",
            report.deleted, report.missing, report.failed
        );
        Ok(report)
    }
}
