use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use walkdir::WalkDir;

/// Decides which walked paths never become records.
pub struct IgnoreFilter {
    suffixes: Vec<String>,
    patterns: Vec<Pattern>,
}

impl IgnoreFilter {
    /// Invalid glob patterns are logged and dropped.
    pub fn new(suffixes: &[String], globs: &[String]) -> Self {
        let patterns = globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();
        IgnoreFilter {
            suffixes: suffixes.to_vec(),
            patterns,
        }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.suffixes.iter().any(|suffix| text.ends_with(suffix.as_str()))
            || self.patterns.iter().any(|pattern| pattern.matches_path(path))
    }

    fn prunes_dir(&self, path: &Path) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches_path(path))
    }
}

/// What the walk found at one path.
#[derive(Debug)]
pub enum WalkEntry {
    Candidate(PathBuf),
    Ignored(PathBuf),
    /// The walk could not read this entry; it is logged and left out.
    Unreadable(String),
}

/// Depth-first walk of the regular files under `root`. Symlinks are not
/// followed and directories matching an ignore pattern are not entered.
pub fn walk_files<'a>(root: &Path, filter: &'a IgnoreFilter) -> impl Iterator<Item = WalkEntry> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            entry.depth() == 0 || !entry.file_type().is_dir() || !filter.prunes_dir(entry.path())
        })
        .filter_map(move |entry| match entry {
            Ok(entry) if entry.file_type().is_file() => {
                let path = entry.into_path();
                if filter.is_ignored(&path) {
                    debug!("Ignoring {}", path.display());
                    Some(WalkEntry::Ignored(path))
                } else {
                    Some(WalkEntry::Candidate(path))
                }
            }
            Ok(_) => None,
            Err(err) => {
                let location = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                error!("Error walking {}: {}", location, err);
                Some(WalkEntry::Unreadable(location))
            }
        })
}
