//! Tag metadata extraction.
//!
//! The scanner only depends on [`MetadataReader`]; [`LoftyReader`] is the
//! production implementation.

mod lofty_reader;

pub use lofty_reader::LoftyReader;

use std::fs::File;
use thiserror::Error;

/// Format tag for a container whose tag type could not be determined.
pub const UNKNOWN_FORMAT: &str = "UNKNOWN";
/// File-type tag for an unrecognized audio stream.
pub const UNKNOWN_FILE_TYPE: &str = "UNKNOWN";
/// Format tag of MP4/M4A atoms, which carry no separate file type.
pub const MP4_FORMAT: &str = "MP4";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("failed to parse tags: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structured tags as read from a file. `None` means the tag is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub format: Option<String>,
    pub file_type: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub composer: Option<String>,
    pub genre: Option<String>,
    pub comment: Option<String>,
    pub year: Option<i64>,
    pub track_no: Option<i64>,
    pub track_total: Option<i64>,
    pub disk_no: Option<i64>,
    pub disk_total: Option<i64>,
}

/// Reads tags from an already opened file.
///
/// Implementations may leave the file cursor anywhere; callers rewind before
/// reusing the handle.
pub trait MetadataReader: Send + Sync {
    fn read(&self, file: &mut File) -> Result<TrackTags, MetadataError>;
}
