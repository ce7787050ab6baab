use crate::metadata::TrackTags;
use rusqlite::Row;
use std::fmt;

/// One scanned file as stored in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    pub filename: String,
    /// Lowercase, including the leading dot.
    pub extension: Option<String>,
    pub format: Option<String>,
    pub file_type: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub composer: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i64>,
    pub track_no: Option<i64>,
    pub track_total: Option<i64>,
    pub disk_no: Option<i64>,
    pub disk_total: Option<i64>,
    pub comment: Option<String>,
    pub size: Option<i64>,
    pub digest: String,
}

impl FileRecord {
    /// A not-yet-inserted record (id 0) for `path` with the given tags.
    pub fn new(
        path: String,
        filename: String,
        extension: Option<String>,
        tags: TrackTags,
        size: Option<i64>,
        digest: String,
    ) -> Self {
        FileRecord {
            id: 0,
            path,
            filename,
            extension,
            format: tags.format,
            file_type: tags.file_type,
            title: tags.title,
            album: tags.album,
            artist: tags.artist,
            album_artist: tags.album_artist,
            composer: tags.composer,
            genre: tags.genre,
            year: tags.year,
            track_no: tags.track_no,
            track_total: tags.track_total,
            disk_no: tags.disk_no,
            disk_total: tags.disk_total,
            comment: tags.comment,
            size,
            digest,
        }
    }

    /// Maps a row selected with `file_columns!()`.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(FileRecord {
            id: row.get(0)?,
            path: row.get(1)?,
            filename: row.get(2)?,
            extension: row.get(3)?,
            format: row.get(4)?,
            file_type: row.get(5)?,
            title: row.get(6)?,
            album: row.get(7)?,
            artist: row.get(8)?,
            album_artist: row.get(9)?,
            composer: row.get(10)?,
            genre: row.get(11)?,
            year: row.get(12)?,
            track_no: row.get(13)?,
            track_total: row.get(14)?,
            disk_no: row.get(15)?,
            disk_total: row.get(16)?,
            comment: row.get(17)?,
            size: row.get(18)?,
            digest: row.get(19)?,
        })
    }
}

/// Identical (artist, album, title) triple shared by a semantic cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagKey {
    pub artist: String,
    pub album: String,
    pub title: String,
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.artist, self.album, self.title)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotMusic,
    MissingTags,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NotMusic => "not a music file",
            RejectReason::MissingTags => "missing tags",
        }
    }
}

/// Which dedup pass produced a duplicate/original row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPass {
    Exact,
    Semantic,
}

impl DedupPass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DedupPass::Exact => "exact",
            DedupPass::Semantic => "semantic",
        }
    }
}

impl fmt::Display for DedupPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file relocated by placement, pending its index update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub record_id: i64,
    pub source: String,
    pub destination: String,
}

/// A row of the duplicate table that has not been nuked yet.
#[derive(Debug, Clone)]
pub struct DuplicateEntry {
    pub rowid: i64,
    pub file_id: i64,
    pub path: String,
    pub duplicate_of: i64,
    pub pass: String,
}

/// Row counts across the index tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub active: i64,
    pub rejected_not_music: i64,
    pub rejected_missing_tags: i64,
    pub duplicates: i64,
    pub duplicates_nuked: i64,
    pub originals: i64,
    pub moved: i64,
}
