use crate::storage::models::FileRecord;

/// Decides whether two members of a cluster are interchangeable.
pub trait Equivalence {
    fn equivalent(&self, a: &FileRecord, b: &FileRecord) -> bool;
}

/// Equal in every stored field except id, path and filename.
/// A field present on one side and absent on the other is a difference.
#[derive(Debug, Default, Clone, Copy)]
pub struct SameExceptPath;

impl Equivalence for SameExceptPath {
    fn equivalent(&self, a: &FileRecord, b: &FileRecord) -> bool {
        a.digest == b.digest
            && a.size == b.size
            && a.extension == b.extension
            && a.format == b.format
            && a.file_type == b.file_type
            && a.title == b.title
            && a.album == b.album
            && a.artist == b.artist
            && a.album_artist == b.album_artist
            && a.composer == b.composer
            && a.genre == b.genre
            && a.year == b.year
            && a.track_no == b.track_no
            && a.track_total == b.track_total
            && a.disk_no == b.disk_no
            && a.disk_total == b.disk_total
            && a.comment == b.comment
    }
}
