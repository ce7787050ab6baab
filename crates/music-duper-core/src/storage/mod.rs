/// Column list shared by every table that stores a full file record.
macro_rules! file_columns {
    () => {
        "id, path, filename, extension, format, file_type, title, album, artist, \
         album_artist, composer, genre, year, track_no, track_total, disk_no, \
         disk_total, comment, size, digest"
    };
}

pub mod models;
pub mod queries;
pub mod sqlite;

pub use sqlite::Index;
