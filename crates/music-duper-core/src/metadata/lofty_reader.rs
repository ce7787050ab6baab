use super::{MetadataError, MetadataReader, TrackTags, MP4_FORMAT, UNKNOWN_FILE_TYPE, UNKNOWN_FORMAT};
use lofty::{Accessor, FileType, ItemKey, Tag, TagType, TaggedFileExt};
use std::fs::File;

/// Metadata reader backed by the lofty library.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyReader;

impl LoftyReader {
    pub fn new() -> Self {
        Self
    }

    fn extract_from_tag(tag: &Tag, file_type: FileType) -> TrackTags {
        TrackTags {
            format: Some(format_name(tag.tag_type()).to_string()),
            file_type: Some(file_type_name(file_type).to_string()),
            title: tag.title().map(|s| s.into_owned()),
            album: tag.album().map(|s| s.into_owned()),
            artist: tag.artist().map(|s| s.into_owned()),
            album_artist: tag.get_string(&ItemKey::AlbumArtist).map(str::to_string),
            composer: tag.get_string(&ItemKey::Composer).map(str::to_string),
            genre: tag.genre().map(|s| s.into_owned()),
            comment: tag.comment().map(|s| s.into_owned()),
            year: tag.year().map(i64::from),
            track_no: tag.track().map(i64::from),
            track_total: tag.track_total().map(i64::from),
            disk_no: tag.disk().map(i64::from),
            disk_total: tag.disk_total().map(i64::from),
        }
    }
}

impl MetadataReader for LoftyReader {
    fn read(&self, file: &mut File) -> Result<TrackTags, MetadataError> {
        let tagged_file =
            lofty::read_from(file).map_err(|e| MetadataError::Parse(e.to_string()))?;

        let file_type = tagged_file.file_type();
        match tagged_file.primary_tag().or(tagged_file.first_tag()) {
            Some(tag) => Ok(Self::extract_from_tag(tag, file_type)),
            // Readable stream without tags: only the container is known.
            None => Ok(TrackTags {
                file_type: Some(file_type_name(file_type).to_string()),
                ..TrackTags::default()
            }),
        }
    }
}

fn format_name(tag_type: TagType) -> &'static str {
    match tag_type {
        TagType::Id3v2 => "ID3v2",
        TagType::Id3v1 => "ID3v1",
        TagType::Mp4Ilst => MP4_FORMAT,
        TagType::VorbisComments => "VORBIS",
        TagType::Ape => "APE",
        TagType::RiffInfo => "RIFFINFO",
        TagType::AiffText => "AIFFTEXT",
        #[allow(unreachable_patterns)]
        _ => UNKNOWN_FORMAT,
    }
}

fn file_type_name(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Mpeg => "MP3",
        FileType::Mp4 => "M4A",
        FileType::Flac => "FLAC",
        FileType::Vorbis | FileType::Opus | FileType::Speex => "OGG",
        FileType::Aac => "AAC",
        FileType::Aiff => "AIFF",
        FileType::Ape => "APE",
        FileType::Wav => "WAV",
        FileType::WavPack => "WAVPACK",
        _ => UNKNOWN_FILE_TYPE,
    }
}
