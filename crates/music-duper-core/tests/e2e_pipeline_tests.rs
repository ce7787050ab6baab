use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

use music_duper_core::analysis::ClusterKey;
use music_duper_core::metadata::{MetadataError, MetadataReader, TrackTags};
use music_duper_core::organize::SkipReason;
use music_duper_core::{AppConfig, Chooser, Cluster, Engine, Index, KeepFirst, SilentReporter};

/// Reads tags from files whose content starts with a `TAGS` line followed by
/// `key=value` lines. Anything else fails to parse.
struct StubReader;

impl MetadataReader for StubReader {
    fn read(&self, file: &mut File) -> Result<TrackTags, MetadataError> {
        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| MetadataError::Parse(e.to_string()))?;
        let mut lines = content.lines();
        if lines.next() != Some("TAGS") {
            return Err(MetadataError::Parse("no tag header".to_string()));
        }
        let mut tags = TrackTags {
            format: Some("ID3v2".to_string()),
            file_type: Some("MP3".to_string()),
            ..TrackTags::default()
        };
        for line in lines {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.to_string();
            match key {
                "format" => tags.format = Some(value),
                "file_type" => tags.file_type = Some(value),
                "title" => tags.title = Some(value),
                "album" => tags.album = Some(value),
                "artist" => tags.artist = Some(value),
                "album_artist" => tags.album_artist = Some(value),
                "track" => tags.track_no = value.parse().ok(),
                _ => {}
            }
        }
        Ok(tags)
    }
}

/// Keeps the first member and remembers every cluster it was shown.
#[derive(Default)]
struct RecordingChooser {
    seen: Vec<ClusterKey>,
}

impl Chooser for RecordingChooser {
    fn choose(&mut self, cluster: &Cluster) -> Option<usize> {
        self.seen.push(cluster.key.clone());
        Some(0)
    }
}

fn track(artist: &str, album: &str, title: &str, track: u32, salt: &str) -> String {
    format!(
        "TAGS\nartist={}\nalbum={}\ntitle={}\ntrack={}\nsalt={}\n",
        artist, album, title, track, salt
    )
}

/// Layout:
///   root/
///     a/one.mp3          Queen / Opera / Bohemian Rhapsody #1
///     b/one_copy.mp3     byte-identical to a/one.mp3
///     c/one_again.mp3    byte-identical to a/one.mp3
///     d/live.mp3         same tags, track 11, different bytes
///     notes.txt          not music
///     untagged.mp3       unreadable tags
///     cover.png          ignored
///     .DS_Store          ignored
fn create_library(root: &Path) {
    for dir in ["a", "b", "c", "d"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    let one = track("Queen", "Opera", "Bohemian Rhapsody", 1, "studio");
    fs::write(root.join("a/one.mp3"), &one).unwrap();
    fs::write(root.join("b/one_copy.mp3"), &one).unwrap();
    fs::write(root.join("c/one_again.mp3"), &one).unwrap();
    fs::write(
        root.join("d/live.mp3"),
        track("Queen", "Opera", "Bohemian Rhapsody", 11, "live"),
    )
    .unwrap();
    fs::write(root.join("notes.txt"), "TAGS\nartist=Me\nalbum=Notes\ntitle=Todo\n").unwrap();
    fs::write(root.join("untagged.mp3"), "just noise").unwrap();
    fs::write(root.join("cover.png"), "png").unwrap();
    fs::write(root.join(".DS_Store"), "junk").unwrap();
}

fn engine(readers: usize) -> Engine {
    let config = AppConfig {
        readers,
        ..AppConfig::default()
    };
    Engine::with_index(config, Index::open_in_memory().unwrap()).with_reader(Arc::new(StubReader))
}

#[test]
fn test_assemble_accounts_for_every_file() {
    let tmp = tempdir().unwrap();
    create_library(tmp.path());
    let engine = engine(4);

    let report = engine.assemble(tmp.path(), &SilentReporter).unwrap();
    assert_eq!(report.dispatched, 6);
    assert_eq!(report.ignored, 2);
    assert_eq!(report.indexed + report.failures.len(), report.dispatched);
    assert_eq!(report.classification.not_music, 1);
    assert_eq!(report.classification.missing_tags, 1);

    let summary = engine.summary().unwrap();
    let rejected = summary.rejected_not_music + summary.rejected_missing_tags;
    assert_eq!(summary.active, 4);
    assert_eq!(
        (summary.active + rejected) as usize,
        report.dispatched - report.failures.len()
    );
}

#[test]
fn test_reassemble_does_not_duplicate_paths() {
    let tmp = tempdir().unwrap();
    create_library(tmp.path());
    let engine = engine(2);

    engine.assemble(tmp.path(), &SilentReporter).unwrap();
    engine.assemble(tmp.path(), &SilentReporter).unwrap();
    assert_eq!(engine.summary().unwrap().active, 4);
}

#[test]
fn test_assemble_missing_root_fails() {
    let tmp = tempdir().unwrap();
    let engine = engine(1);
    assert!(engine.assemble(&tmp.path().join("nope"), &SilentReporter).is_err());
}

#[test]
fn test_analyze_auto_resolves_exact_and_asks_for_semantic() {
    let tmp = tempdir().unwrap();
    create_library(tmp.path());
    let engine = engine(1);
    engine.assemble(tmp.path(), &SilentReporter).unwrap();

    let mut chooser = RecordingChooser::default();
    let (exact, semantic) = engine.analyze(&mut chooser, &SilentReporter).unwrap();

    assert_eq!(exact.clusters, 1);
    assert_eq!(exact.auto_resolved, 1);
    assert_eq!(exact.chosen, 0);
    assert_eq!(exact.tossed, 2);
    assert_eq!(exact.pruned, 2);

    assert_eq!(semantic.clusters, 1);
    assert_eq!(semantic.auto_resolved, 0);
    assert_eq!(semantic.chosen, 1);
    assert_eq!(semantic.pruned, 1);

    // only the semantic cluster reached the chooser
    assert_eq!(chooser.seen.len(), 1);
    assert!(matches!(&chooser.seen[0], ClusterKey::Tags(key) if key.title == "Bohemian Rhapsody"));

    let active = engine.index().active_records().unwrap();
    assert_eq!(active.len(), 1);
    assert!(active[0].path.ends_with("a/one.mp3"));

    let summary = engine.summary().unwrap();
    assert_eq!(summary.duplicates, 3);
    assert_eq!(summary.originals, 1, "one surviving file is one original");
}

#[test]
fn test_place_then_nuke() {
    let tmp = tempdir().unwrap();
    let dest = tempdir().unwrap();
    create_library(tmp.path());
    let engine = engine(1);
    engine.assemble(tmp.path(), &SilentReporter).unwrap();
    engine.analyze(&mut KeepFirst, &SilentReporter).unwrap();

    let report = engine.place(dest.path(), false, &SilentReporter).unwrap();
    assert_eq!(report.moved.len(), 1);
    assert!(report.skipped.is_empty());

    let placed = dest.path().join("Queen/Opera/01 Bohemian Rhapsody.mp3");
    assert!(placed.is_file());
    assert!(!tmp.path().join("a/one.mp3").exists());

    let summary = engine.summary().unwrap();
    assert_eq!(summary.active, 0);
    assert_eq!(summary.moved, 1);

    let nuked = engine.dup_nuke().unwrap();
    assert_eq!(nuked.deleted, 3);
    assert_eq!(nuked.failed, 0);
    assert!(!tmp.path().join("b/one_copy.mp3").exists());
    assert!(!tmp.path().join("d/live.mp3").exists());
    assert!(placed.is_file());
}

#[test]
fn test_place_empty_album_and_collision() {
    let tmp = tempdir().unwrap();
    let dest = tempdir().unwrap();
    fs::write(
        tmp.path().join("first.mp3"),
        track("Queen", "", "Bohemian Rhapsody", 1, "first"),
    )
    .unwrap();
    fs::write(
        tmp.path().join("second.mp3"),
        track("Queen", "", "Bohemian Rhapsody", 1, "second"),
    )
    .unwrap();
    let engine = engine(1);
    engine.assemble(tmp.path(), &SilentReporter).unwrap();

    let report = engine.place(dest.path(), false, &SilentReporter).unwrap();
    let expected = dest.path().join("Queen/Unknown/01 Bohemian Rhapsody.mp3");
    assert_eq!(report.moved.len(), 1);
    assert_eq!(report.moved[0].destination, expected.to_string_lossy());
    assert!(expected.is_file());
    assert_eq!(report.skipped_for(SkipReason::DestinationExists), 1);

    // the skipped record stays active and is skipped again on a second run
    let again = engine.place(dest.path(), false, &SilentReporter).unwrap();
    assert!(again.moved.is_empty());
    assert_eq!(again.skipped_for(SkipReason::DestinationExists), 1);
    assert_eq!(engine.summary().unwrap().active, 1);
}

#[test]
fn test_place_dry_run_changes_nothing() {
    let tmp = tempdir().unwrap();
    let dest = tempdir().unwrap();
    fs::write(
        tmp.path().join("song.mp3"),
        track("Queen", "Jazz", "Mustapha", 1, "x"),
    )
    .unwrap();
    let engine = engine(1);
    engine.assemble(tmp.path(), &SilentReporter).unwrap();

    let report = engine.place(dest.path(), true, &SilentReporter).unwrap();
    assert!(report.dry_run);
    assert_eq!(report.moved.len(), 1);
    assert!(tmp.path().join("song.mp3").is_file());
    assert!(!dest.path().join("Queen").exists());
    assert_eq!(engine.summary().unwrap().active, 1);
}

#[test]
fn test_place_skips_vanished_source_and_unknown_format() {
    let tmp = tempdir().unwrap();
    let dest = tempdir().unwrap();
    fs::write(tmp.path().join("gone.mp3"), track("A", "B", "Gone", 1, "x")).unwrap();
    fs::write(
        tmp.path().join("odd.mp3"),
        "TAGS\nformat=UNKNOWN\nartist=A\nalbum=B\ntitle=Odd\n",
    )
    .unwrap();
    let engine = engine(1);
    engine.assemble(tmp.path(), &SilentReporter).unwrap();
    fs::remove_file(tmp.path().join("gone.mp3")).unwrap();

    let report = engine.place(dest.path(), false, &SilentReporter).unwrap();
    assert!(report.moved.is_empty());
    assert_eq!(report.skipped_for(SkipReason::SourceMissing), 1);
    assert_eq!(report.skipped_for(SkipReason::UnknownFormat), 1);
    assert_eq!(engine.summary().unwrap().active, 2);
}
