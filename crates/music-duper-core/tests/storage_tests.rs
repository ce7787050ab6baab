use music_duper_core::analysis::{DedupResolver, SkipAll};
use music_duper_core::metadata::TrackTags;
use music_duper_core::storage::models::*;
use music_duper_core::{Chooser, Cluster, Index, SilentReporter};
use tempfile::tempdir;

fn make_record(path: &str, digest: &str, title: &str, genre: Option<&str>) -> FileRecord {
    FileRecord::new(
        path.to_string(),
        path.rsplit('/').next().unwrap_or(path).to_string(),
        Some(".mp3".to_string()),
        TrackTags {
            format: Some("ID3v2".to_string()),
            file_type: Some("MP3".to_string()),
            artist: Some("Queen".to_string()),
            album: Some("Jazz".to_string()),
            title: Some(title.to_string()),
            genre: genre.map(str::to_string),
            ..TrackTags::default()
        },
        Some(1000),
        digest.to_string(),
    )
}

struct CountingChooser {
    calls: usize,
    pick: Option<usize>,
}

impl Chooser for CountingChooser {
    fn choose(&mut self, _cluster: &Cluster) -> Option<usize> {
        self.calls += 1;
        self.pick
    }
}

#[test]
fn test_index_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("music.db");
    let db_path = db_path.to_str().unwrap();

    {
        let index = Index::open(db_path).unwrap();
        index
            .insert_file_record(&make_record("/m/a.mp3", "000000000000000a", "Mustapha", None))
            .unwrap();
    }

    let index = Index::open(db_path).unwrap();
    let records = index.active_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title.as_deref(), Some("Mustapha"));
    assert_eq!(records[0].genre, None);
}

#[test]
fn test_exact_cluster_with_differing_tags_goes_to_chooser() {
    let index = Index::open_in_memory().unwrap();
    index
        .insert_file_record(&make_record("/m/a.mp3", "000000000000000a", "Mustapha", Some("Rock")))
        .unwrap();
    index
        .insert_file_record(&make_record("/m/b.mp3", "000000000000000a", "Mustapha", None))
        .unwrap();

    let mut chooser = CountingChooser { calls: 0, pick: Some(1) };
    let report = DedupResolver::new(&index, false)
        .resolve_exact_duplicates(&mut chooser, &SilentReporter)
        .unwrap();

    assert_eq!(chooser.calls, 1);
    assert_eq!(report.chosen, 1);
    assert_eq!(report.auto_resolved, 0);

    let active = index.active_records().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].path, "/m/b.mp3");

    let pending = index.pending_duplicates().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].path, "/m/a.mp3");
    assert_eq!(pending[0].duplicate_of, active[0].id);
}

#[test]
fn test_out_of_range_choice_skips_cluster() {
    let index = Index::open_in_memory().unwrap();
    index
        .insert_file_record(&make_record("/m/a.mp3", "000000000000000a", "Mustapha", None))
        .unwrap();
    index
        .insert_file_record(&make_record("/m/b.mp3", "000000000000000b", "Mustapha", None))
        .unwrap();

    let mut chooser = CountingChooser { calls: 0, pick: Some(7) };
    let report = DedupResolver::new(&index, false)
        .resolve_semantic_duplicates(&mut chooser, &SilentReporter)
        .unwrap();

    assert_eq!(chooser.calls, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.chosen, 0);
    assert_eq!(index.active_count().unwrap(), 2);
}

#[test]
fn test_semantic_pass_ignores_empty_keys() {
    let index = Index::open_in_memory().unwrap();
    index
        .insert_file_record(&make_record("/m/a.mp3", "000000000000000a", "", None))
        .unwrap();
    index
        .insert_file_record(&make_record("/m/b.mp3", "000000000000000b", "", None))
        .unwrap();

    let resolver = DedupResolver::new(&index, false);
    assert!(resolver.semantic_clusters().unwrap().is_empty());
    let report = resolver
        .resolve_semantic_duplicates(&mut SkipAll, &SilentReporter)
        .unwrap();
    assert_eq!(report.clusters, 0);
}

#[test]
fn test_marking_a_vanished_record_as_moved_is_inconsistent() {
    let index = Index::open_in_memory().unwrap();
    let err = index
        .mark_moved(&[MoveRecord {
            record_id: 42,
            source: "/m/a.mp3".to_string(),
            destination: "/music/Queen/Jazz/00 Mustapha.mp3".to_string(),
        }])
        .unwrap_err();
    assert!(err.is_inconsistency());
    assert_eq!(index.summary().unwrap().moved, 0);
}

#[test]
fn test_truncate_all() {
    let index = Index::open_in_memory().unwrap();
    index
        .insert_file_record(&make_record("/m/a.mp3", "000000000000000a", "Mustapha", None))
        .unwrap();
    index.truncate_all().unwrap();
    assert_eq!(index.summary().unwrap(), IndexSummary::default());
}
