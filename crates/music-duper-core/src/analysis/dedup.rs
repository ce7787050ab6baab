//! Duplicate resolution.
//!
//! Active records are clustered twice: by identical digest (exact pass) and
//! by identical non-empty (artist, album, title) (semantic pass). Each cluster
//! ends with at most one keeper; every other member is recorded as its
//! duplicate and pruned from the active set in the same transaction, so a
//! pass cut short never leaves a recorded duplicate active.

use super::chooser::Chooser;
use super::equivalence::{Equivalence, SameExceptPath};
use crate::error::{Error, Result};
use crate::progress::ProgressReporter;
use crate::storage::models::{DedupPass, FileRecord, TagKey};
use crate::storage::Index;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterKey {
    Digest(String),
    Tags(TagKey),
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterKey::Digest(digest) => write!(f, "digest {}", digest),
            ClusterKey::Tags(key) => write!(f, "tags {}", key),
        }
    }
}

/// Two or more active records sharing a key, in index order.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub key: ClusterKey,
    pub members: Vec<FileRecord>,
}

/// The keeper of a cluster and the members it replaces.
#[derive(Debug, Clone)]
pub struct Decision {
    pub keep: FileRecord,
    pub toss: Vec<FileRecord>,
}

impl Decision {
    /// Keep `members[keep]`; `None` if the index is out of range.
    pub fn keeping(cluster: &Cluster, keep: usize) -> Option<Decision> {
        let keeper = cluster.members.get(keep)?.clone();
        let toss = cluster
            .members
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != keep)
            .map(|(_, record)| record.clone())
            .collect();
        Some(Decision { keep: keeper, toss })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub pass: DedupPass,
    pub clusters: usize,
    /// Clusters settled without asking the chooser.
    pub auto_resolved: usize,
    pub chosen: usize,
    pub skipped: usize,
    pub tossed: usize,
    pub pruned: usize,
}

impl PassReport {
    fn new(pass: DedupPass, clusters: usize) -> Self {
        PassReport {
            pass,
            clusters,
            auto_resolved: 0,
            chosen: 0,
            skipped: 0,
            tossed: 0,
            pruned: 0,
        }
    }
}

/// Split `members` into classes of equivalent records.
///
/// Single pass: each class is seeded by the first unassigned member and
/// collects every later unassigned member equivalent to that seed. The
/// relation is not assumed transitive, so A~B and B~C without A~C yields
/// two classes.
pub fn partition(members: &[FileRecord], equivalence: &dyn Equivalence) -> Vec<Vec<usize>> {
    let mut assigned = vec![false; members.len()];
    let mut classes = Vec::new();
    for seed in 0..members.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut class = vec![seed];
        for other in seed + 1..members.len() {
            if !assigned[other] && equivalence.equivalent(&members[seed], &members[other]) {
                assigned[other] = true;
                class.push(other);
            }
        }
        classes.push(class);
    }
    classes
}

pub struct DedupResolver<'a> {
    index: &'a Index,
    equivalence: Box<dyn Equivalence + 'a>,
    prune_keepers: bool,
}

impl<'a> DedupResolver<'a> {
    pub fn new(index: &'a Index, prune_keepers: bool) -> Self {
        Self::with_equivalence(index, prune_keepers, Box::new(SameExceptPath))
    }

    pub fn with_equivalence(
        index: &'a Index,
        prune_keepers: bool,
        equivalence: Box<dyn Equivalence + 'a>,
    ) -> Self {
        DedupResolver {
            index,
            equivalence,
            prune_keepers,
        }
    }

    /// Exact pass then semantic pass.
    pub fn resolve_all(
        &self,
        chooser: &mut dyn Chooser,
        reporter: &dyn ProgressReporter,
    ) -> Result<(PassReport, PassReport)> {
        let exact = self.resolve_exact_duplicates(chooser, reporter)?;
        let semantic = self.resolve_semantic_duplicates(chooser, reporter)?;
        Ok((exact, semantic))
    }

    pub fn exact_clusters(&self) -> Result<Vec<Cluster>> {
        self.index
            .duplicated_digests()?
            .into_iter()
            .map(|(digest, count)| {
                let members = self.index.records_with_digest(&digest)?;
                checked_cluster(ClusterKey::Digest(digest), count, members)
            })
            .collect()
    }

    pub fn semantic_clusters(&self) -> Result<Vec<Cluster>> {
        self.index
            .duplicated_tag_keys()?
            .into_iter()
            .map(|(key, count)| {
                let members = self.index.records_with_tag_key(&key)?;
                checked_cluster(ClusterKey::Tags(key), count, members)
            })
            .collect()
    }

    /// Clusters whose members are all equivalent keep their first member
    /// without consulting `chooser`; the rest are handed to it whole.
    pub fn resolve_exact_duplicates(
        &self,
        chooser: &mut dyn Chooser,
        reporter: &dyn ProgressReporter,
    ) -> Result<PassReport> {
        let clusters = self.exact_clusters()?;
        self.run_pass(DedupPass::Exact, clusters, chooser, reporter, |cluster| {
            partition(&cluster.members, self.equivalence.as_ref()).len() == 1
        })
    }

    /// Every tag cluster goes to `chooser`.
    pub fn resolve_semantic_duplicates(
        &self,
        chooser: &mut dyn Chooser,
        reporter: &dyn ProgressReporter,
    ) -> Result<PassReport> {
        let clusters = self.semantic_clusters()?;
        self.run_pass(DedupPass::Semantic, clusters, chooser, reporter, |_| false)
    }

    fn run_pass(
        &self,
        pass: DedupPass,
        clusters: Vec<Cluster>,
        chooser: &mut dyn Chooser,
        reporter: &dyn ProgressReporter,
        auto_resolvable: impl Fn(&Cluster) -> bool,
    ) -> Result<PassReport> {
        let start = Instant::now();
        let total = clusters.len();
        info!("Resolving {} {} cluster(s)", total, pass);
        reporter.on_resolve_start(pass.as_str(), total);

        let mut report = PassReport::new(pass, total);

        for (done, cluster) in clusters.iter().enumerate() {
            let decision = if auto_resolvable(cluster) {
                report.auto_resolved += 1;
                Decision::keeping(cluster, 0)
            } else {
                match chooser.choose(cluster) {
                    Some(keep) => {
                        let decision = Decision::keeping(cluster, keep);
                        if decision.is_none() {
                            warn!(
                                "Chooser picked {} for {} with {} members; skipping",
                                keep,
                                cluster.key,
                                cluster.members.len()
                            );
                        } else {
                            report.chosen += 1;
                        }
                        decision
                    }
                    None => None,
                }
            };

            match decision {
                Some(decision) => {
                    report.pruned += self.index.record_decision(
                        &decision.keep,
                        &decision.toss,
                        pass,
                        self.prune_keepers,
                    )?;
                    debug!(
                        "{}: keeping {} over {} record(s)",
                        cluster.key,
                        decision.keep.path,
                        decision.toss.len()
                    );
                    report.tossed += decision.toss.len();
                }
                None => {
                    debug!("{}: left unresolved", cluster.key);
                    report.skipped += 1;
                }
            }
            reporter.on_cluster_resolved(done + 1, total);
        }

        reporter.on_resolve_complete(pass.as_str(), start.elapsed().as_secs_f64());
        info!(
            "{} pass: {} auto, {} chosen, {} skipped, {} pruned",
            pass, report.auto_resolved, report.chosen, report.skipped, report.pruned
        );
        Ok(report)
    }
}

fn checked_cluster(key: ClusterKey, expected: usize, members: Vec<FileRecord>) -> Result<Cluster> {
    if members.len() != expected {
        return Err(Error::inconsistent(key.to_string(), expected, members.len()));
    }
    Ok(Cluster { key, members })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::chooser::{KeepFirst, SkipAll};
    use crate::metadata::TrackTags;
    use crate::progress::SilentReporter;

    fn record(id: i64, comment: &str) -> FileRecord {
        let mut record = FileRecord::new(
            format!("/m/{}.mp3", id),
            format!("{}.mp3", id),
            Some(".mp3".to_string()),
            TrackTags {
                comment: Some(comment.to_string()),
                ..TrackTags::default()
            },
            Some(1),
            "0000000000000001".to_string(),
        );
        record.id = id;
        record
    }

    /// Equivalent when comments share a character.
    struct SharesChar;

    impl Equivalence for SharesChar {
        fn equivalent(&self, a: &FileRecord, b: &FileRecord) -> bool {
            let a = a.comment.as_deref().unwrap_or("");
            let b = b.comment.as_deref().unwrap_or("");
            a.chars().any(|c| b.contains(c))
        }
    }

    #[test]
    fn test_partition_single_class() {
        let members = vec![record(1, "x"), record(2, "x"), record(3, "x")];
        assert_eq!(partition(&members, &SameExceptPath), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_partition_chain_is_not_transitive() {
        // A~B and B~C, but not A~C
        let members = vec![record(1, "ab"), record(2, "bc"), record(3, "cd")];
        assert_eq!(partition(&members, &SharesChar), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition(&[], &SameExceptPath).is_empty());
    }

    #[test]
    fn test_decision_out_of_range_is_none() {
        let cluster = Cluster {
            key: ClusterKey::Digest("0000000000000001".to_string()),
            members: vec![record(1, "x"), record(2, "x")],
        };
        assert!(Decision::keeping(&cluster, 2).is_none());

        let decision = Decision::keeping(&cluster, 1).unwrap();
        assert_eq!(decision.keep.id, 2);
        assert_eq!(decision.toss.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_skipped_cluster_is_untouched() {
        let index = Index::open_in_memory().unwrap();
        for id in 1..=2 {
            let mut r = record(id, &id.to_string());
            r.id = 0;
            index.insert_file_record(&r).unwrap();
        }
        let resolver = DedupResolver::new(&index, false);
        let report = resolver
            .resolve_exact_duplicates(&mut SkipAll, &SilentReporter)
            .unwrap();

        assert_eq!(report.clusters, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.pruned, 0);
        assert_eq!(index.active_count().unwrap(), 2);
        assert!(index.pending_duplicates().unwrap().is_empty());

        // a second attempt sees the same cluster again
        let again = resolver.resolve_exact_duplicates(&mut KeepFirst, &SilentReporter).unwrap();
        assert_eq!(again.chosen, 1);
        assert_eq!(index.active_count().unwrap(), 1);
    }

    #[test]
    fn test_prune_keepers_empties_cluster() {
        let index = Index::open_in_memory().unwrap();
        for id in 1..=3 {
            let mut r = record(id, "same");
            r.id = 0;
            index.insert_file_record(&r).unwrap();
        }
        let report = DedupResolver::new(&index, true)
            .resolve_exact_duplicates(&mut SkipAll, &SilentReporter)
            .unwrap();

        assert_eq!(report.auto_resolved, 1);
        assert_eq!(report.tossed, 2);
        assert_eq!(report.pruned, 3);
        assert_eq!(index.active_count().unwrap(), 0);
        assert_eq!(index.summary().unwrap().originals, 1);
    }

    fn tagged(path: &str, digest: &str, title: &str) -> FileRecord {
        FileRecord::new(
            path.to_string(),
            path.rsplit('/').next().unwrap().to_string(),
            Some(".mp3".to_string()),
            TrackTags {
                artist: Some("Queen".to_string()),
                album: Some("Jazz".to_string()),
                title: Some(title.to_string()),
                ..TrackTags::default()
            },
            Some(1),
            digest.to_string(),
        )
    }

    /// Keeps the first member, but on its second call removes a member from
    /// the index first, so recording that decision fails.
    struct FailsOnSecondCluster<'a> {
        index: &'a Index,
        calls: usize,
    }

    impl Chooser for FailsOnSecondCluster<'_> {
        fn choose(&mut self, cluster: &Cluster) -> Option<usize> {
            self.calls += 1;
            if self.calls == 2 {
                self.index
                    .lock()
                    .unwrap()
                    .execute(
                        "DELETE FROM scanned_file WHERE id = ?1",
                        [cluster.members[1].id],
                    )
                    .unwrap();
            }
            Some(0)
        }
    }

    struct KeepSecond;

    impl Chooser for KeepSecond {
        fn choose(&mut self, cluster: &Cluster) -> Option<usize> {
            (cluster.members.len() > 1).then_some(1)
        }
    }

    #[test]
    fn test_aborted_pass_keeps_earlier_decisions_settled() {
        let index = Index::open_in_memory().unwrap();
        index.insert_file_record(&tagged("/m/a.mp3", "000000000000000a", "Mustapha")).unwrap();
        index.insert_file_record(&tagged("/m/b.mp3", "000000000000000b", "Mustapha")).unwrap();
        index.insert_file_record(&tagged("/m/c.mp3", "000000000000000c", "Jealousy")).unwrap();
        index.insert_file_record(&tagged("/m/d.mp3", "000000000000000d", "Jealousy")).unwrap();

        let resolver = DedupResolver::new(&index, false);
        let mut failing = FailsOnSecondCluster { index: &index, calls: 0 };
        let err = resolver
            .resolve_semantic_duplicates(&mut failing, &SilentReporter)
            .unwrap_err();
        assert!(err.is_inconsistency());

        // the first decision committed along with its pruning
        let pending: Vec<String> = index
            .pending_duplicates()
            .unwrap()
            .into_iter()
            .map(|d| d.path)
            .collect();
        assert_eq!(pending, vec!["/m/b.mp3".to_string()]);
        assert!(index.active_records().unwrap().iter().all(|r| r.path != "/m/b.mp3"));

        // a rerun that would pick the other copy cannot queue both copies
        let report = resolver
            .resolve_semantic_duplicates(&mut KeepSecond, &SilentReporter)
            .unwrap();
        assert_eq!(report.clusters, 0);
        let pending: Vec<String> = index
            .pending_duplicates()
            .unwrap()
            .into_iter()
            .map(|d| d.path)
            .collect();
        assert_eq!(pending, vec!["/m/b.mp3".to_string()]);
    }

    #[test]
    fn test_member_count_mismatch_is_inconsistent() {
        let key = ClusterKey::Digest("0000000000000001".to_string());
        let err = checked_cluster(key, 3, vec![record(1, "x"), record(2, "x")]).unwrap_err();
        assert!(err.is_inconsistency());

        let key = ClusterKey::Digest("0000000000000001".to_string());
        let cluster = checked_cluster(key, 2, vec![record(1, "x"), record(2, "x")]).unwrap();
        assert_eq!(cluster.members.len(), 2);
    }
}
