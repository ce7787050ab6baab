use super::dedup::Cluster;

/// Picks the keeper of a cluster the resolver could not settle on its own.
pub trait Chooser {
    /// Index into `cluster.members` of the record to keep, or `None` to leave
    /// the cluster untouched.
    fn choose(&mut self, cluster: &Cluster) -> Option<usize>;
}

/// Keeps the earliest indexed member of every cluster.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepFirst;

impl Chooser for KeepFirst {
    fn choose(&mut self, cluster: &Cluster) -> Option<usize> {
        if cluster.members.is_empty() {
            None
        } else {
            Some(0)
        }
    }
}

/// Never decides; every cluster it sees is skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipAll;

impl Chooser for SkipAll {
    fn choose(&mut self, _cluster: &Cluster) -> Option<usize> {
        None
    }
}
