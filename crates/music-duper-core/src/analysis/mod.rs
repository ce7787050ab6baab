pub mod chooser;
pub mod classifier;
pub mod dedup;
pub mod equivalence;

pub use chooser::{Chooser, KeepFirst, SkipAll};
pub use classifier::{ClassifyReport, Classifier};
pub use dedup::{partition, Cluster, ClusterKey, Decision, DedupResolver, PassReport};
pub use equivalence::{Equivalence, SameExceptPath};
