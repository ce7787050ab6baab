pub mod dup_nuke;
pub mod placement;

pub use dup_nuke::{DupNuker, NukeReport};
pub use placement::{destination_for, PlacementEngine, PlacementReport, SkipReason, Skipped};
