#[macro_use]
pub mod storage;

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod metadata;
pub mod organize;
pub mod progress;
pub mod scanner;

pub use analysis::{Chooser, Cluster, KeepFirst, SkipAll};
pub use config::AppConfig;
pub use engine::Engine;
pub use error::{Error, Result};
pub use progress::{ProgressReporter, SilentReporter};
pub use storage::Index;
