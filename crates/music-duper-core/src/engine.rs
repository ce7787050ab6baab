use crate::analysis::{Chooser, DedupResolver, PassReport};
use crate::config::AppConfig;
use crate::error::Result;
use crate::metadata::{LoftyReader, MetadataReader};
use crate::organize::{DupNuker, NukeReport, PlacementEngine, PlacementReport};
use crate::progress::ProgressReporter;
use crate::scanner::{ScanReport, Scanner};
use crate::storage::models::IndexSummary;
use crate::storage::Index;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Runs the pipeline stages against one index.
pub struct Engine {
    config: AppConfig,
    index: Index,
    reader: Arc<dyn MetadataReader>,
}

impl Engine {
    /// Open (or create) the index at `config.db_path`.
    pub fn open(config: AppConfig) -> Result<Self> {
        let index = Index::open(&config.db_path)?;
        Ok(Self::with_index(config, index))
    }

    pub fn with_index(config: AppConfig, index: Index) -> Self {
        Engine {
            config,
            index,
            reader: Arc::new(LoftyReader::new()),
        }
    }

    /// Replace the tag reader used by [`Engine::assemble`].
    pub fn with_reader(mut self, reader: Arc<dyn MetadataReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Index every file under `root`, then classify.
    pub fn assemble(&self, root: &Path, reporter: &dyn ProgressReporter) -> Result<ScanReport> {
        Scanner::new(&self.index, &self.config, Arc::clone(&self.reader)).populate(
            root,
            self.config.readers,
            reporter,
        )
    }

    /// Exact pass, then semantic pass.
    pub fn analyze(
        &self,
        chooser: &mut dyn Chooser,
        reporter: &dyn ProgressReporter,
    ) -> Result<(PassReport, PassReport)> {
        DedupResolver::new(&self.index, self.config.prune_keepers).resolve_all(chooser, reporter)
    }

    pub fn place(
        &self,
        dest_root: &Path,
        dry_run: bool,
        reporter: &dyn ProgressReporter,
    ) -> Result<PlacementReport> {
        PlacementEngine::new(&self.index).place(dest_root, dry_run, reporter)
    }

    pub fn dup_nuke(&self) -> Result<NukeReport> {
        DupNuker::new(&self.index).nuke()
    }

    pub fn summary(&self) -> Result<IndexSummary> {
        self.index.summary()
    }

    pub fn truncate(&self) -> Result<()> {
        info!("Truncating index at {}", self.config.db_path);
        self.index.truncate_all()
    }
}
