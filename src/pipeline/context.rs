//! State shared by the sync phases

use super::report::{AggregatedFile, SlotOutcome};
use crate::artifacts::ArtifactStore;
use crate::progress::{NoOpHandler, ProgressHandler};
use crate::publish::{CommitPublisher, PublishOutcome};
use crate::registry::StoreId;
use crate::scraper::Scraper;
use std::path::PathBuf;
use std::sync::Arc;

/// Knobs for one sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Tracked catalogue directory
    pub data_dir: PathBuf,

    /// Concurrent slots, 0 for unbounded
    pub max_parallel: usize,

    /// Cancel unfinished slots after the first failure
    pub fail_fast: bool,

    /// Aggregate and publish the successful slots even if some failed
    pub commit_partial: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("stores_products"),
            max_parallel: 0,
            fail_fast: true,
            commit_partial: false,
        }
    }
}

pub struct SyncContext {
    pub run_id: String,
    pub matrix: Vec<StoreId>,
    pub scraper: Arc<dyn Scraper>,
    pub progress: Arc<dyn ProgressHandler>,
    pub options: SyncOptions,

    /// `None` disables the publish step
    pub publisher: Option<CommitPublisher>,

    /// Run directory: slot work dirs live in `work/`, artifacts in `artifacts/`
    pub run_dir: PathBuf,

    pub slots: Vec<SlotOutcome>,
    pub aggregated: Vec<AggregatedFile>,
    pub aggregation_skipped: Option<String>,
    pub publish: Option<PublishOutcome>,
}

impl SyncContext {
    /// Creates a context whose run directory is a fresh subdirectory of `staging_dir`.
    pub fn new(
        matrix: Vec<StoreId>,
        scraper: Arc<dyn Scraper>,
        staging_dir: PathBuf,
        options: SyncOptions,
    ) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        let run_dir = staging_dir.join(&run_id);
        Self {
            run_id,
            matrix,
            scraper,
            progress: Arc::new(NoOpHandler),
            options,
            publisher: None,
            run_dir,
            slots: Vec::new(),
            aggregated: Vec::new(),
            aggregation_skipped: None,
            publish: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_publisher(mut self, publisher: Option<CommitPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn artifacts(&self) -> ArtifactStore {
        ArtifactStore::new(self.run_dir.join("artifacts"))
    }

    pub fn work_dir(&self, store: &StoreId) -> PathBuf {
        self.run_dir.join("work").join(store.as_str())
    }
}
