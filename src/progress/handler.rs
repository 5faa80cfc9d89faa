//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while fetching catalogues and publishing them
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A sync run started over `stores` matrix slots
    SyncStarted { stores: usize },

    /// A matrix slot started scraping its store
    SlotStarted { store: String },

    /// One catalogue page was fetched
    PageFetched {
        store: String,
        page: u32,
        page_products: usize,
        total_products: usize,
    },

    /// A matrix slot produced its catalogue
    SlotComplete {
        store: String,
        products: usize,
        pages: u32,
        duration: Duration,
    },

    /// A matrix slot failed
    SlotFailed { store: String, error: String },

    /// A matrix slot was cancelled before finishing
    SlotCancelled { store: String },

    /// Artifacts were copied into the data directory
    AggregationComplete { files: usize },

    /// Aggregation did not run
    AggregationSkipped { reason: String },

    /// A commit was created
    CommitCreated { commit: String, files: usize },

    /// Nothing changed, no commit was created
    CommitSkipped,

    /// The whole run finished
    Completed { total_time: Duration, failed: usize },
}

/// Trait for handling progress events
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
