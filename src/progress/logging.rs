//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::SyncStarted { stores } => {
                info!(stores, "Starting catalogue sync");
            }
            ProgressEvent::SlotStarted { store } => {
                info!(store = %store, "Fetching catalogue");
            }
            ProgressEvent::PageFetched {
                store,
                page,
                page_products,
                total_products,
            } => {
                debug!(
                    store = %store,
                    page,
                    page_products,
                    total_products,
                    "Fetched page"
                );
            }
            ProgressEvent::SlotComplete {
                store,
                products,
                pages,
                duration,
            } => {
                info!(
                    store = %store,
                    products,
                    pages,
                    duration_ms = duration.as_millis(),
                    "Collected catalogue"
                );
            }
            ProgressEvent::SlotFailed { store, error } => {
                warn!(store = %store, error = %error, "Catalogue fetch failed");
            }
            ProgressEvent::SlotCancelled { store } => {
                warn!(store = %store, "Catalogue fetch cancelled");
            }
            ProgressEvent::AggregationComplete { files } => {
                info!(files, "Catalogues aggregated");
            }
            ProgressEvent::AggregationSkipped { reason } => {
                warn!(reason = %reason, "Aggregation skipped");
            }
            ProgressEvent::CommitCreated { commit, files } => {
                info!(commit = %commit, files, "Committed catalogue changes");
            }
            ProgressEvent::CommitSkipped => {
                info!("No catalogue changes, nothing to commit");
            }
            ProgressEvent::Completed { total_time, failed } => {
                if *failed > 0 {
                    warn!(
                        failed,
                        total_time_ms = total_time.as_millis(),
                        "Sync finished with failures"
                    );
                } else {
                    info!(total_time_ms = total_time.as_millis(), "Sync complete");
                }
            }
        }
    }
}
