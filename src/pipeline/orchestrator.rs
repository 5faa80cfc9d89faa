use super::context::SyncContext;
use super::phase_trait::WorkflowPhase;
use super::phases::{aggregate::AggregatePhase, matrix::MatrixPhase, publish::PublishPhase};
use super::report::SyncReport;
use crate::progress::ProgressEvent;
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{debug, info};

/// Runs the sync phases in order over one context.
#[derive(Debug, Default)]
pub struct SyncOrchestrator;

impl SyncOrchestrator {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&self, context: &mut SyncContext) -> Result<SyncReport> {
        let start = Instant::now();
        info!(
            run_id = %context.run_id,
            "Starting sync over {} store(s)",
            context.matrix.len()
        );
        context.progress.on_progress(&ProgressEvent::SyncStarted {
            stores: context.matrix.len(),
        });

        let workflow_phases: Vec<Box<dyn WorkflowPhase>> = vec![
            Box::new(MatrixPhase),
            Box::new(AggregatePhase),
            Box::new(PublishPhase),
        ];

        for phase in workflow_phases {
            let phase_name = phase.name();
            debug!("Phase: {}", phase_name);

            let phase_start = Instant::now();
            phase
                .execute(context)
                .await
                .with_context(|| format!("Phase {} failed", phase_name))?;

            debug!(
                "Phase {} complete in {:.2}s",
                phase_name,
                phase_start.elapsed().as_secs_f64()
            );
        }

        let report = SyncReport {
            run_id: context.run_id.clone(),
            slots: context.slots.clone(),
            aggregated: context.aggregated.clone(),
            aggregation_skipped: context.aggregation_skipped.clone(),
            publish: context.publish.clone(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Sync complete: {} succeeded, {} failed",
            report.succeeded_slots(),
            report.failed_slots()
        );
        context.progress.on_progress(&ProgressEvent::Completed {
            total_time: start.elapsed(),
            failed: report.failed_slots(),
        });

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::SyncOptions;
    use crate::progress::ProgressHandler;
    use crate::registry::StoreId;
    use crate::scraper::{ScrapeError, ScrapeOutput, Scraper};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct StaticScraper {
        fail: Option<&'static str>,
    }

    #[async_trait]
    impl Scraper for StaticScraper {
        async fn scrape(&self, store: &StoreId, work_dir: &Path) -> Result<ScrapeOutput, ScrapeError> {
            if self.fail == Some(store.as_str()) {
                return Err(ScrapeError::MissingOutput {
                    path: work_dir.join(store.catalogue_file_name()),
                });
            }
            tokio::fs::create_dir_all(work_dir).await.unwrap();
            let path = work_dir.join(store.catalogue_file_name());
            tokio::fs::write(&path, "[{\"id\":1}]").await.unwrap();
            Ok(ScrapeOutput {
                path,
                products: 1,
                pages: Some(1),
                truncated: None,
            })
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ProgressHandler for Recorder {
        fn on_progress(&self, event: &ProgressEvent) {
            let name = match event {
                ProgressEvent::SyncStarted { .. } => "sync_started",
                ProgressEvent::AggregationComplete { .. } => "aggregated",
                ProgressEvent::AggregationSkipped { .. } => "aggregation_skipped",
                ProgressEvent::Completed { .. } => "completed",
                _ => return,
            };
            self.events.lock().unwrap().push(name.to_string());
        }
    }

    fn build(dir: &TempDir, fail: Option<&'static str>, recorder: Arc<Recorder>) -> SyncContext {
        let matrix = ["scs", "kewbz"]
            .iter()
            .map(|s| StoreId::parse(s).unwrap())
            .collect();
        let options = SyncOptions {
            data_dir: dir.path().join("stores_products"),
            fail_fast: false,
            ..SyncOptions::default()
        };
        SyncContext::new(
            matrix,
            Arc::new(StaticScraper { fail }),
            dir.path().join("staging"),
            options,
        )
        .with_progress(recorder)
    }

    #[tokio::test]
    async fn test_successful_run_aggregates() {
        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let mut ctx = build(&dir, None, recorder.clone());

        let report = SyncOrchestrator::new().execute(&mut ctx).await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.aggregated.len(), 2);
        assert!(report.publish.is_none());
        assert_eq!(report.aggregated[0].sha256.len(), 64);
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["sync_started", "aggregated", "completed"]
        );
    }

    #[tokio::test]
    async fn test_failed_slot_skips_aggregation() {
        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let mut ctx = build(&dir, Some("kewbz"), recorder.clone());

        let report = SyncOrchestrator::new().execute(&mut ctx).await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failed_slots(), 1);
        assert!(report.aggregated.is_empty());
        assert!(report.aggregation_skipped.is_some());
        assert!(!dir.path().join("stores_products").exists());
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["sync_started", "aggregation_skipped", "completed"]
        );
    }
}
