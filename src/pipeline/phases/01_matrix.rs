//! Fan-out over the store matrix
//!
//! Every store runs in its own task and work directory. The phase returns
//! only once every slot is terminal (succeeded, failed or cancelled).

use crate::artifacts::ArtifactStore;
use crate::pipeline::context::SyncContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::report::{SlotOutcome, SlotStatus};
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::registry::StoreId;
use crate::scraper::Scraper;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub struct MatrixPhase;

struct Slot {
    store: StoreId,
    work_dir: PathBuf,
    scraper: Arc<dyn Scraper>,
    artifacts: ArtifactStore,
    progress: Arc<dyn ProgressHandler>,
}

impl Slot {
    async fn run(self) -> SlotStatus {
        self.progress.on_progress(&ProgressEvent::SlotStarted {
            store: self.store.to_string(),
        });

        let output = match self.scraper.scrape(&self.store, &self.work_dir).await {
            Ok(output) => output,
            Err(e) => {
                return SlotStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        match self.artifacts.stage(&self.store, &output.path).await {
            Ok(artifact) => SlotStatus::Succeeded {
                products: output.products,
                pages: output.pages,
                artifact,
                truncated: output.truncated,
            },
            Err(e) => SlotStatus::Failed {
                error: format!("Failed to stage artifact: {}", e),
            },
        }
    }
}

async fn wait_cancelled(mut rx: watch::Receiver<bool>) {
    // A closed channel means the sender is gone and nobody can cancel anymore
    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

#[async_trait]
impl WorkflowPhase for MatrixPhase {
    fn name(&self) -> &'static str {
        "MatrixPhase"
    }

    async fn execute(&self, context: &mut SyncContext) -> Result<()> {
        let limit = context.options.max_parallel;
        let semaphore = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let artifacts = context.artifacts();

        let mut tasks = JoinSet::new();
        for (index, store) in context.matrix.iter().cloned().enumerate() {
            let slot = Slot {
                work_dir: context.work_dir(&store),
                store: store.clone(),
                scraper: context.scraper.clone(),
                artifacts: artifacts.clone(),
                progress: context.progress.clone(),
            };
            let semaphore = semaphore.clone();
            let cancel_rx = cancel_rx.clone();

            tasks.spawn(async move {
                let start = Instant::now();
                let status = tokio::select! {
                    biased;
                    _ = wait_cancelled(cancel_rx) => SlotStatus::Cancelled,
                    status = async {
                        let _permit = match semaphore {
                            Some(s) => s.acquire_owned().await.ok(),
                            None => None,
                        };
                        slot.run().await
                    } => status,
                };
                let outcome = SlotOutcome {
                    store,
                    status,
                    duration_ms: start.elapsed().as_millis() as u64,
                };
                (index, outcome)
            });
        }

        let mut outcomes: Vec<(usize, SlotOutcome)> = Vec::with_capacity(context.matrix.len());
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!("Matrix slot task panicked: {}", e);
                    if context.options.fail_fast {
                        let _ = cancel_tx.send(true);
                    }
                    continue;
                }
            };

            let store = outcome.store.to_string();
            match &outcome.status {
                SlotStatus::Succeeded {
                    products, pages, ..
                } => {
                    context.progress.on_progress(&ProgressEvent::SlotComplete {
                        store,
                        products: *products,
                        pages: pages.unwrap_or(0),
                        duration: Duration::from_millis(outcome.duration_ms),
                    });
                }
                SlotStatus::Failed { error } => {
                    context.progress.on_progress(&ProgressEvent::SlotFailed {
                        store,
                        error: error.clone(),
                    });
                    if context.options.fail_fast {
                        debug!("Fail-fast: cancelling remaining slots");
                        let _ = cancel_tx.send(true);
                    }
                }
                SlotStatus::Cancelled => {
                    context
                        .progress
                        .on_progress(&ProgressEvent::SlotCancelled { store });
                }
            }
            outcomes.push((index, outcome));
        }

        // Panicked slots never report back; record them as failed
        let reported: Vec<usize> = outcomes.iter().map(|(i, _)| *i).collect();
        for (index, store) in context.matrix.iter().enumerate() {
            if !reported.contains(&index) {
                outcomes.push((
                    index,
                    SlotOutcome {
                        store: store.clone(),
                        status: SlotStatus::Failed {
                            error: "slot task panicked".to_string(),
                        },
                        duration_ms: 0,
                    },
                ));
            }
        }

        outcomes.sort_by_key(|(index, _)| *index);
        context.slots = outcomes.into_iter().map(|(_, outcome)| outcome).collect();
        Ok(())
    }
}
