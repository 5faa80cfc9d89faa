//! Commits the data directory when its content changed

use crate::pipeline::context::SyncContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::progress::ProgressEvent;
use crate::publish::PublishOutcome;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

pub struct PublishPhase;

#[async_trait]
impl WorkflowPhase for PublishPhase {
    fn name(&self) -> &'static str {
        "PublishPhase"
    }

    async fn execute(&self, context: &mut SyncContext) -> Result<()> {
        if context.aggregation_skipped.is_some() {
            debug!("Aggregation was skipped, nothing to publish");
            return Ok(());
        }
        let Some(publisher) = &context.publisher else {
            debug!("Publishing disabled");
            return Ok(());
        };

        let outcome = publisher
            .publish(&context.options.data_dir)
            .await
            .context("Failed to publish catalogues")?;

        match &outcome {
            PublishOutcome::Committed { commit, files, .. } => {
                context.progress.on_progress(&ProgressEvent::CommitCreated {
                    commit: commit.clone(),
                    files: files.len(),
                });
            }
            PublishOutcome::Unchanged => {
                context.progress.on_progress(&ProgressEvent::CommitSkipped);
            }
        }

        context.publish = Some(outcome);
        Ok(())
    }
}
