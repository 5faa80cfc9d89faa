//! Copies staged artifacts into the tracked data directory

use crate::artifacts::file_digest;
use crate::pipeline::context::SyncContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::report::AggregatedFile;
use crate::progress::ProgressEvent;
use anyhow::{Context, Result};
use async_trait::async_trait;

pub struct AggregatePhase;

/// Why aggregation must not run for this set of slot outcomes, if anything.
fn skip_reason(context: &SyncContext) -> Option<String> {
    let total = context.slots.len();
    let succeeded = context.slots.iter().filter(|s| s.succeeded()).count();

    if succeeded == 0 {
        return Some("no slot produced a catalogue".to_string());
    }
    if succeeded < total && !context.options.commit_partial {
        return Some(format!("{} of {} slots did not succeed", total - succeeded, total));
    }
    None
}

#[async_trait]
impl WorkflowPhase for AggregatePhase {
    fn name(&self) -> &'static str {
        "AggregatePhase"
    }

    async fn execute(&self, context: &mut SyncContext) -> Result<()> {
        if let Some(reason) = skip_reason(context) {
            context
                .progress
                .on_progress(&ProgressEvent::AggregationSkipped {
                    reason: reason.clone(),
                });
            context.aggregation_skipped = Some(reason);
            return Ok(());
        }

        let data_dir = context.options.data_dir.clone();
        let copied = context
            .artifacts()
            .collect_into(&data_dir)
            .await
            .with_context(|| format!("Failed to collect artifacts into {}", data_dir.display()))?;

        let mut aggregated = Vec::with_capacity(copied.len());
        for path in copied {
            let sha256 = file_digest(&path)
                .await
                .with_context(|| format!("Failed to hash {}", path.display()))?;
            aggregated.push(AggregatedFile { path, sha256 });
        }

        context
            .progress
            .on_progress(&ProgressEvent::AggregationComplete {
                files: aggregated.len(),
            });
        context.aggregated = aggregated;
        Ok(())
    }
}
