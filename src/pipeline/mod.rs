pub mod context;
pub mod orchestrator;
pub mod phase_trait;
pub mod phases;
pub mod report;

pub use context::{SyncContext, SyncOptions};
pub use orchestrator::SyncOrchestrator;
pub use phase_trait::WorkflowPhase;
pub use report::{AggregatedFile, SlotOutcome, SlotStatus, SyncReport};
