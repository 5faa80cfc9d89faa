//! Outcomes of a sync run

use crate::publish::PublishOutcome;
use crate::registry::StoreId;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlotStatus {
    Succeeded {
        products: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        pages: Option<u32>,
        artifact: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        truncated: Option<String>,
    },
    Failed {
        error: String,
    },
    Cancelled,
}

/// Terminal state of one matrix slot
#[derive(Debug, Clone, Serialize)]
pub struct SlotOutcome {
    pub store: StoreId,
    #[serde(flatten)]
    pub status: SlotStatus,
    pub duration_ms: u64,
}

impl SlotOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, SlotStatus::Succeeded { .. })
    }
}

/// A catalogue copied into the data directory
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedFile {
    pub path: PathBuf,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: String,
    pub slots: Vec<SlotOutcome>,
    pub aggregated: Vec<AggregatedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation_skipped: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishOutcome>,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn failed_slots(&self) -> usize {
        self.slots.iter().filter(|s| !s.succeeded()).count()
    }

    pub fn succeeded_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.succeeded()).count()
    }

    /// True when every slot produced its catalogue.
    pub fn is_success(&self) -> bool {
        self.failed_slots() == 0
    }
}
