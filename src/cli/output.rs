//! Output formatting for sync reports, stores and configuration
//!
//! Reports go to stdout in JSON, YAML or a human-readable summary; logs and
//! progress stay on stderr.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::config::CubeIndexConfig;
use crate::normalize::NormalizeReport;
use crate::pipeline::{SlotStatus, SyncReport};
use crate::publish::PublishOutcome;
use crate::registry::{Store, StoreRegistry};

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn serialized<T: Serialize + ?Sized>(&self, value: &T, what: &str) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
            OutputFormat::Yaml | OutputFormat::Human => serde_yaml::to_string(value)
                .with_context(|| format!("Failed to serialize {} to YAML", what)),
        }
    }

    pub fn format_report(&self, report: &SyncReport) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_report_human(report)),
            _ => self.serialized(report, "sync report"),
        }
    }

    pub fn format_publish(&self, outcome: &PublishOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(Self::publish_line(outcome)),
            _ => self.serialized(outcome, "publish outcome"),
        }
    }

    pub fn format_stores(&self, registry: &StoreRegistry) -> Result<String> {
        match self.format {
            OutputFormat::Human => {
                let mut output = String::new();
                for store in registry.iter() {
                    let _ = writeln!(output, "{} ({})", store.id, store.host());
                }
                Ok(output.trim_end().to_string())
            }
            _ => {
                let stores: Vec<&Store> = registry.iter().collect();
                self.serialized(&stores, "stores")
            }
        }
    }

    pub fn format_config(&self, config: &CubeIndexConfig) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(config.to_string().trim_end().to_string()),
            _ => {
                let map: BTreeMap<String, String> = config.to_display_map().into_iter().collect();
                self.serialized(&map, "config")
            }
        }
    }

    pub fn format_normalize(&self, report: &NormalizeReport) -> Result<String> {
        match self.format {
            OutputFormat::Human => {
                let mut output = String::new();
                for scan in &report.files {
                    let name = scan
                        .file
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or_default();
                    let _ = writeln!(output, "✓  {:<32} → {:>3} items scanned", name, scan.products);
                }
                let _ = write!(
                    output,
                    "{} unique row(s) from {} candidate(s)",
                    report.unique_rows(),
                    report.candidates
                );
                Ok(output)
            }
            _ => self.serialized(report, "normalize report"),
        }
    }

    fn publish_line(outcome: &PublishOutcome) -> String {
        match outcome {
            PublishOutcome::Committed {
                commit,
                files,
                pushed,
            } => {
                let short: String = commit.chars().take(12).collect();
                let pushed = if *pushed { ", pushed" } else { "" };
                format!("Committed {} ({} file(s){})", short, files.len(), pushed)
            }
            PublishOutcome::Unchanged => "No changes to commit".to_string(),
        }
    }

    fn format_report_human(&self, report: &SyncReport) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "Sync {}", report.run_id);
        let _ = writeln!(output);
        for slot in &report.slots {
            let line = match &slot.status {
                SlotStatus::Succeeded {
                    products,
                    pages,
                    truncated,
                    ..
                } => {
                    let pages = pages.map(|p| format!(", {} page(s)", p)).unwrap_or_default();
                    let partial = if truncated.is_some() { " (partial)" } else { "" };
                    format!("✅ {:<14} {} product(s){}{}", slot.store, products, pages, partial)
                }
                SlotStatus::Failed { error } => format!("❌ {:<14} {}", slot.store, error),
                SlotStatus::Cancelled => format!("⏹  {:<14} cancelled", slot.store),
            };
            let _ = writeln!(output, "  {}", line);
        }

        let _ = writeln!(output);
        match &report.aggregation_skipped {
            Some(reason) => {
                let _ = writeln!(output, "Aggregation skipped: {}", reason);
            }
            None => {
                let _ = writeln!(output, "Aggregated {} file(s)", report.aggregated.len());
            }
        }
        if let Some(outcome) = &report.publish {
            let _ = writeln!(output, "{}", Self::publish_line(outcome));
        }

        let _ = write!(
            output,
            "{} succeeded, {} failed in {:.1}s",
            report.succeeded_slots(),
            report.failed_slots(),
            report.duration_ms as f64 / 1000.0
        );
        output
    }
}
