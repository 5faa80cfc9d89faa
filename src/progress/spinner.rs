//! Terminal spinner progress handler
//!
//! One spinner line per matrix slot showing the page currently being fetched.

use super::{ProgressEvent, ProgressHandler};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";
const TICK_INTERVAL: Duration = Duration::from_millis(100);

pub struct SpinnerHandler {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl Default for SpinnerHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SpinnerHandler {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    /// Handler drawing into the given `MultiProgress` (hidden targets are used in tests).
    pub fn with_multi(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner} {prefix:>12} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICK_CHARS)
    }

    fn with_bar(&self, store: &str, f: impl FnOnce(&ProgressBar)) {
        let Ok(bars) = self.bars.lock() else {
            return;
        };
        if let Some(bar) = bars.get(store) {
            f(bar);
        }
    }

    fn take_bar(&self, store: &str) -> Option<ProgressBar> {
        self.bars.lock().ok().and_then(|mut bars| bars.remove(store))
    }

    fn start(&self, store: &str) {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(Self::style());
        bar.set_prefix(store.to_string());
        bar.set_message("Fetching page 1");
        bar.enable_steady_tick(TICK_INTERVAL);

        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(store.to_string(), bar);
        }
    }
}

impl ProgressHandler for SpinnerHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::SlotStarted { store } => self.start(store),
            ProgressEvent::PageFetched {
                store,
                page,
                total_products,
                ..
            } => {
                self.with_bar(store, |bar| {
                    bar.set_message(format!(
                        "Fetching page {} ({} products so far)",
                        page + 1,
                        total_products
                    ));
                });
            }
            ProgressEvent::SlotComplete {
                store,
                products,
                pages,
                ..
            } => {
                if let Some(bar) = self.take_bar(store) {
                    bar.finish_with_message(format!(
                        "✅ Collected {} products across {} pages",
                        products, pages
                    ));
                }
            }
            ProgressEvent::SlotFailed { store, error } => {
                if let Some(bar) = self.take_bar(store) {
                    bar.abandon_with_message(format!("❌ {}", error));
                } else {
                    let _ = self.multi.println(format!("❌ {}: {}", store, error));
                }
            }
            ProgressEvent::SlotCancelled { store } => {
                if let Some(bar) = self.take_bar(store) {
                    bar.abandon_with_message("cancelled");
                }
            }
            ProgressEvent::CommitCreated { commit, files } => {
                let _ = self
                    .multi
                    .println(format!("📄 Committed {} file(s) as {}", files, commit));
            }
            ProgressEvent::CommitSkipped => {
                let _ = self.multi.println("No changes to commit");
            }
            ProgressEvent::SyncStarted { .. }
            | ProgressEvent::AggregationComplete { .. }
            | ProgressEvent::AggregationSkipped { .. }
            | ProgressEvent::Completed { .. } => {}
        }
    }
}
