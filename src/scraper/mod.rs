//! Scrapers run by each matrix slot
//!
//! The contract every scraper honours: given a store identifier and a working
//! directory, a successful run leaves `<store>_products.json` in that directory.

mod command;
mod native;

pub use command::CommandScraper;
pub use native::NativeScraper;

use crate::fetch::FetchError;
use crate::registry::{RegistryError, StoreId};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Scraper command is empty")]
    EmptyCommand,

    #[error("Cannot determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("Failed to launch scraper '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Scraper exited with {status} for store {store}: {stderr}")]
    CommandFailed {
        store: String,
        status: String,
        stderr: String,
    },

    #[error("Scraper did not produce {}", path.display())]
    MissingOutput { path: PathBuf },

    #[error("Scraper output {} is not a JSON array: {message}", path.display())]
    InvalidOutput { path: PathBuf, message: String },
}

/// What a slot produced
#[derive(Debug, Clone)]
pub struct ScrapeOutput {
    /// Path of `<store>_products.json` inside the work directory
    pub path: PathBuf,
    pub products: usize,

    /// Pages fetched, when the scraper reports them
    pub pages: Option<u32>,

    /// Set when the catalogue was cut short and kept anyway
    pub truncated: Option<String>,
}

#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, store: &StoreId, work_dir: &Path) -> Result<ScrapeOutput, ScrapeError>;

    fn name(&self) -> &str;
}

/// Counts products in a catalogue file, rejecting anything but a JSON array.
pub(crate) async fn inspect_output(path: &Path) -> Result<usize, ScrapeError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScrapeError::MissingOutput {
                path: path.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(ScrapeError::InvalidOutput {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    };

    let products: Vec<serde_json::Value> =
        serde_json::from_slice(&bytes).map_err(|e| ScrapeError::InvalidOutput {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(products.len())
}
