//! Pagination over a page source and catalogue file IO

use super::error::FetchError;
use super::shopify::PageSource;
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Products collected from one store
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    pub products: Vec<Value>,

    /// Number of non-empty pages fetched
    pub pages: u32,

    /// Set when pagination stopped early on an error and the partial result was kept
    pub truncated: Option<String>,
}

impl Catalogue {
    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Walks a page source from page 1 until an empty page
pub struct CatalogueFetcher<S> {
    source: S,
    store: String,
    page_delay: Duration,
    allow_partial: bool,
    progress: Arc<dyn ProgressHandler>,
}

impl<S: PageSource> CatalogueFetcher<S> {
    pub fn new(source: S, store: impl Into<String>) -> Self {
        Self {
            source,
            store: store.into(),
            page_delay: Duration::ZERO,
            allow_partial: false,
            progress: Arc::new(NoOpHandler),
        }
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_allow_partial(mut self, allow_partial: bool) -> Self {
        self.allow_partial = allow_partial;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub async fn fetch_all(&self) -> Result<Catalogue, FetchError> {
        let mut products: Vec<Value> = Vec::new();
        let mut page: u32 = 1;

        loop {
            let chunk = match self.source.fetch_page(page).await {
                Ok(chunk) => chunk,
                Err(e) if self.allow_partial && page > 1 => {
                    warn!(
                        store = %self.store,
                        page,
                        error = %e,
                        "Stopping early, keeping {} products",
                        products.len()
                    );
                    return Ok(Catalogue {
                        products,
                        pages: page - 1,
                        truncated: Some(e.to_string()),
                    });
                }
                Err(e) => return Err(e),
            };

            if chunk.is_empty() {
                debug!(store = %self.store, page, "Empty page, catalogue complete");
                break;
            }

            let page_products = chunk.len();
            products.extend(chunk);
            self.progress.on_progress(&ProgressEvent::PageFetched {
                store: self.store.clone(),
                page,
                page_products,
                total_products: products.len(),
            });

            page += 1;
            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        Ok(Catalogue {
            products,
            pages: page - 1,
            truncated: None,
        })
    }
}

/// Writes products as a pretty-printed JSON array, creating parent directories.
pub async fn write_catalogue(path: &Path, products: &[Value]) -> Result<PathBuf, FetchError> {
    let json = serde_json::to_string_pretty(products)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| FetchError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(path, json)
        .await
        .map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(path.to_path_buf())
}
