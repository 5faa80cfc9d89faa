use super::{ScrapeError, ScrapeOutput, Scraper};
use crate::config::CubeIndexConfig;
use crate::fetch::{write_catalogue, Catalogue, CatalogueFetcher, ShopifySource};
use crate::progress::{NoOpHandler, ProgressHandler};
use crate::registry::{StoreId, StoreRegistry};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Built-in scraper for Shopify stores listed in the registry
pub struct NativeScraper {
    registry: Arc<StoreRegistry>,
    page_limit: u32,
    request_timeout: Duration,
    page_delay: Duration,
    allow_partial: bool,
    progress: Arc<dyn ProgressHandler>,
}

impl NativeScraper {
    pub fn new(registry: Arc<StoreRegistry>, config: &CubeIndexConfig) -> Self {
        Self {
            registry,
            page_limit: config.page_limit,
            request_timeout: config.request_timeout(),
            page_delay: config.page_delay(),
            allow_partial: false,
            progress: Arc::new(NoOpHandler),
        }
    }

    pub fn with_allow_partial(mut self, allow_partial: bool) -> Self {
        self.allow_partial = allow_partial;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    /// Downloads a store's full catalogue without writing it anywhere.
    pub async fn fetch_store(&self, store: &StoreId) -> Result<Catalogue, ScrapeError> {
        let entry = self.registry.resolve(store)?;
        info!(store = %store, host = entry.host(), "Fetching catalogue");

        let source = ShopifySource::new(&entry.endpoint, self.page_limit, self.request_timeout)?;
        let catalogue = CatalogueFetcher::new(source, store.as_str())
            .with_page_delay(self.page_delay)
            .with_allow_partial(self.allow_partial)
            .with_progress(self.progress.clone())
            .fetch_all()
            .await?;

        info!(
            store = %store,
            products = catalogue.len(),
            pages = catalogue.pages,
            "Collected {} products across {} pages",
            catalogue.len(),
            catalogue.pages
        );
        Ok(catalogue)
    }
}

#[async_trait]
impl Scraper for NativeScraper {
    async fn scrape(&self, store: &StoreId, work_dir: &Path) -> Result<ScrapeOutput, ScrapeError> {
        let catalogue = self.fetch_store(store).await?;
        let path = work_dir.join(store.catalogue_file_name());
        write_catalogue(&path, &catalogue.products).await?;

        Ok(ScrapeOutput {
            path,
            products: catalogue.len(),
            pages: Some(catalogue.pages),
            truncated: catalogue.truncated,
        })
    }

    fn name(&self) -> &str {
        "native"
    }
}
