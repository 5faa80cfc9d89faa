//! cubeindex - speedcube store catalogue collector
//!
//! Downloads the public Shopify `products.json` catalogue of a fixed matrix of
//! speedcube stores, one isolated task per store, and commits the aggregated
//! catalogues back into the repository when any of them changed.
//!
//! # Workflow
//!
//! 1. **Matrix**: every store runs in its own task and work directory and
//!    either produces `<store>_products.json` (staged as the `products-<store>`
//!    artifact) or is reported failed.
//! 2. **Aggregate**: once every slot is terminal, staged catalogues are copied
//!    into the tracked data directory (`stores_products/` by default).
//! 3. **Publish**: the data directory is committed with the bot identity, but
//!    only when its content differs from `HEAD`.
//!
//! The `normalize` module turns aggregated catalogues into `cube_models` rows
//! and can upsert them into Supabase.
//!
//! # Example
//!
//! ```ignore
//! use cubeindex::{CubeIndexConfig, NativeScraper, StoreRegistry, SyncContext, SyncOptions, SyncOrchestrator};
//! use std::sync::Arc;
//!
//! let config = CubeIndexConfig::default();
//! let scraper = NativeScraper::new(Arc::new(StoreRegistry::builtin()), &config);
//! let mut context = SyncContext::new(
//!     cubeindex::registry::default_matrix(),
//!     Arc::new(scraper),
//!     config.staging_dir.clone(),
//!     SyncOptions::default(),
//! );
//! let report = SyncOrchestrator::new().execute(&mut context).await?;
//! println!("{} stores failed", report.failed_slots());
//! ```

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod registry;
pub mod scraper;
pub mod util;

pub use config::{ConfigError, CubeIndexConfig};
pub use fetch::{Catalogue, CatalogueFetcher, FetchError, PageSource, ShopifySource};
pub use pipeline::{SyncContext, SyncOptions, SyncOrchestrator, SyncReport};
pub use publish::{CommitIdentity, CommitPublisher, GitRepo, PublishError, PublishOutcome};
pub use registry::{RegistryError, Store, StoreId, StoreRegistry};
pub use crate::scraper::{CommandScraper, NativeScraper, ScrapeError, Scraper};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
