//! Normalizes aggregated store catalogues into `cube_models` rows
//!
//! Every `*_products.json` in the data directory is read in file-name order.
//! Merchandise is skipped, each remaining product becomes a base row plus one
//! trim row per variant, and rows are deduplicated by slug (first wins).

mod row;
mod rules;
mod supabase;

pub use row::{normalize_product, CubeRow, VersionType};
pub use rules::{
    detect_size_mm, detect_surface_finish, extract_series, is_stickered, should_skip, slugify,
};
pub use supabase::{SupabaseClient, SupabaseConfig, UPSERT_CHUNK};

use crate::config::ConfigError;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Default location of the local review dump
pub const DEFAULT_OUTPUT: &str = "normalized_outputs/all_products_normalized.json";

const CATALOGUE_SUFFIX: &str = "_products.json";

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a JSON product array: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize rows: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Upload request failed: {0}")]
    Network(String),

    #[error("Upload rejected with HTTP {status}: {body}")]
    Upload { status: u16, body: String },
}

/// Products scanned from one catalogue file
#[derive(Debug, Clone, Serialize)]
pub struct FileScan {
    pub file: PathBuf,
    pub products: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizeReport {
    pub files: Vec<FileScan>,
    /// Rows produced before deduplication
    pub candidates: usize,
    #[serde(skip)]
    pub rows: Vec<CubeRow>,
}

impl NormalizeReport {
    pub fn unique_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Catalogue files in `data_dir`, sorted by name.
pub async fn catalogue_files(data_dir: &Path) -> Result<Vec<PathBuf>, NormalizeError> {
    let io_err = |source| NormalizeError::Io {
        path: data_dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(data_dir).await.map_err(io_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        let is_catalogue = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(CATALOGUE_SUFFIX));
        if is_catalogue && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn read_products(path: &Path) -> Result<Vec<Value>, NormalizeError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| NormalizeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&content).map_err(|source| NormalizeError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Rows for every product that is not skipped, in input order.
pub fn normalize_products(products: &[Value]) -> Vec<CubeRow> {
    products
        .iter()
        .filter(|p| !should_skip(p))
        .flat_map(normalize_product)
        .collect()
}

/// Keeps the first row for each slug, preserving order.
pub fn deduplicate(rows: Vec<CubeRow>) -> Vec<CubeRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.slug.clone()))
        .collect()
}

/// Normalizes every catalogue in `data_dir`.
pub async fn normalize_dir(data_dir: &Path) -> Result<NormalizeReport, NormalizeError> {
    let mut files = Vec::new();
    let mut rows = Vec::new();

    for path in catalogue_files(data_dir).await? {
        let products = read_products(&path).await?;
        rows.extend(normalize_products(&products));
        info!(
            "{} -> {} item(s) scanned",
            path.file_name().and_then(|n| n.to_str()).unwrap_or_default(),
            products.len()
        );
        files.push(FileScan {
            file: path,
            products: products.len(),
        });
    }

    let candidates = rows.len();
    let rows = deduplicate(rows);
    debug!("{} candidate row(s), {} unique", candidates, rows.len());

    Ok(NormalizeReport {
        files,
        candidates,
        rows,
    })
}

/// Writes rows as pretty-printed JSON, creating parent directories.
pub async fn write_dump(path: &Path, rows: &[CubeRow]) -> Result<(), NormalizeError> {
    let io_err = |source| NormalizeError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(rows)?;
    tokio::fs::write(path, json).await.map_err(io_err)
}
