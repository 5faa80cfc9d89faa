//! Per-run artifact staging
//!
//! Each successful matrix slot stages its catalogue as
//! `<root>/products-<store>/<store>_products.json`. After every slot has
//! finished, the aggregation step copies the staged catalogues into the
//! tracked data directory.

use crate::registry::StoreId;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const ARTIFACT_PREFIX: &str = "products-";
const CATALOGUE_SUFFIX: &str = "_products.json";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_dir(&self, store: &StoreId) -> PathBuf {
        self.root.join(store.artifact_name())
    }

    /// Copies a slot's catalogue into its artifact directory.
    pub async fn stage(&self, store: &StoreId, catalogue: &Path) -> io::Result<PathBuf> {
        let dir = self.artifact_dir(store);
        tokio::fs::create_dir_all(&dir).await?;
        let dest = dir.join(store.catalogue_file_name());
        tokio::fs::copy(catalogue, &dest).await?;
        debug!(store = %store, artifact = %dest.display(), "Staged artifact");
        Ok(dest)
    }

    /// Staged catalogue files, sorted by path.
    pub async fn list(&self) -> io::Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let is_artifact = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(ARTIFACT_PREFIX));
            if !is_artifact || !entry.file_type().await?.is_dir() {
                continue;
            }

            let mut files = tokio::fs::read_dir(entry.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let is_catalogue = file
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.ends_with(CATALOGUE_SUFFIX));
                if is_catalogue && file.file_type().await?.is_file() {
                    found.push(file.path());
                }
            }
        }

        found.sort();
        Ok(found)
    }

    /// Copies every staged catalogue into `data_dir`, overwriting older copies.
    /// Returns the destination paths in sorted order.
    pub async fn collect_into(&self, data_dir: &Path) -> io::Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(data_dir).await?;

        let mut copied = Vec::new();
        for artifact in self.list().await? {
            let Some(name) = artifact.file_name() else {
                continue;
            };
            let dest = data_dir.join(name);
            tokio::fs::copy(&artifact, &dest).await?;
            copied.push(dest);
        }

        copied.sort();
        Ok(copied)
    }
}

/// Hex SHA-256 of a file's content
pub async fn file_digest(path: &Path) -> io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Store identifier encoded in a `<store>_products.json` file name
pub fn store_from_file_name(path: &Path) -> Option<&str> {
    path.file_name()?.to_str()?.strip_suffix(CATALOGUE_SUFFIX)
}
