//! Store registry
//!
//! Maps a short store identifier (`scs`, `kewbz`, ...) to the public Shopify
//! `products.json` endpoint of that store. The built-in table can be extended
//! or overridden with a TOML stores file:
//!
//! ```toml
//! [stores]
//! d-fan = "https://example.com/products.json"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

const BUILTIN_STORES: &[(&str, &str)] = &[
    ("scs", "https://speedcubeshop.com/products.json"),
    ("cubicle", "https://thecubicle.com/products.json"),
    ("cubelelo", "https://cubelelo.com/products.json"),
    ("dailypuzzles", "https://dailypuzzles.com.au/products.json"),
    ("gancube", "https://gancube.com/products.json"),
    ("kewbz", "https://kewbz.co.uk/products.json"),
    ("sc-za", "https://www.speedcubes.co.za/products.json"),
];

/// Stores the sync workflow fans out over when no `--store` is given.
pub const DEFAULT_MATRIX: &[&str] = &[
    "scs",
    "cubicle",
    "cubelelo",
    "dailypuzzles",
    "gancube",
    "kewbz",
    "sc-za",
    "d-fan",
    "kill-cubes",
    "cube-speed",
];

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid store identifier '{0}': use lowercase letters, digits and '-'")]
    InvalidId(String),

    #[error("Unknown store '{id}'. Known stores: {known}")]
    UnknownStore { id: String, known: String },

    #[error("Invalid endpoint for store '{id}': {endpoint}")]
    InvalidEndpoint { id: String, endpoint: String },

    #[error("Failed to read stores file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse stores file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Short identifier of a store, e.g. `sc-za`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreId(String);

impl StoreId {
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(RegistryError::InvalidId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the catalogue file the scraper contract produces for this store.
    pub fn catalogue_file_name(&self) -> String {
        format!("{}_products.json", self.0)
    }

    /// Name of the artifact bundle holding this store's catalogue.
    pub fn artifact_name(&self) -> String {
        format!("products-{}", self.0)
    }
}

impl FromStr for StoreId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StoreId {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StoreId> for String {
    fn from(id: StoreId) -> Self {
        id.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// A store and its catalogue endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Store {
    pub id: StoreId,
    pub endpoint: String,
}

impl Store {
    /// Host part of the endpoint, e.g. `kewbz.co.uk`
    pub fn host(&self) -> &str {
        let without_scheme = self
            .endpoint
            .split_once("//")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.endpoint);
        without_scheme.split('/').next().unwrap_or(without_scheme)
    }
}

#[derive(Debug, Deserialize)]
struct StoresFile {
    #[serde(default)]
    stores: BTreeMap<String, String>,
}

/// Ordered collection of known stores
#[derive(Debug, Clone, Default)]
pub struct StoreRegistry {
    stores: Vec<Store>,
}

impl StoreRegistry {
    pub fn builtin() -> Self {
        let stores = BUILTIN_STORES
            .iter()
            .map(|(id, endpoint)| Store {
                id: StoreId(id.to_string()),
                endpoint: endpoint.to_string(),
            })
            .collect();
        Self { stores }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, RegistryError> {
        let file: StoresFile = toml::from_str(content)?;
        let mut registry = Self::default();
        for (id, endpoint) in file.stores {
            let id = StoreId::parse(&id)?;
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(RegistryError::InvalidEndpoint {
                    id: id.to_string(),
                    endpoint,
                });
            }
            registry.insert(Store { id, endpoint });
        }
        Ok(registry)
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Adds or replaces a store, keeping the original position on replace.
    pub fn insert(&mut self, store: Store) {
        match self.stores.iter_mut().find(|s| s.id == store.id) {
            Some(existing) => *existing = store,
            None => self.stores.push(store),
        }
    }

    /// Merges `other` into this registry; entries from `other` win.
    pub fn merge(mut self, other: StoreRegistry) -> Self {
        for store in other.stores {
            self.insert(store);
        }
        self
    }

    pub fn get(&self, id: &StoreId) -> Option<&Store> {
        self.stores.iter().find(|s| &s.id == id)
    }

    pub fn resolve(&self, id: &StoreId) -> Result<&Store, RegistryError> {
        self.get(id).ok_or_else(|| RegistryError::UnknownStore {
            id: id.to_string(),
            known: self.known_ids().join(", "),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Store> {
        self.stores.iter()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    fn known_ids(&self) -> Vec<&str> {
        self.stores.iter().map(|s| s.id.as_str()).collect()
    }
}

pub fn default_matrix() -> Vec<StoreId> {
    DEFAULT_MATRIX
        .iter()
        .map(|id| StoreId(id.to_string()))
        .collect()
}
