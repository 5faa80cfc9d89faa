//! Upserts normalized rows into the `cube_models` table over PostgREST

use super::row::CubeRow;
use super::NormalizeError;
use crate::config::ConfigError;
use reqwest::Client;
use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const TABLE: &str = "cube_models";
pub const CONFLICT_COLUMN: &str = "slug";

/// Rows per request, below the REST row cap
pub const UPSERT_CHUNK: usize = 500;

const ENV_FILE: &str = ".env.local";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
}

impl SupabaseConfig {
    /// Reads `SUPABASE_URL` and `SUPABASE_KEY`, loading `.env.local` from the
    /// current directory first when it exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load_env_file(Path::new(ENV_FILE));
        Self::from_vars()
    }

    fn load_env_file(path: &Path) {
        match dotenvy::from_path(path) {
            Ok(()) => debug!("Loaded {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("Ignoring {}: {}", path.display(), e),
        }
    }

    fn from_vars() -> Result<Self, ConfigError> {
        let read = |name: &str| {
            env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVariable(name.to_string()))
        };
        Ok(Self {
            url: read("SUPABASE_URL")?,
            key: read("SUPABASE_KEY")?,
        })
    }
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    config: SupabaseConfig,
    http_client: Client,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Result<Self, NormalizeError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("{}/{}", crate::NAME, crate::VERSION))
            .build()
            .map_err(|e| NormalizeError::Client(e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.config.url.trim_end_matches('/'), TABLE)
    }

    /// Upserts `rows` in batches of at most `chunk`, merging on slug conflicts.
    /// Returns the number of requests made.
    pub async fn upsert_rows(&self, rows: &[CubeRow], chunk: usize) -> Result<usize, NormalizeError> {
        let endpoint = self.endpoint();
        let mut batches = 0;

        for batch in rows.chunks(chunk.max(1)) {
            debug!("Upserting {} row(s) into {}", batch.len(), TABLE);
            let response = self
                .http_client
                .post(&endpoint)
                .query(&[("on_conflict", CONFLICT_COLUMN)])
                .header("apikey", &self.config.key)
                .bearer_auth(&self.config.key)
                .header("Prefer", "resolution=merge-duplicates")
                .json(batch)
                .send()
                .await
                .map_err(|e| NormalizeError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(NormalizeError::Upload {
                    status: status.as_u16(),
                    body: body.chars().take(500).collect(),
                });
            }
            batches += 1;
        }

        info!("Upserted {} row(s) in {} request(s)", rows.len(), batches);
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_missing_credentials() {
        env::remove_var("SUPABASE_URL");
        env::remove_var("SUPABASE_KEY");
        let err = SupabaseConfig::from_vars().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable(ref v) if v == "SUPABASE_URL"));
    }

    #[test]
    #[serial]
    fn test_env_file_fills_credentials() {
        env::remove_var("SUPABASE_URL");
        env::remove_var("SUPABASE_KEY");
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join(".env.local");
        std::fs::write(&file, "SUPABASE_URL=https://db.example.com\nSUPABASE_KEY=secret\n").unwrap();

        SupabaseConfig::load_env_file(&file);
        let config = SupabaseConfig::from_vars().unwrap();
        assert_eq!(config.url, "https://db.example.com");
        assert!(!format!("{:?}", config).contains("secret"));

        env::remove_var("SUPABASE_URL");
        env::remove_var("SUPABASE_KEY");
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let client = SupabaseClient::new(SupabaseConfig {
            url: "https://db.example.com/".to_string(),
            key: "k".to_string(),
        })
        .unwrap();
        assert_eq!(client.endpoint(), "https://db.example.com/rest/v1/cube_models");
    }
}
