//! Thin async wrapper over the `git` binary

use super::PublishError;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    /// Opens the work tree containing `dir`.
    pub async fn open(dir: &Path) -> Result<Self, PublishError> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(dir)
            .output()
            .await
            .map_err(PublishError::GitUnavailable)?;

        if !output.status.success() {
            return Err(PublishError::NotARepository(dir.to_path_buf()));
        }

        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let root = PathBuf::from(root)
            .canonicalize()
            .map_err(|source| PublishError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `path` relative to the work tree root, for use as a pathspec.
    pub fn relative_path(&self, path: &Path) -> Result<PathBuf, PublishError> {
        let absolute = path.canonicalize().map_err(|source| PublishError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        absolute
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .map_err(|_| PublishError::OutsideRepository(path.to_path_buf()))
    }

    /// Runs git in the work tree root and returns trimmed stdout.
    pub async fn run(&self, args: &[&str]) -> Result<String, PublishError> {
        debug!(args = ?args, "git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .await
            .map_err(PublishError::GitUnavailable)?;

        if !output.status.success() {
            return Err(PublishError::GitFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub async fn head(&self) -> Result<String, PublishError> {
        self.run(&["rev-parse", "HEAD"]).await
    }
}
