//! Diff-and-commit publishing of the tracked catalogue directory
//!
//! The data directory is staged, and a single commit is created only when
//! the staged content differs from `HEAD`. Byte-identical catalogues never
//! produce an empty commit.

mod git;

pub use git::GitRepo;

use crate::artifacts::store_from_file_name;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("git is not available: {0}")]
    GitUnavailable(#[source] std::io::Error),

    #[error("{} is not inside a git work tree", .0.display())]
    NotARepository(PathBuf),

    #[error("{} is outside the repository", .0.display())]
    OutsideRepository(PathBuf),

    #[error("git {command} failed: {stderr}")]
    GitFailed { command: String, stderr: String },

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Author and committer identity used for catalogue commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

/// Result of a publish attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PublishOutcome {
    Committed {
        commit: String,
        files: Vec<String>,
        pushed: bool,
    },
    Unchanged,
}

/// Expands `{date}`, `{stores}` and `{count}` in a commit message template.
pub fn render_message(template: &str, changed_files: &[String], date: &str) -> String {
    let stores: Vec<&str> = changed_files
        .iter()
        .filter_map(|f| store_from_file_name(Path::new(f)))
        .collect();

    template
        .replace("{date}", date)
        .replace("{stores}", &stores.join(", "))
        .replace("{count}", &changed_files.len().to_string())
}

#[derive(Debug, Clone)]
pub struct CommitPublisher {
    repo: GitRepo,
    identity: CommitIdentity,
    message_template: String,
    push: bool,
}

impl CommitPublisher {
    pub fn new(repo: GitRepo, identity: CommitIdentity, message_template: impl Into<String>) -> Self {
        Self {
            repo,
            identity,
            message_template: message_template.into(),
            push: false,
        }
    }

    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }

    /// Stages `data_dir` and commits it if anything under it changed.
    pub async fn publish(&self, data_dir: &Path) -> Result<PublishOutcome, PublishError> {
        let pathspec = self.repo.relative_path(data_dir)?;
        let pathspec = pathspec.to_string_lossy().to_string();
        let pathspec = if pathspec.is_empty() {
            ".".to_string()
        } else {
            pathspec
        };

        self.repo.run(&["add", "--all", "--", &pathspec]).await?;

        let changed = self
            .repo
            .run(&["diff", "--cached", "--name-only", "--", &pathspec])
            .await?;
        let changed: Vec<String> = changed
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        if changed.is_empty() {
            info!(path = %pathspec, "Catalogues unchanged, skipping commit");
            return Ok(PublishOutcome::Unchanged);
        }

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let message = render_message(&self.message_template, &changed, &date);
        let name_cfg = format!("user.name={}", self.identity.name);
        let email_cfg = format!("user.email={}", self.identity.email);

        self.repo
            .run(&[
                "-c",
                &name_cfg,
                "-c",
                &email_cfg,
                "commit",
                "--quiet",
                "-m",
                &message,
                "--",
                &pathspec,
            ])
            .await?;

        let commit = self.repo.head().await?;
        info!(commit = %commit, files = changed.len(), "Created catalogue commit");

        if self.push {
            self.repo.run(&["push"]).await?;
            info!(commit = %commit, "Pushed catalogue commit");
        }

        Ok(PublishOutcome::Committed {
            commit,
            files: changed,
            pushed: self.push,
        })
    }
}
