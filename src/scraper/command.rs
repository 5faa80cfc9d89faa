use super::{inspect_output, ScrapeError, ScrapeOutput, Scraper};
use crate::registry::StoreId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Runs an external scraper program with the store identifier as its only
/// positional argument, e.g. `python fetch_stores_products.py scs`.
#[derive(Debug, Clone)]
pub struct CommandScraper {
    program: String,
    args: Vec<String>,
}

impl CommandScraper {
    /// Parses a whitespace-separated command line. Relative paths in it are
    /// resolved against the current directory, since the command itself runs
    /// inside each slot's work directory.
    pub fn parse(command_line: &str) -> Result<Self, ScrapeError> {
        let base = std::env::current_dir().map_err(ScrapeError::CurrentDir)?;
        Self::parse_in(command_line, &base)
    }

    /// Like [`CommandScraper::parse`], resolving relative paths against `base`.
    pub fn parse_in(command_line: &str, base: &Path) -> Result<Self, ScrapeError> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next().ok_or(ScrapeError::EmptyCommand)?;

        // Bare program names are left for PATH lookup
        let program = if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
            absolutize(program, base)
        } else {
            program.to_string()
        };

        Ok(Self {
            program,
            args: parts.map(|arg| absolutize(arg, base)).collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// `arg` joined onto `base` when it names an existing relative path, unchanged otherwise.
fn absolutize(arg: &str, base: &Path) -> String {
    let path = Path::new(arg);
    if path.is_absolute() {
        return arg.to_string();
    }
    let candidate: PathBuf = base.join(path);
    if candidate.exists() {
        candidate.to_string_lossy().into_owned()
    } else {
        arg.to_string()
    }
}

#[async_trait]
impl Scraper for CommandScraper {
    async fn scrape(&self, store: &StoreId, work_dir: &Path) -> Result<ScrapeOutput, ScrapeError> {
        tokio::fs::create_dir_all(work_dir)
            .await
            .map_err(|source| ScrapeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        debug!(
            program = %self.program,
            args = ?self.args,
            store = %store,
            work_dir = %work_dir.display(),
            "Running external scraper"
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(store.as_str())
            .current_dir(work_dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ScrapeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScrapeError::CommandFailed {
                store: store.to_string(),
                status: output.status.to_string(),
                stderr: stderr.trim().chars().take(500).collect(),
            });
        }

        let path = work_dir.join(store.catalogue_file_name());
        let products = inspect_output(&path).await?;

        Ok(ScrapeOutput {
            path,
            products,
            pages: None,
            truncated: None,
        })
    }

    fn name(&self) -> &str {
        &self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_command_line() {
        let dir = TempDir::new().unwrap();
        let scraper = CommandScraper::parse_in("python3  fetch_stores_products.py", dir.path()).unwrap();
        assert_eq!(scraper.program(), "python3");
        // Nothing by that name under the base directory, so it is passed through
        assert_eq!(scraper.args, vec!["fetch_stores_products.py"]);
    }

    #[test]
    fn test_relative_paths_resolve_against_base() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("fetch.sh"), "exit 0").unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/scrape"), "").unwrap();

        let scraper = CommandScraper::parse_in("sh fetch.sh --verbose", dir.path()).unwrap();
        assert_eq!(scraper.program(), "sh");
        assert_eq!(
            scraper.args,
            vec![
                dir.path().join("fetch.sh").to_string_lossy().into_owned(),
                "--verbose".to_string()
            ]
        );

        let scraper = CommandScraper::parse_in("./bin/scrape", dir.path()).unwrap();
        assert_eq!(
            Path::new(scraper.program()),
            dir.path().join("./bin/scrape").as_path()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_relative_script_runs_from_work_dir() {
        let cwd = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        std::fs::write(
            cwd.path().join("fetch.sh"),
            "echo '[{\"id\":1},{\"id\":2}]' > \"$1_products.json\"\n",
        )
        .unwrap();

        let scraper = CommandScraper::parse_in("sh fetch.sh", cwd.path()).unwrap();
        let output = scraper
            .scrape(&StoreId::parse("scs").unwrap(), work.path())
            .await
            .unwrap();

        assert_eq!(output.products, 2);
        assert_eq!(output.path, work.path().join("scs_products.json"));
        assert!(!cwd.path().join("scs_products.json").exists());
    }

    #[test]
    fn test_parse_empty_command() {
        assert!(matches!(
            CommandScraper::parse("   "),
            Err(ScrapeError::EmptyCommand)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_writes_catalogue() {
        let dir = TempDir::new().unwrap();
        // `sh -c SCRIPT scs` binds the store id to $0
        let scraper = CommandScraper {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "echo '[{\"id\":1}]' > \"$0_products.json\"".to_string(),
            ],
        };

        let output = scraper
            .scrape(&StoreId::parse("scs").unwrap(), dir.path())
            .await
            .unwrap();

        assert_eq!(output.products, 1);
        assert!(dir.path().join("scs_products.json").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_fails_slot() {
        let dir = TempDir::new().unwrap();
        let scraper = CommandScraper {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo boom >&2; exit 3".to_string()],
        };

        let err = scraper
            .scrape(&StoreId::parse("scs").unwrap(), dir.path())
            .await
            .unwrap_err();

        match err {
            ScrapeError::CommandFailed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_without_file_fails_slot() {
        let dir = TempDir::new().unwrap();
        let scraper = CommandScraper::parse("true").unwrap();

        let err = scraper
            .scrape(&StoreId::parse("kewbz").unwrap(), dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::MissingOutput { .. }));
    }
}
