//! Subcommand handlers
//!
//! Each handler returns the process exit code: 0 on success (including
//! "nothing to commit"), 1 when a store or step failed, 2 on configuration
//! errors.

use super::commands::{
    CliArgs, CommitArgs, ConfigArgs, FetchArgs, NormalizeArgs, StoresArgs, SyncArgs,
};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::CubeIndexConfig;
use crate::fetch::write_catalogue;
use crate::normalize::{self, SupabaseClient, SupabaseConfig, UPSERT_CHUNK};
use crate::pipeline::{SyncContext, SyncOptions, SyncOrchestrator};
use crate::progress::{LoggingHandler, NoOpHandler, ProgressHandler, SpinnerHandler};
use crate::publish::{CommitIdentity, CommitPublisher, GitRepo, PublishError};
use crate::registry::{default_matrix, StoreRegistry};
use crate::scraper::{CommandScraper, NativeScraper, Scraper};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;

/// Environment configuration with global flags applied, validated.
fn load_config(cli: &CliArgs) -> Result<CubeIndexConfig, i32> {
    let mut config = CubeIndexConfig::default();
    if let Some(path) = &cli.stores_file {
        config.stores_file = Some(path.clone());
        config.stores_file_explicit = true;
    }

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your CUBEINDEX_* environment variables and command-line arguments.");
        return Err(EXIT_CONFIG);
    }
    debug!("{}", config);
    Ok(config)
}

fn load_registry(config: &CubeIndexConfig) -> Result<StoreRegistry, i32> {
    config.load_registry().map_err(|e| {
        error!("Failed to load stores: {}", e);
        EXIT_CONFIG
    })
}

/// Spinners on an interactive stderr, log lines otherwise.
fn progress_handler(quiet: bool) -> Arc<dyn ProgressHandler> {
    if quiet {
        Arc::new(NoOpHandler)
    } else if std::io::stderr().is_terminal() {
        Arc::new(SpinnerHandler::new())
    } else {
        Arc::new(LoggingHandler)
    }
}

/// Closest existing directory at or above `path`, for locating the repository.
fn existing_ancestor(path: &Path) -> PathBuf {
    path.ancestors()
        .find(|p| !p.as_os_str().is_empty() && p.is_dir())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn open_publisher(config: &CubeIndexConfig, data_dir: &Path, push: bool) -> Result<CommitPublisher, PublishError> {
    let repo = GitRepo::open(&existing_ancestor(data_dir)).await?;
    debug!("Publishing into repository {}", repo.root().display());

    let identity = CommitIdentity {
        name: config.git_author_name.clone(),
        email: config.git_author_email.clone(),
    };
    Ok(CommitPublisher::new(repo, identity, config.commit_message.clone()).with_push(push))
}

fn emit(output: anyhow::Result<String>) -> i32 {
    match output {
        Ok(text) => {
            println!("{}", text);
            EXIT_SUCCESS
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            EXIT_FAILURE
        }
    }
}

pub async fn handle_fetch(args: &FetchArgs, cli: &CliArgs) -> i32 {
    let config = match load_config(cli) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let registry = match load_registry(&config) {
        Ok(r) => Arc::new(r),
        Err(code) => return code,
    };

    let scraper = NativeScraper::new(registry, &config)
        .with_allow_partial(args.allow_partial)
        .with_progress(progress_handler(cli.quiet));

    let catalogue = match scraper.fetch_store(&args.store).await {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to fetch {}: {}", args.store, e);
            return EXIT_FAILURE;
        }
    };
    if let Some(reason) = &catalogue.truncated {
        warn!("Catalogue for {} is partial: {}", args.store, reason);
    }

    let outfile = args
        .outfile
        .clone()
        .unwrap_or_else(|| PathBuf::from(args.store.catalogue_file_name()));
    match write_catalogue(&outfile, &catalogue.products).await {
        Ok(path) => {
            info!("Saved {} products to {}", catalogue.len(), path.display());
            if !cli.quiet {
                println!(
                    "✅ Collected {} products from {} ({} pages) → {}",
                    catalogue.len(),
                    args.store,
                    catalogue.pages,
                    path.display()
                );
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            EXIT_FAILURE
        }
    }
}

pub async fn handle_sync(args: &SyncArgs, cli: &CliArgs) -> i32 {
    let mut config = match load_config(cli) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &args.staging_dir {
        config.staging_dir = dir.clone();
    }
    if let Some(n) = args.max_parallel {
        config.max_parallel = n;
    }

    let progress = progress_handler(cli.quiet);
    let scraper: Arc<dyn Scraper> = match &args.scraper_cmd {
        Some(command_line) => match CommandScraper::parse(command_line) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                error!("Invalid --scraper-cmd: {}", e);
                return EXIT_CONFIG;
            }
        },
        None => {
            let registry = match load_registry(&config) {
                Ok(r) => Arc::new(r),
                Err(code) => return code,
            };
            Arc::new(
                NativeScraper::new(registry, &config)
                    .with_allow_partial(args.allow_partial)
                    .with_progress(progress.clone()),
            )
        }
    };
    debug!("Using scraper: {}", scraper.name());

    let publisher = if args.no_commit {
        None
    } else {
        match open_publisher(&config, &config.data_dir, args.push).await {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Cannot publish catalogues: {}", e);
                eprintln!("\nRun inside a git work tree or pass --no-commit.");
                return EXIT_CONFIG;
            }
        }
    };

    let matrix = if args.stores.is_empty() {
        default_matrix()
    } else {
        args.stores.clone()
    };
    let options = SyncOptions {
        data_dir: config.data_dir.clone(),
        max_parallel: config.max_parallel,
        fail_fast: !args.no_fail_fast,
        commit_partial: args.commit_partial,
    };

    let mut context = SyncContext::new(matrix, scraper, config.staging_dir.clone(), options)
        .with_progress(progress)
        .with_publisher(publisher);

    let report = match SyncOrchestrator::new().execute(&mut context).await {
        Ok(r) => r,
        Err(e) => {
            error!("Sync failed: {:#}", e);
            warn!("Artifacts kept in {}", context.run_dir.display());
            return EXIT_FAILURE;
        }
    };

    if report.is_success() {
        if let Err(e) = tokio::fs::remove_dir_all(&context.run_dir).await {
            debug!("Could not remove {}: {}", context.run_dir.display(), e);
        }
    } else {
        warn!("Artifacts kept in {}", context.run_dir.display());
    }

    let format: OutputFormat = args.format.into();
    let printed = emit(OutputFormatter::new(format).format_report(&report));
    if printed != EXIT_SUCCESS {
        return printed;
    }

    if report.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}

pub async fn handle_commit(args: &CommitArgs, cli: &CliArgs) -> i32 {
    let config = match load_config(cli) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_dir = args.data_dir.clone().unwrap_or_else(|| config.data_dir.clone());

    if !data_dir.is_dir() {
        error!("Data directory {} does not exist", data_dir.display());
        return EXIT_CONFIG;
    }

    let publisher = match open_publisher(&config, &data_dir, args.push).await {
        Ok(p) => p,
        Err(e) => {
            error!("Cannot publish catalogues: {}", e);
            return EXIT_CONFIG;
        }
    };

    match publisher.publish(&data_dir).await {
        Ok(outcome) => emit(OutputFormatter::new(args.format.into()).format_publish(&outcome)),
        Err(e) => {
            error!("Commit failed: {}", e);
            EXIT_FAILURE
        }
    }
}

pub async fn handle_stores(args: &StoresArgs, cli: &CliArgs) -> i32 {
    let config = match load_config(cli) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let registry = match load_registry(&config) {
        Ok(r) => r,
        Err(code) => return code,
    };
    emit(OutputFormatter::new(args.format.into()).format_stores(&registry))
}

pub async fn handle_config(args: &ConfigArgs, cli: &CliArgs) -> i32 {
    match load_config(cli) {
        Ok(config) => emit(OutputFormatter::new(args.format.into()).format_config(&config)),
        Err(code) => code,
    }
}

pub async fn handle_normalize(args: &NormalizeArgs, cli: &CliArgs) -> i32 {
    let config = match load_config(cli) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_dir = args.data_dir.clone().unwrap_or_else(|| config.data_dir.clone());

    // Fail on credentials before doing any work
    let client = if args.upload {
        let supabase = match SupabaseConfig::from_env() {
            Ok(c) => c,
            Err(e) => {
                error!("{}", e);
                eprintln!("\nSet SUPABASE_URL and SUPABASE_KEY in the environment or .env.local.");
                return EXIT_CONFIG;
            }
        };
        match SupabaseClient::new(supabase) {
            Ok(c) => Some(c),
            Err(e) => {
                error!("{}", e);
                return EXIT_FAILURE;
            }
        }
    } else {
        None
    };

    let report = match normalize::normalize_dir(&data_dir).await {
        Ok(r) => r,
        Err(e) => {
            error!("Normalization failed: {}", e);
            return EXIT_FAILURE;
        }
    };

    if report.rows.is_empty() {
        warn!("Nothing suitable found in {}", data_dir.display());
        return emit(OutputFormatter::new(OutputFormat::Human).format_normalize(&report));
    }
    info!(
        "{} unique rows remain after deduplicating {} candidates",
        report.unique_rows(),
        report.candidates
    );

    if let Err(e) = normalize::write_dump(&args.output, &report.rows).await {
        error!("{}", e);
        return EXIT_FAILURE;
    }
    info!("Normalized dump saved to {}", args.output.display());

    if let Some(client) = client {
        match client.upsert_rows(&report.rows, UPSERT_CHUNK).await {
            Ok(batches) => info!("Upload complete in {} request(s)", batches),
            Err(e) => {
                error!("Upload failed: {}", e);
                return EXIT_FAILURE;
            }
        }
    }

    if cli.quiet {
        return EXIT_SUCCESS;
    }
    emit(OutputFormatter::new(OutputFormat::Human).format_normalize(&report))
}
