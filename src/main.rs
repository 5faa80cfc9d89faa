use cubeindex::cli::commands::{CliArgs, Commands};
use cubeindex::cli::handlers::{
    handle_commit, handle_config, handle_fetch, handle_normalize, handle_stores, handle_sync,
};
use cubeindex::util::logging::{init_logging, parse_level, LoggingConfig};
use cubeindex::{NAME, VERSION};

use clap::Parser;
use std::env;
use std::process;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Fetch(fetch_args) => handle_fetch(fetch_args, &args).await,
        Commands::Sync(sync_args) => handle_sync(sync_args, &args).await,
        Commands::Commit(commit_args) => handle_commit(commit_args, &args).await,
        Commands::Stores(stores_args) => handle_stores(stores_args, &args).await,
        Commands::Normalize(normalize_args) => handle_normalize(normalize_args, &args).await,
        Commands::Config(config_args) => handle_config(config_args, &args).await,
    };

    process::exit(exit_code);
}

/// `--log-level` wins over `-v`, which wins over `-q`, which wins over `CUBEINDEX_LOG_LEVEL`.
fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("CUBEINDEX_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        parse_level(&level_str)
    };

    let use_json = env::var("CUBEINDEX_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..LoggingConfig::default()
    });
}
