use crate::registry::StoreId;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shopify catalogue collector for speedcube stores
#[derive(Parser, Debug)]
#[command(
    name = "cubeindex",
    about = "Collects speedcube store catalogues and commits them when they change",
    version,
    author,
    long_about = "cubeindex downloads the public products.json catalogue of every store in \
                  its matrix, one isolated task per store, stages each result as an artifact, \
                  copies the artifacts into the tracked data directory once every store has \
                  finished and commits the directory when anything changed."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,

    #[arg(
        long = "config",
        global = true,
        value_name = "PATH",
        help = "Stores file with extra or overriding endpoints (TOML)"
    )]
    pub stores_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Fetch one store's catalogue",
        long_about = "Downloads every page of one store's catalogue and writes it as \
                      <store>_products.json in the current directory.\n\n\
                      Examples:\n  \
                      cubeindex fetch scs\n  \
                      cubeindex fetch kewbz --outfile /tmp/kewbz.json\n  \
                      cubeindex fetch cubicle --allow-partial"
    )]
    Fetch(FetchArgs),

    #[command(
        about = "Run the whole collection workflow",
        long_about = "Fans out over the store matrix, waits for every store, aggregates the \
                      catalogues into the data directory and commits it if it changed.\n\n\
                      Examples:\n  \
                      cubeindex sync\n  \
                      cubeindex sync --store scs --store kewbz --no-commit\n  \
                      cubeindex sync --max-parallel 3 --no-fail-fast --commit-partial\n  \
                      cubeindex sync --scraper-cmd 'python fetch_stores_products.py' --push"
    )]
    Sync(SyncArgs),

    #[command(
        about = "Commit the data directory if it changed",
        long_about = "Stages the data directory and creates a single commit with the bot \
                      identity when any catalogue differs from the last commit.\n\n\
                      Examples:\n  \
                      cubeindex commit\n  \
                      cubeindex commit --data-dir stores_products --push"
    )]
    Commit(CommitArgs),

    #[command(about = "List known stores")]
    Stores(StoresArgs),

    #[command(
        about = "Normalize catalogues into cube model rows",
        long_about = "Reads every <store>_products.json in the data directory, skips \
                      merchandise, builds base and trim rows, deduplicates them by slug and \
                      writes a review dump. With --upload the rows are upserted into Supabase \
                      using SUPABASE_URL and SUPABASE_KEY (also read from .env.local).\n\n\
                      Examples:\n  \
                      cubeindex normalize\n  \
                      cubeindex normalize --output /tmp/rows.json --upload"
    )]
    Normalize(NormalizeArgs),

    #[command(about = "Show the effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct FetchArgs {
    #[arg(value_name = "STORE", value_parser = parse_store_id, help = "Store identifier")]
    pub store: StoreId,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Output file (defaults to <store>_products.json)"
    )]
    pub outfile: Option<PathBuf>,

    #[arg(long, help = "Keep the pages fetched so far when a later page fails")]
    pub allow_partial: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SyncArgs {
    #[arg(
        short = 's',
        long = "store",
        value_name = "STORE",
        value_parser = parse_store_id,
        help = "Store to include (repeatable, defaults to the built-in matrix)"
    )]
    pub stores: Vec<StoreId>,

    #[arg(long, value_name = "DIR", help = "Tracked catalogue directory")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Directory for per-run artifacts")]
    pub staging_dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "CMD",
        help = "External scraper invoked as `CMD <store>` instead of the built-in fetcher"
    )]
    pub scraper_cmd: Option<String>,

    #[arg(long, value_name = "N", help = "Concurrent stores, 0 for no limit")]
    pub max_parallel: Option<usize>,

    #[arg(long, help = "Let the other stores finish after a failure")]
    pub no_fail_fast: bool,

    #[arg(long, help = "Aggregate and commit the successful stores even if some failed")]
    pub commit_partial: bool,

    #[arg(long, help = "Aggregate but do not commit")]
    pub no_commit: bool,

    #[arg(long, conflicts_with = "no_commit", help = "Push after committing")]
    pub push: bool,

    #[arg(long, help = "Keep pages fetched so far when a later page fails")]
    pub allow_partial: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Report format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct CommitArgs {
    #[arg(long, value_name = "DIR", help = "Tracked catalogue directory")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, help = "Push after committing")]
    pub push: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct StoresArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct NormalizeArgs {
    #[arg(long, value_name = "DIR", help = "Directory holding the catalogues")]
    pub data_dir: Option<PathBuf>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        default_value = crate::normalize::DEFAULT_OUTPUT,
        help = "Review dump location"
    )]
    pub output: PathBuf,

    #[arg(long, help = "Upsert the rows into Supabase")]
    pub upload: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_store_id(s: &str) -> Result<StoreId, String> {
    StoreId::parse(s).map_err(|e| e.to_string())
}
