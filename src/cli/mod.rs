use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::comments::CommentStore;
use crate::config::{ConfigLoader, ConfigPaths, StorageBackend, StorageOptions, CONFIG_ENV, DATA_ENV};
use crate::storage::{self, KvStore, MemoryStore};

pub mod commands;

use self::commands::{CommentArgs, PostsArgs, RenderArgs, ShareArgs};

#[derive(Parser, Debug)]
#[command(
    name = "blogdeck",
    version,
    about = "Blog page with searchable posts, per-post comments and share links"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over BLOGDECK_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over BLOGDECK_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Browse the blog in the terminal (default)
    Tui,
    /// Print the post listing, optionally searched or filtered by category
    Posts(PostsArgs),
    /// Post, list or count comments on a post
    Comment(CommentArgs),
    /// Print the share link for a platform
    Share(ShareArgs),
    /// Write the static page, persisted comments included
    Render(RenderArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let catalog = config.load_catalog()?;
    let comments = CommentStore::new(open_kv(&paths, &config.storage)?);

    let command = cli.command.unwrap_or(Commands::Tui);
    match command {
        Commands::Tui => commands::run_tui(catalog, comments, &config),
        Commands::Posts(args) => commands::print_posts(&catalog, args),
        Commands::Comment(args) => commands::handle_comment_command(&catalog, &comments, args),
        Commands::Share(args) => commands::print_share(&config.page, args),
        Commands::Render(args) => commands::render_page(&catalog, &comments, &config.page, args),
    }
}

fn open_kv(paths: &ConfigPaths, options: &StorageOptions) -> Result<Arc<dyn KvStore>> {
    Ok(match options.backend {
        StorageBackend::Sqlite => Arc::new(storage::init(paths, options)?),
        StorageBackend::Memory => {
            tracing::info!("using in-memory comment storage; comments end with the process");
            Arc::new(MemoryStore::new())
        }
    })
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
