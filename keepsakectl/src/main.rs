mod commands;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use keepsake_config::{ConfigLoader, ConfigLoaderOptions};
use keepsake_model::{MediaId, RefetchFrequency};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "keepsakectl",
    version,
    about = "Resurface memories from your media library, online or offline"
)]
struct Cli {
    /// Configuration file (defaults to keepsake.toml or config/keepsake.toml)
    #[arg(long, global = true, env = "KEEPSAKE_CONFIG")]
    config: Option<PathBuf>,

    /// Environment file loaded before reading KEEPSAKE_* variables
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Owner whose library and cache to use (overrides configuration)
    #[arg(long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current batch of memories, refetching when due
    Memories(MemoriesArgs),
    /// Inspect or manage the local memory cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Show or change refetch settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub(crate) struct MemoriesArgs {
    /// Select a new batch even if the current one is not due yet
    #[arg(long)]
    pub force: bool,
    /// Never contact the remote library; serve cached memories only
    #[arg(long)]
    pub offline: bool,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cache size and item count
    Info,
    /// Remove every cached memory
    Clear,
    /// Remove one cached memory by media id
    Remove { id: String },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the stored settings
    Show,
    /// Update one or more settings
    Set(SettingsSetArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct SettingsSetArgs {
    /// How often to select a new batch: daily, weekly or monthly
    #[arg(long)]
    pub frequency: Option<RefetchFrequency>,
    /// Number of memories per batch (clamped to 5..=10)
    #[arg(long)]
    pub count: Option<u32>,
    /// Cache budget, e.g. 100MiB; 0 disables the limit
    #[arg(long)]
    pub budget: Option<String>,
    /// Forget the last refetch time so the next run selects a new batch
    #[arg(long)]
    pub reset_schedule: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let load = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: cli.config.clone(),
        env_file: cli.env_file.clone(),
        ..ConfigLoaderOptions::default()
    })
    .load()?;
    for warning in load.warnings.iter() {
        match &warning.hint {
            Some(hint) => warn!(hint, "{}", warning.message),
            None => warn!("{}", warning.message),
        }
    }

    let session = session::Session::open(load.config, cli.owner).await?;

    match cli.command {
        Command::Memories(args) => commands::memories(&session, args).await,
        Command::Cache { action } => match action {
            CacheAction::Info => commands::cache_info(&session).await,
            CacheAction::Clear => commands::cache_clear(&session).await,
            CacheAction::Remove { id } => {
                commands::cache_remove(&session, MediaId::new(id)?).await
            }
        },
        Command::Settings { action } => match action {
            SettingsAction::Show => commands::settings_show(&session).await,
            SettingsAction::Set(args) => {
                commands::settings_set(&session, args).await
            }
        },
    }
}
