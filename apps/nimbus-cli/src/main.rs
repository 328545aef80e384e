use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nimbus_transfers::Feature;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod copy_sdk;
mod local;
mod push;

use commands::EnqueueOptions;
use config::TransfersConfig;

/// Nimbus - queue, start and follow downloads from the command line
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database file holding pending, active and finished transfers
    #[arg(long, default_value = "nimbus-transfers.db")]
    db: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Default download destination
    #[arg(long, default_value = "downloads")]
    download_root: PathBuf,

    /// Mount point of removable storage
    #[arg(long)]
    sd_card_root: Option<PathBuf>,

    /// Staging folder for removable storage downloads
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Seconds without progress before `start` gives up
    #[arg(long, default_value = "30")]
    idle_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Queue local files or folders for download
    Enqueue {
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination folder or content URI
        #[arg(short, long)]
        dest: Option<String>,

        #[arg(long)]
        high_priority: bool,

        /// Mark as preview downloads, which are never recorded in history
        #[arg(long)]
        preview: bool,
    },
    /// Start every pending download
    Start {
        /// Keep following transfers after the queue drains
        #[arg(short, long)]
        follow: bool,
    },
    /// Show aggregated progress and the pending queue
    Status,
    /// Show finished transfers, newest first
    History {
        #[arg(short, long, default_value = "20")]
        limit: u64,
    },
    /// Toggle a feature flag
    Feature {
        feature: FeatureArg,
        state: Toggle,
    },
    /// Store the session used to log in when a push arrives
    Login { session: String },
    /// Handle a push payload given as key=value pairs
    Push {
        #[arg(required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FeatureArg {
    ChooseDownloadDestination,
}

impl From<FeatureArg> for Feature {
    fn from(feature: FeatureArg) -> Self {
        match feature {
            FeatureArg::ChooseDownloadDestination => Feature::ChooseDownloadDestination,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

fn parse_field(field: &str) -> Result<(String, String)> {
    let (key, value) = field
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{}'", field))?;
    Ok((key.to_string(), value.to_string()))
}

impl Args {
    fn transfers_config(&self) -> TransfersConfig {
        let mut config = TransfersConfig::default();
        config.store.db_path = self.db.clone();
        config.download_root = self.download_root.clone();
        config.sd_card_root = self.sd_card_root.clone();
        if let Some(cache_dir) = &self.cache_dir {
            config.sd_card_cache_folder = cache_dir.clone();
        }
        config.idle_timeout = Duration::from_secs(self.idle_timeout);
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = args.transfers_config();

    match args.command {
        Command::Enqueue {
            sources,
            dest,
            high_priority,
            preview,
        } => {
            commands::enqueue(
                &config,
                EnqueueOptions {
                    sources,
                    destination: dest,
                    high_priority,
                    preview,
                },
            )
            .await
        }
        Command::Start { follow } => commands::start(&config, follow).await,
        Command::Status => commands::status(&config).await,
        Command::History { limit } => commands::history(&config, limit).await,
        Command::Feature { feature, state } => {
            commands::set_feature(&config, feature.into(), matches!(state, Toggle::On)).await
        }
        Command::Login { session } => commands::set_session(&config, &session).await,
        Command::Push { fields } => commands::push(&config, &fields).await,
    }
}
