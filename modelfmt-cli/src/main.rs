mod annotate;
mod config;

use clap::{Parser, Subcommand};
use modelfmt::{SettingsStore, SplitLevel, format_model_name};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modelfmt", version, about = "Short display names for raw AI model identifiers")]
struct Cli {
    /// Settings file (default: ~/.modelfmt/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the display name for each raw identifier
    Format {
        /// Split level 0-3 (default: stored setting)
        #[arg(short, long)]
        level: Option<SplitLevel>,

        /// Raw identifiers, e.g. "openrouter - qwen/qwen3-32b"
        #[arg(required = true)]
        raw: Vec<String>,
    },

    /// Label the AI messages of a chat export (JSONL)
    Annotate {
        /// Path to the chat file
        chat: PathBuf,

        /// Split level 0-3 (default: stored setting)
        #[arg(short, long)]
        level: Option<SplitLevel>,
    },

    /// Show or change stored settings
    Config {
        #[command(subcommand)]
        action: config::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modelfmt=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = match cli.settings {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::default_path(),
    };

    match cli.command {
        Commands::Format { level, raw } => {
            let level = match level {
                Some(level) => level,
                None => store.load()?.split_level,
            };
            for name in &raw {
                println!("{}", format_model_name(name, level));
            }
        }
        Commands::Annotate { chat, level } => {
            annotate::run_annotate(&store, &chat, level).await?;
        }
        Commands::Config { action } => {
            config::run_config(&store, action)?;
        }
    }

    Ok(())
}
