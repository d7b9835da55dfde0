//! Repsense CLI — run the tracking API or analyze a recording locally.
//!
//! Usage:
//!   repsense serve [OPTIONS]        Start the HTTP API
//!   repsense analyze <VIDEO>        Analyze a workout video
//!   repsense check                  Check external tools and the model

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use repsense_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "repsense",
    about = "Exercise recognition, rep counting and calorie tracking",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the standard location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Analyze a recorded workout video
    Analyze {
        /// Path to the video file
        video: PathBuf,

        /// Body weight in kilograms
        #[arg(short, long)]
        weight: Option<f64>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check ffmpeg, the pose sidecar and the classifier model
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?;
            config.apply_env_overrides();
            config
        }
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    repsense_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Serve { host, port } => commands::serve::run(config, host, port).await,
        Commands::Analyze {
            video,
            weight,
            json,
        } => commands::analyze::run(&config, video, weight, json).await,
        Commands::Check => commands::check::run(&config),
    }
}
