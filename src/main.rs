use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clipsmith::{config::Config, video::VideoEncoder, App};

#[derive(Parser)]
#[command(
    name = "clipsmith",
    version,
    about = "Interactive audio and video touch-up workbench",
    long_about = "Clipsmith walks you through volume, fade, speed and color adjustments, joins two videos, and puts a looped or trimmed soundtrack under a video, all from a numbered console menu."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the output folders are created under
    #[arg(short, long)]
    output_root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging on stderr so it stays out of the menu; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Clipsmith v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(&config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    if let Some(root) = cli.output_root {
        config.output.root = root;
    }
    config.validate().context("Invalid configuration")?;

    if !VideoEncoder::ffmpeg_available() {
        warn!("⚠️ ffmpeg/ffprobe not found on PATH; video operations will fail");
    }

    let mut app = App::new(config, std::io::stdin().lock(), std::io::stdout())?;
    app.run().await?;

    Ok(())
}
