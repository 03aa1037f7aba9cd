// SPDX-License-Identifier: GPL-3.0-only

use cardcam::CaptureTarget;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "cardcam")]
#[command(about = "Adaptive camera capture for business-card scanning")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options that shape the simulated host and camera
#[derive(Args, Clone, Debug, Default)]
pub struct HostArgs {
    /// Use the built-in virtual camera instead of real hardware
    #[arg(long = "virtual")]
    pub virtual_camera: bool,

    /// Present as a phone (touch screen, phone user agent, small viewport)
    #[arg(long)]
    pub mobile: bool,

    /// User agent string used for device classification
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Viewport size as WIDTHxHEIGHT
    #[arg(long)]
    pub viewport: Option<String>,

    /// Number of touch points
    #[arg(long)]
    pub touch: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the capability report and environment as JSON
    Detect {
        #[command(flatten)]
        host: HostArgs,
    },

    /// List available cameras
    List {
        /// List virtual cameras
        #[arg(long = "virtual")]
        virtual_camera: bool,
    },

    /// Print the constraint tier tables
    Tiers,

    /// Take a photo
    Photo {
        /// Side of the card: front or back
        #[arg(short, long, default_value = "back")]
        target: CaptureTarget,

        /// Output file or directory (default: ~/Pictures/cardcam)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Image file the virtual camera shows instead of its test pattern
        #[arg(long, requires = "virtual_camera")]
        source: Option<PathBuf>,

        #[command(flatten)]
        host: HostArgs,
    },

    /// Show version and configuration paths
    Info,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=cardcam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect { host } => cli::detect(&host),
        Commands::List { virtual_camera } => cli::list_cameras(virtual_camera),
        Commands::Tiers => cli::print_tiers(),
        Commands::Photo {
            target,
            output,
            source,
            host,
        } => cli::take_photo(target, output, source, &host),
        Commands::Info => cli::print_info(),
    }
}
