// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use openedge::AppResult;
use openedge::capture::TestPattern;
use openedge::filter::EdgeVariant;
use openedge::frame::FrameFormat;
use openedge::pipeline::PipelineMode;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "openedge")]
#[command(about = "Live camera preview with grayscale and edge-map modes")]
#[command(version = openedge::constants::app_version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live pipeline against the synthetic camera
    Live {
        /// Initial mode (raw, gray, edges)
        #[arg(short, long)]
        mode: Option<PipelineMode>,

        /// Stop after this many displayed frames
        #[arg(short, long)]
        frames: Option<u64>,

        /// Test pattern (checkerboard, bars, step, flat)
        #[arg(short, long)]
        pattern: Option<TestPattern>,

        /// Capture width
        #[arg(long)]
        width: Option<u32>,

        /// Capture height
        #[arg(long)]
        height: Option<u32>,

        /// Edge algorithm for live frames (canny, sobel)
        #[arg(long)]
        variant: Option<EdgeVariant>,

        /// Synthetic frame layout (i420, nv12, nv21)
        #[arg(long)]
        format: Option<FrameFormat>,

        /// Reported sensor rotation in degrees
        #[arg(long)]
        rotation: Option<u32>,

        /// Switch to the next mode every two seconds
        #[arg(long)]
        cycle_modes: bool,
    },

    /// Process a single image
    View {
        /// Image file to load
        image: PathBuf,

        /// Display mode (raw, gray, edges)
        #[arg(short, long, default_value = "edges")]
        mode: PipelineMode,

        /// Save the processed image here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration as JSON
    Config,
}

fn main() -> AppResult<()> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=openedge=debug, RUST_LOG=info
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
        Commands::Live {
            mode,
            frames,
            pattern,
            width,
            height,
            variant,
            format,
            rotation,
            cycle_modes,
        } => cli::run_live(cli::LiveOptions {
            mode,
            frames,
            pattern,
            width,
            height,
            variant,
            format,
            rotation,
            cycle_modes,
        }),
        Commands::View {
            image,
            mode,
            output,
        } => cli::view_image(&image, mode, output),
        Commands::Config => cli::print_config(),
    }
}
