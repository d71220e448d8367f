// src/cli.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Replays skeletal-tracking sessions through the gesture pipeline
#[derive(Parser, Debug)]
#[command(name = "skeletal-input")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Pipeline config file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed a recorded session through the detectors
    Replay {
        /// frames.csv written by `demo` or a recorder
        #[arg(short, long)]
        input: PathBuf,

        /// Sleep between frames to match the recorded timestamps
        #[arg(long)]
        realtime: bool,

        /// Skip the hands-above-head start gesture
        #[arg(long)]
        armed: bool,
    },

    /// Write a synthetic session (start pose, stride right, jump)
    Demo {
        /// Output directory (defaults to ~/Documents/SkeletalInput)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Session name (defaults to session_<timestamp>)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Inspect or create the pipeline config
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective config as JSON
    Show,

    /// Write the default config
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print where the config is read from
    Path,
}
