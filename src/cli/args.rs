//! CLI argument definitions.

use crate::cli::validators::{
    parse_confidence, parse_latitude, parse_longitude, parse_overlap, parse_sensitivity,
};
use crate::config::ResultFormat;
use crate::output::PoolingMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Analysis server and batch runner for `BattyBirdNET` classifiers.
#[derive(Debug, Parser)]
#[command(name = "battyd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: platform config directory).
    #[arg(long, global = true, env = "BATTYD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress progress and informational output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP analysis server.
    Serve(ServeArgs),
    /// Analyze an audio file or a directory of recordings.
    Analyze(AnalyzeArgs),
    /// List registered regions.
    Regions {
        /// List the server profile (256 kHz models) instead of the desktop one.
        #[arg(long)]
        server: bool,
    },
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Arguments for the serve command. Unset values come from `[server]`.
#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    /// Host name or IP address to bind.
    #[arg(long, env = "BATTYD_HOST")]
    pub host: Option<String>,

    /// Port to bind.
    #[arg(long, env = "BATTYD_PORT")]
    pub port: Option<u16>,

    /// Directory where saved uploads are stored.
    #[arg(long, env = "BATTYD_STORAGE_PATH")]
    pub spath: Option<PathBuf>,

    /// CPU threads per analysis.
    #[arg(long, env = "BATTYD_THREADS")]
    pub threads: Option<usize>,

    /// Locale for translated common names.
    #[arg(long, env = "BATTYD_LOCALE")]
    pub locale: Option<String>,

    /// Region whose classifier is served.
    #[arg(long, env = "BATTYD_AREA")]
    pub area: Option<String>,

    /// Use the high-accuracy model variant where one exists.
    #[arg(long, env = "BATTYD_NO_NOISE")]
    pub no_noise: bool,
}

/// Arguments for the analyze command. Unset values come from `[defaults]`.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct AnalyzeArgs {
    /// Audio file or directory to analyze.
    pub input: PathBuf,

    /// Region preset (unknown names fall back to the default region).
    #[arg(short, long, env = "BATTYD_REGION")]
    pub region: Option<String>,

    /// CPU threads (file workers for directories, inference threads for a file).
    #[arg(short, long, env = "BATTYD_THREADS")]
    pub threads: Option<usize>,

    /// Inference batch size.
    #[arg(short, long, env = "BATTYD_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Minimum confidence threshold (0.0-1.0).
    #[arg(short = 'c', long, value_parser = parse_confidence, env = "BATTYD_MIN_CONFIDENCE")]
    pub min_conf: Option<f32>,

    /// Sigmoid sensitivity (0.5-1.5).
    #[arg(long, value_parser = parse_sensitivity, env = "BATTYD_SENSITIVITY")]
    pub sensitivity: Option<f32>,

    /// Segment overlap in seconds (0.0-2.99).
    #[arg(long, value_parser = parse_overlap, env = "BATTYD_OVERLAP")]
    pub overlap: Option<f32>,

    /// Locale for translated common names.
    #[arg(short, long, env = "BATTYD_LOCALE")]
    pub locale: Option<String>,

    /// Use the high-accuracy model variant where one exists.
    #[arg(long)]
    pub no_noise: bool,

    /// Latitude for the species filter (-90.0 to 90.0).
    #[arg(long, value_parser = parse_latitude, requires = "lon", env = "BATTYD_LATITUDE")]
    pub lat: Option<f64>,

    /// Longitude for the species filter (-180.0 to 180.0).
    #[arg(long, value_parser = parse_longitude, requires = "lat", env = "BATTYD_LONGITUDE")]
    pub lon: Option<f64>,

    /// Week of the year for the species filter (1-48).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=48))]
    pub week: Option<u8>,

    /// Species filter threshold (0.0-1.0).
    #[arg(long, value_parser = parse_confidence, env = "BATTYD_SF_THRESH")]
    pub sf_thresh: Option<f32>,

    /// Result format (table, audacity, r, csv).
    #[arg(short, long, env = "BATTYD_FORMAT")]
    pub format: Option<ResultFormat>,

    /// Print results as JSON instead of a result table.
    #[arg(long)]
    pub json: bool,

    /// Pooling mode of the per-file species summary.
    #[arg(long, value_enum, default_value_t = PoolingMode::Avg)]
    pub summary: PoolingMode,

    /// Number of species in the summary.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..=99))]
    pub top: u8,

    /// Hide the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}
