pub mod instrument_config;

pub use instrument_config::InstrumentConfig;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(ValueEnum))]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "simex")]
#[command(about = "Start-to-end photon experiment simulations: XFEL sources and diffraction data")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, value_enum, default_value = "compact")]
    pub log_format: LogFormat,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Subcommand)]
pub enum Command {
    /// Build the instrument from a TOML file and run every calculator
    Run {
        #[arg(long, short)]
        config: PathBuf,

        /// Overrides `instrument.base_dir`
        #[arg(long)]
        base_dir: Option<PathBuf>,

        #[arg(long, help = "Enable system monitoring")]
        monitor: bool,

        /// Build and print parameters without running
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the default parameters of a calculator kind
    Params {
        kind: String,

        #[arg(long)]
        json: bool,
    },
    /// Summarise a wavefront archive
    Inspect { file: PathBuf },
    /// Summarise a diffraction archive and the selected patterns
    Diffr {
        file: PathBuf,

        /// Pattern ids to load; all patterns when omitted
        #[arg(long = "index", num_args = 1..)]
        indices: Vec<u32>,

        #[arg(long)]
        poissonize: bool,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Write the time-integrated fluence of a wavefront archive as CSV
    Export {
        file: PathBuf,

        #[arg(long, short)]
        output: PathBuf,
    },
}
