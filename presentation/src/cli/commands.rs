//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for finished runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary of the final state
    Summary,
    /// Final state as JSON
    Json,
    /// Every event as one JSON line
    Events,
}

impl From<OutputFormat> for forge_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Summary => forge_domain::OutputFormat::Summary,
            OutputFormat::Json => forge_domain::OutputFormat::Json,
            OutputFormat::Events => forge_domain::OutputFormat::Events,
        }
    }
}

/// CLI arguments for quorum-forge
#[derive(Parser, Debug)]
#[command(name = "quorum-forge")]
#[command(
    author,
    version,
    about = "Reliable structured outputs from noisy generators through consensus sampling"
)]
#[command(long_about = r#"
quorum-forge samples a generator several times per step, validates every
sample against a schema, drops red-flagged samples, and keeps voting until
one answer leads the runner-up by k votes.

Steps are chained into pipelines that thread one state value through every
stage, skipping stages whose condition does not hold.

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./forge.toml        Project-level config
3. ~/.config/quorum-forge/config.toml   Global config

Example:
  quorum-forge demo "Hello World landing page"
  quorum-forge --output events demo
  quorum-forge bench --iterations 3 --seed 7
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output format (overrides [output] format)
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Write every event to this JSONL file (overrides [logging] events_file)
    #[arg(long, value_name = "PATH", global = true)]
    pub events_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the plan -> outline-files -> summarize demo pipeline
    Demo {
        /// What to build
        #[arg(default_value = "Hello World React app")]
        prompt: String,
    },
    /// Compare single-shot sampling against a consensus step on a noisy
    /// synthetic generator
    Bench {
        /// Number of rounds over the task list
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: u32,

        /// Seed for the synthetic generator
        #[arg(short, long, default_value_t = 1)]
        seed: u32,
    },
}
