//! Command line argument parsing for the hybridopt CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::quantization::QuantizationMethod;

/// hybridopt - offline tuning for hybrid retrieval
#[derive(Parser, Debug, Clone)]
#[command(name = "hybridopt")]
#[command(about = "Offline tuning tools for adaptive hybrid retrieval")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct HybridOptArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Optimizer configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl HybridOptArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show query features and the resulting vector/keyword weight
    Alpha(AlphaArgs),

    /// Fit a quantizer on a vector file and report memory savings
    Quantize(QuantizeArgs),

    /// Fit a dimensionality reducer on a vector file
    Reduce(ReduceArgs),

    /// Fuse ranked result lists with Reciprocal Rank Fusion
    Fuse(FuseArgs),
}

/// Arguments for the alpha command
#[derive(Parser, Debug, Clone)]
pub struct AlphaArgs {
    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Corpus statistics file (JSON)
    #[arg(short, long, value_name = "STATS_FILE")]
    pub stats: Option<PathBuf>,

    /// Explicit alpha, bypassing feature extraction
    #[arg(short, long)]
    pub alpha: Option<f32>,
}

/// Arguments for the quantize command
#[derive(Parser, Debug, Clone)]
pub struct QuantizeArgs {
    /// Vector file (JSON array or JSONL)
    #[arg(value_name = "VECTORS")]
    pub vectors: PathBuf,

    /// Quantization method
    #[arg(short, long, value_parser = parse_quantization_method)]
    pub method: Option<QuantizationMethod>,

    /// Bits per code
    #[arg(short, long)]
    pub bits: Option<u8>,

    /// Number of product quantization subspaces
    #[arg(short, long)]
    pub subspaces: Option<usize>,

    /// Write the fitted quantizer state to this file
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for the reduce command
#[derive(Parser, Debug, Clone)]
pub struct ReduceArgs {
    /// Vector file (JSON array or JSONL)
    #[arg(value_name = "VECTORS")]
    pub vectors: PathBuf,

    /// Target dimension
    #[arg(short, long)]
    pub target_dim: Option<usize>,

    /// Minimum number of samples required to fit
    #[arg(long)]
    pub min_samples: Option<usize>,

    /// Write the reduced vectors to this file (JSONL)
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for the fuse command
#[derive(Parser, Debug, Clone)]
pub struct FuseArgs {
    /// File holding a JSON array of result lists
    #[arg(value_name = "LISTS")]
    pub lists: PathBuf,

    /// RRF smoothing constant
    #[arg(short, long)]
    pub k: Option<u32>,

    /// Maximum number of fused results
    #[arg(short, long, default_value = "10")]
    pub limit: usize,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}

fn parse_quantization_method(value: &str) -> Result<QuantizationMethod, String> {
    value.parse().map_err(|e| format!("{e}"))
}
