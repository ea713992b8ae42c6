use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(
    name = "benchstats",
    version,
    about = "Aggregate vegeta benchmark artifacts into per-variant latency and error-rate statistics"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Report(ReportArgs),
    Sequence(SequenceArgs),
    Status(StatusArgs),
}

/// How per-run latency is turned into one observation stream.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AveragingMethod {
    /// Use the precomputed mean of every summary file.
    VegetaSummaries,
    /// Use every individual request latency from the raw results.
    AllRawData,
}

impl AveragingMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VegetaSummaries => "vegeta-summaries",
            Self::AllRawData => "all-raw-data",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long)]
    pub plan: PathBuf,

    #[arg(long, default_value = "evaluation/vegeta/bookinfo")]
    pub data_root: PathBuf,

    #[arg(long, default_value = ".cache/benchstats")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = AveragingMethod::VegetaSummaries)]
    pub averaging_method: AveragingMethod,

    #[arg(long = "host")]
    pub hosts: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SequenceArgs {
    #[arg(long, default_value = "evaluation/vegeta/bookinfo")]
    pub data_root: PathBuf,

    #[arg(long)]
    pub plan: Option<PathBuf>,

    #[arg(long = "file", required = true)]
    pub files: Vec<String>,

    #[arg(long)]
    pub output_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long)]
    pub plan: PathBuf,

    #[arg(long, default_value = ".cache/benchstats")]
    pub cache_root: PathBuf,
}
