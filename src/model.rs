use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cli::AveragingMethod;
use crate::pipeline::group::OrderedMap;

pub const DEFAULT_SUMMARY_SUFFIX: &str = ".summary.json";
pub const DEFAULT_RESULTS_SUFFIX: &str = ".results.json.zst";
pub const METADATA_FILENAME: &str = "metadata.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub test_options: TestOptions,
    pub summary_file_suffix: Option<String>,
    pub results_file_suffix: Option<String>,
}

impl RunMetadata {
    pub fn summary_suffix(&self) -> &str {
        self.summary_file_suffix
            .as_deref()
            .unwrap_or(DEFAULT_SUMMARY_SUFFIX)
    }

    pub fn results_suffix(&self) -> &str {
        self.results_file_suffix
            .as_deref()
            .unwrap_or(DEFAULT_RESULTS_SUFFIX)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestOptions {
    pub rate: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryFile {
    pub latencies: SummaryLatencies,
    pub success: f64,
    #[serde(default)]
    pub status_codes: HashMap<String, u64>,
    pub requests: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryLatencies {
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRecord {
    pub seq: u64,
    pub code: u16,
    pub latency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataType {
    SummaryLatency,
    RawLatency,
    RawLatencySuccess,
    SummarySuccessRate,
    Summary200Rate,
    Summary0Rate,
    Summary503Rate,
    SummaryOtherRate,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SummaryLatency => "summary-latency",
            Self::RawLatency => "raw-latency",
            Self::RawLatencySuccess => "raw-latency-success",
            Self::SummarySuccessRate => "summary-success-rate",
            Self::Summary200Rate => "summary-200-rate",
            Self::Summary0Rate => "summary-0-rate",
            Self::Summary503Rate => "summary-503-rate",
            Self::SummaryOtherRate => "summary-other-rate",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeClass {
    #[serde(rename = "200")]
    Ok,
    #[serde(rename = "0")]
    NoResponse,
    #[serde(rename = "503")]
    Unavailable,
    #[serde(rename = "other")]
    Other,
}

impl CodeClass {
    pub const ALL: [CodeClass; 4] = [
        CodeClass::Ok,
        CodeClass::NoResponse,
        CodeClass::Unavailable,
        CodeClass::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "200",
            Self::NoResponse => "0",
            Self::Unavailable => "503",
            Self::Other => "other",
        }
    }

    pub fn data_type(self) -> DataType {
        match self {
            Self::Ok => DataType::Summary200Rate,
            Self::NoResponse => DataType::Summary0Rate,
            Self::Unavailable => DataType::Summary503Rate,
            Self::Other => DataType::SummaryOtherRate,
        }
    }
}

impl fmt::Display for CodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatPoint {
    pub rate: u32,
    pub mean: f64,
    pub stddev: f64,
}

pub type GroupedStats = OrderedMap<String, Vec<StatPoint>>;

pub type CodeClassStats = OrderedMap<String, OrderedMap<CodeClass, Vec<StatPoint>>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    pub latencies: GroupedStats,
    pub success_latencies: GroupedStats,
    pub success_rates: GroupedStats,
    pub code_classes: CodeClassStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCacheEntry {
    pub cache_version: u32,
    pub hostname: String,
    pub index: usize,
    pub title: String,
    pub averaging_method: AveragingMethod,
    pub generated_at: String,
    pub fingerprint: String,
    pub stats: ReportStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    pub manifest_version: u32,
    pub hostname: String,
    pub index: usize,
    pub title: String,
    pub averaging_method: AveragingMethod,
    pub generated_at: String,
    pub from_cache: bool,
    pub unordered_variants: Vec<String>,
    pub stats: ReportStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SequencePoint {
    pub seq: usize,
    pub mean: f64,
    pub stddev: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceProfileManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub data_root: String,
    pub files: Vec<String>,
    pub points: Vec<SequencePoint>,
}
