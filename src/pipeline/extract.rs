use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::cli::AveragingMethod;
use crate::error::{PipelineError, PipelineResult};
use crate::model::{CodeClass, DataType, RawRecord, SummaryFile};
use crate::pipeline::locate::{LocatedFile, ResultFile};
use crate::pipeline::pipe::Toolchain;

pub const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

pub trait ArtifactReader {
    fn read_summary(&self, path: &Path) -> PipelineResult<SummaryFile>;
    fn read_raw_records(&self, path: &Path) -> PipelineResult<Vec<RawRecord>>;
}

#[derive(Debug, Clone, Default)]
pub struct FsReader {
    toolchain: Toolchain,
}

impl FsReader {
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }
}

impl ArtifactReader for FsReader {
    fn read_summary(&self, path: &Path) -> PipelineResult<SummaryFile> {
        let raw = fs::read(path).map_err(|source| PipelineError::io(path, source))?;
        serde_json::from_slice(&raw).map_err(|source| PipelineError::json(path, source))
    }

    fn read_raw_records(&self, path: &Path) -> PipelineResult<Vec<RawRecord>> {
        self.toolchain.read_records(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObservationKey {
    pub variant: String,
    pub rate: String,
    pub data_type: DataType,
}

impl fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.variant, self.rate, self.data_type)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub key: ObservationKey,
    pub value: f64,
}

impl Observation {
    pub fn into_pair(self) -> (ObservationKey, f64) {
        (self.key, self.value)
    }
}

pub fn summary_observations(summary: &SummaryFile, method: AveragingMethod) -> Vec<(DataType, f64)> {
    let mut out = Vec::with_capacity(6);
    if method == AveragingMethod::VegetaSummaries {
        out.push((
            DataType::SummaryLatency,
            summary.latencies.mean / NANOS_PER_SECOND,
        ));
    }
    out.push((DataType::SummarySuccessRate, summary.success));
    out.extend(code_class_rates(summary));
    out
}

/// Share of requests per response code class; empty when the summary has no
/// requests to divide by.
pub fn code_class_rates(summary: &SummaryFile) -> Vec<(DataType, f64)> {
    if summary.requests == 0 {
        return Vec::new();
    }

    let count = |code: &str| summary.status_codes.get(code).copied().unwrap_or(0);
    let total = summary.requests as f64;
    let ok = count("200") as f64;
    let no_response = count("0") as f64;
    let unavailable = count("503") as f64;
    let other = total - (ok + no_response + unavailable);

    CodeClass::ALL
        .into_iter()
        .zip([ok, no_response, unavailable, other])
        .map(|(class, value)| (class.data_type(), value / total))
        .collect()
}

pub fn raw_observations(records: &[RawRecord]) -> Vec<(DataType, f64)> {
    let mut out = Vec::with_capacity(records.len() * 2);
    for record in records {
        let seconds = record.latency / NANOS_PER_SECOND;
        out.push((DataType::RawLatency, seconds));
        if record.code == 200 {
            out.push((DataType::RawLatencySuccess, seconds));
        }
    }
    out
}

pub struct Extract<'r, I, R> {
    inner: I,
    method: AveragingMethod,
    reader: &'r R,
    pending: VecDeque<Observation>,
}

pub fn extract<I, R>(inner: I, method: AveragingMethod, reader: &R) -> Extract<'_, I, R>
where
    I: Iterator<Item = PipelineResult<LocatedFile>>,
    R: ArtifactReader,
{
    Extract {
        inner,
        method,
        reader,
        pending: VecDeque::new(),
    }
}

impl<I, R> Extract<'_, I, R>
where
    R: ArtifactReader,
{
    fn observe(&self, located: &LocatedFile) -> PipelineResult<Vec<(DataType, f64)>> {
        debug!(
            variant = %located.variant,
            rate = %located.rate,
            file = %located.file.path().display(),
            "extracting"
        );
        match &located.file {
            ResultFile::Summary(path) => {
                let summary = self.reader.read_summary(path)?;
                if summary.requests == 0 {
                    warn!(file = %path.display(), "summary reports zero requests, skipping code class rates");
                }
                Ok(summary_observations(&summary, self.method))
            }
            ResultFile::Raw(path) => match self.method {
                AveragingMethod::AllRawData => {
                    let records = self.reader.read_raw_records(path)?;
                    debug!(file = %path.display(), records = records.len(), "read raw results");
                    Ok(raw_observations(&records))
                }
                AveragingMethod::VegetaSummaries => Ok(Vec::new()),
            },
        }
    }
}

impl<I, R> Iterator for Extract<'_, I, R>
where
    I: Iterator<Item = PipelineResult<LocatedFile>>,
    R: ArtifactReader,
{
    type Item = PipelineResult<Observation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(observation) = self.pending.pop_front() {
                return Some(Ok(observation));
            }

            let located = match self.inner.next()? {
                Ok(located) => located,
                Err(err) => return Some(Err(err)),
            };

            let observed = match self.observe(&located) {
                Ok(observed) => observed,
                Err(err) => return Some(Err(err)),
            };
            self.pending
                .extend(observed.into_iter().map(|(data_type, value)| Observation {
                    key: ObservationKey {
                        variant: located.variant.clone(),
                        rate: located.rate.clone(),
                        data_type,
                    },
                    value,
                }));
        }
    }
}
