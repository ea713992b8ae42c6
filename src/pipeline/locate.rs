use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::model::{METADATA_FILENAME, RunMetadata};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultFile {
    Summary(PathBuf),
    Raw(PathBuf),
}

impl ResultFile {
    pub fn path(&self) -> &Path {
        match self {
            Self::Summary(path) | Self::Raw(path) => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedFile {
    pub variant: String,
    pub rate: String,
    pub file: ResultFile,
}

/// Exclusion globs matched against `timestamp/rate/variant/filename`.
///
/// Matching is case-sensitive and wildcards never cross a `/`.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<(String, Pattern)>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl ExclusionSet {
    pub fn new(patterns: &[String]) -> PipelineResult<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Pattern::new(&single_segment(pattern))
                    .map(|compiled| (pattern.clone(), compiled))
                    .map_err(|source| PipelineError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })
            })
            .collect::<PipelineResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn matching(&self, relative_path: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, compiled)| compiled.matches_with(relative_path, MATCH_OPTIONS))
            .map(|(pattern, _)| pattern.as_str())
    }
}

/// `**` collapses to `*` and a `[` with no closing `]` is literal.
fn single_segment(pattern: &str) -> String {
    let mut out = pattern.to_string();
    while out.contains("**") {
        out = out.replace("**", "*");
    }

    let last_close = out.rfind(']');
    out.char_indices()
        .map(|(position, ch)| match (ch, last_close) {
            ('[', Some(close)) if position < close => "[".to_string(),
            ('[', _) => "[[]".to_string(),
            (other, _) => other.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone)]
struct RunSlice {
    timestamp: String,
    rate: String,
    variant: String,
}

/// Lazy walk over `root/<timestamp>/<rate>/<variant>/`.
///
/// A missing timestamp directory is fatal; a run directory without
/// `metadata.json` is skipped. Result files are never opened here.
pub struct ArtifactLocator {
    root: PathBuf,
    timestamps: VecDeque<String>,
    exclusions: ExclusionSet,
    slices: VecDeque<RunSlice>,
    ready: VecDeque<LocatedFile>,
    failed: bool,
}

impl ArtifactLocator {
    pub fn new(root: &Path, timestamps: &[String], exclude_patterns: &[String]) -> PipelineResult<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            timestamps: timestamps.iter().cloned().collect(),
            exclusions: ExclusionSet::new(exclude_patterns)?,
            slices: VecDeque::new(),
            ready: VecDeque::new(),
            failed: false,
        })
    }

    fn queue_timestamp(&mut self, timestamp: String) -> PipelineResult<()> {
        let results_dir = self.root.join(&timestamp);
        if !results_dir.is_dir() {
            return Err(PipelineError::MissingTimestamp {
                timestamp,
                root: self.root.clone(),
            });
        }

        for rate in list_names(&results_dir, EntryKind::Directory)? {
            for variant in list_names(&results_dir.join(&rate), EntryKind::Directory)? {
                self.slices.push_back(RunSlice {
                    timestamp: timestamp.clone(),
                    rate: rate.clone(),
                    variant,
                });
            }
        }
        Ok(())
    }

    fn scan_slice(&mut self, slice: RunSlice) -> PipelineResult<()> {
        let run_dir = self
            .root
            .join(&slice.timestamp)
            .join(&slice.rate)
            .join(&slice.variant);
        let metadata_path = run_dir.join(METADATA_FILENAME);
        if !metadata_path.is_file() {
            debug!(dir = %run_dir.display(), "no metadata, skipping run directory");
            return Ok(());
        }

        let raw = fs::read(&metadata_path).map_err(|source| PipelineError::io(&metadata_path, source))?;
        let metadata: RunMetadata =
            serde_json::from_slice(&raw).map_err(|source| PipelineError::json(&metadata_path, source))?;

        if metadata.test_options.rate != slice.rate {
            return Err(PipelineError::RateMismatch {
                declared: metadata.test_options.rate,
                directory: slice.rate,
                path: metadata_path,
            });
        }

        for filename in list_names(&run_dir, EntryKind::File)? {
            let path = run_dir.join(&filename);
            let file = if filename.ends_with(metadata.summary_suffix()) {
                ResultFile::Summary(path)
            } else if filename.ends_with(metadata.results_suffix()) {
                ResultFile::Raw(path)
            } else {
                continue;
            };

            let relative = format!(
                "{}/{}/{}/{}",
                slice.timestamp, slice.rate, slice.variant, filename
            );
            if let Some(pattern) = self.exclusions.matching(&relative) {
                debug!(file = %relative, pattern, "excluded by pattern");
                continue;
            }

            self.ready.push_back(LocatedFile {
                variant: slice.variant.clone(),
                rate: slice.rate.clone(),
                file,
            });
        }
        Ok(())
    }
}

impl Iterator for ArtifactLocator {
    type Item = PipelineResult<LocatedFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed {
                return None;
            }
            if let Some(found) = self.ready.pop_front() {
                return Some(Ok(found));
            }

            let step = if let Some(slice) = self.slices.pop_front() {
                self.scan_slice(slice)
            } else if let Some(timestamp) = self.timestamps.pop_front() {
                self.queue_timestamp(timestamp)
            } else {
                return None;
            };

            if let Err(err) = step {
                self.failed = true;
                return Some(Err(err));
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory,
    File,
}

fn list_names(dir: &Path, kind: EntryKind) -> PipelineResult<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|source| PipelineError::io(dir, source))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| PipelineError::io(dir, source))?;
        let path = entry.path();
        let matches_kind = match kind {
            EntryKind::Directory => path.is_dir(),
            EntryKind::File => path.is_file(),
        };
        if !matches_kind {
            continue;
        }

        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => warn!(dir = %dir.display(), name = ?name, "skipping non UTF-8 entry"),
        }
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excluded(patterns: &[&str], path: &str) -> bool {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        ExclusionSet::new(&patterns)
            .expect("patterns compile")
            .matching(path)
            .is_some()
    }

    #[test]
    fn star_matches_within_one_segment() {
        assert!(excluded(&["*/*/filter-97776ef1/*"], "ts/100/filter-97776ef1/1.summary.json"));
        assert!(excluded(
            &["2024-04-09T20:14:12-04:00/120/*/4.*"],
            "2024-04-09T20:14:12-04:00/120/plain/4.summary.json"
        ));
        assert!(!excluded(&["*/filter/*"], "ts/100/filter/1.summary.json"));
        assert!(!excluded(&["ts/*"], "ts/100/plain/1.summary.json"));
    }

    #[test]
    fn matching_is_case_sensitive_and_anchored() {
        assert!(!excluded(&["*/*/Plain/*"], "ts/100/plain/1.summary.json"));
        assert!(!excluded(&["100/plain/*"], "ts/100/plain/1.summary.json"));
    }

    #[test]
    fn question_mark_and_classes_follow_fnmatch() {
        assert!(excluded(&["ts/10?/plain/*"], "ts/100/plain/1.summary.json"));
        assert!(excluded(&["ts/100/plain/[12].*"], "ts/100/plain/2.summary.json"));
        assert!(!excluded(&["ts/100/plain/[!12].*"], "ts/100/plain/2.summary.json"));
        assert!(excluded(&["ts/100/plain/[!12].*"], "ts/100/plain/3.summary.json"));
        assert!(excluded(&["ts/[0-9]00/plain/*"], "ts/500/plain/3.summary.json"));
    }

    #[test]
    fn double_star_stays_within_one_segment() {
        assert!(excluded(&["**/100/plain/*"], "ts/100/plain/1.summary.json"));
        assert!(!excluded(&["**/plain/*"], "ts/100/plain/1.summary.json"));
        assert!(excluded(&["ts/100/plain/1.**"], "ts/100/plain/1.summary.json"));
        assert!(!excluded(&["ts/**"], "ts/100/plain/1.summary.json"));
    }

    #[test]
    fn bracket_edge_cases_follow_fnmatch() {
        assert!(excluded(&["ts/100/plain/[]a].json"], "ts/100/plain/].json"));
        assert!(excluded(&["ts/100/plain/[!]].json"], "ts/100/plain/x.json"));
        assert!(!excluded(&["ts/100/plain/[!]].json"], "ts/100/plain/].json"));
        assert!(excluded(&["ts/100/plain/[a-c].json"], "ts/100/plain/b.json"));
        assert!(excluded(&["ts/100/plain/[^a].json"], "ts/100/plain/^.json"));
        assert!(!excluded(&["ts/100/plain[/]x.json"], "ts/100/plain/x.json"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(excluded(&["ts+1/100/plain/(a).json"], "ts+1/100/plain/(a).json"));
        assert!(!excluded(&["ts/100/plain/1.json"], "ts/100/plain/1xjson"));
        assert!(excluded(&["ts/100/plain/[.json"], "ts/100/plain/[.json"));
    }
}
