use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::AveragingMethod;
use crate::model::{ReportStats, RunCacheEntry};
use crate::plan::ReportSpec;
use crate::util::{now_utc_string, sha256_hex, write_json_pretty};

pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy)]
pub struct ReportKey<'a> {
    pub hostname: &'a str,
    pub index: usize,
    pub spec: &'a ReportSpec,
    pub averaging_method: AveragingMethod,
}

impl ReportKey<'_> {
    pub fn fingerprint(&self) -> String {
        report_fingerprint(self.spec, self.averaging_method)
    }
}

#[derive(Debug, Clone)]
pub struct CachedReport {
    pub entry: RunCacheEntry,
    pub from_cache: bool,
}

#[derive(Debug, Clone)]
pub struct RunCache {
    root: PathBuf,
}

impl RunCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn entry_path(&self, hostname: &str, index: usize) -> PathBuf {
        self.root.join(hostname).join(format!("report-{index}.json"))
    }

    pub fn load(&self, hostname: &str, index: usize) -> Result<Option<RunCacheEntry>> {
        let path = self.entry_path(hostname, index);
        if !path.exists() {
            return Ok(None);
        }
        read_entry(&path).map(Some)
    }

    pub fn store(&self, entry: &RunCacheEntry) -> Result<PathBuf> {
        let path = self.entry_path(&entry.hostname, entry.index);
        write_json_pretty(&path, entry)?;
        Ok(path)
    }

    pub fn get_or_compute<F>(&self, key: &ReportKey<'_>, compute: F) -> Result<CachedReport>
    where
        F: FnOnce() -> Result<ReportStats>,
    {
        let fingerprint = key.fingerprint();

        if let Some(entry) = self.load(key.hostname, key.index)? {
            let path = self.entry_path(key.hostname, key.index);
            if entry.fingerprint != fingerprint {
                warn!(
                    path = %path.display(),
                    cached_title = %entry.title,
                    "cached report was computed with different parameters; delete the file to recompute"
                );
            }
            info!(hostname = key.hostname, index = key.index, path = %path.display(), "using cached report");
            return Ok(CachedReport {
                entry,
                from_cache: true,
            });
        }

        let stats = compute()?;
        let entry = RunCacheEntry {
            cache_version: CACHE_VERSION,
            hostname: key.hostname.to_string(),
            index: key.index,
            title: key.spec.title.clone(),
            averaging_method: key.averaging_method,
            generated_at: now_utc_string(),
            fingerprint,
            stats,
        };
        let path = self.store(&entry)?;
        info!(hostname = key.hostname, index = key.index, path = %path.display(), "cached report");

        Ok(CachedReport {
            entry,
            from_cache: false,
        })
    }
}

fn read_entry(path: &Path) -> Result<RunCacheEntry> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| {
        format!(
            "failed to parse cached report {}; delete it to recompute",
            path.display()
        )
    })
}

pub fn report_fingerprint(spec: &ReportSpec, method: AveragingMethod) -> String {
    let include = spec.include.join("\n");
    let exclude = spec.exclude.join("\n");
    sha256_hex(&[&spec.title, &include, &exclude, method.as_str()])
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::model::StatPoint;
    use crate::pipeline::group::OrderedMap;

    fn spec(title: &str) -> ReportSpec {
        ReportSpec {
            title: title.to_string(),
            include: vec!["2024-04-16T18:22:43-04:00".to_string()],
            exclude: vec![],
        }
    }

    fn stats(mean: f64) -> ReportStats {
        ReportStats {
            latencies: OrderedMap::from_iter([(
                "plain".to_string(),
                vec![StatPoint {
                    rate: 100,
                    mean,
                    stddev: 0.0,
                }],
            )]),
            ..ReportStats::default()
        }
    }

    #[test]
    fn miss_computes_and_persists_then_hit_skips_computation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = RunCache::new(dir.path());
        let spec = spec("baseline");
        let key = ReportKey {
            hostname: "zeus",
            index: 1,
            spec: &spec,
            averaging_method: AveragingMethod::VegetaSummaries,
        };
        let calls = Cell::new(0);

        let first = cache
            .get_or_compute(&key, || {
                calls.set(calls.get() + 1);
                Ok(stats(0.11))
            })
            .expect("first run");
        assert!(!first.from_cache);
        assert!(dir.path().join("zeus").join("report-1.json").exists());

        let second = cache
            .get_or_compute(&key, || {
                calls.set(calls.get() + 1);
                Ok(stats(9.0))
            })
            .expect("second run");
        assert!(second.from_cache);
        assert_eq!(calls.get(), 1);
        assert_eq!(second.entry.stats, first.entry.stats);
    }

    #[test]
    fn changed_parameters_still_return_the_cached_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = RunCache::new(dir.path());
        let original = spec("baseline");
        let renamed = spec("renamed");

        cache
            .get_or_compute(
                &ReportKey {
                    hostname: "zeus",
                    index: 2,
                    spec: &original,
                    averaging_method: AveragingMethod::VegetaSummaries,
                },
                || Ok(stats(0.2)),
            )
            .expect("first run");

        let reused = cache
            .get_or_compute(
                &ReportKey {
                    hostname: "zeus",
                    index: 2,
                    spec: &renamed,
                    averaging_method: AveragingMethod::AllRawData,
                },
                || panic!("must not recompute"),
            )
            .expect("cached run");

        assert!(reused.from_cache);
        assert_eq!(reused.entry.title, "baseline");
        assert_ne!(
            reused.entry.fingerprint,
            report_fingerprint(&renamed, AveragingMethod::AllRawData)
        );
    }

    #[test]
    fn compute_failure_persists_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = RunCache::new(dir.path());
        let spec = spec("broken");
        let key = ReportKey {
            hostname: "zeus",
            index: 1,
            spec: &spec,
            averaging_method: AveragingMethod::VegetaSummaries,
        };

        cache
            .get_or_compute(&key, || anyhow::bail!("pipeline failed"))
            .expect_err("error propagates");

        assert!(cache.load("zeus", 1).expect("load").is_none());
    }

    #[test]
    fn corrupt_entry_names_the_file_to_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = RunCache::new(dir.path());
        let path = cache.entry_path("zeus", 3);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "{not json").expect("write");

        let err = cache.load("zeus", 3).expect_err("corrupt entry");
        assert!(err.to_string().contains("delete it to recompute"));
    }

    #[test]
    fn fingerprint_depends_on_every_parameter() {
        let base = spec("t");
        let mut excluded = base.clone();
        excluded.exclude.push("*/*/plain/*".to_string());

        let fingerprint = report_fingerprint(&base, AveragingMethod::VegetaSummaries);
        assert_ne!(fingerprint, report_fingerprint(&excluded, AveragingMethod::VegetaSummaries));
        assert_ne!(fingerprint, report_fingerprint(&base, AveragingMethod::AllRawData));
        assert_eq!(fingerprint, report_fingerprint(&spec("t"), AveragingMethod::VegetaSummaries));
    }
}
