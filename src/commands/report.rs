use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{info, warn};

use crate::cache::{ReportKey, RunCache};
use crate::cli::{AveragingMethod, ReportArgs};
use crate::commands::ensure_toolchain;
use crate::model::{ReportOutput, ReportStats};
use crate::pipeline::extract::{ArtifactReader, FsReader};
use crate::pipeline::group::OrderedMap;
use crate::pipeline::{PipelineOptions, run_pipeline};
use crate::plan::{ReportSpec, load_plan};
use crate::util::{now_utc_string, write_json_pretty};
use crate::variants::{VariantAliases, order_by_variants};

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: ReportArgs) -> Result<()> {
    let plan = load_plan(&args.plan)?;

    for host in &args.hosts {
        if !plan.hosts.contains_key(host) {
            bail!("host '{host}' is not listed in {}", args.plan.display());
        }
    }

    let toolchain = plan.toolchain();
    if args.averaging_method == AveragingMethod::AllRawData {
        ensure_toolchain(&toolchain)?;
    }
    let reader = FsReader::new(toolchain);
    let aliases = plan.aliases();
    let order = plan.variant_order();
    let cache = RunCache::new(&args.cache_root);
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.cache_root.join("reports"));

    info!(
        plan = %args.plan.display(),
        data_root = %args.data_root.display(),
        averaging_method = args.averaging_method.as_str(),
        "report started"
    );

    let mut written = 0_usize;
    for (hostname, reports) in plan.selected_hosts(&args.hosts) {
        let host_root = args.data_root.join(hostname);
        for (position, spec) in reports.iter().enumerate() {
            let index = position + 1;
            let key = ReportKey {
                hostname,
                index,
                spec,
                averaging_method: args.averaging_method,
            };

            let cached = cache
                .get_or_compute(&key, || {
                    compute_stats(&host_root, spec, args.averaging_method, &aliases, &reader)
                })
                .with_context(|| {
                    format!("report {index} ('{}') for host '{hostname}' failed", spec.title)
                })?;

            let (stats, unordered_variants) = order_stats(&cached.entry.stats, &order);
            if !unordered_variants.is_empty() {
                warn!(
                    hostname = %hostname,
                    index,
                    variants = ?unordered_variants,
                    "variants missing from the display order were appended at the end"
                );
            }

            let output = ReportOutput {
                manifest_version: MANIFEST_VERSION,
                hostname: hostname.clone(),
                index,
                title: cached.entry.title.clone(),
                averaging_method: cached.entry.averaging_method,
                generated_at: now_utc_string(),
                from_cache: cached.from_cache,
                unordered_variants,
                stats,
            };
            let path = output_dir.join(hostname).join(format!("{index}.json"));
            write_json_pretty(&path, &output)?;
            info!(hostname = %hostname, index, title = %output.title, path = %path.display(), "wrote report");
            written += 1;
        }
    }

    info!(reports = written, output_dir = %output_dir.display(), "report completed");
    Ok(())
}

pub fn compute_stats<R: ArtifactReader>(
    host_root: &Path,
    spec: &ReportSpec,
    averaging_method: AveragingMethod,
    aliases: &VariantAliases,
    reader: &R,
) -> Result<ReportStats> {
    let options = PipelineOptions {
        data_root: host_root,
        include_timestamps: &spec.include,
        exclude_patterns: &spec.exclude,
        averaging_method,
        aliases,
    };

    let outcome = run_pipeline(&options, reader).map_err(|err| {
        let kind = if err.is_configuration_error() {
            "report parameters do not match the data"
        } else {
            "failed to aggregate benchmark artifacts"
        };
        anyhow!(err).context(format!("{kind} under {}", host_root.display()))
    })?;

    info!(
        host_root = %host_root.display(),
        title = %spec.title,
        unknown_variants = outcome.unknown_variants.len(),
        unrecognized_groups = outcome.unrecognized_groups,
        "aggregated report"
    );
    Ok(outcome.stats)
}

pub fn order_stats(stats: &ReportStats, order: &[String]) -> (ReportStats, Vec<String>) {
    let mut unordered = Vec::new();
    let ordered = ReportStats {
        latencies: arrange(&stats.latencies, order, &mut unordered),
        success_latencies: arrange(&stats.success_latencies, order, &mut unordered),
        success_rates: arrange(&stats.success_rates, order, &mut unordered),
        code_classes: arrange(&stats.code_classes, order, &mut unordered),
    };
    (ordered, unordered)
}

fn arrange<V: Clone>(
    map: &OrderedMap<String, V>,
    order: &[String],
    unordered: &mut Vec<String>,
) -> OrderedMap<String, V> {
    let (mut sorted, remainder) = order_by_variants(map, order);
    for (variant, value) in remainder {
        if !unordered.contains(&variant) {
            unordered.push(variant.clone());
        }
        sorted.insert(variant, value);
    }
    sorted
}
