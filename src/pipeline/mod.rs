use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::cli::AveragingMethod;
use crate::error::PipelineResult;
use crate::model::{CodeClass, CodeClassStats, ReportStats, StatPoint};
use crate::variants::VariantAliases;

pub mod canonicalize;
pub mod demux;
pub mod extract;
pub mod group;
pub mod locate;
pub mod pipe;
pub mod reduce;

use canonicalize::canonicalize;
use demux::demultiplex;
use extract::{ArtifactReader, ObservationKey, extract};
use group::{Leaf, OrderedMap, group_by_init, merge_dict};
use locate::ArtifactLocator;
use reduce::summarize;

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions<'a> {
    pub data_root: &'a Path,
    pub include_timestamps: &'a [String],
    pub exclude_patterns: &'a [String],
    pub averaging_method: AveragingMethod,
    pub aliases: &'a VariantAliases,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub stats: ReportStats,
    pub unknown_variants: BTreeSet<String>,
    pub unrecognized_groups: usize,
}

pub fn run_pipeline<R: ArtifactReader>(
    options: &PipelineOptions<'_>,
    reader: &R,
) -> PipelineResult<PipelineOutcome> {
    let locator = ArtifactLocator::new(
        options.data_root,
        options.include_timestamps,
        options.exclude_patterns,
    )?;

    let mut unknown_variants = BTreeSet::new();
    let grouped = {
        let located = canonicalize(locator, options.aliases, &mut unknown_variants);
        let observations = extract(located, options.averaging_method, reader)
            .map(|observation| observation.map(|observation| observation.into_pair()));
        group_by_init(observations)?
    };
    debug!(groups = grouped.len(), "grouped observations");

    if !unknown_variants.is_empty() {
        warn!(variants = ?unknown_variants, "detected unknown variants among data folders");
    }

    let demuxed = demultiplex(grouped);
    if !demuxed.unrecognized.is_empty() {
        let tags: BTreeSet<&str> = demuxed
            .unrecognized
            .iter()
            .map(|(key, _)| key.data_type.as_str())
            .collect();
        warn!(groups = demuxed.unrecognized.len(), tags = ?tags, "observations with unrecognized data types");
    }

    let mut merged: OrderedMap<String, OrderedMap<CodeClass, Leaf<Vec<StatPoint>>>> =
        OrderedMap::new();
    for (class, groups) in demuxed.code_classes {
        for (variant, points) in summarize(series(groups))? {
            merge_dict(
                &mut merged,
                OrderedMap::from_iter([(variant, OrderedMap::from_iter([(class, Leaf(points))]))]),
            )?;
        }
    }
    let code_classes: CodeClassStats = merged
        .into_iter()
        .map(|(variant, classes)| {
            let classes: OrderedMap<CodeClass, Vec<StatPoint>> = classes
                .into_iter()
                .map(|(class, Leaf(points))| (class, points))
                .collect();
            (variant, classes)
        })
        .collect();

    let stats = ReportStats {
        latencies: summarize(series(demuxed.main_latencies))?,
        success_latencies: summarize(series(demuxed.success_latencies))?,
        success_rates: summarize(series(demuxed.success_rates))?,
        code_classes,
    };

    info!(
        variants = stats.latencies.len(),
        success_only_variants = stats.success_latencies.len(),
        rate_variants = stats.success_rates.len(),
        "pipeline finished"
    );

    Ok(PipelineOutcome {
        stats,
        unknown_variants,
        unrecognized_groups: demuxed.unrecognized.len(),
    })
}

fn series(
    groups: Vec<(ObservationKey, Vec<f64>)>,
) -> impl Iterator<Item = (String, String, Vec<f64>)> {
    groups
        .into_iter()
        .map(|(key, values)| (key.variant, key.rate, values))
}
