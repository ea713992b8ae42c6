use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::SequenceArgs;
use crate::commands::ensure_toolchain;
use crate::model::{RawRecord, SequenceProfileManifest};
use crate::pipeline::extract::NANOS_PER_SECOND;
use crate::pipeline::pipe::Toolchain;
use crate::pipeline::reduce::sequence_profile;
use crate::plan::load_plan;
use crate::util::{now_utc_string, write_json_pretty};

pub fn run(args: SequenceArgs) -> Result<()> {
    let toolchain = match &args.plan {
        Some(path) => load_plan(path)?.toolchain(),
        None => Toolchain::default(),
    };
    ensure_toolchain(&toolchain)?;

    let manifest = build_manifest(&args, &toolchain)?;
    let output_path = args
        .output_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(".cache/benchstats").join("sequence_profile.json"));

    write_json_pretty(&output_path, &manifest)?;
    info!(
        path = %output_path.display(),
        runs = manifest.files.len(),
        points = manifest.points.len(),
        "wrote sequence profile"
    );

    Ok(())
}

pub fn build_manifest(args: &SequenceArgs, toolchain: &Toolchain) -> Result<SequenceProfileManifest> {
    let mut runs = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let path = args.data_root.join(file);
        let records = toolchain
            .read_records(&path)
            .with_context(|| format!("failed to read raw results {}", path.display()))?;
        info!(file = %path.display(), records = records.len(), "loaded run");
        runs.push(latencies_by_sequence(records));
    }

    Ok(SequenceProfileManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        data_root: args.data_root.display().to_string(),
        files: args.files.clone(),
        points: sequence_profile(&runs),
    })
}

pub fn latencies_by_sequence(mut records: Vec<RawRecord>) -> Vec<f64> {
    records.sort_by_key(|record| record.seq);
    records
        .into_iter()
        .map(|record| record.latency / NANOS_PER_SECOND)
        .collect()
}
