use anyhow::Result;
use tracing::{info, warn};

use crate::cache::{RunCache, report_fingerprint};
use crate::cli::StatusArgs;
use crate::plan::load_plan;

pub fn run(args: StatusArgs) -> Result<()> {
    let plan = load_plan(&args.plan)?;
    let cache = RunCache::new(&args.cache_root);

    info!(cache_root = %args.cache_root.display(), "status requested");

    let mut cached = 0_usize;
    let mut missing = 0_usize;
    for (hostname, reports) in plan.hosts.iter() {
        for (position, spec) in reports.iter().enumerate() {
            let index = position + 1;
            let path = cache.entry_path(hostname, index);

            match cache.load(hostname, index)? {
                Some(entry) => {
                    let current = report_fingerprint(spec, entry.averaging_method);
                    if entry.fingerprint != current {
                        warn!(
                            hostname = %hostname,
                            index,
                            path = %path.display(),
                            "cached report is stale; delete it to recompute"
                        );
                    }
                    info!(
                        hostname = %hostname,
                        index,
                        title = %entry.title,
                        averaging_method = entry.averaging_method.as_str(),
                        generated_at = %entry.generated_at,
                        variants = entry.stats.latencies.len(),
                        "cached report"
                    );
                    cached += 1;
                }
                None => {
                    warn!(hostname = %hostname, index, title = %spec.title, path = %path.display(), "report not cached");
                    missing += 1;
                }
            }
        }
    }

    info!(cached, missing, "status completed");
    Ok(())
}
