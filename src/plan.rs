use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::pipeline::group::OrderedMap;
use crate::pipeline::pipe::Toolchain;
use crate::variants::{CANONICAL_VARIANTS, VariantAliases};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPlan {
    pub hosts: OrderedMap<String, Vec<ReportSpec>>,
    #[serde(default)]
    pub variant_aliases: OrderedMap<String, String>,
    #[serde(default)]
    pub variant_order: Option<Vec<String>>,
    #[serde(default)]
    pub toolchain: Option<Toolchain>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSpec {
    pub title: String,
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ReportPlan {
    pub fn aliases(&self) -> VariantAliases {
        VariantAliases::default().with_overrides(self.variant_aliases.iter())
    }

    pub fn variant_order(&self) -> Vec<String> {
        match &self.variant_order {
            Some(order) => order.clone(),
            None => CANONICAL_VARIANTS.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn toolchain(&self) -> Toolchain {
        self.toolchain.clone().unwrap_or_default()
    }

    pub fn selected_hosts<'a>(
        &'a self,
        selected: &'a [String],
    ) -> impl Iterator<Item = (&'a String, &'a Vec<ReportSpec>)> + 'a {
        self.hosts
            .iter()
            .filter(move |(hostname, _)| selected.is_empty() || selected.contains(hostname))
    }
}

pub fn load_plan(path: &Path) -> Result<ReportPlan> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let plan: ReportPlan = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse report plan {}", path.display()))?;
    validate_plan(&plan).with_context(|| format!("invalid report plan {}", path.display()))?;
    Ok(plan)
}

fn validate_plan(plan: &ReportPlan) -> Result<()> {
    if plan.hosts.is_empty() {
        bail!("plan lists no hosts");
    }

    for (hostname, reports) in plan.hosts.iter() {
        for (position, report) in reports.iter().enumerate() {
            if report.include.is_empty() {
                bail!(
                    "report {} ('{}') for host '{}' includes no timestamps",
                    position + 1,
                    report.title,
                    hostname
                );
            }
        }
    }

    if let Some(toolchain) = &plan.toolchain {
        if toolchain.programs().count() != 2 {
            bail!("toolchain needs a non-empty decompress and query command");
        }
    }

    Ok(())
}
