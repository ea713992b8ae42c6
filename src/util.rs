use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_hex(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0_u8]);
    }
    format!("{:x}", hasher.finalize())
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_directory(parent)?;

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut staging = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create staging file in {}", parent.display()))?;
    staging
        .write_all(&data)
        .with_context(|| format!("failed to write json file: {}", staging.path().display()))?;
    staging
        .write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", staging.path().display()))?;
    staging
        .as_file()
        .sync_all()
        .with_context(|| format!("failed to flush json file: {}", staging.path().display()))?;

    staging
        .persist(path)
        .with_context(|| format!("failed to move json file into place at {}", path.display()))?;

    Ok(())
}

pub fn command_available(program: &str) -> bool {
    Command::new(program).arg("--version").output().is_ok()
}
