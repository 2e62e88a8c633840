use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use log::info;

use crate::almanac::config::SiteConfig;
use crate::almanac::created::resolve_creation_date;
use crate::almanac::types::{BuildInfo, iso_utc};
use crate::almanac::vcs::VersionControlQuery;

pub fn assemble_build_info(config: &SiteConfig, vcs: &dyn VersionControlQuery) -> Result<BuildInfo> {
    let generator_version = generator_version(&config.generator_manifest_path())?;
    let created_at = resolve_creation_date(vcs, &config.project_manifest_path());
    let deployed_at = iso_utc(Utc::now());

    info!("generator {generator_version}, site created {created_at}");

    Ok(BuildInfo {
        generator_version,
        created_at,
        deployed_at,
    })
}

/// The `version` declared in the site generator's installed package metadata.
///
/// A missing or malformed file means the toolchain is broken, so this errors.
pub fn generator_version(metadata: &Path) -> Result<String> {
    let raw = fs::read_to_string(metadata)
        .with_context(|| format!("reading generator metadata at {}", metadata.display()))?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing generator metadata at {}", metadata.display()))?;

    parsed
        .get("version")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("no string `version` field in {}", metadata.display()))
}
