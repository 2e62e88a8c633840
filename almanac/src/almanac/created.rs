use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::almanac::types::{iso_utc, parse_iso_utc};
use crate::almanac::vcs::VersionControlQuery;

/// When the site was first committed, as ISO-8601 UTC.
///
/// Falls back to the creation time of `manifest` when there is no usable
/// history, e.g. a shallow checkout.
pub fn resolve_creation_date(vcs: &dyn VersionControlQuery, manifest: &Path) -> String {
    let first_commit = vcs
        .commit_timestamps(Path::new("."))
        .first()
        .and_then(parse_iso_utc);

    match first_commit {
        Some(at) => iso_utc(at),
        None => {
            debug!(
                "no commit history, using creation time of {}",
                manifest.display()
            );
            iso_utc(file_created_at(manifest))
        }
    }
}

/// Filesystem creation time, or modification time where creation is not recorded.
pub fn file_created_at(path: &Path) -> DateTime<Utc> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            warn!("cannot stat {}: {err}; using current time", path.display());
            return Utc::now();
        }
    };

    meta.created()
        .or_else(|_| meta.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::almanac::vcs::StaticHistory;

    fn history(timestamps: &[&str]) -> StaticHistory {
        StaticHistory {
            timestamps: timestamps.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn oldest_commit_wins() {
        let vcs = history(&["2021-06-01T12:00:00+02:00", "2023-01-01T00:00:00Z"]);
        let created = resolve_creation_date(&vcs, Path::new("does-not-matter"));
        assert_eq!(created, "2021-06-01T10:00:00.000Z");
    }

    #[test]
    fn no_history_falls_back_to_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("package.json");
        fs::write(&manifest, "{}").unwrap();

        let created = resolve_creation_date(&history(&[]), &manifest);
        assert_eq!(created, iso_utc(file_created_at(&manifest)));
    }

    #[test]
    fn unparseable_history_falls_back_to_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("package.json");
        fs::write(&manifest, "{}").unwrap();

        let created = resolve_creation_date(&history(&["not a date"]), &manifest);
        assert!(parse_iso_utc(&created).is_some());
        assert_eq!(created, iso_utc(file_created_at(&manifest)));
    }

    #[test]
    fn missing_manifest_still_yields_a_timestamp() {
        let created = resolve_creation_date(&history(&[]), Path::new("/no/such/manifest.json"));
        assert!(created.ends_with('Z'));
        assert!(parse_iso_utc(&created).is_some());
    }
}
