use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// People credited in the repository history.
#[derive(Clone, Debug, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContributorSet {
    /// Shortlog order, typically by commit count descending.
    pub authors_and_contributors: Vec<String>,
    /// `Co-authored-by` trailers, first-seen order.
    pub co_authors: Vec<String>,
    pub all: Vec<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub generator_version: String,
    pub created_at: String,
    pub deployed_at: String,
}

/// Global template data, computed once per build.
#[derive(Clone, Debug, Serialize)]
pub struct SiteData {
    pub build: BuildInfo,
    pub contributors: ContributorSet,
}

/// `2024-03-05T09:00:00.000Z`
pub fn iso_utc(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 timestamp with offset and normalise it to UTC.
pub fn parse_iso_utc(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
