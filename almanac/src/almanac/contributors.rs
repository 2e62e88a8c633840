use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::almanac::types::ContributorSet;
use crate::almanac::vcs::VersionControlQuery;

const CO_AUTHOR_TRAILER: &str = "co-authored-by:";

pub fn resolve_contributors(vcs: &dyn VersionControlQuery) -> ContributorSet {
    let authors = parse_shortlog(vcs.shortlog().iter());
    let co_authors = parse_co_authors(vcs.commit_messages().iter());
    merge_contributors(authors, co_authors)
}

/// Strip the leading commit count from shortlog summary lines.
pub fn parse_shortlog<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    static COUNT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\s*\d+\s+").expect("shortlog count regex"));

    lines
        .into_iter()
        .map(|line| COUNT.replace(line, "").trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Collect `Co-authored-by:` trailers, matched case-insensitively.
pub fn parse_co_authors<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    dedup_in_order(lines.into_iter().filter_map(co_author))
}

fn co_author(line: &str) -> Option<String> {
    let line = line.trim();
    let prefix = line.get(..CO_AUTHOR_TRAILER.len())?;
    if !prefix.eq_ignore_ascii_case(CO_AUTHOR_TRAILER) {
        return None;
    }
    let name = line[CO_AUTHOR_TRAILER.len()..].trim();
    (!name.is_empty()).then(|| name.to_string())
}

pub fn merge_contributors(authors: Vec<String>, co_authors: Vec<String>) -> ContributorSet {
    let all = dedup_in_order(authors.iter().chain(co_authors.iter()).cloned());
    ContributorSet {
        authors_and_contributors: authors,
        co_authors,
        all,
    }
}

fn dedup_in_order(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
