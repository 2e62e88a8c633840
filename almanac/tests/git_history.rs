use std::fs;
use std::path::Path;
use std::process::Command;

use almanac::almanac::contributors::resolve_contributors;
use almanac::almanac::created::resolve_creation_date;
use almanac::almanac::{Git, VersionControlQuery};
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(["-c", "user.name=Jane", "-c", "user.email=jane@x.com"])
        .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
        .args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_AUTHOR_DATE", "2020-01-02T03:04:05+01:00")
        .env("GIT_COMMITTER_DATE", "2020-01-02T03:04:05+01:00")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// A one-commit repository, or `None` when git is not installed.
fn repository() -> Option<TempDir> {
    let tmp = TempDir::new().expect("create temp dir");
    if !git(tmp.path(), &["init", "-q"]) {
        return None;
    }
    fs::write(tmp.path().join("package.json"), "{}").unwrap();
    assert!(git(tmp.path(), &["add", "."]));
    assert!(git(
        tmp.path(),
        &[
            "commit",
            "-q",
            "-m",
            "Initial commit",
            "-m",
            "Co-authored-by: Ann <ann@x.com>\nco-authored-by: Jane <jane@x.com>",
        ],
    ));
    Some(tmp)
}

#[test]
fn reads_creation_date_from_first_commit() {
    let Some(repo) = repository() else {
        return;
    };
    let vcs = Git::new(repo.path());

    assert_eq!(vcs.commit_timestamps(Path::new(".")).len(), 1);
    let created = resolve_creation_date(&vcs, &repo.path().join("package.json"));
    assert_eq!(created, "2020-01-02T02:04:05.000Z");
}

#[test]
fn reads_contributors_from_shortlog_and_trailers() {
    let Some(repo) = repository() else {
        return;
    };
    let contributors = resolve_contributors(&Git::new(repo.path()));

    assert_eq!(contributors.authors_and_contributors, vec!["Jane <jane@x.com>"]);
    assert_eq!(
        contributors.co_authors,
        vec!["Ann <ann@x.com>", "Jane <jane@x.com>"]
    );
    assert_eq!(
        contributors.all,
        vec!["Jane <jane@x.com>", "Ann <ann@x.com>"]
    );
}
