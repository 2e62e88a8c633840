use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use walkdir::WalkDir;

use crate::almanac::config::PassthroughCopy;

/// Copy every rule's source under `output`, untouched. Returns the number of files copied.
///
/// `from` is relative to `root`, `to` relative to `output`. Missing sources are skipped.
pub fn copy_all(rules: &[PassthroughCopy], root: &Path, output: &Path) -> Result<usize> {
    let mut copied = 0;
    for rule in rules {
        let source = root.join(&rule.from);
        let target = output.join(&rule.to);

        if !source.exists() {
            warn!("passthrough source {} does not exist, skipping", source.display());
            continue;
        }

        copied += if source.is_dir() {
            copy_dir(&source, &target)?
        } else {
            copy_file(&source, &target)?;
            1
        };
    }
    Ok(copied)
}

fn copy_dir(source: &Path, target: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(source)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
    {
        let Ok(rel) = entry.path().strip_prefix(source) else {
            continue;
        };
        copy_file(entry.path(), &target.join(rel))?;
        copied += 1;
    }
    Ok(copied)
}

fn copy_file(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output dir {}", parent.display()))?;
    }
    fs::copy(source, target).with_context(|| {
        format!("copying {} to {}", source.display(), target.display())
    })?;
    debug!("copied {} -> {}", source.display(), target.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/assets/fonts/sub")).unwrap();
        fs::write(root.join("src/assets/fonts/a.woff2"), "a").unwrap();
        fs::write(root.join("src/assets/fonts/sub/b.woff2"), "b").unwrap();
        fs::write(root.join("src/favicon.ico"), "ico").unwrap();

        let rules = vec![
            PassthroughCopy::new("src/assets/fonts", "fonts"),
            PassthroughCopy::new("src/favicon.ico", "favicon.ico"),
            PassthroughCopy::new("src/missing", "missing"),
        ];
        let output = root.join("_site");
        let copied = copy_all(&rules, root, &output).unwrap();

        assert_eq!(copied, 3);
        assert_eq!(fs::read_to_string(output.join("fonts/a.woff2")).unwrap(), "a");
        assert_eq!(fs::read_to_string(output.join("fonts/sub/b.woff2")).unwrap(), "b");
        assert_eq!(fs::read_to_string(output.join("favicon.ico")).unwrap(), "ico");
        assert!(!output.join("missing").exists());
    }

    #[test]
    fn contents_are_not_templated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("raw.html"), "{{ymd build.createdAt}}").unwrap();

        let output = dir.path().join("out");
        copy_all(&[PassthroughCopy::new("raw.html", "nested/raw.html")], dir.path(), &output).unwrap();
        assert_eq!(
            fs::read_to_string(output.join("nested/raw.html")).unwrap(),
            "{{ymd build.createdAt}}"
        );
    }
}
