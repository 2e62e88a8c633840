use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::almanac::command::{CommandLines, ExternalCommand, run_and_split_lines};
use crate::almanac::config::VcsSettings;

/// The three history queries build metadata is derived from.
pub trait VersionControlQuery {
    /// Commit timestamps touching `path`, oldest first, strict ISO-8601.
    fn commit_timestamps(&self, path: &Path) -> CommandLines;

    /// One `<count>\t<name>` summary line per contributor across all branches.
    fn shortlog(&self) -> CommandLines;

    /// Full message bodies of every commit across all branches.
    fn commit_messages(&self) -> CommandLines;
}

/// Queries a git checkout by shelling out to the `git` binary.
#[derive(Clone, Debug)]
pub struct Git {
    program: String,
    root: PathBuf,
    timeout: Duration,
}

impl Git {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            program: "git".into(),
            root: root.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_settings(settings: &VcsSettings) -> Self {
        Self {
            program: settings.program.clone(),
            root: PathBuf::from(&settings.repository_root),
            timeout: settings.timeout(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn query<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> CommandLines {
        let command = ExternalCommand::new(self.program.as_str(), args).with_timeout(self.timeout);
        run_and_split_lines(&command, &self.root)
    }
}

impl VersionControlQuery for Git {
    fn commit_timestamps(&self, path: &Path) -> CommandLines {
        let path = path.to_string_lossy();
        self.query(["log", "--reverse", "--format=%aI", "--", &*path])
    }

    fn shortlog(&self) -> CommandLines {
        self.query(["shortlog", "--summary", "--numbered", "--email", "--all"])
    }

    fn commit_messages(&self) -> CommandLines {
        self.query(["log", "--all", "--format=%B"])
    }
}

/// Fixed history, for sites built outside a checkout and for tests.
#[derive(Clone, Debug, Default)]
pub struct StaticHistory {
    pub timestamps: Vec<String>,
    pub shortlog: Vec<String>,
    pub messages: Vec<String>,
}

impl VersionControlQuery for StaticHistory {
    fn commit_timestamps(&self, _path: &Path) -> CommandLines {
        self.timestamps.iter().cloned().collect()
    }

    fn shortlog(&self) -> CommandLines {
        self.shortlog.iter().cloned().collect()
    }

    fn commit_messages(&self) -> CommandLines {
        self.messages.iter().cloned().collect()
    }
}
