use std::path::{Path, PathBuf};
use std::time::Duration;

use confik::{Configuration, EnvSource};
use serde::{Deserialize, Serialize};

use self::yaml::YamlFileSource;

pub const DEFAULT_CONFIG_FILE: &str = "almanac.yml";

#[derive(Debug, Clone, Serialize, Deserialize, Configuration)]
pub struct SiteSettings {
    /// Base used by `absoluteUrl` when a template does not pass one.
    #[confik(default = default_base_url())]
    pub base_url: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, Configuration)]
pub struct Directories {
    #[confik(default = default_input_dir())]
    pub input: String,
    /// Relative to `input`.
    #[confik(default = default_includes_dir())]
    pub includes: String,
    /// Relative to `input`.
    #[confik(default = default_data_dir())]
    pub data: String,
    #[confik(default = default_output_dir())]
    pub output: String,
}

impl Default for Directories {
    fn default() -> Self {
        Self {
            input: default_input_dir(),
            includes: default_includes_dir(),
            data: default_data_dir(),
            output: default_output_dir(),
        }
    }
}

fn default_input_dir() -> String {
    "src".into()
}

fn default_includes_dir() -> String {
    "_includes".into()
}

fn default_data_dir() -> String {
    "_data".into()
}

fn default_output_dir() -> String {
    "_site".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Configuration)]
#[serde(rename_all = "lowercase")]
#[confik(forward(serde(rename_all = "lowercase")))]
pub enum TemplateEngine {
    Handlebars,
    /// Files are passed through without template processing.
    None,
}

impl TemplateEngine {
    /// File extension of templates processed by this engine.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            TemplateEngine::Handlebars => Some("hbs"),
            TemplateEngine::None => None,
        }
    }
}

/// Engine used per source kind. `html` also decides which includes are
/// registered as partials; `markdown` and `data` are carried for the page
/// renderer and are not read by this crate.
#[derive(Debug, Clone, Serialize, Deserialize, Configuration)]
pub struct TemplateEngines {
    #[confik(default = TemplateEngine::Handlebars)]
    pub html: TemplateEngine,
    #[confik(default = TemplateEngine::Handlebars)]
    pub data: TemplateEngine,
    #[confik(default = TemplateEngine::Handlebars)]
    pub markdown: TemplateEngine,
}

impl Default for TemplateEngines {
    fn default() -> Self {
        Self {
            html: TemplateEngine::Handlebars,
            data: TemplateEngine::Handlebars,
            markdown: TemplateEngine::Handlebars,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Configuration)]
pub struct VcsSettings {
    #[confik(default = default_vcs_program())]
    pub program: String,
    #[confik(default = default_repository_root())]
    pub repository_root: String,
    #[confik(default = 10u64)]
    pub timeout_secs: u64,
}

impl VcsSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for VcsSettings {
    fn default() -> Self {
        Self {
            program: default_vcs_program(),
            repository_root: default_repository_root(),
            timeout_secs: 10,
        }
    }
}

fn default_vcs_program() -> String {
    "git".into()
}

fn default_repository_root() -> String {
    ".".into()
}

/// A source file or directory copied verbatim to `to` under the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Configuration)]
pub struct PassthroughCopy {
    pub from: String,
    pub to: String,
}

impl PassthroughCopy {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Configuration)]
pub struct SiteConfig {
    #[confik(default)]
    pub site: SiteSettings,
    #[confik(default)]
    pub directories: Directories,
    #[confik(default)]
    pub templates: TemplateEngines,
    #[confik(default = default_project_manifest())]
    pub project_manifest: String,
    /// Package metadata of the installed site generator, relative to the
    /// directory holding `project_manifest`.
    #[confik(default = default_generator_manifest())]
    pub generator_manifest: String,
    #[confik(default)]
    pub vcs: VcsSettings,
    #[confik(default = default_passthrough())]
    pub passthrough: Vec<PassthroughCopy>,
}

fn default_project_manifest() -> String {
    "package.json".into()
}

fn default_generator_manifest() -> String {
    "node_modules/@11ty/eleventy/package.json".into()
}

fn default_passthrough() -> Vec<PassthroughCopy> {
    vec![
        PassthroughCopy::new("src/assets/css", "assets/css"),
        PassthroughCopy::new("src/favicon.png", "favicon.png"),
        PassthroughCopy::new("src/og-image.png", "og-image.png"),
    ]
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site: SiteSettings::default(),
            directories: Directories::default(),
            templates: TemplateEngines::default(),
            project_manifest: default_project_manifest(),
            generator_manifest: default_generator_manifest(),
            vcs: VcsSettings::default(),
            passthrough: default_passthrough(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from `almanac.yml` in the working directory (if present)
    /// and environment variables.
    pub fn load() -> Self {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from `config_path` (if present) and environment variables.
    /// Falls back to the compiled-in defaults when parsing fails.
    pub fn load_from(config_path: &Path) -> Self {
        let mut builder = SiteConfig::builder();

        if config_path.exists() {
            builder.override_with(YamlFileSource::new(config_path));
        }

        builder.override_with(EnvSource::new());

        match builder.try_build() {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!(
                    "Failed to load {} or env overrides: {err}. Using defaults.",
                    config_path.display()
                );
                SiteConfig::default()
            }
        }
    }

    pub fn repository_root(&self) -> PathBuf {
        PathBuf::from(&self.vcs.repository_root)
    }

    pub fn project_manifest_path(&self) -> PathBuf {
        self.repository_root().join(&self.project_manifest)
    }

    pub fn generator_manifest_path(&self) -> PathBuf {
        let manifest = self.project_manifest_path();
        let base = manifest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.repository_root());
        base.join(&self.generator_manifest)
    }

    pub fn input_dir(&self) -> PathBuf {
        self.repository_root().join(&self.directories.input)
    }

    pub fn includes_dir(&self) -> PathBuf {
        self.input_dir().join(&self.directories.includes)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.repository_root().join(&self.directories.output)
    }

    /// Where the collected site data is written under the output directory.
    pub fn output_data_dir(&self) -> PathBuf {
        self.output_dir().join(&self.directories.data)
    }
}

mod yaml {
    use std::error::Error;
    use std::path::PathBuf;

    use confik::Source;
    use serde::de::DeserializeOwned;
    use serde_yaml;

    #[derive(Debug)]
    pub struct YamlFileSource {
        path: PathBuf,
    }

    impl YamlFileSource {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }
    }

    impl<T> Source<T> for YamlFileSource
    where
        T: DeserializeOwned + confik::ConfigurationBuilder,
    {
        fn allows_secrets(&self) -> bool {
            false
        }

        fn provide(&self) -> Result<T, Box<dyn Error + Sync + Send>> {
            let contents = std::fs::read_to_string(&self.path)?;
            let parsed = serde_yaml::from_str(&contents)?;
            Ok(parsed)
        }
    }
}
