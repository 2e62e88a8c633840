use std::ffi::OsStr;
use std::fs;

use anyhow::{Context, Result};
use handlebars::Handlebars;
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::almanac::build_info::assemble_build_info;
use crate::almanac::config::SiteConfig;
use crate::almanac::contributors::resolve_contributors;
use crate::almanac::filters::register_filters;
use crate::almanac::types::SiteData;
use crate::almanac::vcs::VersionControlQuery;

impl SiteData {
    /// Gather build metadata once, at the start of a build.
    pub fn collect(config: &SiteConfig, vcs: &dyn VersionControlQuery) -> Result<Self> {
        let build = assemble_build_info(config, vcs)?;
        let contributors = resolve_contributors(vcs);
        debug!(
            "{} contributors ({} co-authors)",
            contributors.all.len(),
            contributors.co_authors.len()
        );
        Ok(Self {
            build,
            contributors,
        })
    }
}

/// A registry with the site helpers and every include registered as a partial.
pub fn build_handlebars(config: &SiteConfig) -> Result<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();
    register_filters(&mut handlebars, config);

    let Some(ext) = config.templates.html.extension() else {
        return Ok(handlebars);
    };

    let includes_dir = config.includes_dir();
    for entry in WalkDir::new(&includes_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file() && e.path().extension() == Some(OsStr::new(ext)))
    {
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(&includes_dir) else {
            continue;
        };
        // layouts/base.hbs -> "layouts/base"
        let name = rel.with_extension("").to_string_lossy().replace('\\', "/");
        let source = fs::read_to_string(path)
            .with_context(|| format!("reading include {}", path.display()))?;
        handlebars
            .register_partial(&name, source)
            .with_context(|| format!("registering include {name}"))?;
        debug!("registered include {name}");
    }

    Ok(handlebars)
}

/// Render `template` with the site globals alongside the page's own data.
/// Page keys shadow globals of the same name.
pub fn render<T: Serialize>(
    handlebars: &Handlebars<'_>,
    template: &str,
    site: &SiteData,
    page: &T,
) -> Result<String> {
    let mut context = match serde_json::to_value(site)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Value::Object(page) = serde_json::to_value(page)? {
        context.extend(page);
    }

    handlebars
        .render(template, &Value::Object(context))
        .with_context(|| format!("rendering {template}"))
}
