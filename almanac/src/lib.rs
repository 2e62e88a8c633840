pub mod almanac;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::almanac::config::SiteConfig;
use crate::almanac::passthrough;
use crate::almanac::{Git, SiteData, build_handlebars};

/// Collect build metadata, apply passthrough copies and write the site data
/// files into the output directory.
pub fn run(config_path: Option<&Path>) -> Result<SiteData> {
    let config = match config_path {
        Some(path) => SiteConfig::load_from(path),
        None => SiteConfig::load(),
    };
    let root = config.repository_root();
    info!("Collecting build metadata in {}", root.display());

    let git = Git::from_settings(&config.vcs);
    let site = SiteData::collect(&config, &git)?;

    // Fail early on a broken include rather than halfway through rendering.
    let registry = build_handlebars(&config)?;
    info!("{} includes registered", registry.get_templates().len());

    let output = config.output_dir();
    let copied = passthrough::copy_all(&config.passthrough, &root, &output)?;
    info!("Copied {copied} passthrough files to {}", output.display());

    write_site_data(&config, &site)?;
    Ok(site)
}

fn write_site_data(config: &SiteConfig, site: &SiteData) -> Result<()> {
    let data_dir = config.output_data_dir();
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir at {}", data_dir.display()))?;

    for (name, json) in [
        ("build.json", serde_json::to_string_pretty(&site.build)?),
        ("contributors.json", serde_json::to_string_pretty(&site.contributors)?),
    ] {
        let path = data_dir.join(name);
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
