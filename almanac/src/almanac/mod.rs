pub mod build_info;
pub mod command;
pub mod config;
pub mod contributors;
pub mod created;
pub mod filters;
pub mod passthrough;
pub mod site;
pub mod types;
pub mod vcs;

pub use config::SiteConfig;
pub use site::{build_handlebars, render};
pub use types::{BuildInfo, ContributorSet, SiteData};
pub use vcs::{Git, StaticHistory, VersionControlQuery};
