use std::path::PathBuf;

use env_logger::Env;
use log::info;

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    info!("Reading the almanac...");

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let site = almanac::run(config_path.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&site)?);
    Ok(())
}
