//! `mast config`: show or persist connection settings

use anyhow::Result;
use colored::*;

use crate::config::{Config, config_path};

pub fn handle_config(
    effective: &Config,
    show: bool,
    set_url: Option<String>,
    set_key: Option<String>,
) -> Result<()> {
    let path = config_path()?;
    let changed = set_url.is_some() || set_key.is_some();

    if changed {
        let mut saved = Config::read(&path)?;
        saved.apply_overrides(set_url, set_key);
        saved.save(&path)?;
        println!("{} {}", "Saved".bright_green(), path.display());
    }

    if show || !changed {
        println!("{} {}", "Config file:".bold(), path.display());
        println!("{} {}", "URL:".bold(), effective.url.cyan());
        println!("{} {}", "API key:".bold(), effective.masked_key());
    }

    Ok(())
}
