//! Config command handlers.

use std::path::Path;

use anyhow::{Context, Result};
use gatehouse_core::config::{Config, ConfigKey};

pub fn path(config_path: &Path) {
    println!("{}", config_path.display());
}

pub fn init(config_path: &Path) -> Result<()> {
    Config::init(config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

pub fn set(config_path: &Path, key: ConfigKey, value: &str) -> Result<()> {
    Config::save_value_to(config_path, key, value)
        .with_context(|| format!("set {key} in {}", config_path.display()))?;
    println!("Set {key} in {}", config_path.display());
    Ok(())
}
