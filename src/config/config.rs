//! Models and functionality to work with the config file.

use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    let path = Path::new("config.toml");
    let config = load_config(path);
    match config {
        Ok(c) => c,
        Err(err) => panic!("{:?}", err),
    }
});

/// Rust representation of the configuration
#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    /// Http server settings
    pub server: Server,
    /// Positioning pipeline settings
    pub positioning: Positioning,
    /// Location-history sink settings
    pub history: History,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    /// Port on which the server listens
    pub http_port: u16,
    /// Number of http workers; 0 means one per CPU
    pub num_http_workers: usize,
    /// application logging level
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Positioning {
    /// positioning mode used when a request does not name one
    pub default_mode: String,
    /// authoritative beacon reference table
    pub beacons_file: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct History {
    /// whether location history is persisted at all
    pub enabled: bool,
    /// NDJSON file the history writer appends to
    pub path: PathBuf,
    /// bound of the writer queue; appends beyond it are dropped
    pub queue_size: usize,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path).context("Failed to read config")?;
    let config = toml::from_str(&data).context("Failed to parse config")?;
    Ok(config)
}
