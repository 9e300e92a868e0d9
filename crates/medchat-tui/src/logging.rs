use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use env_logger::{Env, Target};

/// Send log output to a file; stderr belongs to the terminal UI.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init() -> Result<PathBuf> {
    let log_path = log_path()?;
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .try_init()?;

    Ok(log_path)
}

fn log_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| anyhow!("Could not determine data directory"))?;
    Ok(data_dir.join("medchat").join("medchat.log"))
}
