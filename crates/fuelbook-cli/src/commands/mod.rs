//! Command handlers

pub mod config;
pub mod status;
pub mod summary;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Read a JSON seed file
pub fn read_seed(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse seed file: {:?}", path))
}
