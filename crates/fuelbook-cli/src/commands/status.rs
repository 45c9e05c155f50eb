//! Status command handler

use std::path::PathBuf;

use anyhow::{Context, Result};

use fuelbook_core::{CacheStats, Config, OfflineCache};

use crate::output::{Output, OutputFormat};

/// Show configuration and offline cache status
pub fn show(config: &Config, config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let cache_path = config.cache_path();
    let stats = if config.offline_cache && cache_path.exists() {
        let cache = OfflineCache::open(&cache_path).context("Failed to open offline cache")?;
        Some(cache.stats()?)
    } else {
        None
    };
    let config_file = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "config_file": config_file,
                    "data_dir": config.data_dir,
                    "offline_cache": {
                        "enabled": config.offline_cache,
                        "path": cache_path,
                        "collections": stats.map(|s| s.collections),
                        "documents": stats.map(|s| s.documents)
                    },
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", stats.unwrap_or_default().documents);
        }
        OutputFormat::Human => {
            println!("Fuelbook Status");
            println!("===============");
            println!();
            println!("Config file: {}", config_file.display());
            println!("Data dir:    {}", config.data_dir.display());
            println!();
            println!("Offline cache:");
            println!(
                "  Status:      {}",
                if config.offline_cache {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!("  Location:    {}", cache_path.display());
            match stats {
                Some(CacheStats {
                    collections,
                    documents,
                }) => {
                    println!("  Collections: {}", collections);
                    println!("  Documents:   {}", documents);
                }
                None if config.offline_cache => println!("  (not created yet)"),
                None => {}
            }
        }
    }

    Ok(())
}
