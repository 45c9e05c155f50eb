//! Watch command handler
//!
//! Seeds an in-process backend from a JSON file, starts one live query on
//! it, and prints every result set the query produces. In follow mode the
//! seed file is polled and reloaded until Ctrl-C.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use fuelbook_core::{
    Config, Filter, MemoryStore, QuerySpec, SyncCoordinator, SyncSettings, SyncUpdate,
};

use super::read_seed;
use crate::output::Output;
use crate::WatchArgs;

/// Shortest accepted poll interval
const MIN_INTERVAL_MS: u64 = 50;

/// Seed file plus the modification time last loaded
struct SeedFile {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl SeedFile {
    fn new(path: PathBuf) -> Self {
        let modified = modified_at(&path);
        Self { path, modified }
    }

    /// Whether the file changed since the last check
    fn changed(&mut self) -> bool {
        let current = modified_at(&self.path);
        if current != self.modified {
            self.modified = current;
            true
        } else {
            false
        }
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Build the query from command-line arguments
pub fn build_query(args: &WatchArgs) -> Result<QuerySpec> {
    let mut query = QuerySpec::new(args.collection.as_str());

    for text in &args.filters {
        let filter: Filter = text
            .parse()
            .with_context(|| format!("Invalid --where '{}'", text))?;
        query.filters.push(filter);
    }

    if let Some(order) = &args.order_by {
        query.order_by = Some(
            order
                .parse()
                .with_context(|| format!("Invalid --order-by '{}'", order))?,
        );
    }

    query.limit = args.limit;
    Ok(query)
}

/// Run a live query
pub async fn run(config: &Config, args: WatchArgs, output: &Output) -> Result<()> {
    let query = build_query(&args)?;

    if args.offline && !config.offline_cache {
        bail!(
            "The offline cache is disabled. Enable it with:\n  \
             fuelbook config set offline_cache true"
        );
    }

    let store = Arc::new(MemoryStore::new());
    let coordinator = SyncCoordinator::new(store.clone(), &SyncSettings::from_config(config));

    let mut seed = None;
    if args.offline {
        store.set_online(false);
        output.message(&format!(
            "Offline: serving '{}' from {}",
            query.collection,
            config.cache_path().display()
        ));
    } else if let Some(path) = args.seed.clone() {
        let written = store.import_json(&read_seed(&path)?)?;
        info!("Seeded {} documents from {:?}", written, path);
        seed = Some(SeedFile::new(path));
    }

    let collection = query.collection.clone();
    let (id, mut rx) = coordinator
        .start_stream(query)
        .context("Failed to start sync")?;

    store.pump();
    drain(&mut rx, &collection, output);

    if args.follow {
        output.message("Watching for changes (Ctrl-C to stop)...");
        let interval = Duration::from_millis(args.interval_ms.max(MIN_INTERVAL_MS));
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    debug!("Interrupted");
                    break;
                }
                _ = ticker.tick() => {
                    if let Some(seed) = seed.as_mut() {
                        if seed.changed() {
                            reload(&store, seed, output);
                        }
                    }
                    store.pump();
                    drain(&mut rx, &collection, output);
                }
            }
        }
    }

    coordinator.stop_sync(&id);
    Ok(())
}

/// Apply the current contents of the seed file
fn reload(store: &MemoryStore, seed: &SeedFile, output: &Output) {
    let result = read_seed(&seed.path).and_then(|value| Ok(store.replace_json(&value)?));
    match result {
        Ok(written) => debug!("Reloaded seed ({} writes)", written),
        Err(e) => {
            warn!("Failed to reload {:?}: {:#}", seed.path, e);
            output.print_sync_error(&format!("Seed reload failed: {:#}", e));
        }
    }
}

/// Print everything the subscription delivered so far
fn drain(rx: &mut UnboundedReceiver<SyncUpdate>, collection: &str, output: &Output) {
    while let Ok(update) = rx.try_recv() {
        match update {
            SyncUpdate::Snapshot(records) => output.print_records(collection, &records),
            SyncUpdate::Error { notice, detail } => {
                warn!("{}", detail);
                output.print_sync_error(notice);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuelbook_core::{Direction, FilterOp};
    use serde_json::json;
    use tempfile::TempDir;

    fn args(collection: &str) -> WatchArgs {
        WatchArgs {
            collection: collection.to_string(),
            seed: None,
            filters: Vec::new(),
            order_by: None,
            limit: None,
            follow: false,
            interval_ms: 1000,
            offline: false,
        }
    }

    #[test]
    fn test_build_query() {
        let mut watch = args("expenses");
        watch.filters = vec!["amount >= 20".to_string(), "vendor == Shell".to_string()];
        watch.order_by = Some("amount:desc".to_string());
        watch.limit = Some(5);

        let query = build_query(&watch).unwrap();
        assert_eq!(query.collection, "expenses");
        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[0].op, FilterOp::Gte);
        assert_eq!(query.filters[0].value, json!(20));
        assert_eq!(query.filters[1].value, json!("Shell"));
        assert_eq!(query.order_by.unwrap().direction, Direction::Desc);
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn test_build_query_rejects_bad_filter() {
        let mut watch = args("expenses");
        watch.filters = vec!["amount ~ 20".to_string()];

        let err = build_query(&watch).unwrap_err();
        assert!(err.to_string().contains("Invalid --where"));
    }

    #[test]
    fn test_build_query_rejects_bad_direction() {
        let mut watch = args("expenses");
        watch.order_by = Some("date:sideways".to_string());
        assert!(build_query(&watch).is_err());
    }

    #[test]
    fn test_seed_change_detection() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("seed.json");
        std::fs::write(&path, "{}").unwrap();

        let mut seed = SeedFile::new(path.clone());
        assert!(!seed.changed());

        std::fs::remove_file(&path).unwrap();
        assert!(seed.changed());
        assert!(!seed.changed());
    }

    #[test]
    fn test_reload_replaces_documents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("seed.json");
        std::fs::write(&path, json!({"shifts": [{"id": "s1"}, {"id": "s2"}]}).to_string())
            .unwrap();

        let store = MemoryStore::new();
        store.import_json(&read_seed(&path).unwrap()).unwrap();

        std::fs::write(&path, json!({"shifts": [{"id": "s2"}]}).to_string()).unwrap();
        let seed = SeedFile::new(path);
        reload(&store, &seed, &Output::new(crate::output::OutputFormat::Quiet));

        let ids: Vec<_> = store.records("shifts").into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["s2"]);
    }
}
