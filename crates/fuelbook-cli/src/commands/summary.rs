//! Summary command handler

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use tracing::warn;

use fuelbook_core::{
    Config, DailySummary, MemoryStore, QuerySpec, Record, SummaryOptions, SyncCoordinator,
    SyncSettings, SyncUpdate,
};

use super::read_seed;
use crate::output::Output;
use crate::SummaryArgs;

/// Print the daily summary of a seeded collection
pub fn run(config: &Config, args: SummaryArgs, output: &Output) -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.import_json(&read_seed(&args.seed)?)?;

    let coordinator = SyncCoordinator::new(store.clone(), &SyncSettings::from_config(config));
    let records = fetch_once(&coordinator, &store, QuerySpec::new(args.collection.as_str()))?;

    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let options = SummaryOptions {
        date_field: args.date_field,
        amount_field: args.amount_field,
        group_field: args.group_field,
    };

    let summary = DailySummary::build(date, &records, &options);
    output.print_summary(&summary);
    Ok(())
}

/// Take the first result set of a live query and stop it
fn fetch_once(
    coordinator: &SyncCoordinator,
    store: &MemoryStore,
    query: QuerySpec,
) -> Result<Vec<Record>> {
    let (id, mut rx) = coordinator
        .start_stream(query)
        .context("Failed to start sync")?;
    store.pump();
    coordinator.stop_sync(&id);

    match rx.try_recv() {
        Ok(SyncUpdate::Snapshot(records)) => Ok(records),
        Ok(SyncUpdate::Error { notice, detail }) => {
            warn!("{}", detail);
            Err(anyhow!(notice))
        }
        Err(_) => Err(anyhow!("The store produced no result")),
    }
}
