//! Fuelbook CLI
//!
//! Command-line front end for Fuelbook: watch live queries over a seeded
//! backend, print the daily summary, and manage configuration.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use fuelbook_core::Config;

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "fuelbook")]
#[command(about = "Fuelbook - live data sync for fuel station back offices")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log sync activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live query and print every result set it produces
    Watch(WatchArgs),
    /// Print the daily summary for a collection
    Summary(SummaryArgs),
    /// Show configuration and offline cache status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Args)]
pub struct WatchArgs {
    /// Collection to query
    pub collection: String,

    /// JSON seed file loaded into the backend (`{"<collection>": [..]}`)
    #[arg(
        short,
        long,
        value_name = "FILE",
        required_unless_present = "offline",
        conflicts_with = "offline"
    )]
    pub seed: Option<PathBuf>,

    /// Filter as "<field> <op> <value>", e.g. "amount >= 20" (repeatable)
    #[arg(short = 'w', long = "where", value_name = "FILTER")]
    pub filters: Vec<String>,

    /// Order by a field, e.g. "date:desc"
    #[arg(short, long, value_name = "FIELD[:DIR]")]
    pub order_by: Option<String>,

    /// Maximum number of records
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Keep running and reload the seed file when it changes
    #[arg(short, long)]
    pub follow: bool,

    /// How often to check the seed file in follow mode
    #[arg(long, default_value_t = 1000, value_name = "MS")]
    pub interval_ms: u64,

    /// Serve the query from the offline cache only
    #[arg(long, conflicts_with = "follow")]
    pub offline: bool,
}

#[derive(Args)]
pub struct SummaryArgs {
    /// JSON seed file loaded into the backend
    #[arg(short, long, value_name = "FILE")]
    pub seed: PathBuf,

    /// Collection to summarize
    #[arg(short, long, default_value = "expenses")]
    pub collection: String,

    /// Day to summarize (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Field holding the record date
    #[arg(long, default_value = "date")]
    pub date_field: String,

    /// Field holding the amount
    #[arg(long, default_value = "amount")]
    pub amount_field: String,

    /// Field to group totals by
    #[arg(long, default_value = "category")]
    pub group_field: String,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, offline_cache, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands must work even with a broken data directory
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config, cli.verbose, cli.quiet);
    debug!("Loaded configuration: {:?}", config);

    match cli.command {
        Commands::Watch(args) => commands::watch::run(&config, args, &output).await,
        Commands::Summary(args) => commands::summary::run(&config, args, &output),
        Commands::Status => commands::status::show(&config, config_path, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Logs go to the configured log file, or stderr otherwise. `FUELBOOK_LOG`
/// replaces the level filter entirely when set.
fn init_logging(config: &Config, verbose: bool, quiet: bool) {
    let log_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_env("FUELBOOK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fuelbook_core={},fuelbook_cli={}",
            log_level, log_level
        ))
    });

    match &config.log_file {
        Some(log_path) => {
            let log_file = match File::options().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };

            // Ignore error if already initialized
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
