//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde_json::Value;

use fuelbook_core::{DailySummary, Record};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print one result set of a live query
    pub fn print_records(&self, collection: &str, records: &[Record]) {
        match self.format {
            OutputFormat::Human => {
                println!("── {} ({}) ──", collection, records.len());
                if records.is_empty() {
                    println!("No records found.");
                }
                for record in records {
                    println!(
                        "{} | {}",
                        truncate(&record.id, 12),
                        truncate(&format_fields(record), 90)
                    );
                }
                println!();
            }
            OutputFormat::Json => {
                // One line per result set so the stream stays parseable
                println!(
                    "{}",
                    serde_json::json!({"collection": collection, "records": records})
                );
            }
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.id);
                }
            }
        }
    }

    /// Print a listener fault; shown even in quiet mode
    pub fn print_sync_error(&self, message: &str) {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"status": "error", "message": message}));
            }
            OutputFormat::Human | OutputFormat::Quiet => {
                eprintln!("⚠ {}", message);
            }
        }
    }

    /// Print a daily summary
    pub fn print_summary(&self, summary: &DailySummary) {
        match self.format {
            OutputFormat::Human => {
                print!("{}", summary.render_text());
            }
            OutputFormat::Json => match serde_json::to_string_pretty(summary) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("⚠ Failed to serialize summary: {}", e),
            },
            OutputFormat::Quiet => {
                println!("{:.2}", summary.total);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Render a record's fields as `key=value` pairs
fn format_fields(record: &Record) -> String {
    record
        .fields
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{}={}", key, s),
            other => format!("{}={}", key, other),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
