//! Daily summary aggregation
//!
//! Totals one day's records per group for the end-of-day report. Delivery
//! of the report (email) happens elsewhere; this module only builds the
//! numbers and the plain-text body.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::record::Record;

/// Group name for records without a group field
pub const UNCATEGORIZED: &str = "uncategorized";

/// Which record fields drive the summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    /// Field holding an ISO date or timestamp (`YYYY-MM-DD...`)
    pub date_field: String,
    /// Field holding the numeric amount
    pub amount_field: String,
    /// Field used to group totals
    pub group_field: String,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            date_field: "date".to_string(),
            amount_field: "amount".to_string(),
            group_field: "category".to_string(),
        }
    }
}

/// Total for one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub name: String,
    pub count: usize,
    pub total: f64,
}

/// Aggregated figures for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    /// Groups sorted by name
    pub groups: Vec<GroupTotal>,
    pub total: f64,
    /// Records counted towards the totals
    pub count: usize,
    /// Records on this day whose amount was missing or not numeric
    pub skipped: usize,
}

impl DailySummary {
    /// Aggregate the records dated `date`
    pub fn build(date: NaiveDate, records: &[Record], options: &SummaryOptions) -> Self {
        let day = date.format("%Y-%m-%d").to_string();
        let mut groups: BTreeMap<String, GroupTotal> = BTreeMap::new();
        let mut skipped = 0;

        for record in records {
            let on_day = record
                .get(&options.date_field)
                .as_ref()
                .and_then(Value::as_str)
                .map(|value| value.starts_with(&day))
                .unwrap_or(false);
            if !on_day {
                continue;
            }

            let Some(amount) = record.get(&options.amount_field).as_ref().and_then(amount_of)
            else {
                skipped += 1;
                continue;
            };

            let name = record
                .get(&options.group_field)
                .as_ref()
                .and_then(group_name)
                .unwrap_or_else(|| UNCATEGORIZED.to_string());

            let group = groups.entry(name.clone()).or_insert(GroupTotal {
                name,
                count: 0,
                total: 0.0,
            });
            group.count += 1;
            group.total += amount;
        }

        let groups: Vec<GroupTotal> = groups.into_values().collect();
        Self {
            date,
            total: groups.iter().map(|g| g.total).sum(),
            count: groups.iter().map(|g| g.count).sum(),
            groups,
            skipped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Plain-text report body
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Daily summary for {}", self.date.format("%Y-%m-%d"));
        let _ = writeln!(out);

        if self.groups.is_empty() {
            let _ = writeln!(out, "No entries recorded.");
        } else {
            let width = self
                .groups
                .iter()
                .map(|g| g.name.chars().count())
                .max()
                .unwrap_or(0);
            for group in &self.groups {
                let _ = writeln!(
                    out,
                    "  {:<width$}  {:>4}  {:>12.2}",
                    group.name,
                    group.count,
                    group.total,
                    width = width
                );
            }
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "Total: {:.2} across {} {}",
                self.total,
                self.count,
                plural(self.count, "entry", "entries")
            );
        }

        if self.skipped > 0 {
            let _ = writeln!(
                out,
                "Skipped {} {} without a numeric amount",
                self.skipped,
                plural(self.skipped, "entry", "entries")
            );
        }

        out
    }
}

/// Numbers, or strings holding a number
fn amount_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn group_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}
