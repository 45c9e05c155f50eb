//! Query specifications
//!
//! A `QuerySpec` names a collection and optionally narrows it with
//! conjunctive filters, an ordering and a row limit. Specs are immutable
//! once handed to the sync coordinator.
//!
//! Evaluation applies the clauses in a fixed order: filters, then
//! ordering, then limit. Limiting after ordering is what gives "top N"
//! semantics.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::record::Record;

/// Errors raised when a query spec is malformed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Collection name must not be empty")]
    EmptyCollection,

    #[error("Invalid collection name '{0}': must not contain '/'")]
    InvalidCollection(String),

    #[error("Filter field name must not be empty")]
    EmptyField,

    #[error("Limit must be a positive integer")]
    ZeroLimit,

    #[error("Range filters on multiple fields are not supported: {0}")]
    MultipleRangeFields(String),

    #[error("Ordering by '{order_field}' conflicts with range filter on '{range_field}'; order by the range field first")]
    OrderConflictsWithRange {
        order_field: String,
        range_field: String,
    },

    #[error("Unknown comparison operator '{0}' (expected ==, >, <, >=, <=)")]
    UnknownOperator(String),

    #[error("Invalid filter '{0}': expected \"<field> <op> <value>\"")]
    InvalidFilter(String),

    #[error("Unknown sort direction '{0}' (expected asc or desc)")]
    UnknownDirection(String),
}

/// Comparison operator used by a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "==",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
        }
    }

    /// Whether this operator is a range (inequality) comparison
    pub fn is_range(&self) -> bool {
        !matches!(self, FilterOp::Eq)
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(FilterOp::Eq),
            ">" => Ok(FilterOp::Gt),
            "<" => Ok(FilterOp::Lt),
            ">=" => Ok(FilterOp::Gte),
            "<=" => Ok(FilterOp::Lte),
            other => Err(QueryError::UnknownOperator(other.to_string())),
        }
    }
}

/// A single `(field, operator, value)` predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Check whether a record satisfies this predicate
    ///
    /// Records lacking the field never match. Range comparisons between
    /// values of different JSON types never match.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.get(&self.field) else {
            return false;
        };

        if self.op.is_range() && type_rank(&actual) != type_rank(&self.value) {
            return false;
        }

        let ord = compare_values(&actual, &self.value);
        match self.op {
            FilterOp::Eq => ord == Ordering::Equal,
            FilterOp::Gt => ord == Ordering::Greater,
            FilterOp::Lt => ord == Ordering::Less,
            FilterOp::Gte => ord != Ordering::Less,
            FilterOp::Lte => ord != Ordering::Greater,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

/// Parses `"<field> <op> <value>"`
///
/// The value is read as JSON when it parses as JSON, otherwise it is
/// taken as a plain string (`vendor == Shell`).
impl FromStr for Filter {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || QueryError::InvalidFilter(s.to_string());

        let text = s.trim();
        let (field, rest) = text.split_once(char::is_whitespace).ok_or_else(invalid)?;
        let (op, value) = rest
            .trim_start()
            .split_once(char::is_whitespace)
            .ok_or_else(invalid)?;
        let value = value.trim();
        if value.is_empty() {
            return Err(invalid());
        }

        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        Ok(Filter::new(field, op.parse()?, value))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(QueryError::UnknownDirection(other.to_string())),
        }
    }
}

/// Ordering clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Parses `"field"` or `"field:asc"` / `"field:desc"`
impl FromStr for OrderBy {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once(':') {
            Some((field, dir)) => (field, dir.parse()?),
            None => (s, Direction::Asc),
        };
        Ok(OrderBy::new(field.trim(), direction))
    }
}

/// A logical live query against one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub collection: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub order_by: Option<OrderBy>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl QuerySpec {
    /// Query every record of a collection
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Add a conjunctive filter
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::new(field, op, value));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy::new(field, direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Reject specs the store cannot run
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.collection.trim().is_empty() {
            return Err(QueryError::EmptyCollection);
        }
        if self.collection.contains('/') {
            return Err(QueryError::InvalidCollection(self.collection.clone()));
        }
        if self.filters.iter().any(|f| f.field.trim().is_empty()) {
            return Err(QueryError::EmptyField);
        }
        if matches!(&self.order_by, Some(order) if order.field.trim().is_empty()) {
            return Err(QueryError::EmptyField);
        }
        if self.limit == Some(0) {
            return Err(QueryError::ZeroLimit);
        }

        let range_fields: BTreeSet<&str> = self
            .filters
            .iter()
            .filter(|f| f.op.is_range())
            .map(|f| f.field.as_str())
            .collect();

        if range_fields.len() > 1 {
            let fields: Vec<&str> = range_fields.into_iter().collect();
            return Err(QueryError::MultipleRangeFields(fields.join(", ")));
        }

        if let (Some(range_field), Some(order)) = (range_fields.iter().next(), &self.order_by) {
            if order.field != *range_field {
                return Err(QueryError::OrderConflictsWithRange {
                    order_field: order.field.clone(),
                    range_field: range_field.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Check the filters alone against a record
    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|f| f.matches(record))
    }

    /// Materialize the result set over a collection's records
    pub fn evaluate<I>(&self, records: I) -> Vec<Record>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut results: Vec<Record> = records.into_iter().filter(|r| self.matches(r)).collect();

        match &self.order_by {
            Some(order) => {
                results.retain(|r| r.get(&order.field).is_some());
                results.sort_by(|a, b| {
                    let (av, bv) = (a.get(&order.field), b.get(&order.field));
                    let ord = match (&av, &bv) {
                        (Some(av), Some(bv)) => compare_values(av, bv),
                        _ => Ordering::Equal,
                    };
                    let ord = match order.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    };
                    ord.then_with(|| a.id.cmp(&b.id))
                });
            }
            None => results.sort_by(|a, b| a.id.cmp(&b.id)),
        }

        if let Some(limit) = self.limit {
            results.truncate(limit);
        }

        results
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection)?;
        for filter in &self.filters {
            write!(f, " where {}", filter)?;
        }
        if let Some(order) = &self.order_by {
            let dir = match order.direction {
                Direction::Asc => "asc",
                Direction::Desc => "desc",
            };
            write!(f, " order by {} {}", order.field, dir)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " limit {}", limit)?;
        }
        Ok(())
    }
}

/// Rank of a JSON type in the cross-type ordering
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values
///
/// Values of different types order by type rank
/// (null < bool < number < string < array < object).
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            a.total_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ord = compare_values(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => {
            let mut a: Vec<_> = a.iter().collect();
            let mut b: Vec<_> = b.iter().collect();
            a.sort_by(|x, y| x.0.cmp(y.0));
            b.sort_by(|x, y| x.0.cmp(y.0));
            for ((ak, av), (bk, bv)) in a.iter().zip(b.iter()) {
                let ord = ak.cmp(bk).then_with(|| compare_values(av, bv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, value: Value) -> Record {
        Record::from_value(id, value).unwrap()
    }

    fn expenses() -> Vec<Record> {
        vec![
            record("e1", json!({"date": "2024-03-01", "amount": 120.0, "category": "fuel"})),
            record("e2", json!({"date": "2024-03-02", "amount": 35.5, "category": "supplies"})),
            record("e3", json!({"date": "2024-03-03", "amount": 80, "category": "fuel"})),
            record("e4", json!({"date": "2024-03-04", "amount": 12, "category": "misc"})),
            record("e5", json!({"amount": 500, "category": "fuel"})),
        ]
    }

    #[test]
    fn test_filter_op_round_trip_symbols() {
        for op in ["==", ">", "<", ">=", "<="] {
            let parsed: FilterOp = op.parse().unwrap();
            assert_eq!(parsed.to_string(), op);
        }
        assert!(matches!("!=".parse::<FilterOp>(), Err(QueryError::UnknownOperator(_))));
    }

    #[test]
    fn test_filter_from_str() {
        let filter: Filter = "amount >= 100".parse().unwrap();
        assert_eq!(filter, Filter::new("amount", FilterOp::Gte, 100));

        let filter: Filter = "vendor == Shell Station".parse().unwrap();
        assert_eq!(filter.value, json!("Shell Station"));

        let filter: Filter = "category == \"fuel\"".parse().unwrap();
        assert_eq!(filter.value, json!("fuel"));

        assert!("amount".parse::<Filter>().is_err());
        assert!("amount >=".parse::<Filter>().is_err());
        assert!("amount ~ 3".parse::<Filter>().is_err());
    }

    #[test]
    fn test_order_by_from_str() {
        let order: OrderBy = "date:desc".parse().unwrap();
        assert_eq!(order, OrderBy::new("date", Direction::Desc));

        let order: OrderBy = "amount".parse().unwrap();
        assert_eq!(order.direction, Direction::Asc);

        assert!("date:sideways".parse::<OrderBy>().is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed_specs() {
        let spec = QuerySpec::new("expenses")
            .filter("category", FilterOp::Eq, "fuel")
            .filter("amount", FilterOp::Gt, 10)
            .filter("amount", FilterOp::Lt, 1000)
            .order_by("amount", Direction::Desc)
            .limit(5);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed_specs() {
        assert_eq!(QuerySpec::new("  ").validate(), Err(QueryError::EmptyCollection));
        assert!(matches!(
            QuerySpec::new("a/b").validate(),
            Err(QueryError::InvalidCollection(_))
        ));
        assert_eq!(
            QuerySpec::new("expenses").filter("", FilterOp::Eq, 1).validate(),
            Err(QueryError::EmptyField)
        );
        assert_eq!(QuerySpec::new("expenses").limit(0).validate(), Err(QueryError::ZeroLimit));
        assert!(matches!(
            QuerySpec::new("expenses")
                .filter("amount", FilterOp::Gt, 1)
                .filter("date", FilterOp::Lt, "2024")
                .validate(),
            Err(QueryError::MultipleRangeFields(_))
        ));
        assert!(matches!(
            QuerySpec::new("expenses")
                .filter("amount", FilterOp::Gt, 1)
                .order_by("date", Direction::Asc)
                .validate(),
            Err(QueryError::OrderConflictsWithRange { .. })
        ));
    }

    #[test]
    fn test_evaluate_without_clauses_orders_by_id() {
        let mut records = expenses();
        records.reverse();
        let results = QuerySpec::new("expenses").evaluate(records);
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e2", "e3", "e4", "e5"]);
    }

    #[test]
    fn test_evaluate_filters_conjunctively() {
        let spec = QuerySpec::new("expenses")
            .filter("category", FilterOp::Eq, "fuel")
            .filter("amount", FilterOp::Lte, 120);
        let ids: Vec<_> = spec.evaluate(expenses()).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["e1", "e3"]);
    }

    #[test]
    fn test_evaluate_orders_before_limiting() {
        let spec = QuerySpec::new("expenses")
            .order_by("date", Direction::Desc)
            .limit(2);
        let ids: Vec<_> = spec.evaluate(expenses()).into_iter().map(|r| r.id).collect();
        // e5 has no date and is excluded from an ordered query
        assert_eq!(ids, vec!["e4", "e3"]);
    }

    #[test]
    fn test_numbers_compare_numerically_across_int_and_float() {
        let spec = QuerySpec::new("expenses").filter("amount", FilterOp::Eq, 80.0);
        let ids: Vec<_> = spec.evaluate(expenses()).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["e3"]);
    }

    #[test]
    fn test_range_filter_ignores_other_types() {
        let records = vec![
            record("a", json!({"amount": "100"})),
            record("b", json!({"amount": 100})),
        ];
        let spec = QuerySpec::new("x").filter("amount", FilterOp::Gte, 50);
        let ids: Vec<_> = spec.evaluate(records).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_filter_on_id_field() {
        let spec = QuerySpec::new("expenses").filter("id", FilterOp::Eq, "e2");
        let results = spec.evaluate(expenses());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "e2");
    }

    #[test]
    fn test_cross_type_ordering() {
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(true), &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!(99), &json!("1")), Ordering::Less);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 3])), Ordering::Less);
    }

    #[test]
    fn test_spec_display() {
        let spec = QuerySpec::new("shifts")
            .filter("status", FilterOp::Eq, "open")
            .order_by("start", Direction::Desc)
            .limit(3);
        assert_eq!(
            spec.to_string(),
            "shifts where status == \"open\" order by start desc limit 3"
        );
    }

    #[test]
    fn test_spec_serde_uses_symbols() {
        let spec = QuerySpec::new("expenses")
            .filter("amount", FilterOp::Gte, 10)
            .order_by("amount", Direction::Desc);
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["filters"][0]["op"], json!(">="));
        assert_eq!(value["order_by"]["direction"], json!("desc"));

        let parsed: QuerySpec = serde_json::from_value(json!({"collection": "shifts"})).unwrap();
        assert_eq!(parsed, QuerySpec::new("shifts"));
    }
}
