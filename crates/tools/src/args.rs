//! Argument extraction shared by the tool handlers.
//!
//! The model produces loosely-typed JSON. These helpers turn it into the
//! values a handler needs, or an `InvalidArguments` error naming the field.

use chrono::NaiveDate;
use serde_json::Value;
use workroom_core::error::ToolError;

/// A required, non-blank string argument.
pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    optional_str(args, key)
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// An optional string argument. Blank strings count as absent.
pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Check `value` against a closed set of allowed values.
pub fn one_of<'a>(value: &'a str, key: &str, allowed: &[&str]) -> Result<&'a str, ToolError> {
    if allowed.contains(&value) {
        Ok(value)
    } else {
        Err(ToolError::InvalidArguments(format!(
            "'{key}' must be one of {}, got '{value}'",
            allowed.join(", ")
        )))
    }
}

/// A list of strings, as JSON values ready for an `In` filter.
/// Missing, null or non-array arguments yield an empty list.
pub fn string_list(value: Option<&Value>) -> Vec<Value> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| Value::String(s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// A positive integer argument with a default and an upper bound.
pub fn limit(args: &Value, key: &str, default: usize, max: usize) -> usize {
    args.get(key)
        .and_then(Value::as_f64)
        .filter(|n| *n >= 1.0)
        .map(|n| n as usize)
        .unwrap_or(default)
        .min(max)
}

/// An inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Parse `{"date_range": {"start": "YYYY-MM-DD", "end": "YYYY-MM-DD"}}`.
    pub fn from_args(args: &Value) -> Result<Self, ToolError> {
        let range = args
            .get("date_range")
            .filter(|v| v.is_object())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'date_range' argument".into()))?;

        let start = parse_date(range, "start")?;
        let end = parse_date(range, "end")?;
        if start > end {
            return Err(ToolError::InvalidArguments(format!(
                "date_range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start_str(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    /// Upper bound for timestamp columns, so rows on the end date are kept.
    pub fn end_of_day_str(&self) -> String {
        format!("{}T23:59:59", self.end_str())
    }
}

fn parse_date(range: &Value, key: &str) -> Result<NaiveDate, ToolError> {
    let raw = range
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing 'date_range.{key}'")))?;
    // Accept full timestamps by reading only the date part.
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| {
        ToolError::InvalidArguments(format!("'date_range.{key}' is not a date: {raw}"))
    })
}

/// Numeric column value. Null, missing and non-numeric values read as zero;
/// numeric strings (e.g. Postgres `numeric`) are parsed.
pub fn number(row: &Value, key: &str) -> f64 {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// String column value, or `"unknown"` when absent.
pub fn text(row: &Value, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Division that yields zero instead of NaN or infinity.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn percent(part: f64, whole: f64) -> f64 {
    ratio(part, whole) * 100.0
}
