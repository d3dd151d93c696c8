//! CSV output format for query results
//!
//! One row per value: `path,start,end,type,value` for intervals and
//! `path,time,type,value` for point and full-state queries.

use crate::state_system::{Interval, StateValue};
use std::collections::BTreeMap;

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Null renders as an empty cell; the type column disambiguates
fn value_field(value: &StateValue) -> String {
    match value {
        StateValue::Null => String::new(),
        other => escape_field(&other.to_string()),
    }
}

/// CSV formatter for range query results
#[derive(Debug, Default)]
pub struct CsvIntervalOutput {
    rows: Vec<(String, u64, u64, StateValue)>,
}

impl CsvIntervalOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_interval(&mut self, path: &str, interval: &Interval) {
        self.rows.push((
            path.to_string(),
            interval.start,
            interval.end,
            interval.value.clone(),
        ));
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::from("path,start,end,type,value\n");
        for (path, start, end, value) in &self.rows {
            output.push_str(&format!(
                "{},{},{},{},{}\n",
                escape_field(path),
                start,
                end,
                value.type_name(),
                value_field(value)
            ));
        }
        output
    }
}

/// CSV formatter for point values at a single time
#[derive(Debug, Default)]
pub struct CsvStateOutput {
    time: u64,
    rows: Vec<(String, StateValue)>,
}

impl CsvStateOutput {
    pub fn new(time: u64) -> Self {
        Self {
            time,
            rows: Vec::new(),
        }
    }

    pub fn add_value(&mut self, path: &str, value: StateValue) {
        self.rows.push((path.to_string(), value));
    }

    pub fn from_state(time: u64, state: BTreeMap<String, StateValue>) -> Self {
        Self {
            time,
            rows: state.into_iter().collect(),
        }
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::from("path,time,type,value\n");
        for (path, value) in &self.rows {
            output.push_str(&format!(
                "{},{},{},{}\n",
                escape_field(path),
                self.time,
                value.type_name(),
                value_field(value)
            ));
        }
        output
    }
}
