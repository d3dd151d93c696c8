//! Typed attribute-change events and JSON Lines input
//!
//! Upstream decoders emit one record per attribute change:
//!
//! ```json
//! {"timestamp": 0, "path": "a/status", "op": "modify", "value": {"int": 1}}
//! {"timestamp": 7, "path": ["a", "status"], "op": "update_ongoing", "value": {"int": 4}}
//! {"ts": 10, "path": "a/status", "op": "modify", "value": "null"}
//! ```
//!
//! Field presence is checked here, at parse time; the store only ever sees
//! complete, typed operations.

use crate::state_system::{split_path, StateValue};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// Operation carried by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Close the current interval and start a new one at the event time
    Modify,
    /// Amend the value of the current interval without a new boundary
    UpdateOngoing,
}

/// Attribute path as either a joined string or explicit segments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributePath {
    Segments(Vec<String>),
    Joined(String),
}

impl AttributePath {
    /// Path segments, splitting a joined path on `separator`
    pub fn segments(&self, separator: char) -> Vec<&str> {
        match self {
            AttributePath::Segments(segments) => segments.iter().map(String::as_str).collect(),
            AttributePath::Joined(path) => split_path(path, separator),
        }
    }
}

impl From<&str> for AttributePath {
    fn from(path: &str) -> Self {
        AttributePath::Joined(path.to_string())
    }
}

impl From<Vec<String>> for AttributePath {
    fn from(segments: Vec<String>) -> Self {
        AttributePath::Segments(segments)
    }
}

/// One attribute change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEvent {
    /// Event time in nanoseconds
    #[serde(alias = "ts")]
    pub timestamp: u64,
    pub path: AttributePath,
    pub op: Operation,
    #[serde(default)]
    pub value: StateValue,
}

impl StateEvent {
    pub fn modify(
        timestamp: u64,
        path: impl Into<AttributePath>,
        value: impl Into<StateValue>,
    ) -> Self {
        StateEvent {
            timestamp,
            path: path.into(),
            op: Operation::Modify,
            value: value.into(),
        }
    }

    pub fn update_ongoing(
        timestamp: u64,
        path: impl Into<AttributePath>,
        value: impl Into<StateValue>,
    ) -> Self {
        StateEvent {
            timestamp,
            path: path.into(),
            op: Operation::UpdateOngoing,
            value: value.into(),
        }
    }
}

/// Iterator over events of a JSON Lines stream
///
/// Blank lines and lines starting with `#` are skipped. Parse failures name
/// the offending line.
pub struct EventReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

/// Read events from a JSON Lines source
pub fn read_events<R: BufRead>(reader: R) -> EventReader<R> {
    EventReader {
        lines: reader.lines(),
        line_no: 0,
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<StateEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line_no = self.line_no;

            let line = match line.with_context(|| format!("Failed to read line {}", line_no)) {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            return Some(
                serde_json::from_str(trimmed)
                    .with_context(|| format!("Invalid event on line {}", line_no)),
            );
        }
    }
}
