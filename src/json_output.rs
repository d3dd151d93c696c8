//! JSON output format for replay summaries and query results
//!
//! Values use the same tagged encoding as the event input, so query output
//! can be fed back to tools that read events.

use crate::replay::ReplayStats;
use crate::state_system::{Interval, QueryEngine, StateValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of one attribute at one time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonPoint {
    pub path: String,
    pub time: u64,
    pub value: StateValue,
}

/// One interval of a range query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonInterval {
    pub path: String,
    pub start: u64,
    pub end: u64,
    pub value: StateValue,
}

impl JsonInterval {
    pub fn from_interval(path: &str, interval: &Interval) -> Self {
        JsonInterval {
            path: path.to_string(),
            start: interval.start,
            end: interval.end,
            value: interval.value.clone(),
        }
    }
}

/// Snapshot of every attribute at one time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonFullState {
    pub time: u64,
    pub attributes: BTreeMap<String, StateValue>,
}

/// Replay counters and history bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonSummary {
    pub events: u64,
    pub modifications: u64,
    pub updates: u64,
    pub ignored_updates: u64,
    pub attributes: usize,
    pub intervals: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
}

impl JsonSummary {
    pub fn new(stats: &ReplayStats, query: &QueryEngine) -> Self {
        JsonSummary {
            events: stats.events,
            modifications: stats.modifications,
            updates: stats.updates,
            ignored_updates: stats.ignored_updates,
            attributes: stats.quarks,
            intervals: stats.intervals,
            start_time: query.start_time(),
            end_time: stats.end_time,
        }
    }
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    pub summary: JsonSummary,
    /// Point query result (if --at given)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<JsonPoint>,
    /// Range query result (if --range given)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervals: Option<Vec<JsonInterval>>,
    /// Full-state snapshot (if --full-state given)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_state: Option<JsonFullState>,
}

impl JsonOutput {
    pub fn new(summary: JsonSummary) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "estado-json-v1".to_string(),
            summary,
            point: None,
            intervals: None,
            full_state: None,
        }
    }

    pub fn set_point(&mut self, path: &str, time: u64, value: StateValue) {
        self.point = Some(JsonPoint {
            path: path.to_string(),
            time,
            value,
        });
    }

    /// Record a range query result; an empty range still yields `[]`
    pub fn set_intervals<'a, I>(&mut self, path: &str, intervals: I)
    where
        I: IntoIterator<Item = &'a Interval>,
    {
        self.intervals = Some(
            intervals
                .into_iter()
                .map(|iv| JsonInterval::from_interval(path, iv))
                .collect(),
        );
    }

    pub fn set_full_state(&mut self, time: u64, attributes: BTreeMap<String, StateValue>) {
        self.full_state = Some(JsonFullState { time, attributes });
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
