//! Read-only queries over a state history
//!
//! A `QueryEngine` is a cheap, cloneable handle. Every query takes the read
//! lock once, so it observes a consistent history even while the single
//! writer keeps appending.

use super::attribute_tree::Quark;
use super::error::{Result, StateError};
use super::interval_store::{Interval, OngoingState};
use super::value::StateValue;
use super::{split_path, History, SharedHistory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// Read handle over a state history
#[derive(Debug, Clone)]
pub struct QueryEngine {
    history: SharedHistory,
    separator: char,
}

/// One attribute of an exported history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpAttribute {
    pub quark: Quark,
    pub path: String,
}

/// Flat export of a history: attribute paths plus every closed interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDump {
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub attributes: Vec<DumpAttribute>,
    pub intervals: Vec<Interval>,
}

impl QueryEngine {
    pub(crate) fn new(history: SharedHistory, separator: char) -> Self {
        QueryEngine { history, separator }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// First accepted write time
    pub fn start_time(&self) -> Option<u64> {
        self.history.read().start_time
    }

    /// Latest accepted write time, or the close time once closed
    pub fn current_end_time(&self) -> Option<u64> {
        self.history.read().latest_time
    }

    pub fn is_closed(&self) -> bool {
        self.history.read().closed
    }

    pub fn quark_count(&self) -> usize {
        self.history.read().tree.len()
    }

    /// Total number of closed intervals
    pub fn interval_count(&self) -> usize {
        self.history.read().intervals.len()
    }

    /// Resolve a separator-joined absolute path
    pub fn lookup(&self, path: &str) -> Option<Quark> {
        let segments = split_path(path, self.separator);
        self.history.read().tree.lookup_path(None, &segments)
    }

    fn resolve(&self, history: &History, path: &str) -> Result<Quark> {
        let segments = split_path(path, self.separator);
        history
            .tree
            .lookup_path(None, &segments)
            .ok_or_else(|| StateError::QuarkNotFound {
                path: path.to_string(),
            })
    }

    pub fn path_of(&self, quark: Quark) -> Option<String> {
        self.history.read().tree.path_of(quark, self.separator)
    }

    pub fn segments_of(&self, quark: Quark) -> Vec<String> {
        let history = self.history.read();
        history
            .tree
            .segments_of(quark)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn name_of(&self, quark: Quark) -> Option<String> {
        self.history.read().tree.name_of(quark).map(str::to_string)
    }

    pub fn children_of(&self, quark: Quark) -> Vec<Quark> {
        self.history.read().tree.children_of(quark).to_vec()
    }

    pub fn parent_of(&self, quark: Quark) -> Option<Quark> {
        self.history.read().tree.parent_of(quark)
    }

    pub fn sub_attributes(&self, quark: Quark, recursive: bool) -> Vec<Quark> {
        self.history.read().tree.sub_attributes(quark, recursive)
    }

    /// Quarks matching a path pattern where `*` matches any one segment
    /// (e.g. `*/*/status`)
    pub fn quarks_matching(&self, pattern: &str) -> Vec<Quark> {
        let segments = split_path(pattern, self.separator);
        if segments.is_empty() {
            return Vec::new();
        }
        self.history.read().tree.matching(None, &segments)
    }

    /// Value of `quark` at `time`; `Null` where no interval covers `time`
    pub fn query_at(&self, quark: Quark, time: u64) -> Result<StateValue> {
        let history = self.history.read();
        if !history.tree.contains(quark) {
            return Err(StateError::InvalidQuark { quark });
        }
        Ok(history.intervals.query_at(quark, time))
    }

    /// Value of the attribute at `path` at `time`.
    ///
    /// An unknown path fails with the recoverable `QuarkNotFound`.
    pub fn query_path(&self, path: &str, time: u64) -> Result<StateValue> {
        let history = self.history.read();
        let quark = self.resolve(&history, path)?;
        Ok(history.intervals.query_at(quark, time))
    }

    /// Like `query_path`, treating unknown paths as absent
    pub fn query_path_or_null(&self, path: &str, time: u64) -> StateValue {
        self.query_path(path, time).unwrap_or_default()
    }

    /// Intervals of the attribute at `path` intersecting `[t0, t1]`
    pub fn query_range(&self, path: &str, t0: u64, t1: u64) -> Result<RangeQuery> {
        let quark = {
            let history = self.history.read();
            self.resolve(&history, path)?
        };
        self.query_range_quark(quark, t0, t1)
    }

    /// Intervals of `quark` intersecting `[t0, t1]`.
    ///
    /// The closed part is captured as an index range into the append-only
    /// interval list and read lazily. A still-open interval starting at or
    /// before `t1` is appended with its end reported as the current end
    /// time of the history.
    pub fn query_range_quark(&self, quark: Quark, t0: u64, t1: u64) -> Result<RangeQuery> {
        if t1 < t0 {
            return Err(StateError::InvalidTimeOrder {
                quark,
                start: t0,
                end: t1,
            });
        }
        let history = self.history.read();
        if !history.tree.contains(quark) {
            return Err(StateError::InvalidQuark { quark });
        }

        let closed = history.intervals.range_bounds(quark, t0, t1);
        let ongoing = history
            .intervals
            .ongoing(quark)
            .filter(|o| o.start <= t1)
            .map(|o| Interval {
                quark,
                start: o.start,
                end: history.latest_time.unwrap_or(o.start).max(o.start),
                value: o.value.clone(),
            });

        Ok(RangeQuery {
            history: self.history.clone(),
            quark,
            closed,
            ongoing,
        })
    }

    /// Snapshot of every known attribute at `time`, keyed by path
    pub fn full_state(&self, time: u64) -> BTreeMap<String, StateValue> {
        let history = self.history.read();
        history
            .tree
            .quarks()
            .filter_map(|quark| {
                let path = history.tree.path_of(quark, self.separator)?;
                Some((path, history.intervals.query_at(quark, time)))
            })
            .collect()
    }

    /// Closed intervals of `quark`, sorted by start
    pub fn intervals_of(&self, quark: Quark) -> Vec<Interval> {
        self.history.read().intervals.intervals_of(quark).to_vec()
    }

    /// Every closed interval ordered by `(quark, start)`
    pub fn all_intervals(&self) -> Vec<Interval> {
        self.history.read().intervals.iter().cloned().collect()
    }

    pub fn ongoing_of(&self, quark: Quark) -> Option<OngoingState> {
        self.history.read().intervals.ongoing(quark).cloned()
    }

    /// Every open interval, keyed by quark
    pub fn all_ongoing(&self) -> BTreeMap<Quark, OngoingState> {
        self.history.read().intervals.all_ongoing()
    }

    /// Export attribute paths and closed intervals
    pub fn export(&self) -> StateDump {
        let history = self.history.read();
        let attributes = history
            .tree
            .quarks()
            .filter_map(|quark| {
                history
                    .tree
                    .path_of(quark, self.separator)
                    .map(|path| DumpAttribute { quark, path })
            })
            .collect();
        StateDump {
            start_time: history.start_time,
            end_time: history.latest_time,
            attributes,
            intervals: history.intervals.iter().cloned().collect(),
        }
    }
}

/// Result of a range query
///
/// Finite and restartable: every call to `iter` walks the same intervals
/// from the beginning.
#[derive(Debug, Clone)]
pub struct RangeQuery {
    history: SharedHistory,
    quark: Quark,
    closed: Range<usize>,
    ongoing: Option<Interval>,
}

impl RangeQuery {
    pub fn quark(&self) -> Quark {
        self.quark
    }

    pub fn len(&self) -> usize {
        self.closed.len() + usize::from(self.ongoing.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> RangeIter<'_> {
        RangeIter {
            query: self,
            next: self.closed.start,
            ongoing_done: false,
        }
    }
}

impl<'a> IntoIterator for &'a RangeQuery {
    type Item = Interval;
    type IntoIter = RangeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over a `RangeQuery`
#[derive(Debug)]
pub struct RangeIter<'a> {
    query: &'a RangeQuery,
    next: usize,
    ongoing_done: bool,
}

impl Iterator for RangeIter<'_> {
    type Item = Interval;

    fn next(&mut self) -> Option<Interval> {
        if self.next < self.query.closed.end {
            let idx = self.next;
            self.next += 1;
            let history = self.query.history.read();
            return history
                .intervals
                .intervals_of(self.query.quark)
                .get(idx)
                .cloned();
        }
        if !self.ongoing_done {
            self.ongoing_done = true;
            return self.query.ongoing.clone();
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.query.closed.end.saturating_sub(self.next)
            + usize::from(!self.ongoing_done && self.query.ongoing.is_some());
        (remaining, Some(remaining))
    }
}
