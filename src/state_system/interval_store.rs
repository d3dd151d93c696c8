//! Append-only interval storage
//!
//! Closed intervals are kept per quark in a `Vec` sorted by start time.
//! Because writers never go back in time, every new interval lands at the
//! tail: appends are amortized O(1) and point queries are a binary search.
//! Each quark also tracks at most one ongoing interval `[start, +inf)`.

use super::attribute_tree::Quark;
use super::error::{Result, StateError};
use super::value::StateValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// A closed interval `[start, end]` (both inclusive) during which `quark`
/// held `value`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub quark: Quark,
    pub start: u64,
    pub end: u64,
    pub value: StateValue,
}

impl Interval {
    pub fn contains(&self, time: u64) -> bool {
        self.start <= time && time <= self.end
    }

    /// Whether this interval shares at least one instant with `[t0, t1]`
    pub fn intersects(&self, t0: u64, t1: u64) -> bool {
        self.start <= t1 && self.end >= t0
    }

    /// Length in time units (an instant interval has duration 0)
    pub fn duration(&self) -> u64 {
        self.end - self.start
    }
}

/// The currently open interval of a quark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OngoingState {
    pub start: u64,
    pub value: StateValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntervalStore {
    /// Closed intervals, indexed by quark, sorted by start
    closed: Vec<Vec<Interval>>,
    /// Open interval per quark
    ongoing: Vec<Option<OngoingState>>,
    closed_count: usize,
}

impl IntervalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with room for `quarks` attributes
    pub fn with_capacity(quarks: usize) -> Self {
        IntervalStore {
            closed: Vec::with_capacity(quarks),
            ongoing: Vec::with_capacity(quarks),
            closed_count: 0,
        }
    }

    /// Total number of closed intervals across all quarks
    pub fn len(&self) -> usize {
        self.closed_count
    }

    pub fn is_empty(&self) -> bool {
        self.closed_count == 0
    }

    fn ensure(&mut self, quark: Quark) {
        let needed = quark.index() + 1;
        if self.closed.len() < needed {
            self.closed.resize_with(needed, Vec::new);
            self.ongoing.resize_with(needed, || None);
        }
    }

    /// End time of the last closed interval of `quark`
    pub fn committed_end(&self, quark: Quark) -> Option<u64> {
        self.closed.get(quark.index())?.last().map(|iv| iv.end)
    }

    /// Close the ongoing interval of `quark` at `end`, recording `value`.
    ///
    /// The start comes from the tracked ongoing state. Fails with
    /// `InvalidTimeOrder` when `end` precedes that start or the quark's last
    /// committed end; the ongoing state is left untouched on failure.
    pub fn close_interval(&mut self, quark: Quark, end: u64, value: StateValue) -> Result<Interval> {
        let start = match self.ongoing(quark) {
            Some(ongoing) => ongoing.start,
            None => return Err(StateError::NoOngoingInterval { quark }),
        };
        if end < start {
            return Err(StateError::InvalidTimeOrder { quark, start, end });
        }
        if let Some(committed) = self.committed_end(quark) {
            if end <= committed {
                return Err(StateError::InvalidTimeOrder {
                    quark,
                    start: committed,
                    end,
                });
            }
        }

        let interval = Interval {
            quark,
            start,
            end,
            value,
        };
        let idx = quark.index();
        self.ongoing[idx] = None;
        self.closed[idx].push(interval.clone());
        self.closed_count += 1;
        Ok(interval)
    }

    /// Start a new ongoing interval for `quark`.
    ///
    /// Refuses to overwrite an existing ongoing interval and refuses a start
    /// that would overlap the quark's committed history.
    pub fn open_interval(&mut self, quark: Quark, start: u64, value: StateValue) -> Result<()> {
        if let Some(existing) = self.ongoing(quark) {
            return Err(StateError::OngoingIntervalExists {
                quark,
                start: existing.start,
            });
        }
        if let Some(committed) = self.committed_end(quark) {
            if start <= committed {
                return Err(StateError::InvalidTimeOrder {
                    quark,
                    start: committed,
                    end: start,
                });
            }
        }
        self.ensure(quark);
        self.ongoing[quark.index()] = Some(OngoingState { start, value });
        Ok(())
    }

    /// Replace the payload of the ongoing interval without moving its start.
    /// Returns the previous value.
    pub fn update_ongoing(&mut self, quark: Quark, value: StateValue) -> Result<StateValue> {
        match self.ongoing.get_mut(quark.index()).and_then(Option::as_mut) {
            Some(ongoing) => Ok(std::mem::replace(&mut ongoing.value, value)),
            None => Err(StateError::NoOngoingInterval { quark }),
        }
    }

    pub fn ongoing(&self, quark: Quark) -> Option<&OngoingState> {
        self.ongoing.get(quark.index())?.as_ref()
    }

    /// Every open interval, keyed by quark
    pub fn all_ongoing(&self) -> BTreeMap<Quark, OngoingState> {
        self.ongoing
            .iter()
            .enumerate()
            .filter_map(|(idx, o)| o.clone().map(|o| (Quark::new(idx), o)))
            .collect()
    }

    /// Closed intervals of `quark`, sorted by start
    pub fn intervals_of(&self, quark: Quark) -> &[Interval] {
        self.closed
            .get(quark.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every closed interval ordered by `(quark, start)`
    pub fn iter(&self) -> impl Iterator<Item = &Interval> + '_ {
        self.closed.iter().flatten()
    }

    /// Closed interval of `quark` covering `time`, if any
    pub fn interval_at(&self, quark: Quark, time: u64) -> Option<&Interval> {
        let intervals = self.intervals_of(quark);
        let idx = intervals.partition_point(|iv| iv.start <= time);
        let candidate = intervals.get(idx.checked_sub(1)?)?;
        candidate.contains(time).then_some(candidate)
    }

    /// Value of `quark` at `time`: the covering closed interval, else the
    /// ongoing value once `time` reaches its start, else `Null`
    pub fn query_at(&self, quark: Quark, time: u64) -> StateValue {
        if let Some(ongoing) = self.ongoing(quark) {
            if time >= ongoing.start {
                return ongoing.value.clone();
            }
        }
        self.interval_at(quark, time)
            .map(|iv| iv.value.clone())
            .unwrap_or_default()
    }

    /// Index range of closed intervals of `quark` intersecting `[t0, t1]`
    pub fn range_bounds(&self, quark: Quark, t0: u64, t1: u64) -> Range<usize> {
        let intervals = self.intervals_of(quark);
        // Closed intervals never overlap, so they are sorted by end as well.
        let lo = intervals.partition_point(|iv| iv.end < t0);
        let hi = intervals.partition_point(|iv| iv.start <= t1);
        lo..hi.max(lo)
    }
}
