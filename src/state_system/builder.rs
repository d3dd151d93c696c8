//! Single-writer API for building a state history
//!
//! Event handlers resolve attributes with the `quark_*` methods and record
//! changes with `modify_attribute` / `update_ongoing_state`. When the event
//! source is exhausted, `close_stream` closes every open interval and
//! freezes the history.
//!
//! Per-quark state machine:
//!
//! ```text
//! Unset ──modify──▶ Open(v) ──modify──▶ Open(v') ── ... ──close_stream──▶ Closed
//!                    │   ▲
//!                    └───┘ update_ongoing_state (payload only)
//! ```

use super::attribute_tree::Quark;
use super::error::{Result, StateError};
use super::query::QueryEngine;
use super::value::StateValue;
use super::{split_path, History, SharedHistory};
use crate::config::StateConfig;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

/// Write handle of a state history
///
/// # Example
/// ```
/// use estado::state_system::{StateHistoryBuilder, StateValue};
///
/// let mut builder = StateHistoryBuilder::new();
/// let status = builder.quark_absolute_and_add(&["a", "status"])?;
///
/// builder.modify_attribute(0, status, 1)?;
/// builder.modify_attribute(5, status, 2)?;
/// builder.modify_attribute(10, status, StateValue::Null)?;
/// builder.close_stream(12)?;
///
/// let query = builder.query_engine();
/// assert_eq!(query.query_at(status, 7)?, StateValue::Int(2));
/// # Ok::<(), estado::state_system::StateError>(())
/// ```
#[derive(Debug)]
pub struct StateHistoryBuilder {
    history: SharedHistory,
    config: StateConfig,
}

impl Default for StateHistoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHistoryBuilder {
    pub fn new() -> Self {
        Self::with_config(StateConfig::default())
    }

    pub fn with_config(config: StateConfig) -> Self {
        let history = History::with_capacity(config.quark_capacity);
        StateHistoryBuilder {
            history: Arc::new(RwLock::new(history)),
            config,
        }
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    /// Read handle sharing this builder's history
    pub fn query_engine(&self) -> QueryEngine {
        QueryEngine::new(Arc::clone(&self.history), self.config.path_separator)
    }

    /// Latest accepted write time
    pub fn latest_time(&self) -> Option<u64> {
        self.history.read().latest_time
    }

    pub fn is_closed(&self) -> bool {
        self.history.read().closed
    }

    pub fn quark_count(&self) -> usize {
        self.history.read().tree.len()
    }

    /// Resolve (creating if needed) the child `name` of `parent`, or a
    /// top-level attribute when `parent` is `None`
    pub fn quark_for(&mut self, parent: Option<Quark>, name: &str) -> Result<Quark> {
        self.resolve(parent, &[name])
    }

    /// Resolve (creating if needed) an absolute path such as
    /// `["host", "1234", "5678", "status"]`
    pub fn quark_absolute_and_add<S: AsRef<str>>(&mut self, path: &[S]) -> Result<Quark> {
        self.resolve(None, path)
    }

    /// Resolve (creating if needed) a path below `parent`
    pub fn quark_relative_and_add<S: AsRef<str>>(
        &mut self,
        parent: Quark,
        path: &[S],
    ) -> Result<Quark> {
        self.resolve(Some(parent), path)
    }

    /// Resolve (creating if needed) a separator-joined absolute path
    pub fn quark_for_str(&mut self, path: &str) -> Result<Quark> {
        let segments = split_path(path, self.config.path_separator);
        self.resolve(None, &segments)
    }

    /// Read-only absolute resolution
    pub fn quark_absolute<S: AsRef<str>>(&self, path: &[S]) -> Result<Quark> {
        self.history
            .read()
            .tree
            .lookup_path(None, path)
            .ok_or_else(|| self.not_found(path))
    }

    /// Read-only resolution below `parent`
    pub fn quark_relative<S: AsRef<str>>(&self, parent: Quark, path: &[S]) -> Result<Quark> {
        self.history
            .read()
            .tree
            .lookup_path(Some(parent), path)
            .ok_or_else(|| self.not_found(path))
    }

    fn not_found<S: AsRef<str>>(&self, path: &[S]) -> StateError {
        let separator = self.config.path_separator.to_string();
        let path: Vec<&str> = path.iter().map(AsRef::as_ref).collect();
        StateError::QuarkNotFound {
            path: path.join(separator.as_str()),
        }
    }

    fn resolve<S: AsRef<str>>(&mut self, parent: Option<Quark>, path: &[S]) -> Result<Quark> {
        let mut history = self.history.write();
        if let Some(quark) = history.tree.lookup_path(parent, path) {
            return Ok(quark);
        }
        if history.closed {
            return Err(StateError::StoreClosed);
        }
        let before = history.tree.len();
        let quark = history.tree.quark_for_path(parent, path)?;
        debug!(
            quark = quark.index(),
            created = history.tree.len() - before,
            "attribute created"
        );
        Ok(quark)
    }

    /// Set `quark` to `value` from `time` on.
    ///
    /// An existing ongoing interval is closed at `time - 1` and a new one
    /// opens at `time`. A second change at the same instant as the ongoing
    /// start replaces its value in place, so no zero-length interval is
    /// produced. `StateValue::Null` clears the attribute but still leaves an
    /// open (null) interval.
    pub fn modify_attribute(
        &mut self,
        time: u64,
        quark: Quark,
        value: impl Into<StateValue>,
    ) -> Result<()> {
        let value = value.into();
        let mut history = self.history.write();
        check_writable(&history, time)?;
        if !history.tree.contains(quark) {
            return Err(StateError::InvalidQuark { quark });
        }

        let ongoing = history
            .intervals
            .ongoing(quark)
            .map(|o| (o.start, o.value.clone()));
        match ongoing {
            Some((start, _)) if start == time => {
                history.intervals.update_ongoing(quark, value)?;
            }
            Some((start, previous)) => {
                let closed = history.intervals.close_interval(quark, time - 1, previous)?;
                trace!(
                    quark = quark.index(),
                    start,
                    end = closed.end,
                    value = %closed.value,
                    "interval closed"
                );
                history.intervals.open_interval(quark, time, value)?;
            }
            None => {
                history.intervals.open_interval(quark, time, value)?;
            }
        }
        advance(&mut history, time);
        Ok(())
    }

    /// Replace the value of the ongoing interval of `quark` without creating
    /// a new interval boundary.
    ///
    /// Fails with the recoverable `NoOngoingInterval` when the attribute was
    /// never opened.
    pub fn update_ongoing_state(&mut self, quark: Quark, value: impl Into<StateValue>) -> Result<()> {
        let mut history = self.history.write();
        if history.closed {
            return Err(StateError::StoreClosed);
        }
        history.intervals.update_ongoing(quark, value.into())?;
        Ok(())
    }

    /// `update_ongoing_state` for an event stamped `time`.
    ///
    /// `time` is held to the same global order as `modify_attribute` and
    /// becomes the latest accepted time once the update is applied. A
    /// rejected update leaves the history and its latest time untouched.
    pub fn update_ongoing_state_at(
        &mut self,
        time: u64,
        quark: Quark,
        value: impl Into<StateValue>,
    ) -> Result<()> {
        let mut history = self.history.write();
        check_writable(&history, time)?;
        history.intervals.update_ongoing(quark, value.into())?;
        advance(&mut history, time);
        Ok(())
    }

    /// Close every ongoing interval at `end_time` and freeze the history.
    ///
    /// Returns the number of intervals closed.
    pub fn close_stream(&mut self, end_time: u64) -> Result<usize> {
        let mut history = self.history.write();
        check_writable(&history, end_time)?;

        let ongoing = history.intervals.all_ongoing();
        for (quark, state) in &ongoing {
            history
                .intervals
                .close_interval(*quark, end_time, state.value.clone())?;
        }
        advance(&mut history, end_time);
        history.closed = true;
        debug!(
            end_time,
            closed = ongoing.len(),
            intervals = history.intervals.len(),
            "state history closed"
        );
        Ok(ongoing.len())
    }
}

fn check_writable(history: &History, time: u64) -> Result<()> {
    if history.closed {
        return Err(StateError::StoreClosed);
    }
    match history.latest_time {
        Some(latest) if time < latest => Err(StateError::NonMonotonicTime { time, latest }),
        _ => Ok(()),
    }
}

fn advance(history: &mut History, time: u64) {
    history.start_time.get_or_insert(time);
    history.latest_time = Some(time);
}
