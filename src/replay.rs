//! Replay of an ordered event stream into a state history
//!
//! Applies each typed event to a `StateHistoryBuilder`, resolving its path
//! and dispatching on the operation. Sequencing errors abort the session;
//! updates of never-opened attributes are skipped when the configuration
//! allows it.

use crate::config::StateConfig;
use crate::event::{Operation, StateEvent};
use crate::state_system::{QueryEngine, Result, StateError, StateHistoryBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Counters collected during a replay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayStats {
    /// Events applied (including ignored updates)
    pub events: u64,
    /// `modify` operations applied
    pub modifications: u64,
    /// `update_ongoing` operations applied
    pub updates: u64,
    /// `update_ongoing` operations skipped for lack of an open interval
    pub ignored_updates: u64,
    /// Attributes in the history
    pub quarks: usize,
    /// Closed intervals in the history
    pub intervals: usize,
    /// Time at which the stream was closed
    pub end_time: Option<u64>,
}

/// Drives a builder from events
#[derive(Debug)]
pub struct Replayer {
    builder: StateHistoryBuilder,
    stats: ReplayStats,
}

impl Default for Replayer {
    fn default() -> Self {
        Self::new(StateConfig::default())
    }
}

impl Replayer {
    pub fn new(config: StateConfig) -> Self {
        Replayer {
            builder: StateHistoryBuilder::with_config(config),
            stats: ReplayStats::default(),
        }
    }

    /// Direct access to the underlying builder
    pub fn builder(&mut self) -> &mut StateHistoryBuilder {
        &mut self.builder
    }

    pub fn query_engine(&self) -> QueryEngine {
        self.builder.query_engine()
    }

    pub fn stats(&self) -> &ReplayStats {
        &self.stats
    }

    /// Apply one event
    pub fn apply(&mut self, event: &StateEvent) -> Result<()> {
        let separator = self.builder.config().path_separator;
        let segments = event.path.segments(separator);
        let quark = self.builder.quark_absolute_and_add(&segments)?;

        match event.op {
            Operation::Modify => {
                self.builder
                    .modify_attribute(event.timestamp, quark, event.value.clone())?;
                self.stats.modifications += 1;
            }
            Operation::UpdateOngoing => {
                let result = self
                    .builder
                    .update_ongoing_state_at(event.timestamp, quark, event.value.clone());
                match result {
                    Ok(()) => self.stats.updates += 1,
                    Err(StateError::NoOngoingInterval { .. })
                        if self.builder.config().ignore_missing_ongoing =>
                    {
                        let path = segments.join(separator.to_string().as_str());
                        warn!(
                            timestamp = event.timestamp,
                            path = %path,
                            "update of attribute without ongoing interval ignored"
                        );
                        self.stats.ignored_updates += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        self.stats.events += 1;
        Ok(())
    }

    /// Apply every event in order, stopping at the first fatal error
    pub fn replay<'a, I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a StateEvent>,
    {
        for event in events {
            self.apply(event)?;
        }
        Ok(())
    }

    /// Close the stream at `end` (default: the latest accepted time) and
    /// hand back a query handle plus final counters
    pub fn finish(mut self, end: Option<u64>) -> Result<(QueryEngine, ReplayStats)> {
        let end_time = end.or(self.builder.latest_time()).unwrap_or(0);
        self.builder.close_stream(end_time)?;

        let query = self.builder.query_engine();
        self.stats.quarks = query.quark_count();
        self.stats.intervals = query.interval_count();
        self.stats.end_time = Some(end_time);
        debug!(
            events = self.stats.events,
            ignored = self.stats.ignored_updates,
            "replay finished"
        );
        Ok((query, self.stats))
    }
}
