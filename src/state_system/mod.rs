// Time-indexed attribute state history
//
// Converts a chronological stream of attribute changes into a queryable
// history. Each attribute (quark) holds one value at a time; every change
// closes the previous interval at `T-1` and opens a new one at `T`.
//
// Layout:
// - attribute_tree: path → quark addressing
// - interval_store: per-quark append-only closed intervals + ongoing state
// - builder: single-writer API enforcing global time order
// - query: read-only point, range and full-state queries
//
// One builder owns the write side. Any number of QueryEngine handles can
// read concurrently; each write is applied under a single write lock, so a
// reader sees the store either before or after a close+reopen pair.

mod attribute_tree;
mod builder;
mod error;
mod interval_store;
mod query;
mod value;

pub use attribute_tree::{AttributeTree, Quark, WILDCARD};
pub use builder::StateHistoryBuilder;
pub use error::{Result, StateError};
pub use interval_store::{Interval, IntervalStore, OngoingState};
pub use query::{DumpAttribute, QueryEngine, RangeIter, RangeQuery, StateDump};
pub use value::StateValue;

use parking_lot::RwLock;
use std::sync::Arc;

/// State shared between the writer and its query engines
#[derive(Debug, Default)]
pub(crate) struct History {
    pub(crate) tree: AttributeTree,
    pub(crate) intervals: IntervalStore,
    /// First accepted write time
    pub(crate) start_time: Option<u64>,
    /// Latest accepted write time (the close time once closed)
    pub(crate) latest_time: Option<u64>,
    pub(crate) closed: bool,
}

impl History {
    pub(crate) fn with_capacity(quarks: usize) -> Self {
        History {
            tree: AttributeTree::with_capacity(quarks),
            intervals: IntervalStore::with_capacity(quarks),
            ..History::default()
        }
    }
}

pub(crate) type SharedHistory = Arc<RwLock<History>>;

/// Split a string path on `separator`, ignoring empty segments
pub fn split_path(path: &str, separator: char) -> Vec<&str> {
    path.split(separator).filter(|s| !s.is_empty()).collect()
}
