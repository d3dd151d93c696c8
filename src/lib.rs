//! Estado - time-indexed attribute state history
//!
//! This library turns a chronological stream of attribute changes into a
//! history of `(attribute, [start, end], value)` intervals that can be
//! queried at any point in time, over a time range, or as a full snapshot.
//! It also provides a slot allocator for laying out concurrently-live
//! requests and a replay driver for JSON Lines event files.

pub mod cli;
pub mod config;
pub mod csv_output;
pub mod event;
pub mod json_output;
pub mod output;
pub mod pile;
pub mod replay;
pub mod state_system;
