//! Rendering of query results in the selected output format

use crate::cli::OutputFormat;
use crate::csv_output::{CsvIntervalOutput, CsvStateOutput};
use crate::json_output::{JsonOutput, JsonSummary};
use crate::state_system::{Interval, StateValue};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::Write;

/// What the command was asked to print
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Summary,
    Point {
        path: String,
        time: u64,
        value: StateValue,
    },
    Range {
        path: String,
        intervals: Vec<Interval>,
    },
    FullState {
        time: u64,
        state: BTreeMap<String, StateValue>,
    },
}

pub fn render(result: &QueryResult, summary: &JsonSummary, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(result, summary)),
        OutputFormat::Json => render_json(result, summary),
        OutputFormat::Csv => Ok(render_csv(result, summary)),
    }
}

fn render_text(result: &QueryResult, summary: &JsonSummary) -> String {
    let mut out = String::new();
    match result {
        QueryResult::Summary => {
            let bound = |t: Option<u64>| t.map_or_else(|| "-".to_string(), |t| t.to_string());
            let _ = writeln!(out, "events:          {}", summary.events);
            let _ = writeln!(out, "modifications:   {}", summary.modifications);
            let _ = writeln!(out, "updates:         {}", summary.updates);
            let _ = writeln!(out, "ignored updates: {}", summary.ignored_updates);
            let _ = writeln!(out, "attributes:      {}", summary.attributes);
            let _ = writeln!(out, "intervals:       {}", summary.intervals);
            let _ = writeln!(
                out,
                "time range:      [{}, {}]",
                bound(summary.start_time),
                bound(summary.end_time)
            );
        }
        QueryResult::Point { path, time, value } => {
            let _ = writeln!(out, "{} @ {} = {}", path, time, value);
        }
        QueryResult::Range { path, intervals } => {
            for iv in intervals {
                let _ = writeln!(out, "[{}, {}] {} = {}", iv.start, iv.end, path, iv.value);
            }
        }
        QueryResult::FullState { state, .. } => {
            for (path, value) in state {
                let _ = writeln!(out, "{} = {}", path, value);
            }
        }
    }
    out
}

fn render_json(result: &QueryResult, summary: &JsonSummary) -> Result<String> {
    let mut output = JsonOutput::new(summary.clone());
    match result {
        QueryResult::Summary => {}
        QueryResult::Point { path, time, value } => output.set_point(path, *time, value.clone()),
        QueryResult::Range { path, intervals } => output.set_intervals(path, intervals),
        QueryResult::FullState { time, state } => output.set_full_state(*time, state.clone()),
    }
    Ok(output.to_json()? + "\n")
}

fn render_csv(result: &QueryResult, summary: &JsonSummary) -> String {
    match result {
        QueryResult::Summary => {
            let mut out = String::from(
                "events,modifications,updates,ignored_updates,attributes,intervals,start_time,end_time\n",
            );
            let bound = |t: Option<u64>| t.map(|t| t.to_string()).unwrap_or_default();
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{}",
                summary.events,
                summary.modifications,
                summary.updates,
                summary.ignored_updates,
                summary.attributes,
                summary.intervals,
                bound(summary.start_time),
                bound(summary.end_time)
            );
            out
        }
        QueryResult::Point { path, time, value } => {
            let mut csv = CsvStateOutput::new(*time);
            csv.add_value(path, value.clone());
            csv.to_csv()
        }
        QueryResult::Range { path, intervals } => {
            let mut csv = CsvIntervalOutput::new();
            for iv in intervals {
                csv.add_interval(path, iv);
            }
            csv.to_csv()
        }
        QueryResult::FullState { time, state } => {
            CsvStateOutput::from_state(*time, state.clone()).to_csv()
        }
    }
}
