use anyhow::{Context, Result};
use clap::Parser;
use estado::{
    cli::Cli,
    config::StateConfig,
    event::read_events,
    json_output::JsonSummary,
    output::{render, QueryResult},
    replay::Replayer,
    state_system::QueryEngine,
};
use std::fs::{self, File};
use std::io::BufReader;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(args: &Cli) -> Result<StateConfig> {
    let mut config = match &args.config {
        Some(path) => StateConfig::from_toml(path)?,
        None => StateConfig::default(),
    };
    if args.strict {
        config.ignore_missing_ongoing = false;
    }
    Ok(config)
}

/// Answer the query selected on the command line
fn run_query(args: &Cli, query: &QueryEngine) -> Result<QueryResult> {
    let path = args.path.clone().unwrap_or_default();

    if let Some(time) = args.at {
        let value = query.query_path_or_null(&path, time);
        return Ok(QueryResult::Point { path, time, value });
    }

    if let Some((t0, t1)) = args.range_bounds() {
        let intervals = match query.query_range(&path, t0, t1) {
            Ok(range) => range.iter().collect(),
            Err(e) if e.is_recoverable() => {
                warn!(%path, "range query on unknown attribute");
                Vec::new()
            }
            Err(e) => return Err(e).context("Range query failed"),
        };
        return Ok(QueryResult::Range { path, intervals });
    }

    if let Some(time) = args.full_state {
        let state = query.full_state(time);
        return Ok(QueryResult::FullState { time, state });
    }

    Ok(QueryResult::Summary)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = load_config(&args)?;
    let file = File::open(&args.events)
        .with_context(|| format!("Failed to open event file: {}", args.events.display()))?;

    let mut replayer = Replayer::new(config);
    for (index, event) in read_events(BufReader::new(file)).enumerate() {
        let event = event?;
        replayer.apply(&event).with_context(|| {
            format!(
                "Replay aborted at event {} (timestamp {})",
                index + 1,
                event.timestamp
            )
        })?;
    }
    let (query, stats) = replayer
        .finish(args.end)
        .context("Failed to close state history")?;

    if let Some(dump_path) = &args.dump {
        let json = serde_json::to_string_pretty(&query.export())?;
        fs::write(dump_path, json)
            .with_context(|| format!("Failed to write dump: {}", dump_path.display()))?;
    }

    let result = run_query(&args, &query)?;
    let summary = JsonSummary::new(&stats, &query);
    print!("{}", render(&result, &summary, args.format)?);

    Ok(())
}
