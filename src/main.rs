//! CLI entry point for the Nysse transit lookup.
//!
//! Provides one-shot subcommands for arrivals, vehicle positions and stop
//! search, and a `serve` subcommand that answers tool calls over stdio.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nysse_transit::{
    config::{Config, ConfigArgs, FeedMode},
    feed::FeedClient,
    output::{
        arrivals_to_json, render_arrivals, render_error, render_positions, render_stops, to_json,
    },
    query::TransitService,
    reference::{ReferenceLoader, StopDirectory},
    tools::ToolServer,
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "nysse_transit")]
#[command(about = "Next-bus and bus-position lookups for Tampere public transport", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the next arrivals at a stop, by name or stop code
    NextBus {
        #[arg(value_name = "STOP")]
        stop: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show where buses are right now, by vehicle id, route or licence plate
    BusInfo {
        #[arg(value_name = "SEARCH")]
        search: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Search stops by name
    SearchStops {
        #[arg(value_name = "QUERY")]
        query: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Answer tool calls as newline-delimited JSON-RPC on stdin/stdout
    Serve,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();
    let _log_guard = init_logging();

    if let Err(e) = run(cli).await {
        error!(error = ?e, "Fatal error");
        std::process::exit(1);
    }
}

/// Logging setup: colored stderr + JSON rolling log file.
///
/// stdout is left alone because `serve` speaks the tool protocol on it.
fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/nysse_transit.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("nysse_transit.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info"));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}

fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from(cli.config);
    let service = build_service(&config)?;

    match cli.command {
        Commands::NextBus { stop, json } => match service.find_next_bus(&stop).await {
            Ok(results) if json => println!("{}", arrivals_to_json(&results)?),
            Ok(results) => println!("{}", render_arrivals(&stop, &results)),
            Err(e) => eprintln!("{}", render_error(&e)),
        },
        Commands::BusInfo { search, json } => match service.get_bus_information(&search).await {
            Ok(positions) if json => println!("{}", to_json(&positions)?),
            Ok(positions) => println!("{}", render_positions(&search, &positions)),
            Err(e) => eprintln!("{}", render_error(&e)),
        },
        Commands::SearchStops { query, json } => match service.search_stops(&query) {
            Ok(stops) if json => println!("{}", to_json(&stops)?),
            Ok(stops) => println!("{}", render_stops(&query, &stops)),
            Err(e) => eprintln!("{}", render_error(&e)),
        },
        Commands::Serve => {
            let server = ToolServer::new(service);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            server
                .run(stdin, tokio::io::stdout())
                .await
                .context("tool server I/O failed")?;
        }
    }

    Ok(())
}

/// Loads the stop table and validates the trip table, then picks live or
/// simulated mode from the configuration.
#[tracing::instrument(skip(config))]
fn build_service(config: &Config) -> Result<TransitService> {
    let loader = ReferenceLoader::new(&config.stops_path, &config.trips_path);

    let stops = loader.load_stops().context("failed to load stop data")?;
    let trips = loader.load_trips().context("failed to load trip data")?;
    info!(stops = stops.len(), trips = trips.len(), "Reference data loaded");
    let stops = StopDirectory::new(stops);

    let service = match config.feed_mode() {
        FeedMode::Live(credentials) => {
            let client = FeedClient::authenticated(&config.base_url, &credentials, config.timeout)
                .context("failed to build feed client")?;
            info!(base_url = %config.base_url, timeout_secs = config.timeout.as_secs(), "Using live feed");
            TransitService::live(stops, loader, Box::new(client))
        }
        FeedMode::Simulated(reason) => {
            warn!(%reason, "Using simulated arrival data");
            TransitService::simulated(stops, loader, reason)
        }
    };

    Ok(service)
}
