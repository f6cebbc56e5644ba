//! cache-miner - Unkeyed Header Miner
//!
//! Probes HTTP endpoints for request headers that are reflected in the
//! response but left out of the cache key, the precondition for web cache
//! poisoning.

mod app;
mod error;
mod http;
mod import;
mod miner;
mod reporting;

pub use error::*;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::Config;
use crate::http::{HttpClient, Request};
use crate::miner::{ChannelSink, FindingStore, Miner, MinerConfig, MarkerStyle, StopHandle};
use crate::reporting::{MiningReport, ReportFormat, ReportMetadata};

/// Unkeyed header cache poisoning miner
#[derive(Parser, Debug)]
#[command(name = "cache-miner")]
#[command(author, version, about = "Find unkeyed headers reflected by cached endpoints", long_about = None)]
struct Cli {
    /// Target URLs to mine
    targets: Vec<String>,

    /// File with one target URL per line
    #[arg(long, env = "CACHE_MINER_TARGETS_FILE")]
    targets_file: Option<String>,

    /// Base request file (raw HTTP, cURL command or HAR archive)
    #[arg(short = 'r', long)]
    request_file: Option<String>,

    /// Scheme for raw requests, which carry none of their own
    #[arg(long, default_value = "https")]
    scheme: String,

    /// File containing a cURL command
    #[arg(long)]
    curl_file: Option<String>,

    /// HTTP method for target URLs
    #[arg(short = 'X', long = "method")]
    method: Option<String>,

    /// Extra header for target URLs ("Name: value"), repeatable
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body for target URLs
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Probe only these headers (comma-separated)
    #[arg(long, value_delimiter = ',')]
    only: Vec<String>,

    /// File with additional candidate headers, one per line
    #[arg(long)]
    headers_file: Option<String>,

    /// Maximum probes in flight per target
    #[arg(short = 'c', long, env = "CACHE_MINER_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Per-probe timeout in seconds
    #[arg(short = 't', long, env = "CACHE_MINER_TIMEOUT")]
    timeout: Option<u64>,

    /// Use a 5-digit marker suffix instead of 12 digits
    #[arg(long)]
    compact_marker: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Configuration file path
    #[arg(long, env = "CACHE_MINER_CONFIG")]
    config: Option<String>,

    /// Generate default configuration and exit
    #[arg(long)]
    generate_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "CACHE_MINER_LOG_LEVEL")]
    log_level: String,

    /// Log file path (enables file logging)
    #[arg(long, env = "CACHE_MINER_LOG_FILE")]
    log_file: Option<String>,

    /// Enable JSON structured logging
    #[arg(long, env = "CACHE_MINER_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle special commands first
    if cli.generate_config {
        return generate_default_config();
    }

    init_logging(&cli)?;

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Starting cache-miner");

    let config = load_config(&cli)?;

    if cli.validate_config {
        tracing::info!("Configuration is valid");
        return Ok(());
    }

    let bases = collect_base_requests(&cli)?;
    if bases.is_empty() {
        anyhow::bail!("No targets given. Pass URLs, --targets-file, --request-file or --curl-file");
    }

    run_mining(&cli, &config, bases).await
}

/// Initialize the logging system
///
/// Logs go to stderr so stdout carries only the report.
fn init_logging(cli: &Cli) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if let Some(log_path) = &cli.log_file {
        // File-based logging with rotation
        let file_appender = if log_path.contains('/') || log_path.contains('\\') {
            let path = std::path::Path::new(log_path);
            let dir = path.parent().unwrap_or(std::path::Path::new("."));
            let filename = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("cache-miner.log");
            RollingFileAppender::new(Rotation::DAILY, dir, filename)
        } else {
            let log_dir = Config::data_dir()
                .map(|d| d.join("logs"))
                .unwrap_or_else(|_| std::path::PathBuf::from("."));
            std::fs::create_dir_all(&log_dir).ok();
            RollingFileAppender::new(Rotation::DAILY, log_dir, log_path)
        };

        if cli.log_json {
            let file_layer = fmt::layer()
                .json()
                .with_writer(file_appender)
                .with_ansi(false);

            subscriber.with(file_layer).init();
        } else {
            let file_layer = fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false);

            subscriber.with(file_layer).init();
        }
    } else if cli.log_json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

/// Load configuration with CLI overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    if !cli.only.is_empty() {
        config.miner.headers = cli.only.clone();
        config.miner.extra_headers.clear();
    }

    if let Some(path) = &cli.headers_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read headers file {}", path))?;
        config.miner.extra_headers.extend(import::parse_list(&content));
    }

    if let Some(concurrency) = cli.concurrency {
        config.miner.max_concurrent_probes = concurrency;
    }

    if let Some(timeout) = cli.timeout {
        config.http.request_timeout = timeout;
    }

    if cli.compact_marker {
        config.miner.marker_style = MarkerStyle::Compact;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!(MinerError::from(e).user_message()))?;

    Ok(config)
}

/// Generate default configuration file
fn generate_default_config() -> Result<()> {
    let config = Config::default();
    let toml = toml::to_string_pretty(&config).context("Failed to serialize configuration")?;

    println!("{}", toml);
    Ok(())
}

/// Gather base requests from every input source
fn collect_base_requests(cli: &Cli) -> Result<Vec<Request>> {
    let mut urls = cli.targets.clone();
    if let Some(path) = &cli.targets_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read targets file {}", path))?;
        urls.extend(import::parse_list(&content));
    }

    let mut bases = Vec::new();
    for url in &urls {
        let request = import::direct_request(
            url,
            cli.method.as_deref(),
            &cli.headers,
            cli.data.as_deref(),
        )
        .map_err(|e| anyhow::anyhow!(MinerError::from(e).user_message()))?;
        bases.push(request);
    }

    if let Some(path) = &cli.request_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path))?;
        let requests = import::import_auto(&content, &cli.scheme)
            .map_err(|e| anyhow::anyhow!("{}: {}", path, MinerError::from(e).user_message()))?;
        tracing::info!("Imported {} request(s) from {}", requests.len(), path);
        bases.extend(requests);
    }

    if let Some(path) = &cli.curl_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cURL file {}", path))?;
        let request = import::curl::parse_curl(&content)
            .map_err(|e| anyhow::anyhow!("{}: {}", path, MinerError::from(e).user_message()))?;
        bases.push(request);
    }

    Ok(bases)
}

/// Mine every base request and print the report
async fn run_mining(cli: &Cli, config: &Config, bases: Vec<Request>) -> Result<()> {
    let client = HttpClient::new(&config.http)
        .map_err(|e| anyhow::anyhow!(MinerError::from(e).user_message()))?;

    let (sink, mut findings_rx) = ChannelSink::new();
    let store = FindingStore::new();

    let collector = {
        let store = store.clone();
        tokio::spawn(async move {
            while let Some(finding) = findings_rx.recv().await {
                tracing::debug!(
                    header = %finding.header,
                    url = %finding.request.url,
                    "Recorded finding: {}",
                    finding.rationale()
                );
                store.append(finding);
            }
        })
    };

    let miner = Miner::new(MinerConfig::from_config(config), Arc::new(client), Arc::new(sink));
    tracing::info!(
        targets = bases.len(),
        headers = miner.headers().len(),
        "Mining {} target(s) with {} candidate header(s)",
        bases.len(),
        miner.headers().len()
    );

    let stop = miner.stop_handle();
    let signals = tokio::spawn(async move {
        handle_signals(stop).await;
    });

    let targets: Vec<String> = bases.iter().map(|b| b.url.clone()).collect();
    let start_time = Utc::now();
    let results = miner.mine_all(bases).await;
    let end_time = Utc::now();

    // Dropping the last sink closes the channel and ends the collector
    drop(miner);
    signals.abort();
    collector.await.context("Finding collector failed")?;

    let mut runs = Vec::new();
    for (target, result) in targets.iter().zip(results) {
        match result {
            Ok(summary) => runs.push(summary),
            Err(e) => tracing::error!(target = %target, "Skipping {}: {}", target, e.user_message()),
        }
    }

    if runs.is_empty() {
        anyhow::bail!("No mining run could start");
    }

    let metadata = ReportMetadata {
        targets,
        start_time,
        end_time,
        ..ReportMetadata::default()
    };
    let report = MiningReport::new(store.snapshot(), runs, metadata);

    let format = if cli.json { ReportFormat::Json } else { ReportFormat::Text };
    println!("{}", report.render(format)?);

    Ok(())
}

/// Stop mining on SIGINT/SIGTERM
///
/// In-flight probes finish; queued ones are never sent.
async fn handle_signals(stop: StopHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                _ => {
                    tracing::warn!("Failed to register signal handlers");
                    return;
                }
            };

        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, stopping after in-flight probes");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, stopping after in-flight probes");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to register Ctrl+C handler: {}", e);
            return;
        }
        tracing::info!("Received Ctrl+C, stopping after in-flight probes");
    }

    stop.stop();
}
