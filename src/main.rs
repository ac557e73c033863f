//! Cross-venue arbitrage scanner entry point.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cross_venue_arb::config::Config;
use cross_venue_arb::market::{load_snapshot, VenueClient};
use cross_venue_arb::metrics;
use cross_venue_arb::report::{render_table, write_json};
use cross_venue_arb::utils::shutdown_signal;
use cross_venue_arb::{CycleReport, Pipeline};

/// Kalshi/Polymarket cross-venue arbitrage scanner.
#[derive(Parser, Debug)]
#[command(name = "cross-venue-arb")]
#[command(about = "Match Kalshi and Polymarket contracts and compute no-loss ratio bounds")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch both venues once and print the arbitrage table.
    Scan {
        /// Write records as JSON to this path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Scan repeatedly until Ctrl-C (default).
    Run {
        /// Seconds between scans (overrides SCAN_INTERVAL_SECS).
        #[arg(short, long)]
        interval_secs: Option<u64>,

        /// Write records as JSON to this path after every scan.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze saved venue listings without network access.
    Analyze {
        /// Kalshi listings JSON (array or {"markets": [...]}).
        #[arg(long)]
        kalshi: PathBuf,

        /// Polymarket listings JSON (array or {"markets": [...]}).
        #[arg(long)]
        polymarket: PathBuf,

        /// Write records as JSON to this path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("cross_venue_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Scan { output }) => cmd_scan(output).await,
        Some(Command::Run {
            interval_secs,
            output,
        }) => cmd_run(interval_secs, output).await,
        Some(Command::Analyze {
            kalshi,
            polymarket,
            output,
        }) => cmd_analyze(&kalshi, &polymarket, output),
        None => cmd_run(None, None).await,
    }
}

/// Load and validate configuration, logging the failure.
fn load_config() -> anyhow::Result<Config> {
    info!("Loading configuration...");
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

/// Install the exporter if a port is configured, then describe metrics.
fn start_metrics(config: &Config) -> anyhow::Result<()> {
    if let Some(port) = config.metrics_port {
        metrics::install_prometheus_exporter(port)?;
    }
    metrics::init_metrics();
    Ok(())
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("CROSS-VENUE ARB - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Kalshi API: {}", config.kalshi_api_url);
    println!("  Polymarket Gamma API: {}", config.polymarket_gamma_url);
    println!("  Lookahead: {} days", config.lookahead_days);
    println!("  Page Limit: {} (max {} pages)", config.page_limit, config.max_pages);
    println!("  HTTP Timeout: {}ms", config.http_timeout_ms);
    println!("  Series: {}", config.series_name);
    println!("  Keyword: {}", display_or_off(&config.series_keyword));
    println!("  Kalshi Ticker Filter: {}", display_or_off(&config.kalshi_ticker_filter));
    println!(
        "  Polymarket Question Pattern: {}",
        display_or_off(&config.polymarket_question_pattern)
    );
    println!("  Max Strike Diff: {}", config.max_strike_diff);
    println!("  Multiplier Policy: {}", config.multiplier_policy);
    println!("  Max Skew: {}", config.max_skew);
    println!("  Sanity Ceiling: {}", config.sanity_ceiling);
    println!("  Scan Interval: {}s", config.scan_interval_secs);
    println!(
        "  Output: {}",
        config.output_path.as_deref().unwrap_or("(stdout only)")
    );
    match config.metrics_port {
        Some(port) => println!("  Metrics: http://0.0.0.0:{}/metrics", port),
        None => println!("  Metrics: Disabled"),
    }
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

fn display_or_off(value: &str) -> &str {
    if value.is_empty() {
        "(off)"
    } else {
        value
    }
}

/// Fetch once, analyze and print.
async fn cmd_scan(output: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config()?;
    start_metrics(&config)?;

    let pipeline = Pipeline::new(config.analysis()?);
    let client = VenueClient::new(config.fetch())?;
    let output = output.or_else(|| config.output_path.as_ref().map(PathBuf::from));

    let snapshot = client.fetch_snapshot().await?;
    let report = pipeline.analyze(&snapshot);

    print_report(&config.series_name, &report);
    if let Some(path) = output {
        write_json(&path, &report.records)?;
    }

    Ok(())
}

/// Scan on an interval until shutdown.
async fn cmd_run(interval_secs: Option<u64>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config()?;
    start_metrics(&config)?;

    let pipeline = Pipeline::new(config.analysis()?);
    let client = VenueClient::new(config.fetch())?;
    let output = output.or_else(|| config.output_path.as_ref().map(PathBuf::from));

    let interval = match interval_secs {
        Some(0) => return Err(anyhow::anyhow!("--interval-secs must be greater than zero")),
        Some(secs) => Duration::from_secs(secs),
        None => config.scan_interval(),
    };

    info!("========================================");
    info!("CROSS-VENUE SCANNER STARTED");
    info!("========================================");
    info!("Series: {}", config.series_name);
    info!("Policy: {}", config.multiplier_policy);
    info!("Interval: {}s", interval.as_secs());
    info!("========================================");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut scan_count: u64 = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        scan_count += 1;

        // A failed fetch skips the cycle; the next tick retries.
        let snapshot = match client.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("[Scan #{}] Fetch failed, skipping cycle: {}", scan_count, e);
                continue;
            }
        };

        let report = pipeline.analyze(&snapshot);
        info!(
            "[Scan #{}] {} matched, {} emitted",
            scan_count, report.stats.matched, report.stats.emitted
        );
        print_report(&config.series_name, &report);

        if let Some(path) = &output {
            if let Err(e) = write_json(path, &report.records) {
                error!("Failed to write {}: {}", path.display(), e);
            }
        }
    }

    info!("Stopped after {} scans", scan_count);
    Ok(())
}

/// Analyze saved listings.
fn cmd_analyze(kalshi: &Path, polymarket: &Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config()?;
    metrics::init_metrics();

    let pipeline = Pipeline::new(config.analysis()?);
    let snapshot = load_snapshot(kalshi, polymarket)?;
    let report = pipeline.analyze(&snapshot);

    print_report(&config.series_name, &report);
    if let Some(path) = output.or_else(|| config.output_path.as_ref().map(PathBuf::from)) {
        write_json(&path, &report.records)?;
    }

    Ok(())
}

fn print_report(series: &str, report: &CycleReport) {
    let stats = &report.stats;

    println!("======================================================================");
    println!("{} ARBITRAGE", series.to_uppercase());
    println!("======================================================================");
    println!(
        "Kalshi: {} listed, {} skipped, {} malformed",
        stats.kalshi_total, stats.kalshi_skipped, stats.kalshi_malformed
    );
    println!(
        "Polymarket: {} listed, {} skipped, {} malformed",
        stats.polymarket_total, stats.polymarket_skipped, stats.polymarket_malformed
    );
    println!(
        "Matched: {} (unmatched kalshi {}, polymarket {})",
        stats.matched, stats.unmatched_kalshi, stats.unmatched_polymarket
    );
    println!(
        "Dropped: {} unpriced, {} degenerate, {} over ceiling",
        stats.unpriced, stats.degenerate, stats.over_ceiling
    );
    println!("----------------------------------------------------------------------");
    print!("{}", render_table(&report.records));
    println!("======================================================================");
}
