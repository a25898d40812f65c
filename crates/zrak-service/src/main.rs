//! Zrak Service - Background refresher for ARSO air-quality feeds.
//!
//! Run with: `cargo run -p zrak-service`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use time::format_description::well_known::Rfc3339;
use tracing::info;

use zrak_core::{
    ArsoService, ChartRange, FilePayloadStore, FilePremiumStore, HttpFeedSource,
    PremiumAccessStore, list_stations,
};
use zrak_service::{Collector, Config, default_config_path};

/// Zrak Service - Background refresher and diagnostics for ARSO air quality.
#[derive(Parser, Debug)]
#[command(name = "zrak-service")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Shared payload path (overrides config).
    #[arg(long, global = true)]
    payload: Option<PathBuf>,

    /// Refresh interval in seconds (overrides config).
    #[arg(short, long, global = true)]
    interval: Option<u64>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh in the foreground until interrupted (default behavior).
    Run,

    /// Fetch and list all stations with their latest readings.
    Stations,

    /// Show chart points for one station.
    History {
        /// Station code, e.g. E21.
        code: String,

        /// Time range: 24h or 7d.
        #[arg(short, long, default_value = "24h", value_parser = parse_range)]
        range: ChartRange,
    },

    /// Show the last published payload.
    Payload {
        /// Station code to show (defaults to the first station).
        #[arg(short, long)]
        station: Option<String>,
    },

    /// Read or set the premium flag.
    Premium {
        /// Set the flag to unlocked.
        #[arg(long, conflicts_with = "lock")]
        unlock: bool,

        /// Set the flag to locked.
        #[arg(long)]
        lock: bool,
    },

    /// Print the effective configuration.
    Config {
        /// Write the effective configuration to the config path.
        #[arg(long)]
        init: bool,
    },
}

fn parse_range(value: &str) -> Result<ChartRange, String> {
    ChartRange::parse(value).ok_or_else(|| format!("unknown range '{}' (use 24h or 7d)", value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = load_config(&args)?;

    match &args.command {
        Some(Command::Run) | None => run(config).await,
        Some(Command::Stations) => show_stations(&config, args.json).await,
        Some(Command::History { code, range }) => {
            show_history(&config, code, *range, args.json).await
        }
        Some(Command::Payload { station }) => show_payload(&config, station.as_deref(), args.json),
        Some(Command::Premium { unlock, lock }) => premium(&config, *unlock, *lock, args.json),
        Some(Command::Config { init }) => show_config(&config, args.config.clone(), *init),
    }
}

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("zrak_core={}", level).parse()?)
                .add_directive(format!("zrak_service={}", level).parse()?),
        )
        .init();
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let initializing = matches!(args.command, Some(Command::Config { init: true }));
    let mut config = match &args.config {
        Some(path) if initializing && !path.exists() => Config::default(),
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };

    if let Some(payload) = &args.payload {
        config.publish.payload_path = payload.clone();
    }
    if let Some(interval) = args.interval {
        config.collector.refresh_interval = interval;
    }

    config.validate()?;
    Ok(config)
}

fn build_service(config: &Config) -> anyhow::Result<ArsoService> {
    let source = HttpFeedSource::with_timeout(config.feeds.urls(), config.feeds.timeout())
        .context("Failed to create HTTP client")?;
    let sink = FilePayloadStore::new(&config.publish.payload_path);
    Ok(ArsoService::new(Arc::new(source)).with_payload_sink(Arc::new(sink)))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let service = Arc::new(build_service(&config)?);

    info!("Publishing payload to {:?}", config.publish.payload_path);
    let collector = Collector::new(service, config.collector.interval());
    let token = collector.cancellation_token();
    let handle = collector.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");
    token.cancel();
    handle.await?;

    Ok(())
}

async fn show_stations(config: &Config, json: bool) -> anyhow::Result<()> {
    let service = build_service(config)?;
    let snapshot = service.fetch_latest_snapshot(true).await?;
    let items = list_stations(&snapshot);

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    println!("{:<8} {:<28} {:>10} {:<8} Level", "Code", "Name", "Value", "");
    for item in &items {
        let value = item
            .primary_value
            .map(|v| format!("{:.0}", v))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:<28} {:>10} {:<8} {}",
            item.station.code, item.station.name, value, item.primary_label, item.level
        );
    }
    println!(
        "\n{} station(s), fetched {}",
        items.len(),
        snapshot.fetched_at.format(&Rfc3339)?
    );
    Ok(())
}

async fn show_history(
    config: &Config,
    code: &str,
    range: ChartRange,
    json: bool,
) -> anyhow::Result<()> {
    let service = build_service(config)?;
    let points = service.station_history(code, range.duration(), true).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    if points.is_empty() {
        println!("No history for station {}", code);
        return Ok(());
    }
    for point in &points {
        println!("{}  {:>6.1}", point.timestamp.format(&Rfc3339)?, point.value);
    }
    Ok(())
}

fn show_payload(config: &Config, station: Option<&str>, json: bool) -> anyhow::Result<()> {
    let store = FilePayloadStore::new(&config.publish.payload_path);
    let Some(payload) = store.read() else {
        bail!("No payload at {:?}", store.path());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("Generated {}", payload.generated_at.format(&Rfc3339)?);
    let Some(entry) = payload.station_or_first(station) else {
        println!("Payload has no stations");
        return Ok(());
    };
    println!("{} ({}): {}", entry.name, entry.code, entry.level());
    for (label, value) in [
        ("PM2.5", entry.pm25),
        ("PM10", entry.pm10),
        ("NO2", entry.no2),
        ("O3", entry.o3),
        ("SO2", entry.so2),
        ("CO", entry.co),
    ] {
        if let Some(value) = value {
            println!("  {:<6} {:>6.1}", label, value);
        }
    }
    println!(
        "  {} point(s) in 24h chart, {} in 7d chart",
        entry.chart(ChartRange::Last24Hours).len(),
        entry.chart(ChartRange::Last7Days).len()
    );
    Ok(())
}

fn premium(config: &Config, unlock: bool, lock: bool, json: bool) -> anyhow::Result<()> {
    let store = FilePremiumStore::new(&config.publish.premium_path);
    if unlock || lock {
        store.write(unlock)?;
    }

    let unlocked = store.read();
    if json {
        println!("{}", serde_json::json!({ "isPremiumUnlocked": unlocked }));
    } else {
        println!("Premium: {}", if unlocked { "unlocked" } else { "locked" });
    }
    Ok(())
}

fn show_config(config: &Config, path: Option<PathBuf>, init: bool) -> anyhow::Result<()> {
    if init {
        let path = path.unwrap_or_else(default_config_path);
        config.save(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
