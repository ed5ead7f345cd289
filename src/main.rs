//! carefinder binary entrypoint kept minimal. The runtime lives in
//! [`carefinder::app`].

use std::sync::{Arc, OnceLock};
use std::{fmt, time::SystemTime};

use clap::Parser;
use tokio::sync::mpsc;

use carefinder::app::{self, RepoInput};
use carefinder::config;
use carefinder::location::{GeoSource, StaticSource, UnsupportedSource};
use carefinder::state::{CategoryFilter, Coordinate};
use carefinder::storage::DirStorage;
use carefinder::util;

/// Find the nearest appropriate medical facility around a coordinate
#[derive(Parser, Debug)]
#[command(name = "carefinder")]
#[command(version)]
#[command(
    about = "Offline-tolerant nearest-facility discovery around a coordinate",
    long_about = None
)]
struct Args {
    /// Latitude of the search origin (with --lng). Without a coordinate the
    /// run reports the missing-location error path.
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude of the search origin (with --lat)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Search radius in kilometers (preset ladder: 5, 10, 20; anything else
    /// becomes the custom radius)
    #[arg(long)]
    radius_km: Option<u32>,

    /// Category filter: all, emergency, or open
    #[arg(long)]
    category: Option<String>,

    /// Backend base URL (overrides settings.conf)
    #[arg(long)]
    api_base: Option<String>,

    /// Keep running and react to further events instead of exiting at the
    /// first stable state
    #[arg(long)]
    watch: bool,
}

struct LogTimer;

impl tracing_subscriber::fmt::time::FormatTime for LogTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let secs = match SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(_) => 0,
        };
        w.write_str(&util::ts_to_date(Some(secs)))
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

fn init_logging() {
    let mut log_path = config::logs_dir();
    log_path.push("carefinder.log");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_timer(LogTimer)
                .init();
            let _ = LOG_GUARD.set(guard);
            tracing::info!(path = %log_path.display(), "logging initialized");
        }
        Err(e) => {
            // Fallback: stderr logger so startup never blocks on the log file
            let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_timer(LogTimer)
                .init();
            tracing::warn!(error = %e, "failed to open log file; using stderr");
        }
    }
}

#[tokio::main]
async fn main() {
    init_logging();
    let args = Args::parse();

    let mut settings = config::settings();
    if let Some(base) = args.api_base {
        settings.api_base = base;
    }
    if let Some(km) = args.radius_km {
        settings.radius = config::radius_choice_for(km * 1000, &mut settings.custom_radius_m);
    }
    if let Some(cat) = args.category.as_deref() {
        match CategoryFilter::from_config_key(cat) {
            Some(parsed) => settings.category = parsed,
            None => {
                eprintln!("unknown category '{cat}' (expected all, emergency, or open)");
                std::process::exit(2);
            }
        }
    }

    // Free-text geocoding is an external collaborator: the CLI only accepts
    // an already-resolved coordinate.
    let source: Arc<dyn GeoSource> = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => Arc::new(StaticSource::new(Coordinate { lat, lng })),
        _ => Arc::new(UnsupportedSource),
    };

    let cache_storage = Arc::new(DirStorage::new(config::cache_dir()));
    let state_storage = Arc::new(DirStorage::new(config::state_dir()));
    let (_input_tx, input_rx) = mpsc::unbounded_channel::<RepoInput>();

    tracing::info!(watch = args.watch, "carefinder starting");
    match app::run(
        source,
        settings,
        cache_storage,
        state_storage,
        input_rx,
        args.watch,
    )
    .await
    {
        Ok(state) => {
            let text = app::summary(&state);
            if !text.is_empty() {
                println!("{text}");
            }
        }
        Err(err) => {
            tracing::error!(error = ?err, "Application error");
            eprintln!("carefinder failed: {err}");
            std::process::exit(1);
        }
    }
    tracing::info!("carefinder exited");
}
