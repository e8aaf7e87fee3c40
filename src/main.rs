//! CLI entry point for the bike-share sampler.
//!
//! Provides subcommands for taking one station or bike snapshot, sampling
//! both periodically, listing stored summaries, and reading back the
//! station detail of a bucket.

use anyhow::{Context, Result};
use bikeshare_sampler::bucket::BucketKey;
use bikeshare_sampler::config::SamplerConfig;
use bikeshare_sampler::fetch::{BasicClient, ConcurrencyLimit};
use bikeshare_sampler::infra::gobee::{self, GobeeClient};
use bikeshare_sampler::infra::jcdecaux::JcDecauxClient;
use bikeshare_sampler::infra::memory::{DEFAULT_PAGE_SIZE, MemoryStore};
use bikeshare_sampler::infra::s3::S3Store;
use bikeshare_sampler::infra::ssm::resolve_api_key;
use bikeshare_sampler::output::{append_records, print_json, print_pretty};
use bikeshare_sampler::services::snapshot_store::SnapshotStore;
use bikeshare_sampler::services::station_api::StationApi;
use bikeshare_sampler::snapshot::grid::GridCollector;
use bikeshare_sampler::snapshot::runner::Sampler;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bikeshare_sampler")]
#[command(about = "Samples bike-sharing networks into hourly snapshots", long_about = None)]
struct Cli {
    /// Keep snapshots in memory instead of writing them to S3
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take one station snapshot for the current bucket
    Stations,
    /// Take one free-floating bike snapshot for the current bucket
    Bikes,
    /// Take station and bike snapshots periodically
    Sample {
        /// Sample rate: take a snapshot every X seconds
        #[arg(short = 'r', long, default_value_t = 3600)]
        sample_rate: u64,

        /// Number of samples to collect (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        num_samples: usize,
    },
    /// List every stored station summary
    List {
        /// Optional: CSV file to append the summaries to
        #[arg(long)]
        csv: Option<String>,
    },
    /// Show the station detail stored for a bucket
    Show {
        /// Bucket key, e.g. 2017-10-27-10
        #[arg(value_name = "BUCKET")]
        bucket: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/bikeshare_sampler.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bikeshare_sampler.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = SamplerConfig::from_env()?;
    let sampler = build_sampler(&config, cli.dry_run).await?;

    match cli.command {
        Commands::Stations => {
            let bucket = BucketKey::now();
            let snapshot = sampler.run_stations(&bucket).await?;
            print_json(&snapshot.summary)?;
            print_pretty(&snapshot.detail);
        }
        Commands::Bikes => {
            let bucket = BucketKey::now();
            let collection = sampler.run_bikes(&bucket).await?;
            if !collection.failures.is_empty() {
                warn!(
                    failed_tiles = collection.failures.len(),
                    "Some tiles could not be read"
                );
            }
            print_json(&collection.detail)?;
        }
        Commands::Sample {
            sample_rate,
            num_samples,
        } => {
            sample(&sampler, sample_rate, num_samples).await;
        }
        Commands::List { csv } => {
            let summaries = sampler.list_summaries().await?;

            for s in &summaries {
                info!(
                    bucket = %s.bucket_key,
                    total = s.total_stations,
                    open = s.open_stations,
                    bikes = s.total_bikes_available,
                    stands = s.total_stands_available,
                    "Summary"
                );
            }

            if let Some(path) = csv {
                append_records(&path, &summaries)?;
                info!(path = %path, rows = summaries.len(), "Summaries written to CSV");
            }
        }
        Commands::Show { bucket } => {
            let bucket = BucketKey::from(bucket);
            match sampler.station_detail(&bucket).await? {
                Some(detail) => print_json(&detail)?,
                None => warn!(bucket = %bucket, "No station detail stored for bucket"),
            }
        }
    }

    Ok(())
}

/// Builds every collaborator from the configuration.
async fn build_sampler(config: &SamplerConfig, dry_run: bool) -> Result<Sampler> {
    let aws = aws_config::load_from_env().await;

    let store: Arc<dyn SnapshotStore> = if dry_run {
        info!("Dry run, snapshots stay in memory");
        let page_size = usize::try_from(config.store.page_size).unwrap_or(DEFAULT_PAGE_SIZE);
        Arc::new(MemoryStore::with_page_size(page_size))
    } else {
        let bucket = config
            .store
            .bucket
            .as_deref()
            .context("SNAPSHOT_BUCKET must be set unless --dry-run is given")?;
        info!(bucket, gzip = config.store.gzip, "S3 store enabled");
        Arc::new(S3Store::new(
            &aws,
            bucket,
            config.store.page_size,
            config.store.gzip,
        ))
    };

    // One transport, so HTTP_CONCURRENCY caps both providers together
    let http = Arc::new(ConcurrencyLimit::new(
        BasicClient::with_timeout(config.http.timeout)?,
        config.http.concurrency,
    ));

    let jcdecaux = &config.jcdecaux;
    let stations: Arc<dyn StationApi> = match &jcdecaux.api_key {
        Some(source) => {
            let key = resolve_api_key(source, &aws).await?;
            Arc::new(JcDecauxClient::with_api_key(
                http.clone(),
                &jcdecaux.base_url,
                &jcdecaux.contract,
                &key,
            ))
        }
        None => {
            warn!("JCDECAUX_KEY not set, station requests are sent without a key");
            Arc::new(JcDecauxClient::new(
                http.clone(),
                &jcdecaux.base_url,
                &jcdecaux.contract,
            ))
        }
    };

    let bikes = Arc::new(GobeeClient::new(http, &config.gobee.near_bikes_url));

    let grid = GridCollector::new(
        config.gobee.region,
        config.gobee.step,
        &config.gobee.city,
        gobee::PROVIDER,
    );

    Ok(Sampler::new(
        config.tables.clone(),
        store,
        stations,
        bikes,
        grid,
    ))
}

/// Takes both snapshots for a fresh bucket every `sample_rate` seconds.
///
/// A failed snapshot is logged and sampling goes on.
#[tracing::instrument(skip(sampler))]
async fn sample(sampler: &Sampler, sample_rate: u64, num_samples: usize) {
    if num_samples == 0 {
        info!(sample_rate, "Sampling infinitely. Press Ctrl+C to stop.");
    } else {
        info!(num_samples, sample_rate, "Starting sample collection");
    }

    let mut sample_count = 0;

    loop {
        // Check if we've reached the sample limit (0 = infinite)
        if num_samples > 0 && sample_count >= num_samples {
            break;
        }

        sample_count += 1;

        // One key for every record of this round
        let bucket = BucketKey::now();
        let round = tracing::info_span!("sample_round", sample = sample_count, bucket = %bucket);

        let report = sampler.run_round(&bucket).instrument(round).await;

        if let Err(e) = report.stations {
            error!(sample = sample_count, error = %e, "Station snapshot failed");
        }
        match report.bikes {
            Ok(collection) if !collection.failures.is_empty() => {
                warn!(
                    sample = sample_count,
                    failed_tiles = collection.failures.len(),
                    "Bike snapshot stored with missing tiles"
                );
            }
            Ok(_) => {}
            Err(e) => error!(sample = sample_count, error = %e, "Bike snapshot failed"),
        }

        // If not the last sample, wait before next iteration
        if num_samples == 0 || sample_count < num_samples {
            info!(sample_rate, "Waiting before next sample");
            tokio::time::sleep(Duration::from_secs(sample_rate)).await;
        }
    }

    info!(sample_count, "Finished sampling");
}
