//! Streamline ETL - daily Spotify catalog pipeline with a dashboard API
//!
//! Extract -> Transform -> Validate -> Load, with each stage invokable on
//! its own so an external scheduler can sequence and retry them. The
//! bundled `run` subcommand is a thin sequencer with one retry per stage.

#![allow(dead_code)]

mod api;
mod config;
mod db;
mod models;
mod pipeline;
mod serializers;
mod spotify;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Settings;
use crate::db::Warehouse;
use crate::pipeline::{run_validation, ArtifactStore, Extractor, Loader, Transformer, ValidationReport};
use crate::spotify::SpotifyClient;

/// Delay before the single retry of a failed stage
const STAGE_RETRY_DELAY: Duration = Duration::from_secs(300);

/// Streamline ETL - Spotify catalog warehouse pipeline
#[derive(Parser, Debug)]
#[command(name = "streamline-etl")]
#[command(version = "0.3.0")]
#[command(about = "Extract, clean, validate and load Spotify catalog metadata")]
struct Args {
    /// Path to the settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch catalog metadata and write the raw artifacts
    Extract,
    /// Clean the raw artifacts and write the cleaned artifacts
    Transform,
    /// Run the data quality checks over the cleaned artifacts
    Validate,
    /// Load the cleaned artifacts into the warehouse
    Load,
    /// Run the whole pipeline in order with one retry per stage
    Run,
    /// Serve the read-only dashboard API
    Serve {
        /// Bind address override
        #[arg(long)]
        host: Option<String>,

        /// Port override
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::new(format!("{},sqlx=warn,hyper=warn", log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::load(args.config.as_deref())?;

    match args.command {
        Command::Extract => {
            let client = build_client(&settings)?;
            extract_stage(&settings, &client).await
        }
        Command::Transform => transform_stage(&settings).await,
        Command::Validate => {
            let report = validate_stage(&settings).await?;
            if settings.enforce_validation && report.has_errors() {
                anyhow::bail!("validation produced error-level findings");
            }
            Ok(())
        }
        Command::Load => load_stage(&settings).await,
        Command::Run => run_pipeline(&settings).await,
        Command::Serve { host, port } => {
            let mut settings = settings;
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            serve(&settings).await
        }
    }
}

/// Construct the catalog client. Failure here is the one fatal setup
/// error: it stops a run before any stage executes.
fn build_client(settings: &Settings) -> Result<SpotifyClient> {
    SpotifyClient::new(&settings.client_id, &settings.client_secret)
        .context("Failed to initialize Spotify client")
}

async fn extract_stage(settings: &Settings, client: &SpotifyClient) -> Result<()> {
    let store = ArtifactStore::new(&settings.data_dir)?;
    let extractor = Extractor::new(client).with_delays(
        Duration::from_millis(settings.artist_delay_ms),
        Duration::from_millis(settings.page_delay_ms),
    );
    extractor
        .run(&store, &settings.artist_ids, &settings.playlist_ids)
        .await
}

async fn transform_stage(settings: &Settings) -> Result<()> {
    let store = ArtifactStore::new(&settings.data_dir)?;
    Transformer::new().run(&store)
}

async fn validate_stage(settings: &Settings) -> Result<ValidationReport> {
    let store = ArtifactStore::new(&settings.data_dir)?;
    Ok(run_validation(&store))
}

/// Load step. The warehouse connection is opened once here and closed on
/// every exit path; a connection failure aborts the whole step.
async fn load_stage(settings: &Settings) -> Result<()> {
    let store = ArtifactStore::new(&settings.data_dir)?;
    let warehouse = Warehouse::connect(&settings.warehouse_path)
        .await
        .context("Load step aborted: could not connect to warehouse")?;

    let result = Loader::new(&warehouse, settings.load_mode).run(&store).await;
    warehouse.close().await;
    result
}

/// Sequence the stages once, retrying each failed stage a single time
/// after a fixed delay. A retry re-runs the whole stage from scratch.
async fn run_pipeline(settings: &Settings) -> Result<()> {
    let client = build_client(settings)?;

    with_retry("extract", STAGE_RETRY_DELAY, || extract_stage(settings, &client)).await?;
    with_retry("transform", STAGE_RETRY_DELAY, || transform_stage(settings)).await?;

    let report = validate_stage(settings).await?;
    if settings.enforce_validation && report.has_errors() {
        warn!("Validation gate is enforced and found errors; skipping load");
        return Ok(());
    }

    with_retry("load", STAGE_RETRY_DELAY, || load_stage(settings)).await?;

    info!("Pipeline run complete");
    Ok(())
}

async fn with_retry<F, Fut>(stage: &str, delay: Duration, run: F) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    match run().await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(
                "Stage {} failed: {:#}. Retrying once in {}s",
                stage,
                e,
                delay.as_secs()
            );
            tokio::time::sleep(delay).await;
            run().await
        }
    }
}

async fn serve(settings: &Settings) -> Result<()> {
    use actix_cors::Cors;
    use actix_web::{middleware, web, App, HttpServer};

    use crate::api::streams::ApiState;

    let warehouse = Warehouse::connect(&settings.warehouse_path).await?;
    warehouse.ensure_schema().await?;
    let state = web::Data::new(ApiState { warehouse });

    let addr = format!("{}:{}", settings.host, settings.port);
    info!("Dashboard API listening on http://{}", addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(api::configure)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
