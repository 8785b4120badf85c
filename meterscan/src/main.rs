use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meterscan::api::v1::dto::ValidateMeterResponse;
use meterscan::api::{create_router, AppState};
use meterscan::classifier::{classify_with_policy, HeuristicClassifier};
use meterscan::config::Config;
use meterscan::ocr::{OcrProvider, TextRecognizer};
use meterscan::reading::ReadingPipeline;

#[derive(Parser)]
#[command(name = "meterscan")]
#[command(about = "Extract utility meter readings from photos")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Extract the reading from a single photo and print it as JSON
    Scan {
        /// Path to the meter photo
        path: PathBuf,
        /// Reading to echo back next to the extracted one
        #[arg(long, default_value = "")]
        user_reading: String,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "meterscan=info,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    // stdout is reserved for `scan` output.
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn init_recognizer(config: &Config) -> Arc<dyn TextRecognizer> {
    tracing::info!("Initializing OCR engine ({})...", config.ocr.languages);
    let ocr = OcrProvider::new(&config.ocr);
    if !ocr.is_available() {
        tracing::warn!("OCR unavailable - only the contour fallback can produce readings");
    }
    Arc::new(ocr)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Scan { path, user_reading } => scan(config, path, user_reading).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let recognizer = init_recognizer(&config);
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let app = create_router(AppState::new(config, recognizer));

    tracing::info!("Meterscan starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  Validate:     http://{}/api/v1/validate-meter", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn scan(config: Config, path: PathBuf, user_reading: String) -> anyhow::Result<()> {
    let bytes: Arc<[u8]> = tokio::fs::read(&path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?
        .into();

    let recognizer = init_recognizer(&config);
    let pipeline = ReadingPipeline::new(recognizer, &config);
    let classifier = HeuristicClassifier::new(&config.classifier);

    let (extraction, image_valid) = tokio::join!(
        pipeline.extract(bytes.clone()),
        classify_with_policy(&classifier, bytes, config.classifier.failure_policy),
    );

    let report = ValidateMeterResponse::new(extraction, user_reading, image_valid);
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
