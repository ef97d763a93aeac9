use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use shelf_discount::{
    adapters::{
        clock::SystemClock,
        discount::model::KnnDiscountModel,
        http::{router, state::HttpState},
        onnx::detector::OnnxDetector,
    },
    application::services::{decode_image, PredictionService},
    config::AppConfig,
    logging,
};

#[derive(Debug, Parser)]
#[command(name = "shelf-discount", about = "Detect shelf merchandise and price it by time-of-day stock")]
struct Cli {
    /// TOML configuration file; built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `server.bind`.
    #[arg(long)]
    bind: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.log_json);

    let mut cfg = AppConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        cfg.server.bind = bind;
    }

    tracing::info!("loading models");
    let detector = Arc::new(OnnxDetector::load(
        &cfg.detector.model_path,
        &cfg.detector.labels_path,
        cfg.detector.ssd_options(),
    )?);
    let discounts = Arc::new(KnnDiscountModel::load(&cfg.discount.model_path)?);

    let prediction = Arc::new(PredictionService::new(
        detector,
        discounts,
        Arc::new(SystemClock),
        cfg.detector.cleaning_params(),
    ));

    let warmup = match &cfg.detector.warmup_image {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading warm-up image {}", path.display()))?;
            Some(decode_image(&bytes)?)
        }
        None => None,
    };
    prediction.warm_up(warmup).await?;

    let app = router(HttpState { prediction }, cfg.server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind))?;
    tracing::info!("serving predictions on http://{}", cfg.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
