use anyhow::Result;
use reqwest::Client;
use std::{env, path::PathBuf, process::exit};
use tabload::{pipeline, Config};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) args: [CONFIG] [DATASET...] ──────────────────────────────
    let mut args = env::args().skip(1);
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("datasets.yaml"));
    let only: Vec<String> = args.collect();

    let config = Config::from_path(&config_path)?;
    info!(
        config = %config_path.display(),
        datasets = config.datasets.len(),
        "configuration loaded"
    );

    // ─── 3) run datasets one after another ───────────────────────────
    let client = Client::new();
    let results = pipeline::run_all(&client, &config, &only).await;

    // ─── 4) summary + exit status ────────────────────────────────────
    let failed: Vec<&str> = results
        .iter()
        .filter(|(_, r)| r.is_err())
        .map(|(name, _)| name.as_str())
        .collect();
    if !failed.is_empty() {
        error!(failed = ?failed, "{} of {} datasets failed", failed.len(), results.len());
        exit(1);
    }

    info!(datasets = results.len(), "all done");
    Ok(())
}
