use anyhow::{Context, Result};
use article_image_set_mapper::config;
use article_image_set_mapper::http::{self, AppState};
use article_image_set_mapper::mapper::ImageSetMapper;
use article_image_set_mapper::queue::{ProxyConsumer, ProxyHealth, ProxyProducer};
use article_image_set_mapper::relay::{self, Relay};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let mapper = ImageSetMapper::new();
    let consumer = ProxyConsumer::from_config(&cfg.queue)?;
    let producer = ProxyProducer::from_config(&cfg.queue)?;
    let health = ProxyHealth::from_config(&cfg.queue)?;

    // Spawn relay consumer loop
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay = Relay::new(mapper, Arc::new(producer));
    let poll_interval = cfg.queue.poll_interval();
    let backoff = cfg.queue.backoff();
    let worker = tokio::spawn(async move {
        if let Err(err) = relay::run(&consumer, &relay, poll_interval, backoff, shutdown_rx).await {
            error!(?err, "relay consumer loop error");
        }
    });

    let state = Arc::new(AppState {
        mapper,
        health: Arc::new(health),
        system_code: cfg.app.system_code.clone(),
        name: cfg.app.name.clone(),
    });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.app.port))
        .await
        .with_context(|| format!("failed to bind port {}", cfg.app.port))?;

    info!(port = cfg.app.port, "starting image-set mapper");
    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(?err, "failed to listen for ctrl-c");
            }
            info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("HTTP server error")?;

    if let Err(err) = worker.await {
        error!(?err, "relay task panicked");
    }
    Ok(())
}
