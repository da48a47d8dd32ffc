use anyhow::{Context, Result};
use ariregister::{
    server::{self, AppState},
    Config, DatasetStore, HttpArchiveSource, QueryService, RefreshScheduler,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let config = Config::from_env().context("reading configuration")?;
    info!(
        port = config.port,
        dataset_url = %config.dataset_url,
        refresh_interval = ?config.refresh_interval,
        fetch_timeout = ?config.fetch_timeout,
        "configured"
    );

    // ─── 3) dataset store + refresh loop ─────────────────────────────
    let store = Arc::new(DatasetStore::new());
    let source = HttpArchiveSource::new(&config.dataset_url, config.fetch_timeout)
        .with_context(|| format!("invalid DATASET_URL {}", config.dataset_url))?;
    let scheduler = Arc::new(RefreshScheduler::new(
        Arc::new(source),
        Arc::clone(&store),
        config.ingest_options(),
        config.refresh_interval,
    ));
    let refresh = tokio::spawn(Arc::clone(&scheduler).run());

    // ─── 4) serve queries ────────────────────────────────────────────
    let routes = server::routes(AppState {
        query: QueryService::new(store),
        scheduler,
        search_limit: config.search_limit,
    });

    let (addr, serving) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(([0, 0, 0, 0], config.port), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .with_context(|| format!("binding port {}", config.port))?;
    info!(%addr, "listening");

    serving.await;
    info!("shutting down; abandoning any in-flight refresh");
    refresh.abort();
    Ok(())
}
