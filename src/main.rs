//! Forex scraper service — binary entrypoint.
//! Boots the Axum HTTP server that runs one scrape-and-upload cycle per trigger.

use std::net::SocketAddr;

use anyhow::Context;
use forex_scraper::api::{self, AppState};
use forex_scraper::config::AppConfig;
use forex_scraper::metrics::Metrics;
use forex_scraper::Pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    forex_scraper::init_tracing();

    // Missing Lark credentials stop us here, before any network activity.
    let cfg = AppConfig::from_env().context("loading configuration")?;
    let pipeline = Pipeline::from_config(&cfg)?;
    tracing::info!(
        port = cfg.port,
        sources = ?pipeline.sources().iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        "configuration loaded"
    );

    let mut router = api::create_router(AppState::new(pipeline));
    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = %e, "prometheus recorder not installed"),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "server running");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("serving http")?;
    Ok(())
}
