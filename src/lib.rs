// src/lib.rs
// Public library surface for the service binary, the one-shot bin and integration tests.

pub mod api;
pub mod batch;
pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod sheet;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::pipeline::{Pipeline, RunResult};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG` (default `forex_scraper=info,warn`);
/// `LOG_FORMAT=json` switches to one JSON object per line.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("forex_scraper=info,scrape_once=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
