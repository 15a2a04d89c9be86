// src/collector.rs
//! Concurrent fan-out over all configured sources with settle-all semantics.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use metrics::counter;

use crate::error::{FetchError, PipelineError, SourceError};
use crate::sources::fetcher::{FetchTimeouts, PageFetcher};
use crate::sources::scrape_source;
use crate::sources::types::{ExtractedRate, SourceConfig};

/// Terminal state of one source's branch.
#[derive(Debug)]
pub struct SourceOutcome {
    pub source_name: String,
    pub result: Result<ExtractedRate, SourceError>,
}

/// Successes and failure messages of a settled run.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectSummary {
    pub results: Vec<ExtractedRate>,
    pub errors: Vec<String>,
}

/// Scrape every source in its own task and wait for all of them.
///
/// Each success is handed to `on_rate` as soon as its task finishes. A failing,
/// slow or panicking source never cancels the others. Outcomes come back in
/// configuration order.
pub async fn collect_all<F>(
    sources: &[SourceConfig],
    fetcher: Arc<dyn PageFetcher>,
    timeouts: FetchTimeouts,
    mut on_rate: F,
) -> Vec<SourceOutcome>
where
    F: FnMut(&ExtractedRate),
{
    let mut pending: FuturesUnordered<_> = sources
        .iter()
        .cloned()
        .map(|source| {
            let fetcher = Arc::clone(&fetcher);
            let name = source.name.clone();
            let limit = timeouts.total();
            let handle = tokio::spawn(async move {
                match tokio::time::timeout(limit, scrape_source(&source, fetcher.as_ref())).await
                {
                    Ok(res) => res,
                    Err(_) => Err(FetchError::Timeout {
                        source_name: source.name.clone(),
                        secs: limit.as_secs(),
                    }
                    .into()),
                }
            });
            async move { (name, handle.await) }
        })
        .collect();

    let mut outcomes = Vec::with_capacity(sources.len());
    while let Some((source_name, joined)) = pending.next().await {
        let result = joined.unwrap_or_else(|e| {
            Err(SourceError::Join {
                source_name: source_name.clone(),
                reason: e.to_string(),
            })
        });

        match &result {
            Ok(rate) => {
                counter!("scrape_source_success_total", "source" => source_name.clone())
                    .increment(1);
                on_rate(rate);
            }
            Err(e) => {
                tracing::warn!(source = %source_name, error = %e, "scraper failed");
                counter!("scrape_source_errors_total", "source" => source_name.clone())
                    .increment(1);
            }
        }
        outcomes.push(SourceOutcome {
            source_name,
            result,
        });
    }

    outcomes.sort_by_key(|o| {
        sources
            .iter()
            .position(|s| s.name == o.source_name)
            .unwrap_or(usize::MAX)
    });
    outcomes
}

/// Partition settled outcomes. Fails only when no source succeeded.
pub fn summarize(outcomes: Vec<SourceOutcome>) -> Result<CollectSummary, PipelineError> {
    let total = outcomes.len();
    let mut results = Vec::new();
    let mut errors = Vec::new();
    for o in outcomes {
        match o.result {
            Ok(rate) => results.push(rate),
            Err(e) => errors.push(e.to_string()),
        }
    }

    if !errors.is_empty() {
        tracing::error!(errors = ?errors, "some scrapers failed");
    }
    if results.is_empty() {
        return Err(PipelineError::AllSourcesFailed { errors });
    }

    tracing::info!(
        ok = results.len(),
        total,
        "forex scraping completed"
    );
    Ok(CollectSummary { results, errors })
}
