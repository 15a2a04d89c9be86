// src/pipeline.rs
//! One fetch → extract → join → publish cycle per trigger.

use std::sync::Arc;

use metrics::{counter, gauge};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::batch::{RateBatch, UploadRows};
use crate::collector::{collect_all, summarize};
use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::sheet::lark::LarkSheetPublisher;
use crate::sheet::{PublishReceipt, SheetPublisher};
use crate::sources::fetcher::{FetchTimeouts, HttpPageFetcher, PageFetcher};
use crate::sources::types::{ExtractedRate, SourceConfig};

/// Externally visible outcome of one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub success: bool,
    pub run_id: Uuid,
    pub results: Vec<ExtractedRate>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<PublishReceipt>,
}

pub struct Pipeline {
    sources: Arc<[SourceConfig]>,
    fetcher: Arc<dyn PageFetcher>,
    publisher: Arc<dyn SheetPublisher>,
    timeouts: FetchTimeouts,
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        sources: Vec<SourceConfig>,
        fetcher: Arc<dyn PageFetcher>,
        publisher: Arc<dyn SheetPublisher>,
    ) -> Self {
        Self {
            sources: sources.into(),
            fetcher,
            publisher,
            timeouts: FetchTimeouts::default(),
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_timeouts(mut self, timeouts: FetchTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Production wiring: plain HTTP fetcher + Lark publisher.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let fetcher = HttpPageFetcher::new(cfg.timeouts)?;
        let publisher = LarkSheetPublisher::new(cfg.lark.clone())?;
        Ok(Self::new(cfg.sources.clone(), Arc::new(fetcher), Arc::new(publisher))
            .with_timeouts(cfg.timeouts))
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// Run once. Overlapping calls queue behind each other; every run gets its own batch.
    pub async fn run(&self) -> Result<RunResult, PipelineError> {
        let _guard = self.run_lock.lock().await;
        let run_id = Uuid::new_v4();
        counter!("scrape_runs_total").increment(1);
        gauge!("scrape_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(
            %run_id,
            sources = self.sources.len(),
            fetcher = self.fetcher.name(),
            publisher = self.publisher.name(),
            "starting forex scraper"
        );

        let res = self.run_inner(run_id).await;
        if let Err(e) = &res {
            counter!("scrape_run_failures_total").increment(1);
            tracing::error!(%run_id, error = %e, "forex scraper failed");
        }
        res
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RunResult, PipelineError> {
        let mut batch = RateBatch::new(run_id, &self.sources);
        let mut ready: Option<UploadRows> = None;

        let outcomes = collect_all(
            &self.sources,
            Arc::clone(&self.fetcher),
            self.timeouts,
            |rate| {
                if let Some(rows) = batch.record(rate.clone()) {
                    ready = Some(rows);
                }
            },
        )
        .await;
        if !batch.is_emitted() {
            tracing::warn!(
                run_id = %batch.run_id(),
                stored = batch.len(),
                "batch incomplete; nothing uploaded this run"
            );
        }
        // Partial batches end with the run.
        drop(batch);

        let summary = summarize(outcomes)?;

        let published = match ready {
            Some(rows) => Some(self.publisher.publish(&rows).await?),
            None => None,
        };

        Ok(RunResult {
            success: true,
            run_id,
            results: summary.results,
            errors: summary.errors,
            published,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PublishError;
    use crate::sheet::MemoryPublisher;
    use crate::sources::fetcher::StaticPageFetcher;
    use crate::sources::types::SourceConfig;

    const CIMB_PAGE: &str =
        "<table><tr><td>USD</td><td>15,230</td><td>15,330</td></tr></table>";
    const BCA_PAGE: &str = "<table><tbody><tr><td>USD</td><td>15.300,00</td><td>15.400,00</td></tr></tbody></table>";

    fn pipeline(fetcher: StaticPageFetcher, publisher: Arc<MemoryPublisher>) -> Pipeline {
        Pipeline::new(
            vec![SourceConfig::cimb(), SourceConfig::bca()],
            Arc::new(fetcher),
            publisher,
        )
    }

    #[tokio::test]
    async fn both_sources_publish_two_rows_once() {
        let publisher = Arc::new(MemoryPublisher::new());
        let p = pipeline(
            StaticPageFetcher::new()
                .with_page("CIMB", CIMB_PAGE)
                .with_page("BCA", BCA_PAGE),
            publisher.clone(),
        );
        let res = p.run().await.unwrap();
        assert!(res.success);
        assert_eq!(res.results.len(), 2);
        assert_eq!(publisher.call_count(), 1);
        assert_eq!(res.published.unwrap().rows, 2);
    }

    #[tokio::test]
    async fn publish_failure_fails_the_run() {
        let publisher = Arc::new(MemoryPublisher::failing(PublishError::Auth(
            "code 10003: invalid param".into(),
        )));
        let p = pipeline(
            StaticPageFetcher::new()
                .with_page("CIMB", CIMB_PAGE)
                .with_page("BCA", BCA_PAGE),
            publisher.clone(),
        );
        let err = p.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::Publish(PublishError::Auth(_))));

        // The next run starts from an empty batch and publishes again.
        let err = p.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::Publish(_)));
        assert_eq!(publisher.call_count(), 2);
    }
}
