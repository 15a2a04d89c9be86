// src/sources/fetcher.rs
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use metrics::histogram;

use crate::error::FetchError;
use crate::sources::types::SourceConfig;

/// Retrieves the markup of a source's page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, source: &SourceConfig) -> Result<String, FetchError>;
    fn name(&self) -> &'static str;
}

/// Explicit fetch limits. The collector bounds each source by their sum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTimeouts {
    pub page_load: Duration,
    pub selector_wait: Duration,
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self {
            page_load: Duration::from_secs(30),
            selector_wait: Duration::from_secs(15),
        }
    }
}

impl FetchTimeouts {
    pub fn total(&self) -> Duration {
        self.page_load + self.selector_wait
    }
}

/// Plain HTTP GET. The markup is parsed afterwards; no script execution.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    page_load: Duration,
}

impl HttpPageFetcher {
    pub fn new(timeouts: FetchTimeouts) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; forex-scraper/0.1)")
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeouts.page_load)
            .build()
            .map_err(|e| FetchError::Request {
                source_name: "*".to_string(),
                url: String::new(),
                reason: format!("building http client: {e}"),
            })?;
        Ok(Self {
            client,
            page_load: timeouts.page_load,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, source: &SourceConfig) -> Result<String, FetchError> {
        let t0 = std::time::Instant::now();
        let request_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    source_name: source.name.clone(),
                    secs: self.page_load.as_secs(),
                }
            } else {
                FetchError::Request {
                    source_name: source.name.clone(),
                    url: source.url.clone(),
                    reason: e.to_string(),
                }
            }
        };

        let resp = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(request_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_name: source.name.clone(),
                url: source.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(request_err)?;
        histogram!("scrape_fetch_ms", "source" => source.name.clone())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::debug!(source = %source.name, bytes = body.len(), "page fetched");
        Ok(body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Canned pages keyed by source name. For tests and dry runs.
#[derive(Default)]
pub struct StaticPageFetcher {
    pages: HashMap<String, Result<String, String>>,
    delays: HashMap<String, Duration>,
}

impl StaticPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, source: &str, markup: impl Into<String>) -> Self {
        self.pages.insert(source.to_string(), Ok(markup.into()));
        self
    }

    /// The source fails with a request error carrying `reason`.
    pub fn with_failure(mut self, source: &str, reason: impl Into<String>) -> Self {
        self.pages.insert(source.to_string(), Err(reason.into()));
        self
    }

    pub fn with_delay(mut self, source: &str, delay: Duration) -> Self {
        self.delays.insert(source.to_string(), delay);
        self
    }
}

#[async_trait]
impl PageFetcher for StaticPageFetcher {
    async fn fetch(&self, source: &SourceConfig) -> Result<String, FetchError> {
        if let Some(d) = self.delays.get(&source.name) {
            tokio::time::sleep(*d).await;
        }
        match self.pages.get(&source.name) {
            Some(Ok(markup)) => Ok(markup.clone()),
            Some(Err(reason)) => Err(FetchError::Request {
                source_name: source.name.clone(),
                url: source.url.clone(),
                reason: reason.clone(),
            }),
            None => Err(FetchError::Status {
                source_name: source.name.clone(),
                url: source.url.clone(),
                status: 404,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
