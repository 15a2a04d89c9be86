use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and describe the scrape series.
    pub fn init() -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        describe();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("scrape_runs_total", "Pipeline runs started.");
    describe_counter!("scrape_run_failures_total", "Pipeline runs reported as failed.");
    describe_counter!(
        "scrape_source_success_total",
        "Sources that yielded USD rates, by source."
    );
    describe_counter!(
        "scrape_source_errors_total",
        "Source fetch/extract failures, by source."
    );
    describe_histogram!("scrape_fetch_ms", "Page fetch time in milliseconds, by source.");
    describe_gauge!("scrape_last_run_ts", "Unix ts when the pipeline last ran.");
    describe_counter!("sheet_publish_total", "Spreadsheet publish attempts.");
    describe_counter!("sheet_publish_errors_total", "Failed spreadsheet publishes.");
    describe_counter!("sheet_rows_appended_total", "Rows appended to the spreadsheet.");
}
