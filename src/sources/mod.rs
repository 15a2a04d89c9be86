// src/sources/mod.rs
pub mod extract;
pub mod fetcher;
pub mod html;
pub mod types;

use crate::error::{ExtractError, FetchError, SourceError};
use crate::sources::fetcher::PageFetcher;
use crate::sources::types::{ExtractedRate, SourceConfig, TARGET_CURRENCY};

/// Fetch one source's page and pull the target-currency rates out of it.
pub async fn scrape_source(
    source: &SourceConfig,
    fetcher: &dyn PageFetcher,
) -> Result<ExtractedRate, SourceError> {
    tracing::info!(source = %source.name, fetcher = fetcher.name(), "starting scraper");
    let markup = fetcher.fetch(source).await?;
    rates_from_markup(&markup, source)
}

/// Parse fetched markup for one source. Split out so fixtures skip the network.
pub fn rates_from_markup(
    markup: &str,
    source: &SourceConfig,
) -> Result<ExtractedRate, SourceError> {
    let rows = html::select_rows(markup, &source.selector);
    if rows.is_empty() {
        return Err(FetchError::SelectorMissing {
            source_name: source.name.clone(),
            selector: source.selector.clone(),
        }
        .into());
    }

    match extract::extract(&rows, source, TARGET_CURRENCY)? {
        Some(rate) => {
            tracing::info!(
                source = %rate.source_name,
                buy = rate.buy_rate,
                sell = rate.sell_rate,
                "rates extracted"
            );
            Ok(rate)
        }
        None => Err(ExtractError::NotFound {
            source_name: source.name.clone(),
            currency: TARGET_CURRENCY.to_string(),
        }
        .into()),
    }
}
