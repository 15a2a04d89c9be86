// src/sources/extract.rs
//! Locate the target-currency row on a bank page and normalize its rates.

use crate::error::ExtractError;
use crate::sources::types::{ExtractedRate, NumberLocale, RawRateRow, SourceConfig};

impl NumberLocale {
    /// Parse a rate cell. Anything other than digits, `,` and `.` is dropped first.
    /// Returns `None` when nothing numeric is left.
    pub fn parse(self, text: &str) -> Option<f64> {
        let kept: String = text
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
            .collect();

        let canonical = match self {
            NumberLocale::CommaThousands => {
                let whole = kept.split('.').next().unwrap_or_default();
                whole.replace(',', "")
            }
            NumberLocale::DotThousandsCommaDecimal => kept.replace('.', "").replacen(',', ".", 1),
        };

        if !canonical.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        canonical
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
    }
}

/// First qualifying row wins. `Ok(None)` means no row qualified.
pub fn extract(
    rows: &[RawRateRow],
    source: &SourceConfig,
    currency: &str,
) -> Result<Option<ExtractedRate>, ExtractError> {
    let strategy = source.strategy;
    let layout = strategy.cells;
    let min_cells = layout.min_cells();

    for row in rows {
        if row.cells.len() < min_cells {
            continue;
        }
        let cur = row.cells[layout.currency].trim();
        if !strategy.currency_match.matches(cur, currency) {
            continue;
        }
        let buy = row.cells[layout.buy].trim();
        let sell = row.cells[layout.sell].trim();
        if buy.is_empty() || sell.is_empty() {
            continue;
        }

        let parse = |field: &'static str, text: &str| {
            strategy
                .number_locale
                .parse(text)
                .ok_or_else(|| ExtractError::Malformed {
                    source_name: source.name.clone(),
                    field,
                    text: text.to_string(),
                })
        };

        return Ok(Some(ExtractedRate {
            source_name: source.name.clone(),
            currency_code: currency.to_string(),
            buy_rate: parse("buy", buy)?,
            sell_rate: parse("sell", sell)?,
        }));
    }

    Ok(None)
}
