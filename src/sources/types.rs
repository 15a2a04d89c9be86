// src/sources/types.rs
use serde::{Deserialize, Serialize};

/// Currency every source is scraped for.
pub const TARGET_CURRENCY: &str = "USD";

/// One bank page to scrape. Loaded once at startup, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub name: String, // e.g. "CIMB", "BCA"
    pub url: String,
    /// Descendant chain of tag names, e.g. "table tbody tr".
    pub selector: String,
    #[serde(flatten)]
    pub strategy: ExtractStrategy,
    /// 0-based spreadsheet column holding this source's rate in both upload rows.
    pub sheet_column: usize,
}

/// How rates are pulled out of a source's rows. Selected once per source, as data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractStrategy {
    pub currency_match: CurrencyMatch,
    pub number_locale: NumberLocale,
    #[serde(default)]
    pub cells: CellLayout,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyMatch {
    /// Currency cell equals the code.
    Exact,
    /// Currency cell contains the code ("USD/IDR", "USD e-Rate").
    Contains,
}

impl CurrencyMatch {
    pub fn matches(self, cell: &str, code: &str) -> bool {
        match self {
            CurrencyMatch::Exact => cell == code,
            CurrencyMatch::Contains => cell.contains(code),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NumberLocale {
    /// "15,234" -> 15234. Whole numbers only.
    CommaThousands,
    /// "15.234,56" -> 15234.56.
    DotThousandsCommaDecimal,
}

/// Cell positions inside a table row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellLayout {
    pub currency: usize,
    pub buy: usize,
    pub sell: usize,
}

impl Default for CellLayout {
    fn default() -> Self {
        Self {
            currency: 0,
            buy: 1,
            sell: 2,
        }
    }
}

impl CellLayout {
    /// Rows shorter than this are skipped.
    pub fn min_cells(&self) -> usize {
        (self.currency.max(self.buy).max(self.sell) + 1).max(3)
    }
}

/// Trimmed plain-text `td` cells of one table row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRateRow {
    pub cells: Vec<String>,
}

impl RawRateRow {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRate {
    pub source_name: String,
    pub currency_code: String,
    pub buy_rate: f64,
    pub sell_rate: f64,
}

impl SourceConfig {
    pub fn cimb() -> Self {
        Self {
            name: "CIMB".to_string(),
            url: "https://www.cimbniaga.co.id/content/cimb/id/personal/treasury/kurs-valas/jcr:content/responsivegrid/kurs_copy_copy_copy.get-content/".to_string(),
            selector: "table tr".to_string(),
            strategy: ExtractStrategy {
                currency_match: CurrencyMatch::Exact,
                number_locale: NumberLocale::CommaThousands,
                cells: CellLayout::default(),
            },
            sheet_column: 7, // H
        }
    }

    pub fn bca() -> Self {
        Self {
            name: "BCA".to_string(),
            url: "https://www.bca.co.id/id/informasi/kurs".to_string(),
            selector: "table tbody tr".to_string(),
            strategy: ExtractStrategy {
                currency_match: CurrencyMatch::Contains,
                number_locale: NumberLocale::DotThousandsCommaDecimal,
                cells: CellLayout::default(),
            },
            sheet_column: 8, // I
        }
    }
}

/// Built-in source table used when no sources file is configured.
pub fn default_sources() -> Vec<SourceConfig> {
    vec![SourceConfig::cimb(), SourceConfig::bca()]
}
