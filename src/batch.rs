// src/batch.rs
//! Per-run fan-in of extracted rates and construction of the two upload rows.
//!
//! A `RateBatch` lives for exactly one pipeline run. It is created empty at run
//! start, emits once when every configured source has reported, and is dropped
//! at run end, so an incomplete batch never leaks into the next run.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::sources::types::{ExtractedRate, SourceConfig};

/// Columns A..K.
pub const ROW_WIDTH: usize = 11;
pub const COL_DATE: usize = 0;
pub const COL_TYPE: usize = 1;
pub const COL_CUTOFF: usize = 2;
/// First column available to sources (H). D..G belong to other providers.
pub const FIRST_SOURCE_COL: usize = 7;

pub const DEPOSIT_LABEL: &str = "Deposit";
pub const WITHDRAWAL_LABEL: &str = "Withdrawal";

/// Asia/Jakarta has no DST.
const JAKARTA_OFFSET_SECS: i32 = 7 * 3600;

/// `A:K` for the default width.
pub fn column_range() -> String {
    let last = (b'A' + (ROW_WIDTH as u8) - 1) as char;
    format!("A:{last}")
}

/// One spreadsheet cell as sent to the sheet API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl CellValue {
    pub fn blank() -> Self {
        CellValue::Text(String::new())
    }

    /// Whole rates go out as integers, others keep their fraction.
    pub fn rate(v: f64) -> Self {
        if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            CellValue::Int(v as i64)
        } else {
            CellValue::Float(v)
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UploadRow(pub Vec<CellValue>);

impl UploadRow {
    pub fn cells(&self) -> &[CellValue] {
        &self.0
    }
}

/// Buy row ("Deposit") then sell row ("Withdrawal").
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRows {
    pub buy: UploadRow,
    pub sell: UploadRow,
}

impl UploadRows {
    pub fn to_matrix(&self) -> Vec<UploadRow> {
        vec![self.buy.clone(), self.sell.clone()]
    }
}

#[derive(Debug)]
pub struct RateBatch {
    run_id: Uuid,
    columns: HashMap<String, usize>,
    expected: BTreeSet<String>,
    entries: BTreeMap<String, ExtractedRate>,
    emitted: bool,
}

impl RateBatch {
    pub fn new(run_id: Uuid, sources: &[SourceConfig]) -> Self {
        Self {
            run_id,
            columns: sources
                .iter()
                .map(|s| (s.name.clone(), s.sheet_column))
                .collect(),
            expected: sources.iter().map(|s| s.name.clone()).collect(),
            entries: BTreeMap::new(),
            emitted: false,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_emitted(&self) -> bool {
        self.emitted
    }

    pub fn record(&mut self, rate: ExtractedRate) -> Option<UploadRows> {
        self.record_at(rate, Utc::now())
    }

    /// Store `rate` and, once every configured source is present, return the rows
    /// to upload. The entries are cleared before the rows are handed out.
    pub fn record_at(&mut self, rate: ExtractedRate, now: DateTime<Utc>) -> Option<UploadRows> {
        if self.emitted {
            tracing::warn!(run_id = %self.run_id, source = %rate.source_name, "batch already emitted; ignoring");
            return None;
        }
        if !self.expected.contains(&rate.source_name) {
            tracing::warn!(run_id = %self.run_id, source = %rate.source_name, "unknown source; ignoring");
            return None;
        }

        tracing::info!(
            run_id = %self.run_id,
            source = %rate.source_name,
            buy = rate.buy_rate,
            sell = rate.sell_rate,
            "stored rates"
        );
        self.entries.insert(rate.source_name.clone(), rate);

        if self.entries.len() < self.expected.len() {
            return None;
        }

        let rows = self.build_rows(now);
        self.entries.clear();
        self.emitted = true;
        Some(rows)
    }

    fn build_rows(&self, now: DateTime<Utc>) -> UploadRows {
        let (date, time) = jakarta_stamp(now);
        UploadRows {
            buy: self.build_row(&date, DEPOSIT_LABEL, &time, |r| r.buy_rate),
            sell: self.build_row(&date, WITHDRAWAL_LABEL, &time, |r| r.sell_rate),
        }
    }

    fn build_row<F>(&self, date: &str, label: &str, time: &str, pick: F) -> UploadRow
    where
        F: Fn(&ExtractedRate) -> f64,
    {
        let mut cells = vec![CellValue::blank(); ROW_WIDTH];
        cells[COL_DATE] = CellValue::Text(date.to_string());
        cells[COL_TYPE] = CellValue::Text(label.to_string());
        cells[COL_CUTOFF] = CellValue::Text(time.to_string());
        for (name, rate) in &self.entries {
            // Columns are validated at config load; out-of-range ones are dropped here.
            if let Some(&col) = self.columns.get(name).filter(|c| **c < ROW_WIDTH) {
                cells[col] = CellValue::rate(pick(rate));
            }
        }
        UploadRow(cells)
    }
}

/// ("18 Oct 26", "03:45 PM") in Asia/Jakarta.
pub fn jakarta_stamp(now: DateTime<Utc>) -> (String, String) {
    let tz = FixedOffset::east_opt(JAKARTA_OFFSET_SECS).expect("valid fixed offset");
    let local = now.with_timezone(&tz);
    (
        local.format("%d %b %y").to_string(),
        local.format("%I:%M %p").to_string(),
    )
}
