// src/sheet/mod.rs
pub mod lark;

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::batch::UploadRows;
use crate::error::PublishError;

/// What an append left behind in the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
    pub sheet_id: String,
    pub range: String,
    pub rows: usize,
}

/// Appends upload rows to the destination spreadsheet. Single attempt, not idempotent.
#[async_trait]
pub trait SheetPublisher: Send + Sync {
    async fn publish(&self, rows: &UploadRows) -> Result<PublishReceipt, PublishError>;
    fn name(&self) -> &'static str;
}

/// Keeps every published batch in memory; optionally fails instead.
pub struct MemoryPublisher {
    pub calls: Mutex<Vec<UploadRows>>,
    fail_with: Option<PublishError>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(vec![]),
            fail_with: None,
        }
    }

    pub fn failing(err: PublishError) -> Self {
        Self {
            calls: Mutex::new(vec![]),
            fail_with: Some(err),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl Default for MemoryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SheetPublisher for MemoryPublisher {
    async fn publish(&self, rows: &UploadRows) -> Result<PublishReceipt, PublishError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(rows.clone());
        }
        if let Some(e) = &self.fail_with {
            return Err(e.clone());
        }
        Ok(PublishReceipt {
            sheet_id: "memory".to_string(),
            range: format!("memory!{}", crate::batch::column_range()),
            rows: rows.to_matrix().len(),
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
