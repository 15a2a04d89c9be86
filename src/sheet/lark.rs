// src/sheet/lark.rs
//! Lark (Feishu international) Open API client: tenant token, sheet lookup,
//! values append.

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{PublishReceipt, SheetPublisher};
use crate::batch::{column_range, UploadRow, UploadRows};
use crate::config::LarkConfig;
use crate::error::PublishError;

#[derive(Serialize)]
struct TokenReq<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResp {
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
}

/// Common `{ code, msg, data }` wrapper of the sheets endpoints.
#[derive(Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct SheetList {
    #[serde(default)]
    sheets: Vec<SheetInfo>,
}

#[derive(Deserialize)]
struct SheetInfo {
    sheet_id: String,
    #[serde(default)]
    title: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendReq<'a> {
    value_range: ValueRange<'a>,
}

#[derive(Serialize)]
struct ValueRange<'a> {
    range: &'a str,
    values: &'a [UploadRow],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendData {
    updates: Option<AppendUpdates>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_rows: Option<usize>,
}

pub struct LarkSheetPublisher {
    cfg: LarkConfig,
    client: Client,
}

impl LarkSheetPublisher {
    pub fn new(cfg: LarkConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| PublishError::Client(e.to_string()))?;
        Ok(Self { cfg, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.cfg.api_base.trim_end_matches('/'), path)
    }

    /// Exchange app id + secret for a tenant access token.
    pub async fn tenant_access_token(&self) -> Result<String, PublishError> {
        let resp = self
            .client
            .post(self.url("auth/v3/tenant_access_token/internal"))
            .json(&TokenReq {
                app_id: &self.cfg.app_id,
                app_secret: &self.cfg.app_secret,
            })
            .send()
            .await
            .map_err(|e| PublishError::Auth(format!("request failed: {e}")))?;

        let body: TokenResp = decode(resp).await.map_err(PublishError::Auth)?;
        if body.code != 0 {
            return Err(PublishError::Auth(format!(
                "code {}: {}",
                body.code, body.msg
            )));
        }
        let token = body
            .tenant_access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PublishError::Auth("response carried no token".to_string()))?;
        tracing::info!("got Lark access token");
        Ok(token)
    }

    /// First sheet of the configured spreadsheet.
    pub async fn first_sheet_id(&self, token: &str) -> Result<String, PublishError> {
        let path = format!(
            "sheets/v3/spreadsheets/{}/sheets/query",
            self.cfg.spreadsheet_token
        );
        let resp = self
            .client
            .get(self.url(&path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PublishError::Lookup(format!("request failed: {e}")))?;

        let body: Envelope<SheetList> = decode(resp).await.map_err(PublishError::Lookup)?;
        if body.code != 0 {
            return Err(PublishError::Lookup(format!(
                "code {}: {}",
                body.code, body.msg
            )));
        }
        let sheet = body
            .data
            .and_then(|d| d.sheets.into_iter().next())
            .ok_or_else(|| PublishError::Lookup("spreadsheet has no sheets".to_string()))?;
        tracing::info!(sheet_id = %sheet.sheet_id, title = %sheet.title, "found sheet");
        Ok(sheet.sheet_id)
    }

    /// Append `values` below the last filled row of `range`.
    pub async fn append_values(
        &self,
        token: &str,
        range: &str,
        values: &[UploadRow],
    ) -> Result<usize, PublishError> {
        let path = format!(
            "sheets/v2/spreadsheets/{}/values_append",
            self.cfg.spreadsheet_token
        );
        let resp = self
            .client
            .post(self.url(&path))
            .bearer_auth(token)
            .json(&AppendReq {
                value_range: ValueRange { range, values },
            })
            .send()
            .await
            .map_err(|e| PublishError::Write(format!("request failed: {e}")))?;

        let body: Envelope<AppendData> = decode(resp).await.map_err(PublishError::Write)?;
        if body.code != 0 {
            return Err(PublishError::Write(format!(
                "code {}: {}",
                body.code, body.msg
            )));
        }
        Ok(body
            .data
            .and_then(|d| d.updates)
            .and_then(|u| u.updated_rows)
            .unwrap_or(values.len()))
    }

    async fn publish_inner(&self, rows: &UploadRows) -> Result<PublishReceipt, PublishError> {
        let token = self.tenant_access_token().await?;
        let sheet_id = self.first_sheet_id(&token).await?;
        let range = format!("{sheet_id}!{}", column_range());
        let values = rows.to_matrix();
        let appended = self.append_values(&token, &range, &values).await?;
        tracing::info!(%range, rows = appended, "combined data sent to Lark spreadsheet");
        Ok(PublishReceipt {
            sheet_id,
            range,
            rows: appended,
        })
    }
}

/// Decode a JSON body, folding HTTP status into the message when it is not JSON.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, String> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| format!("reading body (HTTP {status}): {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("HTTP {status}, undecodable body: {e}"))
}

#[async_trait]
impl SheetPublisher for LarkSheetPublisher {
    async fn publish(&self, rows: &UploadRows) -> Result<PublishReceipt, PublishError> {
        counter!("sheet_publish_total").increment(1);
        match self.publish_inner(rows).await {
            Ok(receipt) => {
                counter!("sheet_rows_appended_total").increment(receipt.rows as u64);
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!(error = %e, "error sending combined data to spreadsheet");
                counter!("sheet_publish_errors_total").increment(1);
                Err(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        "lark"
    }
}
