use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::google_auth::AccessTokenSource;
use crate::core::content::{RecordStore, StoreError};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
/// Cells are stored exactly as encoded. Sheets would otherwise parse long
/// numeric post ids into floats and calendar strings into date serials.
const VALUE_INPUT_OPTION: &str = "RAW";

/// Google Sheets backed record store. Each table is a tab; row 1 is the
/// header, so data index `i` lives on sheet row `i + 2`.
pub struct SheetsRecordStore {
    client: Client,
    auth: Arc<dyn AccessTokenSource>,
    spreadsheet_id: String,
    /// Tab title -> numeric sheet id, needed for row deletion.
    sheet_ids: DashMap<String, i64>,
}

#[derive(Debug, Deserialize)]
struct ApiValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiSpreadsheet {
    #[serde(default)]
    sheets: Vec<ApiSheet>,
}

#[derive(Debug, Deserialize)]
struct ApiSheet {
    properties: ApiSheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSheetProperties {
    sheet_id: i64,
    title: String,
}

impl SheetsRecordStore {
    pub fn new(auth: Arc<dyn AccessTokenSource>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            auth,
            spreadsheet_id: spreadsheet_id.into(),
            sheet_ids: DashMap::new(),
        }
    }

    async fn bearer(&self) -> Result<String, StoreError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| StoreError::Api(e.to_string()))?;
        Ok(format!("Bearer {}", token))
    }

    fn url(&self, suffix: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(SHEETS_API).map_err(|e| StoreError::Api(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Api("invalid Sheets API base URL".into()))?
            .push(&self.spreadsheet_id)
            .extend(suffix);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Api(e.to_string()))?;
        Err(StoreError::Api(format!("Sheets returned {}: {}", status, text)))
    }

    fn write_url(&self, table: &str, index: usize) -> Result<Url, StoreError> {
        let mut url = self.url(&["values", &row_range(table, index)])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", VALUE_INPUT_OPTION);
        Ok(url)
    }

    fn append_url(&self, table: &str) -> Result<Url, StoreError> {
        let mut url = self.url(&["values", &format!("'{}'!A1:append", table)])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", VALUE_INPUT_OPTION)
            .append_pair("insertDataOption", "INSERT_ROWS");
        Ok(url)
    }

    async fn sheet_id(&self, table: &str) -> Result<i64, StoreError> {
        if let Some(id) = self.sheet_ids.get(table) {
            return Ok(*id);
        }

        let mut url = self.url(&[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties");
        let response = self
            .client
            .get(url)
            .header("Authorization", self.bearer().await?)
            .send()
            .await
            .map_err(|e| StoreError::Api(e.to_string()))?;
        let spreadsheet: ApiSpreadsheet = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Api(e.to_string()))?;

        for sheet in spreadsheet.sheets {
            self.sheet_ids
                .insert(sheet.properties.title, sheet.properties.sheet_id);
        }
        self.sheet_ids
            .get(table)
            .map(|id| *id)
            .ok_or_else(|| StoreError::Api(format!("No sheet named {}", table)))
    }

    async fn row_count(&self, table: &str) -> Result<usize, StoreError> {
        Ok(self.read_rows(table).await?.len())
    }

    async fn ensure_row(&self, table: &str, index: usize) -> Result<(), StoreError> {
        if index >= self.row_count(table).await? {
            return Err(StoreError::NotFound {
                table: table.to_string(),
                index,
            });
        }
        Ok(())
    }
}

/// A1 range covering every data row of a tab.
fn data_range(table: &str) -> String {
    format!("'{}'!A2:ZZ", table)
}

/// A1 anchor for one data row.
fn row_range(table: &str, index: usize) -> String {
    format!("'{}'!A{}", table, index + 2)
}

/// Cells as strings; numbers and booleans keep their textual form.
fn cells_from_values(values: Vec<Vec<Value>>) -> Vec<Vec<String>> {
    values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

#[async_trait]
impl RecordStore for SheetsRecordStore {
    async fn read_rows(&self, table: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let url = self.url(&["values", &data_range(table)])?;
        let response = self
            .client
            .get(url)
            .header("Authorization", self.bearer().await?)
            .send()
            .await
            .map_err(|e| StoreError::Api(e.to_string()))?;
        let range: ApiValueRange = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Api(e.to_string()))?;
        Ok(cells_from_values(range.values))
    }

    async fn write_row(
        &self,
        table: &str,
        index: usize,
        cells: Vec<String>,
    ) -> Result<(), StoreError> {
        self.ensure_row(table, index).await?;

        let url = self.write_url(table, index)?;
        let response = self
            .client
            .put(url)
            .header("Authorization", self.bearer().await?)
            .json(&json!({ "values": [cells] }))
            .send()
            .await
            .map_err(|e| StoreError::Api(e.to_string()))?;
        Self::check(response).await?;
        tracing::debug!(table = %table, row = index, "Sheet row updated");
        Ok(())
    }

    async fn append_row(&self, table: &str, cells: Vec<String>) -> Result<(), StoreError> {
        let url = self.append_url(table)?;
        let response = self
            .client
            .post(url)
            .header("Authorization", self.bearer().await?)
            .json(&json!({ "values": [cells] }))
            .send()
            .await
            .map_err(|e| StoreError::Api(e.to_string()))?;
        Self::check(response).await?;
        tracing::debug!(table = %table, "Sheet row appended");
        Ok(())
    }

    async fn delete_row(&self, table: &str, index: usize) -> Result<(), StoreError> {
        self.ensure_row(table, index).await?;
        let sheet_id = self.sheet_id(table).await?;

        let url = Url::parse(&format!(
            "{}/{}:batchUpdate",
            SHEETS_API, self.spreadsheet_id
        ))
        .map_err(|e| StoreError::Api(e.to_string()))?;
        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": index + 1,
                        "endIndex": index + 2
                    }
                }
            }]
        });
        let response = self
            .client
            .post(url)
            .header("Authorization", self.bearer().await?)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Api(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            self.sheet_ids.remove(table);
        }
        Self::check(response).await?;
        tracing::debug!(table = %table, row = index, "Sheet row deleted");
        Ok(())
    }
}
