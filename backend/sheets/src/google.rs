//! Google Sheets v4 REST store used by the scheduled path.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use altforge_core::{
    AltError, AltResult, CellValue, StoreProvider, Table, TableStore, TrackedTable, WriteOp,
    WriteReceipt,
};
use altforge_engine::coords::{cell_address, quote_sheet_name};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Authenticated Sheets API client. Cheap to clone.
#[derive(Clone)]
pub struct GoogleSheetsClient {
    client: Client,
    access_token: String,
    base_url: String,
}

impl GoogleSheetsClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bind the client to one sheet of one spreadsheet.
    pub fn sheet(&self, spreadsheet_id: impl Into<String>, sheet_name: impl Into<String>) -> GoogleSheet {
        GoogleSheet {
            api: self.clone(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }
}

/// One sheet (tab) inside a spreadsheet.
#[derive(Clone)]
pub struct GoogleSheet {
    api: GoogleSheetsClient,
    spreadsheet_id: String,
    sheet_name: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    total_updated_cells: usize,
}

/// Convert the `values` grid of a Sheets response into a table.
pub fn table_from_values(values: Vec<Vec<Value>>) -> Table {
    let rows = values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|v| match v {
                    Value::Null => CellValue::Empty,
                    Value::String(s) => CellValue::from_text(s),
                    Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or_default(),
                    other => CellValue::from_text(other.to_string()),
                })
                .collect()
        })
        .collect();
    Table::new(rows)
}

/// Request body for `values:batchUpdate`: one range per write, raw input.
pub fn batch_update_body(sheet_name: &str, writes: &[WriteOp]) -> Value {
    let data: Vec<Value> = writes
        .iter()
        .map(|op| {
            json!({
                "range": cell_address(sheet_name, op.row_index, op.column_index),
                "values": [[op.value]],
            })
        })
        .collect();
    json!({ "valueInputOption": "RAW", "data": data })
}

impl GoogleSheet {
    fn spreadsheet_url(&self) -> String {
        format!(
            "{}/spreadsheets/{}",
            self.api.base_url,
            urlencoding::encode(&self.spreadsheet_id)
        )
    }

    async fn check(response: reqwest::Response) -> AltResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AltError::Storage(format!("Sheets API returned {status}: {body}")))
    }
}

#[async_trait]
impl TableStore for GoogleSheet {
    fn describe(&self) -> String {
        format!("{} ({})", self.spreadsheet_id, self.sheet_name)
    }

    async fn read_table(&self) -> AltResult<Table> {
        let range = quote_sheet_name(&self.sheet_name);
        let url = format!("{}/values/{}", self.spreadsheet_url(), urlencoding::encode(&range));
        debug!(sheet = %self.describe(), "Reading sheet values");

        let response = self
            .api
            .client
            .get(&url)
            .bearer_auth(&self.api.access_token)
            .send()
            .await
            .map_err(|e| AltError::Storage(format!("Sheets read request failed: {e}")))?;
        let range: ValueRange = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AltError::Storage(format!("unparseable Sheets response: {e}")))?;

        Ok(table_from_values(range.values))
    }

    async fn batch_write(&self, writes: &[WriteOp]) -> AltResult<WriteReceipt> {
        let url = format!("{}/values:batchUpdate", self.spreadsheet_url());
        let body = batch_update_body(&self.sheet_name, writes);

        let response = self
            .api
            .client
            .post(&url)
            .bearer_auth(&self.api.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AltError::Storage(format!("Sheets batch update failed: {e}")))?;
        let result: BatchUpdateResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AltError::Storage(format!("unparseable Sheets response: {e}")))?;

        info!(
            sheet = %self.describe(),
            requested = writes.len(),
            updated = result.total_updated_cells,
            "Sheets batch update sent"
        );
        Ok(WriteReceipt {
            requested: writes.len(),
            updated: result.total_updated_cells,
        })
    }
}

impl StoreProvider for GoogleSheetsClient {
    fn open(&self, table: &TrackedTable) -> AltResult<Box<dyn TableStore>> {
        Ok(Box::new(self.sheet(&table.identifier, &table.display_name)))
    }
}
