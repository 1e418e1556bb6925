use reqwest::Url;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{
    SheetProperties, SheetsApi, SpreadsheetInfo, ValueRange, Request, auth,
};
use crate::config::ServiceAccount;
use crate::error::{AppError, AppResult};
use crate::model::Color;

/// Blocking Google Sheets v4 client bound to one spreadsheet.
pub struct SheetsClient {
    http: Client,
    api_base: String,
    spreadsheet_id: String,
    token: String,
    client_email: String,
}

// ---- response shapes (only the fields we read) ----

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetResponse {
    spreadsheet_id: String,
    #[serde(default)]
    spreadsheet_url: String,
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetEntryProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetEntryProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u64,
    #[serde(default)]
    column_count: u64,
}

#[derive(Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct GridResponse {
    #[serde(default)]
    sheets: Vec<GridSheet>,
}

#[derive(Deserialize)]
struct GridSheet {
    #[serde(default)]
    data: Vec<GridData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridData {
    #[serde(default)]
    row_data: Vec<RowData>,
}

#[derive(Deserialize)]
struct RowData {
    #[serde(default)]
    values: Vec<CellValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CellValue {
    effective_format: Option<EffectiveFormat>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EffectiveFormat {
    background_color: Option<Color>,
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl SheetsClient {
    /// Authenticates with the service account and binds to `spreadsheet_id`.
    pub fn connect(api_base: &str, spreadsheet_id: &str, account: &ServiceAccount) -> AppResult<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let token = auth::fetch_access_token(&http, account)?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            token,
            client_email: account.client_email.clone(),
        })
    }

    fn spreadsheet_url(&self, suffix: &str) -> AppResult<Url> {
        Url::parse(&format!(
            "{}/spreadsheets/{}{}",
            self.api_base, self.spreadsheet_id, suffix
        ))
        .map_err(|e| AppError::Config(format!("invalid sheets.api_base: {}", e)))
    }

    fn check(&self, response: Response) -> AppResult<Response> {
        let status = response.status();
        tracing::debug!("{} {}", status, response.url());
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        tracing::error!("Sheets API request failed: {}", body);
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::SpreadsheetNotFound(self.client_email.clone()));
        }
        Err(AppError::Api {
            status: status.as_u16(),
            body,
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> AppResult<T> {
        let response = self.http.get(url).bearer_auth(&self.token).send()?;
        Ok(self.check(response)?.json()?)
    }

    fn post_json(&self, url: Url, body: &serde_json::Value) -> AppResult<()> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()?;
        self.check(response)?;
        Ok(())
    }
}

impl SheetsApi for SheetsClient {
    fn spreadsheet(&self) -> AppResult<SpreadsheetInfo> {
        let mut url = self.spreadsheet_url("")?;
        url.query_pairs_mut().append_pair(
            "fields",
            "spreadsheetId,spreadsheetUrl,properties.title,sheets.properties",
        );
        let data: SpreadsheetResponse = self.get_json(url)?;
        Ok(SpreadsheetInfo {
            id: data.spreadsheet_id,
            title: data.properties.title,
            url: data.spreadsheet_url,
            sheets: data
                .sheets
                .into_iter()
                .map(|s| SheetProperties {
                    sheet_id: s.properties.sheet_id,
                    title: s.properties.title,
                    row_count: s.properties.grid_properties.row_count,
                    column_count: s.properties.grid_properties.column_count,
                })
                .collect(),
        })
    }

    fn values(&self, range: &str) -> AppResult<Vec<Vec<String>>> {
        let mut url = self.spreadsheet_url("")?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config("sheets.api_base cannot be a base URL".into()))?
            .push("values")
            .push(range);
        let data: ValuesResponse = self.get_json(url)?;
        Ok(data
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    fn update_values(&self, data: &[ValueRange]) -> AppResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let url = self.spreadsheet_url("/values:batchUpdate")?;
        let body = serde_json::json!({
            "valueInputOption": "USER_ENTERED",
            "data": data,
        });
        tracing::debug!("values:batchUpdate with {} ranges", data.len());
        self.post_json(url, &body)
    }

    fn batch_update(&self, requests: &[Request]) -> AppResult<()> {
        if requests.is_empty() {
            return Ok(());
        }
        let url = self.spreadsheet_url(":batchUpdate")?;
        let body = serde_json::json!({ "requests": requests });
        tracing::debug!("batchUpdate with {} requests", requests.len());
        self.post_json(url, &body)
    }

    fn background_color(&self, range: &str) -> AppResult<Option<Color>> {
        let mut url = self.spreadsheet_url("")?;
        url.query_pairs_mut()
            .append_pair("ranges", range)
            .append_pair("includeGridData", "true")
            .append_pair(
                "fields",
                "sheets.data.rowData.values.effectiveFormat.backgroundColor",
            );
        let data: GridResponse = self.get_json(url)?;
        Ok(data
            .sheets
            .into_iter()
            .flat_map(|s| s.data)
            .flat_map(|d| d.row_data)
            .flat_map(|r| r.values)
            .next()
            .and_then(|c| c.effective_format)
            .and_then(|f| f.background_color))
    }

    fn identity(&self) -> String {
        self.client_email.clone()
    }
}
