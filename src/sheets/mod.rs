//! Remote spreadsheet access.
//!
//! `SheetsApi` is the seam between the billing logic and the transport;
//! `SheetsClient` implements it against Google Sheets v4.

pub mod auth;
pub mod client;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::extract::Worksheet;
use crate::model::Color;

pub use client::SheetsClient;

#[derive(Debug, Clone, PartialEq)]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    pub row_count: u64,
    pub column_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetInfo {
    pub id: String,
    pub title: String,
    pub url: String,
    pub sheets: Vec<SheetProperties>,
}

/// Values for one A1 range in a `values:batchUpdate` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueRange {
    pub range: String,
    pub values: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRange {
    pub sheet_id: i64,
    pub start_row_index: usize,
    pub end_row_index: usize,
    pub start_column_index: usize,
    pub end_column_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedValue {
    pub string_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellFormat {
    pub background_color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_entered_value: Option<ExtendedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_entered_format: Option<CellFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatCellRequest {
    pub range: GridRange,
    pub cell: CellData,
    pub fields: String,
}

/// One entry of a `spreadsheets:batchUpdate` request list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Request {
    RepeatCell(RepeatCellRequest),
}

impl Request {
    pub fn background(range: GridRange, color: Color) -> Self {
        Request::RepeatCell(RepeatCellRequest {
            range,
            cell: CellData {
                user_entered_value: None,
                user_entered_format: Some(CellFormat {
                    background_color: color,
                }),
            },
            fields: "userEnteredFormat.backgroundColor".to_string(),
        })
    }

    pub fn text(range: GridRange, text: &str) -> Self {
        Request::RepeatCell(RepeatCellRequest {
            range,
            cell: CellData {
                user_entered_value: Some(ExtendedValue {
                    string_value: text.to_string(),
                }),
                user_entered_format: None,
            },
            fields: "userEnteredValue".to_string(),
        })
    }
}

pub trait SheetsApi {
    fn spreadsheet(&self) -> AppResult<SpreadsheetInfo>;

    /// All cell values of an A1 range (or a whole worksheet title), row-major.
    fn values(&self, range: &str) -> AppResult<Vec<Vec<String>>>;

    fn update_values(&self, data: &[ValueRange]) -> AppResult<()>;

    fn batch_update(&self, requests: &[Request]) -> AppResult<()>;

    /// Effective background colour of the first cell of `range`, if any.
    fn background_color(&self, range: &str) -> AppResult<Option<Color>>;

    /// Service-account identity used for the calls, for diagnostics.
    fn identity(&self) -> String {
        "the service account".to_string()
    }
}

/// `'Title'!` prefix for A1 ranges.
pub fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// A1 column letters for a 0-based index: 0 -> A, 25 -> Z, 26 -> AA.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Looks the worksheet up by title and reads all of its values.
pub fn fetch_worksheet<A: SheetsApi + ?Sized>(api: &A, title: &str) -> AppResult<Worksheet> {
    let info = api.spreadsheet()?;
    let sheet = info
        .sheets
        .into_iter()
        .find(|s| s.title == title)
        .ok_or_else(|| AppError::WorksheetNotFound(title.to_string()))?;
    let rows = api.values(&quote_sheet(&sheet.title))?;
    tracing::debug!("read {} rows from '{}'", rows.len(), sheet.title);
    Ok(Worksheet::new(sheet.sheet_id, sheet.title, rows))
}
