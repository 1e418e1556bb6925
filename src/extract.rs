//! Turns raw worksheet rows into typed `WorkEntry` values.
//!
//! Only rows whose status cell reads `WIP` are billable. A malformed row is
//! skipped with a warning; it never aborts the scan.

use crate::columns::{ColumnMap, Field};
use crate::model::{DEFAULT_CATEGORY, WorkEntry};

pub const WIP_STATUS: &str = "WIP";

/// One snapshot of a worksheet: its grid id, title, and all cell values with
/// row 0 holding the headers.
#[derive(Debug, Clone)]
pub struct Worksheet {
    pub sheet_id: i64,
    pub title: String,
    rows: Vec<Vec<String>>,
    columns: ColumnMap,
}

impl Worksheet {
    /// Rows are padded to the header width since the remote API drops
    /// trailing empty cells.
    pub fn new(sheet_id: i64, title: impl Into<String>, mut rows: Vec<Vec<String>>) -> Self {
        let width = rows.first().map(|h| h.len()).unwrap_or(0);
        for row in rows.iter_mut().skip(1) {
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
        let columns = rows
            .first()
            .map(|h| ColumnMap::from_headers(h.as_slice()))
            .unwrap_or_default();
        Self {
            sheet_id,
            title: title.into(),
            rows,
            columns,
        }
    }

    pub fn headers(&self) -> &[String] {
        self.rows.first().map(|h| h.as_slice()).unwrap_or(&[])
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Data rows paired with their 1-based sheet row number.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[String])> + '_ {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, row)| (i + 1, row.as_slice()))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Fresh pass over the billable rows; call again to restart.
    pub fn entries(&self) -> Entries<'_> {
        Entries::new(&self.rows, self.columns)
    }

    /// Trimmed cell text, empty when the column is absent or the row is short.
    pub fn cell<'a>(&self, row: &'a [String], field: Field) -> &'a str {
        cell(row, self.columns.get(field))
    }
}

fn cell(row: &[String], index: Option<usize>) -> &str {
    index
        .and_then(|i| row.get(i))
        .map(|v| v.trim())
        .unwrap_or("")
}

/// Lazy iterator over the WIP rows of a header-first grid.
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    rows: &'a [Vec<String>],
    columns: ColumnMap,
    position: usize,
}

impl<'a> Entries<'a> {
    pub fn new(rows: &'a [Vec<String>], columns: ColumnMap) -> Self {
        let missing = columns.missing_required();
        let rows: &'a [Vec<String>] = if missing.is_empty() {
            rows
        } else {
            let names: Vec<&str> = missing.iter().map(|f| f.name()).collect();
            tracing::warn!(
                "required column(s) {} not found in header, no rows can be billed",
                names.join(", ")
            );
            &[]
        };
        Self {
            rows,
            columns,
            position: 1,
        }
    }

    fn parse_row(&self, row_number: usize, row: &[String]) -> Option<WorkEntry> {
        let max_index = self.columns.max_index()?;
        if row.len() <= max_index {
            tracing::debug!("row {}: incomplete, skipping", row_number);
            return None;
        }

        let status = cell(row, self.columns.status).to_uppercase();
        if status != WIP_STATUS {
            return None;
        }

        let hours_raw = cell(row, self.columns.hours);
        let hours = match hours_raw.parse::<f64>() {
            Ok(h) if h.is_finite() => h,
            _ => {
                tracing::warn!(
                    "Invalid hours value '{}' in row {}, skipping",
                    hours_raw,
                    row_number
                );
                return None;
            }
        };

        let date = cell(row, self.columns.date);
        let description = cell(row, self.columns.task);
        if hours <= 0.0 || date.is_empty() || description.is_empty() {
            tracing::debug!("row {}: no hours, date or description, skipping", row_number);
            return None;
        }

        let category = match cell(row, self.columns.category) {
            "" => DEFAULT_CATEGORY,
            c => c,
        };

        Some(WorkEntry {
            date: date.to_string(),
            hours,
            category: category.to_string(),
            description: description.to_string(),
            persons: cell(row, self.columns.persons).to_string(),
            invoice: cell(row, self.columns.invoice).to_string(),
            source_row: row_number,
        })
    }
}

impl Iterator for Entries<'_> {
    type Item = WorkEntry;

    fn next(&mut self) -> Option<WorkEntry> {
        while self.position < self.rows.len() {
            let index = self.position;
            self.position += 1;
            if let Some(entry) = self.parse_row(index + 1, &self.rows[index]) {
                return Some(entry);
            }
        }
        None
    }
}
