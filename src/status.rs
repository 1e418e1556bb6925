//! Write-back of the billing status: status label plus row highlight.
//!
//! By default this is two independent remote calls (values, then format).
//! A failure between them leaves rows labelled but not highlighted;
//! `fix_colors` is the recovery path. With `single_batch` both go out in
//! one atomic `batchUpdate`.

use std::collections::BTreeSet;

use crate::columns::Field;
use crate::config::BillingSettings;
use crate::error::{AppError, AppResult};
use crate::extract::Worksheet;
use crate::model::{Color, WorkEntry};
use crate::sheets::{GridRange, Request, SheetsApi, ValueRange, column_letter, quote_sheet};

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub rows: Vec<usize>,
    pub label: String,
    pub color: Color,
}

pub struct StatusUpdater<'a, A: SheetsApi + ?Sized> {
    api: &'a A,
    billing: &'a BillingSettings,
}

impl<'a, A: SheetsApi + ?Sized> StatusUpdater<'a, A> {
    pub fn new(api: &'a A, billing: &'a BillingSettings) -> Self {
        Self { api, billing }
    }

    /// Sets the status of every entry's row to the billed label and
    /// highlights the rows with the reference colour (see `reference_color`).
    pub fn mark_billed(&self, sheet: &Worksheet, entries: &[WorkEntry]) -> AppResult<StatusReport> {
        let status_col = sheet
            .columns()
            .status
            .ok_or(AppError::MissingColumn(Field::Status.name()))?;
        let rows: Vec<usize> = entries
            .iter()
            .map(|e| e.source_row)
            .filter(|r| *r >= 1)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let label = self.billing.status_label.clone();
        if rows.is_empty() {
            let color = self.billing.highlight;
            return Ok(StatusReport { rows, label, color });
        }
        let color = self.reference_color(sheet)?;

        if self.billing.single_batch {
            let mut requests = Vec::with_capacity(rows.len() * 2);
            for &row in &rows {
                requests.push(Request::text(cell_range(sheet.sheet_id, row, status_col), &label));
                requests.push(Request::background(self.row_range(sheet.sheet_id, row), color));
            }
            self.api.batch_update(&requests)?;
            println!("✅ Updated {} entries to {} with highlighting", rows.len(), label);
        } else {
            let values: Vec<ValueRange> = rows
                .iter()
                .map(|&row| ValueRange {
                    range: format!("{}!{}{}", quote_sheet(&sheet.title), column_letter(status_col), row),
                    values: vec![vec![label.clone()]],
                })
                .collect();
            self.api.update_values(&values)?;
            println!("✅ Updated {} entries from WIP to {}", rows.len(), label);

            self.apply_color(sheet.sheet_id, &rows, color)?;
            println!("🎨 Applied highlighting to {} rows", rows.len());
        }

        Ok(StatusReport { rows, label, color })
    }

    /// Recovery: re-derive the reference colour and reapply it to every row
    /// of `invoice` already carrying the billed label.
    pub fn fix_colors(&self, sheet: &Worksheet, invoice: &str) -> AppResult<StatusReport> {
        if invoice.trim().is_empty() {
            return Err(AppError::Config("invoice number must not be empty".into()));
        }
        let columns = sheet.columns();
        if columns.invoice.is_none() {
            return Err(AppError::MissingColumn(Field::Invoice.name()));
        }
        if columns.status.is_none() {
            return Err(AppError::MissingColumn(Field::Status.name()));
        }

        let color = self.reference_color(sheet)?;
        let label = self.billing.status_label.clone();
        let wanted_status = label.trim().to_uppercase();
        let rows: Vec<usize> = sheet
            .data_rows()
            .filter(|(_, row)| {
                sheet.cell(row, Field::Invoice) == invoice.trim()
                    && sheet.cell(row, Field::Status).to_uppercase() == wanted_status
            })
            .map(|(n, _)| n)
            .collect();

        if !rows.is_empty() {
            self.apply_color(sheet.sheet_id, &rows, color)?;
        }
        Ok(StatusReport { rows, label, color })
    }

    /// Colour of the configured reference range, or the configured highlight.
    pub fn reference_color(&self, sheet: &Worksheet) -> AppResult<Color> {
        let Some(range) = &self.billing.reference_range else {
            return Ok(self.billing.highlight);
        };
        let a1 = format!("{}!{}", quote_sheet(&sheet.title), range.trim());
        match self.api.background_color(&a1)? {
            Some(color) => Ok(color),
            None => {
                tracing::warn!("no background colour at {}, using configured highlight", a1);
                Ok(self.billing.highlight)
            }
        }
    }

    fn apply_color(&self, sheet_id: i64, rows: &[usize], color: Color) -> AppResult<()> {
        let requests: Vec<Request> = rows
            .iter()
            .map(|&row| Request::background(self.row_range(sheet_id, row), color))
            .collect();
        self.api.batch_update(&requests)
    }

    fn row_range(&self, sheet_id: i64, row: usize) -> GridRange {
        GridRange {
            sheet_id,
            start_row_index: row - 1,
            end_row_index: row,
            start_column_index: 0,
            end_column_index: self.billing.highlight_columns,
        }
    }
}

fn cell_range(sheet_id: i64, row: usize, column: usize) -> GridRange {
    GridRange {
        sheet_id,
        start_row_index: row - 1,
        end_row_index: row,
        start_column_index: column,
        end_column_index: column + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::{CellData, RepeatCellRequest, SheetProperties, SpreadsheetInfo};
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory sheet applying writes the way the API would.
    struct FakeSheet {
        title: String,
        cells: RefCell<Vec<Vec<String>>>,
        colors: RefCell<HashMap<(usize, usize), Color>>,
        calls: RefCell<Vec<&'static str>>,
        fail_format: bool,
        reference: Option<Color>,
    }

    impl FakeSheet {
        fn new(rows: Vec<Vec<&str>>) -> Self {
            Self {
                title: "Sheet1".into(),
                cells: RefCell::new(
                    rows.into_iter()
                        .map(|r| r.into_iter().map(String::from).collect())
                        .collect(),
                ),
                colors: RefCell::new(HashMap::new()),
                calls: RefCell::new(Vec::new()),
                fail_format: false,
                reference: None,
            }
        }

        fn worksheet(&self) -> Worksheet {
            Worksheet::new(0, self.title.clone(), self.cells.borrow().clone())
        }

        fn status(&self, row: usize) -> String {
            self.cells.borrow()[row - 1][6].clone()
        }

        fn color(&self, row: usize, col: usize) -> Option<Color> {
            self.colors.borrow().get(&(row - 1, col)).copied()
        }
    }

    fn parse_a1(a1: &str) -> (usize, usize) {
        let cell = a1.rsplit('!').next().unwrap();
        let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        let digits: String = cell.chars().skip_while(|c| c.is_ascii_alphabetic()).collect();
        let col = letters.bytes().fold(0, |acc, b| acc * 26 + (b - b'A' + 1) as usize) - 1;
        (digits.parse::<usize>().unwrap() - 1, col)
    }

    impl SheetsApi for FakeSheet {
        fn spreadsheet(&self) -> AppResult<SpreadsheetInfo> {
            Ok(SpreadsheetInfo {
                id: "fake".into(),
                title: "Fake".into(),
                url: String::new(),
                sheets: vec![SheetProperties {
                    sheet_id: 0,
                    title: self.title.clone(),
                    row_count: 100,
                    column_count: 7,
                }],
            })
        }

        fn values(&self, _range: &str) -> AppResult<Vec<Vec<String>>> {
            Ok(self.cells.borrow().clone())
        }

        fn update_values(&self, data: &[ValueRange]) -> AppResult<()> {
            self.calls.borrow_mut().push("values");
            for vr in data {
                let (row, col) = parse_a1(&vr.range);
                self.cells.borrow_mut()[row][col] = vr.values[0][0].clone();
            }
            Ok(())
        }

        fn batch_update(&self, requests: &[Request]) -> AppResult<()> {
            self.calls.borrow_mut().push("batch");
            if self.fail_format {
                return Err(AppError::Api { status: 500, body: "backend error".into() });
            }
            for Request::RepeatCell(RepeatCellRequest { range, cell, .. }) in requests {
                let CellData { user_entered_value, user_entered_format } = cell;
                for row in range.start_row_index..range.end_row_index {
                    for col in range.start_column_index..range.end_column_index {
                        if let Some(v) = user_entered_value {
                            self.cells.borrow_mut()[row][col] = v.string_value.clone();
                        }
                        if let Some(f) = user_entered_format {
                            self.colors.borrow_mut().insert((row, col), f.background_color);
                        }
                    }
                }
            }
            Ok(())
        }

        fn background_color(&self, _range: &str) -> AppResult<Option<Color>> {
            Ok(self.reference)
        }
    }

    fn fixture() -> FakeSheet {
        FakeSheet::new(vec![
            vec!["Date", "Hours", "Category", "Task/Work", "Persons", "Invoice", "Paid"],
            vec!["6/1/25", "4", "Bug", "Old work", "BK", "NES01-5540", "Billed"],
            vec!["6/4/25", "17", "Enhancement", "UAT fixes", "BK/DH", "NES01-5541", "WIP"],
            vec!["6/5/25", "15", "Enhancement", "UAT fixes", "BK/DH", "NES01-5541", "WIP"],
        ])
    }

    #[test]
    fn marks_rows_with_two_calls() {
        let fake = fixture();
        let sheet = fake.worksheet();
        let entries: Vec<_> = sheet.entries().collect();
        let billing = BillingSettings::default();

        let report = StatusUpdater::new(&fake, &billing).mark_billed(&sheet, &entries).unwrap();

        assert_eq!(report.rows, vec![3, 4]);
        assert_eq!(*fake.calls.borrow(), vec!["values", "batch"]);
        assert_eq!(fake.status(3), "Billed");
        assert_eq!(fake.status(4), "Billed");
        assert_eq!(fake.status(2), "Billed");
        for col in 0..7 {
            assert_eq!(fake.color(3, col), Some(Color::BILLED));
        }
        assert_eq!(fake.color(3, 7), None);
        assert_eq!(fake.color(2, 0), None);
    }

    #[test]
    fn marking_twice_is_idempotent() {
        let fake = fixture();
        let sheet = fake.worksheet();
        let mut entries: Vec<_> = sheet.entries().collect();
        entries.push(entries[0].clone());
        let billing = BillingSettings::default();
        let updater = StatusUpdater::new(&fake, &billing);

        let first = updater.mark_billed(&sheet, &entries).unwrap();
        let cells = fake.cells.borrow().clone();
        let colors = fake.colors.borrow().clone();

        let second = updater.mark_billed(&sheet, &entries).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.rows, vec![3, 4]);
        assert_eq!(*fake.cells.borrow(), cells);
        assert_eq!(*fake.colors.borrow(), colors);
    }

    #[test]
    fn single_batch_mode_uses_one_call() {
        let fake = fixture();
        let sheet = fake.worksheet();
        let entries: Vec<_> = sheet.entries().collect();
        let billing = BillingSettings {
            single_batch: true,
            ..BillingSettings::default()
        };

        StatusUpdater::new(&fake, &billing).mark_billed(&sheet, &entries).unwrap();
        assert_eq!(*fake.calls.borrow(), vec!["batch"]);
        assert_eq!(fake.status(3), "Billed");
        assert_eq!(fake.color(4, 6), Some(Color::BILLED));
    }

    #[test]
    fn format_failure_keeps_written_status() {
        let mut fake = fixture();
        fake.fail_format = true;
        let sheet = fake.worksheet();
        let entries: Vec<_> = sheet.entries().collect();
        let billing = BillingSettings::default();

        let result = StatusUpdater::new(&fake, &billing).mark_billed(&sheet, &entries);
        assert!(matches!(result, Err(AppError::Api { status: 500, .. })));
        assert_eq!(fake.status(3), "Billed");
        assert_eq!(fake.color(3, 0), None);
    }

    #[test]
    fn fix_colors_recovers_billed_rows_of_one_invoice() {
        let mut fake = fixture();
        fake.reference = Some(Color { red: 1.0, green: 0.8, blue: 0.4, alpha: Some(1.0) });
        let billing = BillingSettings {
            reference_range: Some("A2:G2".into()),
            ..BillingSettings::default()
        };
        // status written but the format call never happened
        {
            let mut cells = fake.cells.borrow_mut();
            cells[2][6] = "Billed".into();
            cells[3][6] = "billed".into();
        }
        let sheet = fake.worksheet();

        let report = StatusUpdater::new(&fake, &billing).fix_colors(&sheet, "NES01-5541").unwrap();
        assert_eq!(report.rows, vec![3, 4]);
        assert_eq!(report.color, fake.reference.unwrap());
        assert_eq!(fake.color(4, 3), fake.reference);
        assert_eq!(fake.color(2, 0), None);
    }

    #[test]
    fn fix_colors_without_matches_makes_no_call() {
        let fake = fixture();
        let sheet = fake.worksheet();
        let billing = BillingSettings::default();
        let report = StatusUpdater::new(&fake, &billing).fix_colors(&sheet, "NES01-9999").unwrap();
        assert!(report.rows.is_empty());
        assert!(fake.calls.borrow().is_empty());
    }

    #[test]
    fn reference_colour_falls_back_to_highlight() {
        let fake = fixture();
        let sheet = fake.worksheet();
        let billing = BillingSettings {
            reference_range: Some("A2:G2".into()),
            ..BillingSettings::default()
        };
        let color = StatusUpdater::new(&fake, &billing).reference_color(&sheet).unwrap();
        assert_eq!(color, Color::BILLED);
    }

    #[test]
    fn marking_uses_the_reference_colour() {
        let mut fake = fixture();
        let reference = Color { red: 1.0, green: 0.8, blue: 0.4, alpha: Some(1.0) };
        fake.reference = Some(reference);
        let sheet = fake.worksheet();
        let entries: Vec<_> = sheet.entries().collect();
        let billing = BillingSettings {
            reference_range: Some("A932:G932".into()),
            ..BillingSettings::default()
        };

        let report = StatusUpdater::new(&fake, &billing).mark_billed(&sheet, &entries).unwrap();
        assert_eq!(report.color, reference);
        assert_eq!(fake.color(3, 0), Some(reference));
        assert_eq!(fake.color(4, 6), Some(reference));
    }

    #[test]
    fn blank_invoice_is_rejected_before_any_write() {
        let fake = fixture();
        fake.cells.borrow_mut()[1][5] = String::new();
        let sheet = fake.worksheet();
        let billing = BillingSettings::default();

        let result = StatusUpdater::new(&fake, &billing).fix_colors(&sheet, "  ");
        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(fake.calls.borrow().is_empty());
        assert_eq!(fake.color(2, 0), None);
    }

    #[test]
    fn missing_status_column_is_an_error() {
        let fake = FakeSheet::new(vec![vec!["Date", "Hours", "Task"], vec!["6/1/25", "1", "x"]]);
        let sheet = fake.worksheet();
        let billing = BillingSettings::default();
        let result = StatusUpdater::new(&fake, &billing).mark_billed(&sheet, &[]);
        assert!(matches!(result, Err(AppError::MissingColumn("status"))));
    }
}
