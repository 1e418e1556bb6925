use comfy_table::{Attribute, Cell, Table};
use inquire::Confirm;
use regex::Regex;
use std::path::Path;

use crate::aggregate::{self, RateConfig};
use crate::config::{BillingSettings, ServiceAccount, Settings};
use crate::error::{AppError, AppResult};
use crate::extract::{WIP_STATUS, Worksheet};
use crate::columns::Field;
use crate::model::{Color, InvoiceRecord, WorkEntry};
use crate::pdf::{PdfConverter, pdf_path_for};
use crate::render::{self, OutputFiles, Renderer, format_currency, format_hours};
use crate::sheets::{self, SheetsApi, SheetsClient, SpreadsheetInfo, quote_sheet};
use crate::status::StatusUpdater;

const RULE: &str = "==================================================";

pub struct Generated {
    pub invoice: InvoiceRecord,
    pub files: OutputFiles,
}

// ==========================================
// Shared helpers
// ==========================================

pub fn connect(settings: &Settings) -> AppResult<SheetsClient> {
    let account = ServiceAccount::load(&settings.credentials_path())?;
    let client = SheetsClient::connect(&settings.sheets.api_base, &settings.spreadsheet_id(), &account)?;
    println!("✅ Successfully authenticated and connected to spreadsheet");
    Ok(client)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

fn entries_table(entries: &[WorkEntry]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Row"),
        Cell::new("Date"),
        Cell::new("Hours"),
        Cell::new("Category"),
        Cell::new("Task/Work"),
        Cell::new("Persons"),
        Cell::new("Invoice"),
    ]);
    for e in entries {
        table.add_row(vec![
            Cell::new(e.source_row),
            Cell::new(&e.date),
            Cell::new(format_hours(e.hours)),
            Cell::new(&e.category),
            Cell::new(truncate(&e.description, 50)),
            Cell::new(&e.persons),
            Cell::new(&e.invoice),
        ]);
    }
    let total: f64 = entries.iter().map(|e| e.hours).sum();
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(format_hours(total)).add_attribute(Attribute::Bold),
    ]);
    table
}

// ==========================================
// Invoice generation
// ==========================================

/// Aggregates the entries, renders the invoice and writes the enabled
/// output formats. PDF failures are reported but never fail the run.
pub fn build_and_render(settings: &Settings, entries: Vec<WorkEntry>) -> AppResult<Generated> {
    if entries.is_empty() {
        return Err(AppError::NoBillableWork);
    }
    let invoice_number = aggregate::invoice_number(&entries)
        .or_else(|| settings.invoice.default_number.clone())
        .ok_or(AppError::NoInvoiceNumber)?;
    println!("📄 Generating Invoice: {}", invoice_number);

    let invoice = aggregate::build_invoice(entries, invoice_number, &RateConfig::from_settings(settings))?;
    let renderer = Renderer::from_settings(settings)?;
    let html = renderer.render_html(&invoice)?;

    let mut files = render::save_files(
        &invoice,
        &html,
        &settings.output_dir(),
        settings.output.generate_html,
        settings.output.generate_json,
    )?;

    if settings.output.generate_pdf {
        if let Some(html_path) = files.html.clone() {
            println!("📄 Converting to PDF...");
            let converter = PdfConverter::new(&settings.pdf);
            match converter.convert(&html_path, &pdf_path_for(&html_path)) {
                Ok(pdf) => {
                    println!("✅ PDF generated: {}", pdf.display());
                    files.pdf = Some(pdf);
                }
                Err(e) => println!("❌ {}", e),
            }
        } else {
            println!("⚠️  PDF requested but HTML output is disabled, skipping PDF");
        }
    }

    Ok(Generated { invoice, files })
}

pub fn print_generated(generated: &Generated) {
    let inv = &generated.invoice;
    println!("\n🎉 Invoice Generated Successfully!");
    println!("{}", RULE);
    println!("📊 Invoice Number: {}", inv.invoice_number);
    println!("📅 Invoice Date: {}", inv.invoice_date);
    println!("⏰ Total Hours: {}", format_hours(inv.summary.total_hours));
    println!("💰 Total Amount: ${}", format_currency(inv.summary.balance_due));

    println!("\n📁 Files Created:");
    for (kind, path) in generated.files.iter() {
        println!("   {}: {}", kind.to_uppercase(), path.display());
    }
}

pub fn generate(settings: &Settings) -> AppResult<()> {
    println!("🚀 WIP Invoice Generator");
    println!("{}", RULE);
    println!("📊 Reading WIP data from Google Sheets...");

    let client = connect(settings)?;
    let sheet = sheets::fetch_worksheet(&client, &settings.sheets.worksheet)?;
    let entries: Vec<WorkEntry> = sheet.entries().collect();
    if entries.is_empty() {
        return Err(AppError::NoBillableWork);
    }
    println!("✅ Found {} WIP entries", entries.len());

    let generated = build_and_render(settings, entries)?;
    print_generated(&generated);

    println!("\n✅ Invoice ready for delivery!");
    println!("💡 Once it is sent, run `wip-invoice bill` to mark these rows as {}.", settings.billing.status_label);
    Ok(())
}

// ==========================================
// Write-back
// ==========================================

/// Shows the WIP rows, asks for confirmation, then marks them billed.
/// With `invoice`, only the WIP rows carrying that invoice id are touched.
pub fn bill(settings: &Settings, assume_yes: bool, invoice: Option<&str>) -> AppResult<()> {
    let client = connect(settings)?;
    let sheet = sheets::fetch_worksheet(&client, &settings.sheets.worksheet)?;
    bill_sheet(&client, &sheet, settings, assume_yes, invoice)
}

pub fn bill_sheet<A: SheetsApi + ?Sized>(
    api: &A,
    sheet: &Worksheet,
    settings: &Settings,
    assume_yes: bool,
    invoice: Option<&str>,
) -> AppResult<()> {
    let invoice = invoice.map(str::trim);
    if invoice == Some("") {
        return Err(AppError::Config("invoice number must not be empty".into()));
    }

    let entries: Vec<WorkEntry> = sheet
        .entries()
        .filter(|e| invoice.is_none_or(|id| e.invoice == id))
        .collect();
    if entries.is_empty() {
        match invoice {
            Some(id) => println!("ℹ️  No WIP entries for {} to mark as {}", id, settings.billing.status_label),
            None => println!("ℹ️  No WIP entries to mark as {}", settings.billing.status_label),
        }
        return Ok(());
    }

    println!("{}", entries_table(&entries));
    let label = &settings.billing.status_label;

    let confirmed = assume_yes
        || Confirm::new(&format!(
            "Update these {} entries to '{}' with highlighting?",
            entries.len(),
            label
        ))
        .with_default(false)
        .prompt()?;

    if !confirmed {
        println!("ℹ️  Entries left unchanged");
        return Ok(());
    }

    println!("🔄 Updating entries to {}...", label);
    let report = StatusUpdater::new(api, &settings.billing).mark_billed(sheet, &entries)?;
    println!("✅ Successfully updated {} rows to {}", report.rows.len(), report.label);
    Ok(())
}

/// Recovery path for a status update whose highlight step failed.
pub fn fix_colors(settings: &Settings, invoice: &str) -> AppResult<()> {
    let client = connect(settings)?;
    let sheet = sheets::fetch_worksheet(&client, &settings.sheets.worksheet)?;

    println!("🎨 Fixing color of {} rows for {}...", settings.billing.status_label, invoice);
    let updater = StatusUpdater::new(&client, &settings.billing);
    let report = updater.fix_colors(&sheet, invoice)?;
    println!("🎨 Using reference color: {:?}", report.color);

    if report.rows.is_empty() {
        println!("ℹ️  No {} entries found for {}", report.label, invoice);
    } else {
        println!("✅ Fixed color for {} rows: {:?}", report.rows.len(), report.rows);
    }
    Ok(())
}

// ==========================================
// Diagnostics
// ==========================================

pub fn recent(settings: &Settings, count: usize) -> AppResult<()> {
    let client = connect(settings)?;
    let sheet = sheets::fetch_worksheet(&client, &settings.sheets.worksheet)?;
    println!("📊 Headers: {:?}", sheet.headers());
    println!("📊 Total rows: {}", sheet.row_count());
    println!("{}", recent_table(&sheet, count));
    println!("📊 Total WIP entries found: {}", count_wip(&sheet));
    Ok(())
}

pub fn recent_table(sheet: &Worksheet, count: usize) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Row"),
        Cell::new("Date"),
        Cell::new("Hours"),
        Cell::new("Category"),
        Cell::new("Task/Work"),
        Cell::new("Persons"),
        Cell::new("Invoice"),
        Cell::new("Status"),
    ]);
    let skip = sheet.row_count().saturating_sub(count);
    for (n, row) in sheet.data_rows().skip(skip) {
        table.add_row(vec![
            Cell::new(n),
            Cell::new(sheet.cell(row, Field::Date)),
            Cell::new(sheet.cell(row, Field::Hours)),
            Cell::new(sheet.cell(row, Field::Category)),
            Cell::new(truncate(sheet.cell(row, Field::Task), 30)),
            Cell::new(sheet.cell(row, Field::Persons)),
            Cell::new(sheet.cell(row, Field::Invoice)),
            Cell::new(sheet.cell(row, Field::Status)),
        ]);
    }
    table
}

/// Rows whose status reads WIP, regardless of whether they are billable.
pub fn count_wip(sheet: &Worksheet) -> usize {
    sheet
        .data_rows()
        .filter(|(_, row)| sheet.cell(row, Field::Status).to_uppercase() == WIP_STATUS)
        .count()
}

/// Step-by-step setup check: settings, credentials, authentication, reading.
pub fn check(config_path: &Path) -> AppResult<()> {
    println!("🔐 WIP Invoice Generator - Setup Check\n");
    let mut results: Vec<(&str, bool)> = Vec::new();

    println!("🧪 Testing configuration file...");
    let settings = match Settings::load(config_path) {
        Ok(s) => {
            println!("✅ Configuration file is valid");
            println!("📊 Spreadsheet ID: {}", s.spreadsheet_id());
            println!("📋 Worksheet: {}", s.sheets.worksheet);
            Some(s)
        }
        Err(e) => {
            println!("❌ {}", e);
            None
        }
    };
    results.push(("Configuration File", settings.is_some()));

    println!("\n🧪 Testing credentials file...");
    let account = settings.as_ref().and_then(|s| match ServiceAccount::load(&s.credentials_path()) {
        Ok(a) => {
            println!("✅ Credentials file is valid");
            println!("📧 Service Account Email: {}", a.client_email);
            println!("🏗️  Project ID: {}", a.project_id);
            Some(a)
        }
        Err(e) => {
            println!("❌ {}", e);
            None
        }
    });
    results.push(("Credentials File", account.is_some()));

    println!("\n🧪 Testing Google Sheets authentication...");
    let client = match (&settings, &account) {
        (Some(s), Some(a)) => {
            match SheetsClient::connect(&s.sheets.api_base, &s.spreadsheet_id(), a)
                .and_then(|c| c.spreadsheet().map(|info| (c, info)))
            {
                Ok((c, info)) => {
                    println!("✅ Authentication successful!");
                    println!("{}", describe_spreadsheet(&info, &c.identity()));
                    Some(c)
                }
                Err(e) => {
                    println!("❌ {}", e);
                    println!("💡 Ensure the spreadsheet is shared with the service account email");
                    None
                }
            }
        }
        _ => {
            println!("⏭️  Skipped");
            None
        }
    };
    results.push(("Google Sheets Authentication", client.is_some()));

    println!("\n🧪 Testing WIP entry reading...");
    let reading = match (&settings, &client) {
        (Some(s), Some(c)) => match sheets::fetch_worksheet(c, &s.sheets.worksheet) {
            Ok(sheet) => {
                print_wip_summary(&sheet.entries().collect::<Vec<_>>());
                true
            }
            Err(e) => {
                println!("❌ {}", e);
                false
            }
        },
        _ => {
            println!("⏭️  Skipped");
            false
        }
    };
    results.push(("WIP Entry Reading", reading));

    if let Some(s) = settings.as_ref().filter(|s| s.billing.reference_range.is_some()) {
        println!("\n🧪 Testing reference formatting...");
        let formatting = match &client {
            Some(c) => match sheets::fetch_worksheet(c, &s.sheets.worksheet)
                .and_then(|sheet| reference_formatting(c, &sheet, &s.billing))
            {
                Ok(_) => true,
                Err(e) => {
                    println!("❌ {}", e);
                    false
                }
            },
            None => {
                println!("⏭️  Skipped");
                false
            }
        };
        results.push(("Reference Formatting", formatting));
    }

    println!("\n{}", RULE);
    println!("📊 CHECK SUMMARY");
    println!("{}", RULE);
    for (name, ok) in &results {
        println!("{} - {}", if *ok { "✅ PASS" } else { "❌ FAIL" }, name);
    }
    let failed = results.iter().filter(|(_, ok)| !ok).count();
    println!("\n🎯 Results: {}/{} checks passed", results.len() - failed, results.len());

    if failed > 0 {
        return Err(AppError::ChecksFailed {
            failed,
            total: results.len(),
        });
    }
    println!("\n🎉 All checks passed! Run: wip-invoice");
    Ok(())
}

/// Spreadsheet title, id, URL, sharing identity and worksheet grid sizes.
pub fn describe_spreadsheet(info: &SpreadsheetInfo, identity: &str) -> String {
    let mut lines = vec![
        format!("📊 Spreadsheet: {}", info.title),
        format!("🆔 Spreadsheet ID: {}", info.id),
        format!("🔗 URL: {}", info.url),
        format!("📧 Shared with: {}", identity),
        format!("📋 Worksheets: {}", info.sheets.len()),
    ];
    for ws in &info.sheets {
        lines.push(format!("   - {}: {} rows × {} columns", ws.title, ws.row_count, ws.column_count));
    }
    lines.join("\n")
}

/// Prints the rows of `[billing].reference_range` and the background colour
/// of its first cell. Returns that colour, `None` when no range is set or the
/// cell has no fill.
pub fn reference_formatting<A: SheetsApi + ?Sized>(
    api: &A,
    sheet: &Worksheet,
    billing: &BillingSettings,
) -> AppResult<Option<Color>> {
    let Some(range) = billing.reference_range.as_deref().map(str::trim) else {
        println!("ℹ️  No reference_range configured, billed rows use {:?}", billing.highlight);
        return Ok(None);
    };
    let (first, last) = range_rows(range)
        .ok_or_else(|| AppError::Config(format!("billing.reference_range '{}' is not an A1 range", range)))?;

    println!("📊 Rows {}-{}:", first, last);
    for (n, row) in sheet.data_rows().filter(|(n, _)| (first..=last).contains(n)) {
        println!(
            "Row {}: {} | {}h | {} | {} | {} | {} | {}",
            n,
            sheet.cell(row, Field::Date),
            sheet.cell(row, Field::Hours),
            sheet.cell(row, Field::Category),
            truncate(sheet.cell(row, Field::Task), 30),
            sheet.cell(row, Field::Persons),
            sheet.cell(row, Field::Invoice),
            sheet.cell(row, Field::Status),
        );
    }

    let a1 = format!("{}!{}", quote_sheet(&sheet.title), range);
    let color = api.background_color(&a1)?;
    match &color {
        Some(c) => println!("🎨 Background color of {}: {:?}", range, c),
        None => println!("ℹ️  {} has no background color", range),
    }
    Ok(color)
}

/// First and last row numbers of an A1 range such as `A932:G938`.
fn range_rows(range: &str) -> Option<(usize, usize)> {
    let re = Regex::new(r"^[A-Za-z]+([0-9]+)(?::[A-Za-z]+([0-9]+))?$").ok()?;
    let caps = re.captures(range)?;
    let first: usize = caps[1].parse().ok()?;
    let last: usize = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => first,
    };
    Some((first.min(last), first.max(last)))
}

fn print_wip_summary(entries: &[WorkEntry]) {
    if entries.is_empty() {
        println!("ℹ️  No WIP entries found");
        println!("💡 Make sure some entries are marked as '{}' in the Paid column", WIP_STATUS);
        return;
    }
    println!("✅ Found {} WIP entries", entries.len());
    let total: f64 = entries.iter().map(|e| e.hours).sum();
    println!("⏱️  Total Hours: {}", format_hours(total));
    for (category, hours) in aggregate::hours_by_category(entries) {
        println!("   - {}: {} hours", category, format_hours(hours));
    }

    println!("\n📋 Sample WIP entries:");
    for (i, e) in entries.iter().take(3).enumerate() {
        println!("   {}. {}: {}h - {}", i + 1, e.date, format_hours(e.hours), truncate(&e.description, 50));
    }
    if entries.len() > 3 {
        println!("   ... and {} more entries", entries.len() - 3);
    }
}
