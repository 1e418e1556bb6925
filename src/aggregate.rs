use chrono::NaiveDate;

use crate::config::{DateOrder, Settings};
use crate::error::{AppError, AppResult};
use crate::model::{ClientProfile, CompanyProfile, InvoiceRecord, InvoiceSummary, WorkEntry};

/// Everything the aggregator needs from the settings.
#[derive(Debug, Clone)]
pub struct RateConfig {
    pub hourly_rate: f64,
    pub discount: f64,
    pub date_order: DateOrder,
    pub date_formats: Vec<String>,
    pub bill_to: ClientProfile,
    pub payment_info: CompanyProfile,
    pub sales_rep: String,
    pub terms: String,
}

impl RateConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            hourly_rate: settings.invoice.hourly_rate,
            discount: settings.invoice.discount,
            date_order: settings.invoice.date_order,
            date_formats: settings.invoice.date_formats.clone(),
            bill_to: settings.client.clone(),
            payment_info: settings.company.clone(),
            sales_rep: settings.invoice.sales_rep.clone(),
            terms: settings.invoice.terms.clone(),
        }
    }
}

/// Builds the invoice for one billing cycle. Callers check for an empty
/// entry set first and report "no billable work" themselves.
pub fn build_invoice(
    entries: Vec<WorkEntry>,
    invoice_number: String,
    rates: &RateConfig,
) -> AppResult<InvoiceRecord> {
    if entries.is_empty() {
        return Err(AppError::NoBillableWork);
    }

    let total_hours: f64 = entries.iter().map(|e| e.hours).sum();
    let subtotal = total_hours * rates.hourly_rate;
    let summary = InvoiceSummary {
        total_hours,
        hourly_rate: rates.hourly_rate,
        original_rate: rates.hourly_rate + rates.discount,
        discount_per_hour: rates.discount,
        subtotal,
        // the rate already carries the discount
        balance_due: subtotal,
    };

    let invoice_date = invoice_date(&entries, rates.date_order, &rates.date_formats)
        .unwrap_or_default();

    Ok(InvoiceRecord {
        invoice_number,
        invoice_date,
        bill_to: rates.bill_to.clone(),
        sales_rep: rates.sales_rep.clone(),
        terms: rates.terms.clone(),
        entries,
        summary,
        payment_info: rates.payment_info.clone(),
    })
}

/// Latest work date, as written in the sheet.
///
/// `Chronological` parses every date with the given formats and falls back to
/// the plain string maximum if any of them doesn't parse.
pub fn invoice_date(entries: &[WorkEntry], order: DateOrder, formats: &[String]) -> Option<String> {
    let lexicographic = || entries.iter().map(|e| e.date.as_str()).max().map(str::to_string);

    match order {
        DateOrder::Lexicographic => lexicographic(),
        DateOrder::Chronological => {
            let parsed: Option<Vec<(NaiveDate, &str)>> = entries
                .iter()
                .map(|e| parse_date(&e.date, formats).map(|d| (d, e.date.as_str())))
                .collect();
            match parsed {
                // first of equal maxima keeps the earliest row's spelling
                Some(dates) => dates
                    .into_iter()
                    .fold(None, |best: Option<(NaiveDate, &str)>, cur| match best {
                        Some(b) if b.0 >= cur.0 => Some(b),
                        _ => Some(cur),
                    })
                    .map(|(_, raw)| raw.to_string()),
                None => {
                    tracing::warn!(
                        "some work dates don't match {:?}, using the string maximum as invoice date",
                        formats
                    );
                    lexicographic()
                }
            }
        }
    }
}

fn parse_date(raw: &str, formats: &[String]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw.trim(), f).ok())
}

/// Most frequent non-empty invoice id; ties go to the one seen first.
pub fn invoice_number(entries: &[WorkEntry]) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for invoice in entries.iter().map(|e| e.invoice.trim()).filter(|i| !i.is_empty()) {
        match counts.iter_mut().find(|(id, _)| *id == invoice) {
            Some((_, n)) => *n += 1,
            None => counts.push((invoice, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (id, n) in counts {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((id, n));
        }
    }
    best.map(|(id, _)| id.to_string())
}

/// Hours per category in first-seen order.
pub fn hours_by_category(entries: &[WorkEntry]) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, f64)> = Vec::new();
    for entry in entries {
        match totals.iter_mut().find(|(c, _)| *c == entry.category) {
            Some((_, hours)) => *hours += entry.hours,
            None => totals.push((entry.category.clone(), entry.hours)),
        }
    }
    totals
}
