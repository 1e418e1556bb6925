use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "Enhancement";

/// Customer the invoice is addressed to.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ClientProfile {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city_state_zip: String,
    #[serde(default)]
    pub customer_id: String,
}

/// Company being paid: where checks go and how to send money.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct CompanyProfile {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub zelle: String,
}

/// One billable row of the time-tracking sheet.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorkEntry {
    pub date: String, // kept verbatim from the sheet
    pub hours: f64,
    pub category: String,
    pub description: String,
    pub persons: String,
    pub invoice: String,
    /// 1-based sheet row, used when writing the status back.
    pub source_row: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InvoiceSummary {
    pub total_hours: f64,
    pub hourly_rate: f64,
    pub original_rate: f64,
    pub discount_per_hour: f64,
    pub subtotal: f64,
    pub balance_due: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InvoiceRecord {
    pub invoice_number: String,
    pub invoice_date: String,
    pub bill_to: ClientProfile,
    pub sales_rep: String,
    pub terms: String,
    pub entries: Vec<WorkEntry>,
    pub summary: InvoiceSummary,
    pub payment_info: CompanyProfile,
}

/// RGB(A) colour as the Sheets API spells it; components are 0.0..=1.0 and
/// the API omits zero components, hence the defaults.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Color {
    #[serde(default)]
    pub red: f64,
    #[serde(default)]
    pub green: f64,
    #[serde(default)]
    pub blue: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
}

impl Color {
    /// Orange used on billed rows.
    pub const BILLED: Color = Color {
        red: 1.0,
        green: 0.6,
        blue: 0.0,
        alpha: None,
    };
}
