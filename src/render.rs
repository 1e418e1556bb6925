use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

use crate::config::Settings;
use crate::error::AppResult;
use crate::model::InvoiceRecord;

// Default template, embedded at compile time
const DEFAULT_TEMPLATE: &str = include_str!("../templates/invoice.html.tera");
const TEMPLATE_NAME: &str = "invoice.html";

/// Currency with thousands separators and no decimals: `12852.0` -> `12,852`.
pub fn format_currency(value: f64) -> String {
    let rounded = format!("{:.0}", value);
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) if rest != "0" => ("-", rest),
        Some(rest) => ("", rest),
        None => ("", rounded.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", sign, grouped)
}

/// Hours keep whatever precision the value has; whole numbers print bare.
pub fn format_hours(value: f64) -> String {
    format!("{}", value)
}

#[derive(Serialize)]
struct Amounts {
    total_hours: String,
    hourly_rate: String,
    original_rate: String,
    discount_per_hour: String,
    subtotal: String,
    balance_due: String,
}

#[derive(Serialize)]
struct EntryRow<'a> {
    date: &'a str,
    hours: String,
    category: &'a str,
    description: &'a str,
    persons: &'a str,
}

#[derive(Serialize)]
struct RenderContext<'a> {
    invoice: &'a InvoiceRecord,
    logo: &'a str,
    item_label: &'a str,
    amounts: Amounts,
    rows: Vec<EntryRow<'a>>,
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

pub struct Renderer {
    tera: Tera,
    logo_base64: String,
    item_label: String,
}

impl Renderer {
    pub fn from_settings(settings: &Settings) -> AppResult<Self> {
        let template = match settings.template_path() {
            Some(path) => Some(fs::read_to_string(&path)?),
            None => None,
        };
        let logo = load_logo(&settings.logo_path());
        Self::new(template.as_deref(), logo, &settings.invoice.item_label)
    }

    /// `template` overrides the embedded one; an empty `logo_base64` leaves
    /// the logo out.
    pub fn new(template: Option<&str>, logo_base64: String, item_label: &str) -> AppResult<Self> {
        let mut tera = Tera::default();
        tera.set_escape_fn(escape_html);
        tera.add_raw_template(TEMPLATE_NAME, template.unwrap_or(DEFAULT_TEMPLATE))?;
        Ok(Self {
            tera,
            logo_base64,
            item_label: item_label.to_string(),
        })
    }

    pub fn render_html(&self, invoice: &InvoiceRecord) -> AppResult<String> {
        let s = &invoice.summary;
        let context_data = RenderContext {
            invoice,
            logo: &self.logo_base64,
            item_label: &self.item_label,
            amounts: Amounts {
                total_hours: format_hours(s.total_hours),
                hourly_rate: format_currency(s.hourly_rate),
                original_rate: format_currency(s.original_rate),
                discount_per_hour: format_currency(s.discount_per_hour),
                subtotal: format_currency(s.subtotal),
                balance_due: format_currency(s.balance_due),
            },
            rows: invoice
                .entries
                .iter()
                .map(|e| EntryRow {
                    date: &e.date,
                    hours: format_hours(e.hours),
                    category: &e.category,
                    description: &e.description,
                    persons: &e.persons,
                })
                .collect(),
        };

        let context = Context::from_serialize(&context_data)?;
        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }
}

/// Logo file as base64, or empty when it can't be read.
pub fn load_logo(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => STANDARD.encode(bytes),
        Err(e) => {
            tracing::debug!("no logo at {}: {}", path.display(), e);
            String::new()
        }
    }
}

/// Files written for one invoice, keyed by format.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OutputFiles {
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
}

impl OutputFiles {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Path)> {
        [("html", &self.html), ("json", &self.json), ("pdf", &self.pdf)]
            .into_iter()
            .filter_map(|(kind, path)| path.as_deref().map(|p| (kind, p)))
    }
}

/// Writes `<number>.html` and `<number>.json` into `output_dir` for the
/// enabled formats.
pub fn save_files(
    invoice: &InvoiceRecord,
    html: &str,
    output_dir: &Path,
    generate_html: bool,
    generate_json: bool,
) -> AppResult<OutputFiles> {
    fs::create_dir_all(output_dir)?;
    let mut files = OutputFiles::default();

    if generate_html {
        let html_path = output_dir.join(format!("{}.html", invoice.invoice_number));
        fs::write(&html_path, html)?;
        files.html = Some(html_path);
    }

    if generate_json {
        let json_path = output_dir.join(format!("{}.json", invoice.invoice_number));
        fs::write(&json_path, serde_json::to_string_pretty(invoice)?)?;
        files.json = Some(json_path);
    }

    Ok(files)
}

pub fn read_invoice_json(path: &Path) -> AppResult<InvoiceRecord> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClientProfile, CompanyProfile, InvoiceSummary, WorkEntry};

    fn invoice() -> InvoiceRecord {
        InvoiceRecord {
            invoice_number: "NES01-5541".into(),
            invoice_date: "6/10/25".into(),
            bill_to: ClientProfile {
                name: "Acme Corp".into(),
                address: "1 Main St".into(),
                city_state_zip: "Springfield, IL 62701".into(),
                customer_id: "NES01".into(),
            },
            sales_rep: "BK".into(),
            terms: "Net 15".into(),
            entries: vec![
                WorkEntry {
                    date: "6/4/25".into(),
                    hours: 17.0,
                    category: "Enhancement".into(),
                    description: "UAT <bug> tracker".into(),
                    persons: "BK/DH".into(),
                    invoice: "NES01-5541".into(),
                    source_row: 2,
                },
                WorkEntry {
                    date: "6/5/25".into(),
                    hours: 7.5,
                    category: "Bug".into(),
                    description: "Prod fixes".into(),
                    persons: "DH".into(),
                    invoice: "NES01-5541".into(),
                    source_row: 3,
                },
            ],
            summary: InvoiceSummary {
                total_hours: 24.5,
                hourly_rate: 126.0,
                original_rate: 175.0,
                discount_per_hour: 49.0,
                subtotal: 3087.0,
                balance_due: 3087.0,
            },
            payment_info: CompanyProfile {
                name: "W3 Evolutions".into(),
                address: "PO Box 1".into(),
                zelle: "pay@example.com".into(),
            },
        }
    }

    #[test]
    fn currency_groups_thousands_without_decimals() {
        assert_eq!(format_currency(12852.0), "12,852");
        assert_eq!(format_currency(126.0), "126");
        assert_eq!(format_currency(0.0), "0");
        assert_eq!(format_currency(1234567.6), "1,234,568");
        assert_eq!(format_currency(100000.0), "100,000");
        assert_eq!(format_currency(-4500.0), "-4,500");
    }

    #[test]
    fn hours_keep_source_precision() {
        assert_eq!(format_hours(102.0), "102");
        assert_eq!(format_hours(7.25), "7.25");
    }

    #[test]
    fn html_lists_charges_totals_and_entries() {
        let renderer = Renderer::new(None, String::new(), "Enhancement").unwrap();
        let html = renderer.render_html(&invoice()).unwrap();

        assert!(html.contains("Invoice NES01-5541"));
        assert!(html.contains("<td>24.5</td>"));
        assert!(html.contains("$49 / hr off<br>$175 / hr"));
        assert!(html.contains("$3,087"));
        assert!(html.contains("<td>BK/DH</td>"));
        assert!(html.contains("<td>6/4/25</td>"));
        assert!(html.contains("<td>7.5</td>"));
        assert!(html.contains("UAT &lt;bug&gt; tracker"));
        assert!(!html.contains("data:image/png"));

        let first = html.find("UAT &lt;bug&gt;").unwrap();
        let second = html.find("Prod fixes").unwrap();
        assert!(first < second);
    }

    #[test]
    fn logo_is_inlined_as_base64() {
        let renderer = Renderer::new(None, "iVBORw0KGgo=".into(), "Enhancement").unwrap();
        let html = renderer.render_html(&invoice()).unwrap();
        assert!(html.contains("data:image/png;base64,iVBORw0KGgo="));
    }

    #[test]
    fn custom_template_replaces_default() {
        let renderer = Renderer::new(
            Some("{{ invoice.invoice_number }}|{{ amounts.balance_due }}|{{ rows | length }}"),
            String::new(),
            "Enhancement",
        )
        .unwrap();
        assert_eq!(renderer.render_html(&invoice()).unwrap(), "NES01-5541|3,087|2");
    }

    #[test]
    fn missing_logo_is_empty() {
        assert_eq!(load_logo(Path::new("/nonexistent/logo.png")), "");
    }

    #[test]
    fn json_sibling_round_trips() {
        let dir = std::env::temp_dir().join("wip_invoice_render_json_round_trip");
        fs::remove_dir_all(&dir).ok();
        let inv = invoice();

        let files = save_files(&inv, "<html></html>", &dir, false, true).unwrap();
        assert!(files.html.is_none());
        let json_path = files.json.clone().unwrap();
        assert_eq!(json_path, dir.join("NES01-5541.json"));

        let back = read_invoice_json(&json_path).unwrap();
        assert_eq!(back, inv);
        assert_eq!(files.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["json"]);
        fs::remove_dir_all(&dir).ok();
    }
}
