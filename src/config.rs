use directories::BaseDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::model::{ClientProfile, Color, CompanyProfile};

pub const SETTINGS_FILE: &str = "invoice.toml";

// ==========================================
// Settings
// ==========================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    pub sheets: SheetsSettings,
    pub client: ClientProfile,
    pub company: CompanyProfile,
    pub invoice: InvoiceSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub pdf: PdfSettings,
    #[serde(default)]
    pub billing: BillingSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SheetsSettings {
    /// Bare spreadsheet id or the full browser URL.
    pub spreadsheet: String,
    #[serde(default = "default_worksheet")]
    pub worksheet: String,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DateOrder {
    #[default]
    Chronological,
    Lexicographic,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InvoiceSettings {
    pub hourly_rate: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub terms: String,
    #[serde(default)]
    pub sales_rep: String,
    #[serde(default = "default_item_label")]
    pub item_label: String,
    pub default_number: Option<String>,
    #[serde(default)]
    pub date_order: DateOrder,
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
    #[serde(default = "default_logo_path")]
    pub logo_path: String,
    pub template: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputSettings {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_true")]
    pub generate_html: bool,
    #[serde(default = "default_true")]
    pub generate_json: bool,
    #[serde(default)]
    pub generate_pdf: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            generate_html: true,
            generate_json: true,
            generate_pdf: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PdfSettings {
    #[serde(default = "default_pdf_binary")]
    pub binary: String,
    #[serde(default = "default_page_size")]
    pub page_size: String,
    /// Applied to all four sides.
    #[serde(default = "default_margin")]
    pub margin: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_true")]
    pub auto_install: bool,
    #[serde(default = "default_install_commands")]
    pub install_commands: Vec<Vec<String>>,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            binary: default_pdf_binary(),
            page_size: default_page_size(),
            margin: default_margin(),
            encoding: default_encoding(),
            auto_install: true,
            install_commands: default_install_commands(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BillingSettings {
    #[serde(default = "default_status_label")]
    pub status_label: String,
    #[serde(default = "default_highlight")]
    pub highlight: Color,
    /// Row highlight covers columns `0..highlight_columns`.
    #[serde(default = "default_highlight_columns")]
    pub highlight_columns: usize,
    /// Known-good billed range (A1 notation, e.g. "A932:G932") to copy the colour from.
    pub reference_range: Option<String>,
    /// Send status values and highlight in one atomic batch instead of two calls.
    #[serde(default)]
    pub single_batch: bool,
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            status_label: default_status_label(),
            highlight: default_highlight(),
            highlight_columns: default_highlight_columns(),
            reference_range: None,
            single_batch: false,
        }
    }
}

fn default_worksheet() -> String {
    "Sheet1".to_string()
}
fn default_credentials_path() -> String {
    "credentials/service_account_credentials.json".to_string()
}
fn default_api_base() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}
fn default_item_label() -> String {
    "Enhancement".to_string()
}
fn default_date_formats() -> Vec<String> {
    vec!["%m/%d/%y".into(), "%m/%d/%Y".into(), "%Y-%m-%d".into()]
}
fn default_logo_path() -> String {
    "assets/logo.png".to_string()
}
fn default_output_dir() -> String {
    "output".to_string()
}
fn default_true() -> bool {
    true
}
fn default_pdf_binary() -> String {
    "wkhtmltopdf".to_string()
}
fn default_page_size() -> String {
    "A4".to_string()
}
fn default_margin() -> String {
    "0.75in".to_string()
}
fn default_encoding() -> String {
    "UTF-8".to_string()
}
fn default_install_commands() -> Vec<Vec<String>> {
    vec![
        vec!["sudo".into(), "apt-get".into(), "update".into(), "-y".into()],
        vec![
            "sudo".into(),
            "apt-get".into(),
            "install".into(),
            "-y".into(),
            "wkhtmltopdf".into(),
        ],
    ]
}
fn default_status_label() -> String {
    "Billed".to_string()
}
fn default_highlight() -> Color {
    Color::BILLED
}
fn default_highlight_columns() -> usize {
    7
}

impl Settings {
    /// Read and validate the settings file.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::ConfigNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| match e {
            AppError::ConfigParse { source, .. } => AppError::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let settings: Settings =
            toml::from_str(content).map_err(|source| AppError::ConfigParse {
                path: PathBuf::from(SETTINGS_FILE),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> AppResult<()> {
        if self.sheets.spreadsheet.trim().is_empty() {
            return Err(AppError::Config("sheets.spreadsheet is empty".into()));
        }
        if self.sheets.worksheet.trim().is_empty() {
            return Err(AppError::Config("sheets.worksheet is empty".into()));
        }
        if !(self.invoice.hourly_rate.is_finite() && self.invoice.hourly_rate >= 0.0) {
            return Err(AppError::Config(format!(
                "invoice.hourly_rate must be a non-negative number, got {}",
                self.invoice.hourly_rate
            )));
        }
        if !(self.invoice.discount.is_finite() && self.invoice.discount >= 0.0) {
            return Err(AppError::Config(format!(
                "invoice.discount must be a non-negative number, got {}",
                self.invoice.discount
            )));
        }
        if self.billing.highlight_columns == 0 {
            return Err(AppError::Config("billing.highlight_columns must be at least 1".into()));
        }
        if let Some(range) = &self.billing.reference_range {
            let re = Regex::new(r"^[A-Za-z]+[0-9]+(:[A-Za-z]+[0-9]+)?$")
                .map_err(|e| AppError::Config(e.to_string()))?;
            if !re.is_match(range.trim()) {
                return Err(AppError::Config(format!(
                    "billing.reference_range '{}' is not an A1 range",
                    range
                )));
            }
        }
        Ok(())
    }

    /// Spreadsheet id, extracted from the URL when one was configured.
    pub fn spreadsheet_id(&self) -> String {
        spreadsheet_id(&self.sheets.spreadsheet)
    }

    pub fn credentials_path(&self) -> PathBuf {
        PathBuf::from(expand_home_dir(&self.sheets.credentials_path))
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(expand_home_dir(&self.output.output_dir))
    }

    pub fn logo_path(&self) -> PathBuf {
        PathBuf::from(expand_home_dir(&self.invoice.logo_path))
    }

    pub fn template_path(&self) -> Option<PathBuf> {
        self.invoice
            .template
            .as_deref()
            .map(|t| PathBuf::from(expand_home_dir(t)))
    }
}

pub fn spreadsheet_id(raw: &str) -> String {
    let raw = raw.trim();
    let re = Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").ok();
    re.and_then(|re| re.captures(raw).map(|c| c[1].to_string()))
        .unwrap_or_else(|| raw.to_string())
}

pub fn expand_home_dir(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}

// ==========================================
// Service-account credentials
// ==========================================

const REQUIRED_CREDENTIAL_FIELDS: [&str; 4] = ["type", "project_id", "private_key", "client_email"];

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceAccount {
    #[serde(rename = "type")]
    pub kind: String,
    pub project_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccount {
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::CredentialsNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Checks the required fields before anything is sent over the network.
    pub fn from_json(content: &str) -> AppResult<Self> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| AppError::Credentials(format!("invalid JSON: {}", e)))?;
        let object = value
            .as_object()
            .ok_or_else(|| AppError::Credentials("expected a JSON object".into()))?;

        let missing: Vec<&str> = REQUIRED_CREDENTIAL_FIELDS
            .iter()
            .copied()
            .filter(|field| object.get(*field).and_then(|v| v.as_str()).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Credentials(format!(
                "missing fields: {}",
                missing.join(", ")
            )));
        }

        let account: ServiceAccount = serde_json::from_value(value)
            .map_err(|e| AppError::Credentials(e.to_string()))?;
        if account.kind != "service_account" {
            return Err(AppError::Credentials(format!(
                "type must be 'service_account', got '{}'",
                account.kind
            )));
        }
        Ok(account)
    }
}
