//! Unified application error type.
//! Every module returns `AppError` so the binary can print one line and
//! turn it into an exit code.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO / serialization
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    // ---------------------------
    // Configuration
    // ---------------------------
    #[error("{} not found. Please run from the invoice directory.", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Failed to parse {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    // ---------------------------
    // Credentials
    // ---------------------------
    #[error("Credentials file not found: {}", .0.display())]
    CredentialsNotFound(PathBuf),

    #[error("Invalid credentials file: {0}")]
    Credentials(String),

    // ---------------------------
    // Remote access
    // ---------------------------
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error(
        "Spreadsheet not found. Check the spreadsheet id and ensure it's shared with {0}"
    )]
    SpreadsheetNotFound(String),

    #[error("Worksheet '{0}' not found in spreadsheet")]
    WorksheetNotFound(String),

    #[error("Column '{0}' not found in worksheet header")]
    MissingColumn(&'static str),

    // ---------------------------
    // Invoice data
    // ---------------------------
    #[error("No WIP entries found in the spreadsheet")]
    NoBillableWork,

    #[error("No invoice number on the WIP entries and no default_number configured")]
    NoInvoiceNumber,

    #[error("{failed} of {total} checks failed")]
    ChecksFailed { failed: usize, total: usize },

    #[error("Prompt failed: {0}")]
    Prompt(#[from] inquire::InquireError),

    // ---------------------------
    // External tools
    // ---------------------------
    #[error("PDF conversion failed: {0}")]
    Pdf(String),
}

pub type AppResult<T> = Result<T, AppError>;
