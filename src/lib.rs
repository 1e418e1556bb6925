//! Invoice generation from the WIP rows of a time-tracking spreadsheet.
//!
//! Read path: `columns` -> `extract` -> `aggregate` -> `render`/`pdf`.
//! Write path: `extract` -> `status`, after the operator confirms.

pub mod aggregate;
pub mod columns;
pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod pdf;
pub mod render;
pub mod sheets;
pub mod status;

pub use error::{AppError, AppResult};
