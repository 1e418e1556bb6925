//! HTML -> PDF through an external converter (wkhtmltopdf by default).

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::PdfSettings;
use crate::error::{AppError, AppResult};

pub struct PdfConverter<'a> {
    settings: &'a PdfSettings,
}

impl<'a> PdfConverter<'a> {
    pub fn new(settings: &'a PdfSettings) -> Self {
        Self { settings }
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.settings.binary)
            .arg("--version")
            .output()
            .is_ok()
    }

    fn conversion_args(&self, html_path: &Path, pdf_path: &Path) -> Vec<String> {
        let s = self.settings;
        let mut args = vec!["--page-size".to_string(), s.page_size.clone()];
        for side in ["top", "right", "bottom", "left"] {
            args.push(format!("--margin-{}", side));
            args.push(s.margin.clone());
        }
        args.extend([
            "--encoding".to_string(),
            s.encoding.clone(),
            "--quiet".to_string(),
            html_path.to_string_lossy().to_string(),
            pdf_path.to_string_lossy().to_string(),
        ]);
        args
    }

    /// Converts `html_path` into `pdf_path`. A missing converter gets one
    /// install attempt (when enabled) before the conversion is tried.
    pub fn convert(&self, html_path: &Path, pdf_path: &Path) -> AppResult<PathBuf> {
        if !self.is_available() {
            if !self.settings.auto_install {
                return Err(AppError::Pdf(format!(
                    "'{}' is not installed",
                    self.settings.binary
                )));
            }
            println!("⚠️  {} not found. Installing...", self.settings.binary);
            self.install()?;
            if !self.is_available() {
                return Err(AppError::Pdf(format!(
                    "'{}' is still unavailable after installation",
                    self.settings.binary
                )));
            }
        }

        let output = Command::new(&self.settings.binary)
            .args(self.conversion_args(html_path, pdf_path))
            .output()
            .map_err(|e| AppError::Pdf(format!("failed to run {}: {}", self.settings.binary, e)))?;

        if output.status.success() {
            Ok(pdf_path.to_path_buf())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!("{} stderr: {}", self.settings.binary, stderr);
            Err(AppError::Pdf(stderr.trim().to_string()))
        }
    }

    fn install(&self) -> AppResult<()> {
        for command in &self.settings.install_commands {
            let Some((program, args)) = command.split_first() else {
                continue;
            };
            tracing::info!("running {}", command.join(" "));
            let status = Command::new(program).args(args).status().map_err(|e| {
                AppError::Pdf(format!("failed to run '{}': {}", command.join(" "), e))
            })?;
            if !status.success() {
                return Err(AppError::Pdf(format!(
                    "'{}' exited with {}. Please install {} manually",
                    command.join(" "),
                    status,
                    self.settings.binary
                )));
            }
        }
        Ok(())
    }
}

/// Sibling path with a `.pdf` extension.
pub fn pdf_path_for(html_path: &Path) -> PathBuf {
    html_path.with_extension("pdf")
}
