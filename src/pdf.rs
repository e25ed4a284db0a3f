use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::process::{CommandSpec, run_command};

pub const DEFAULT_PDF_COMMAND: &str = "wkhtmltopdf {html} {pdf}";
const DEFAULT_PDF_TIMEOUT: Duration = Duration::from_secs(120);

pub trait PdfRenderer {
    /// Convert an HTML file to PDF, returning the PDF path.
    fn render_pdf(
        &self,
        html: &Path,
    ) -> impl std::future::Future<Output = Result<PathBuf>> + Send;
}

/// Runs an external converter. `{html}` and `{pdf}` in the argument list are
/// replaced with the input and output paths.
#[derive(Debug, Clone)]
pub struct CommandPdfRenderer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandPdfRenderer {
    /// Build from a whitespace-separated command line.
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| Error::Pdf("pdf command is empty".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
            timeout: DEFAULT_PDF_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn expand_args(&self, html: &Path, pdf: &Path) -> Vec<String> {
        let html = html.to_string_lossy();
        let pdf = pdf.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{html}", &html).replace("{pdf}", &pdf))
            .collect()
    }
}

impl Default for CommandPdfRenderer {
    fn default() -> Self {
        Self {
            program: "wkhtmltopdf".to_string(),
            args: vec!["{html}".to_string(), "{pdf}".to_string()],
            timeout: DEFAULT_PDF_TIMEOUT,
        }
    }
}

pub fn pdf_path_for(html: &Path) -> PathBuf {
    html.with_extension("pdf")
}

impl PdfRenderer for CommandPdfRenderer {
    async fn render_pdf(&self, html: &Path) -> Result<PathBuf> {
        let pdf = pdf_path_for(html);
        let spec = CommandSpec {
            program: self.program.clone(),
            args: self.expand_args(html, &pdf),
            // relative paths resolve against the caller's directory
            working_dir: PathBuf::from("."),
            timeout: Some(self.timeout),
            log_prefix: "pdf".to_string(),
        };
        debug!(program = %spec.program, args = ?spec.args, "running pdf converter");

        let output = run_command(spec)
            .await
            .map_err(|e| Error::Pdf(e.to_string()))?;
        if !output.success() {
            let detail = output.stderr_lines.last().cloned().unwrap_or_default();
            return Err(Error::Pdf(format!(
                "{} exited with code {}: {detail}",
                self.program, output.exit_code
            )));
        }
        if !pdf.is_file() {
            return Err(Error::Pdf(format!(
                "{} did not produce {}",
                self.program,
                pdf.display()
            )));
        }

        info!(path = %pdf.display(), "pdf written");
        Ok(pdf)
    }
}
