//! External PDF engines
//!
//! Each engine turns an HTML file on disk into a PDF. The renderer tries
//! them in order; any error moves it on to the next one.

use crate::error::{Result, StockError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Renders an HTML file to a PDF file
#[async_trait]
pub trait PdfEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Write `pdf` from `html`; must not report success without a PDF on disk
    async fn render(&self, html: &Path, pdf: &Path) -> Result<()>;
}

/// Engine backed by a command-line program
///
/// Arguments may contain `{input}` (HTML path), `{input_url}` (HTML as a
/// `file://` URL) and `{output}` (PDF path). When several programs are
/// listed, the first one that exists is used.
pub struct CommandEngine {
    name: String,
    programs: Vec<String>,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandEngine {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            programs: vec![program.into()],
            args: args.iter().map(|a| (*a).to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Additional program names to try when the first is not installed
    pub fn with_alternatives(mut self, programs: &[&str]) -> Self {
        self.programs.extend(programs.iter().map(|p| (*p).to_string()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn weasyprint() -> Self {
        Self::new("weasyprint", "weasyprint", &["{input}", "{output}"])
    }

    pub fn wkhtmltopdf() -> Self {
        Self::new(
            "wkhtmltopdf",
            "wkhtmltopdf",
            &[
                "--encoding",
                "utf-8",
                "--enable-local-file-access",
                "-q",
                "{input}",
                "{output}",
            ],
        )
    }

    pub fn chromium() -> Self {
        Self::new(
            "chromium",
            "chromium",
            &[
                "--headless",
                "--disable-gpu",
                "--no-sandbox",
                "--no-pdf-header-footer",
                "--print-to-pdf={output}",
                "{input_url}",
            ],
        )
        .with_alternatives(&["chromium-browser", "google-chrome"])
    }

    fn fail(&self, reason: impl Into<String>) -> StockError {
        StockError::PdfEngine {
            engine: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn expand_args(&self, html: &Path, pdf: &Path) -> Result<Vec<String>> {
        let input = html.to_string_lossy();
        let output = pdf.to_string_lossy();
        let needs_url = self.args.iter().any(|a| a.contains("{input_url}"));
        let input_url = if needs_url {
            let absolute = std::path::absolute(html)?;
            url::Url::from_file_path(&absolute)
                .map_err(|()| self.fail(format!("cannot build a file URL for {}", absolute.display())))?
                .to_string()
        } else {
            String::new()
        };

        Ok(self
            .args
            .iter()
            .map(|arg| {
                arg.replace("{input_url}", &input_url)
                    .replace("{input}", &input)
                    .replace("{output}", &output)
            })
            .collect())
    }

    async fn run_program(&self, program: &str, args: &[String]) -> Result<std::process::Output> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(self.fail(format!("timed out after {}s", self.timeout.as_secs()))),
        }
    }
}

#[async_trait]
impl PdfEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn render(&self, html: &Path, pdf: &Path) -> Result<()> {
        let args = self.expand_args(html, pdf)?;

        for program in &self.programs {
            debug!(engine = %self.name, program, "Running PDF engine");
            let output = match self.run_program(program, &args).await {
                Ok(output) => output,
                Err(StockError::Io(e)) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
                return Err(self.fail(format!("{program} exited with {}: {last}", output.status)));
            }

            return match tokio::fs::metadata(pdf).await {
                Ok(meta) if meta.len() > 0 => Ok(()),
                _ => Err(self.fail(format!("{program} produced no PDF"))),
            };
        }

        Err(self.fail(format!("not installed (tried {})", self.programs.join(", "))))
    }
}

/// weasyprint, then wkhtmltopdf, then headless Chromium
pub fn default_engines() -> Vec<Arc<dyn PdfEngine>> {
    vec![
        Arc::new(CommandEngine::weasyprint()),
        Arc::new(CommandEngine::wkhtmltopdf()),
        Arc::new(CommandEngine::chromium()),
    ]
}
