//! Report rendering
//!
//! Markdown goes to HTML, then to PDF through the first engine in the list
//! that succeeds. The `.md` and `.html` files are always written; the
//! `.pdf` only when an engine worked. When every engine fails the HTML
//! carries instructions for printing it to PDF by hand.

pub mod engine;
pub mod markdown;
pub mod template;

pub use engine::{CommandEngine, PdfEngine, default_engines};
pub use markdown::markdown_to_html;
pub use template::render_document;

use crate::error::Result;
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Output files for one report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub pdf: PathBuf,
    pub html: PathBuf,
    pub markdown: PathBuf,
}

impl ReportPaths {
    /// `Report_<code>_<YYYYMMDD>.{pdf,html,md}` under `output_dir`
    pub fn new(output_dir: &Path, code: &str, date: chrono::NaiveDate) -> Self {
        let stem = format!("Report_{code}_{}", date.format("%Y%m%d"));
        Self {
            pdf: output_dir.join(format!("{stem}.pdf")),
            html: output_dir.join(format!("{stem}.html")),
            markdown: output_dir.join(format!("{stem}.md")),
        }
    }
}

/// One engine tried during rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineAttempt {
    pub engine: String,
    /// `None` on success
    pub error: Option<String>,
}

/// What the renderer produced
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub paths: ReportPaths,
    /// Engine that wrote the PDF, if any
    pub engine: Option<String>,
    pub attempts: Vec<EngineAttempt>,
}

impl RenderOutcome {
    pub fn pdf(&self) -> Option<&Path> {
        self.engine.as_ref().map(|_| self.paths.pdf.as_path())
    }

    pub fn pdf_generated(&self) -> bool {
        self.engine.is_some()
    }
}

/// Renders Markdown reports into the output directory
pub struct ReportRenderer {
    output_dir: PathBuf,
    engines: Vec<Arc<dyn PdfEngine>>,
}

impl ReportRenderer {
    /// Renderer using [`default_engines`]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_engines(output_dir, default_engines())
    }

    pub fn with_engines(output_dir: impl Into<PathBuf>, engines: Vec<Arc<dyn PdfEngine>>) -> Self {
        Self {
            output_dir: output_dir.into(),
            engines,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn engine_names(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Render with the current local time
    pub async fn render(&self, markdown: &str, code: &str) -> Result<RenderOutcome> {
        self.render_at(markdown, code, Local::now().naive_local()).await
    }

    /// Render as if at `now`; the date names the files, the time goes in the header
    pub async fn render_at(
        &self,
        markdown: &str,
        code: &str,
        now: NaiveDateTime,
    ) -> Result<RenderOutcome> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let paths = ReportPaths::new(&self.output_dir, code, now.date());
        let generated_at = now.format("%Y-%m-%d %H:%M:%S").to_string();
        let body = markdown_to_html(markdown);

        tokio::fs::write(&paths.markdown, markdown).await?;
        let document = render_document(code, &generated_at, &body, false)?;
        tokio::fs::write(&paths.html, &document).await?;

        let mut attempts = Vec::new();
        let mut engine_used = None;
        for engine in &self.engines {
            let name = engine.name().to_string();
            match engine.render(&paths.html, &paths.pdf).await {
                Ok(()) => {
                    info!(engine = %name, path = %paths.pdf.display(), "PDF generated");
                    attempts.push(EngineAttempt {
                        engine: name.clone(),
                        error: None,
                    });
                    engine_used = Some(name);
                    break;
                }
                Err(e) => {
                    warn!(engine = %name, error = %e, "PDF engine failed");
                    attempts.push(EngineAttempt {
                        engine: name,
                        error: Some(e.to_string()),
                    });
                    remove_partial(&paths.pdf).await;
                }
            }
        }

        if engine_used.is_none() {
            warn!(
                attempts = attempts.len(),
                "No PDF engine succeeded, keeping HTML and Markdown"
            );
            let document = render_document(code, &generated_at, &body, true)?;
            tokio::fs::write(&paths.html, document).await?;
        }

        Ok(RenderOutcome {
            paths,
            engine: engine_used,
            attempts,
        })
    }
}

async fn remove_partial(pdf: &Path) {
    match tokio::fs::remove_file(pdf).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            warn!(path = %pdf.display(), error = %e, "Could not remove partial PDF");
        }
        _ => {}
    }
}

/// Write only the Markdown, for when rendering itself failed
pub async fn save_markdown_only(output_dir: &Path, code: &str, markdown: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;
    let path = ReportPaths::new(output_dir, code, Local::now().date_naive()).markdown;
    tokio::fs::write(&path, markdown).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FakeEngine;
    use template::PRINT_NOTE_MARKER;

    const REPORT: &str = "# 贵州茅台(600519)分析报告\n\n## 1. 公司概况\n\n| 指标 | 数值 |\n|---|---|\n| PE | 22.35 |\n";

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 10, 16)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap()
    }

    #[test]
    fn test_report_paths() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let paths = ReportPaths::new(Path::new("reports"), "600519", date);
        assert_eq!(paths.pdf, Path::new("reports/Report_600519_20260105.pdf"));
        assert_eq!(paths.html, Path::new("reports/Report_600519_20260105.html"));
        assert_eq!(paths.markdown, Path::new("reports/Report_600519_20260105.md"));
    }

    #[tokio::test]
    async fn test_stops_at_first_working_engine() {
        let dir = tempfile::tempdir().unwrap();
        let engines = FakeEngine::chain(2, true);
        let renderer = ReportRenderer::with_engines(dir.path(), FakeEngine::as_dyn(&engines));

        let outcome = renderer.render_at(REPORT, "600519", now()).await.unwrap();

        assert_eq!(outcome.attempts.len(), 3);
        assert_eq!(outcome.engine.as_deref(), Some("engine-2"));
        assert_eq!(engines[3].calls(), 0);
        assert!(outcome.pdf().unwrap().exists());
        assert!(outcome.paths.html.exists());
        assert!(outcome.paths.markdown.exists());

        let html = std::fs::read_to_string(&outcome.paths.html).unwrap();
        assert!(!html.contains(PRINT_NOTE_MARKER));
    }

    #[tokio::test]
    async fn test_all_engines_fail_keeps_html_and_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let engines = FakeEngine::chain(3, false);
        let renderer = ReportRenderer::with_engines(dir.path(), FakeEngine::as_dyn(&engines));

        let outcome = renderer.render_at(REPORT, "600519", now()).await.unwrap();

        assert_eq!(outcome.attempts.len(), 3);
        assert!(outcome.attempts.iter().all(|a| a.error.is_some()));
        assert!(!outcome.pdf_generated());
        assert!(outcome.pdf().is_none());
        assert!(!outcome.paths.pdf.exists());

        let md = std::fs::read_to_string(&outcome.paths.markdown).unwrap();
        assert_eq!(md, REPORT);
        let html = std::fs::read_to_string(&outcome.paths.html).unwrap();
        assert!(html.contains(&markdown_to_html(REPORT)));
        assert!(html.contains(PRINT_NOTE_MARKER));
        assert!(html.contains("生成时间: 2026-10-16 09:30:00"));
    }

    #[tokio::test]
    async fn test_no_engines_configured() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ReportRenderer::with_engines(dir.path().join("nested"), Vec::new());

        let outcome = renderer.render_at(REPORT, "000001", now()).await.unwrap();

        assert!(outcome.attempts.is_empty());
        assert!(outcome.paths.markdown.ends_with("Report_000001_20261016.md"));
        assert!(outcome.paths.html.exists());
    }

    #[tokio::test]
    async fn test_partial_pdf_removed() {
        let dir = tempfile::tempdir().unwrap();
        let engines: Vec<Arc<dyn PdfEngine>> = vec![Arc::new(FakeEngine::leaving_partial("broken"))];
        let renderer = ReportRenderer::with_engines(dir.path(), engines);

        let outcome = renderer.render_at(REPORT, "600519", now()).await.unwrap();
        assert!(!outcome.paths.pdf.exists());
    }

    #[tokio::test]
    async fn test_save_markdown_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_markdown_only(dir.path(), "600519", REPORT).await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), REPORT);
    }
}
