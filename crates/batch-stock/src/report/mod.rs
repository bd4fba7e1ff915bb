//! Markdown and HTML reports rendered from a finished batch
//!
//! Reports are built from a [`DetailedReport`], either straight from a run or
//! reloaded from disk with [`ResultDir`](crate::persist::ResultDir).

mod templates;
pub mod view;

pub use view::{BatchView, SymbolView};

use crate::engine::Status;
use crate::error::{BatchError, Result};
use crate::persist::{DetailedReport, file_timestamp, safe_file_part};
use chrono::Local;
use minijinja::{Environment, context};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Output format of a generated report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Markdown,
    Html,
    Pdf,
    Docx,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Html => "html",
            ReportFormat::Pdf => "pdf",
            ReportFormat::Docx => "docx",
        }
    }

    fn templates(self) -> Result<(&'static str, &'static str)> {
        match self {
            ReportFormat::Markdown => Ok(("summary.md", "individual.md")),
            ReportFormat::Html => Ok(("summary.html", "individual.html")),
            ReportFormat::Pdf | ReportFormat::Docx => Err(BatchError::Report(format!(
                "{self} output requires an external renderer; use markdown or html"
            ))),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportFormat::Markdown => "markdown",
            ReportFormat::Html => "html",
            ReportFormat::Pdf => "pdf",
            ReportFormat::Docx => "docx",
        })
    }
}

impl FromStr for ReportFormat {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "html" => Ok(ReportFormat::Html),
            "pdf" => Ok(ReportFormat::Pdf),
            "docx" => Ok(ReportFormat::Docx),
            other => Err(BatchError::Config(format!(
                "Unknown report format: {other}. Supported: markdown, html, pdf, docx"
            ))),
        }
    }
}

/// Which reports to generate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportKind {
    /// One report per successful or partial symbol
    Individual,
    /// One report for the whole batch
    #[default]
    Summary,
    Both,
}

impl ReportKind {
    fn individual(self) -> bool {
        matches!(self, ReportKind::Individual | ReportKind::Both)
    }

    fn summary(self) -> bool {
        matches!(self, ReportKind::Summary | ReportKind::Both)
    }
}

impl FromStr for ReportKind {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individual" => Ok(ReportKind::Individual),
            "summary" => Ok(ReportKind::Summary),
            "both" => Ok(ReportKind::Both),
            other => Err(BatchError::Config(format!(
                "Unknown report type: {other}. Supported: individual, summary, both"
            ))),
        }
    }
}

fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("summary.md", templates::SUMMARY_MD)?;
    env.add_template("individual.md", templates::INDIVIDUAL_MD)?;
    env.add_template("summary.html", templates::SUMMARY_HTML)?;
    env.add_template("individual.html", templates::INDIVIDUAL_HTML)?;
    Ok(env)
}

fn generated_at() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render the whole-batch report into a string
pub fn render_summary(report: &DetailedReport, format: ReportFormat) -> Result<String> {
    let (summary, _) = format.templates()?;
    let env = environment()?;
    let view = BatchView::from(report);
    let rendered = env
        .get_template(summary)?
        .render(context! { generated_at => generated_at(), ..minijinja::Value::from_serialize(&view) })?;
    Ok(rendered)
}

/// Render a single symbol's report into a string
pub fn render_individual(symbol: &SymbolView, format: ReportFormat) -> Result<String> {
    let (_, individual) = format.templates()?;
    let env = environment()?;
    let rendered = env
        .get_template(individual)?
        .render(context! { r => symbol, generated_at => generated_at() })?;
    Ok(rendered)
}

/// Write the requested reports into `out_dir` and return their paths
pub fn generate_reports(
    report: &DetailedReport,
    format: ReportFormat,
    kind: ReportKind,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    // Reject unsupported formats before touching the filesystem
    format.templates()?;
    fs::create_dir_all(out_dir)?;

    let ts = file_timestamp(Local::now());
    let ext = format.extension();
    let mut written = Vec::new();

    if kind.individual() {
        for result in &report.results {
            if result.status == Status::Failed {
                continue;
            }
            let view = SymbolView::from(result);
            let path = out_dir.join(format!(
                "{}_{}_report_{ts}.{ext}",
                safe_file_part(&result.symbol),
                safe_file_part(&result.name)
            ));
            match render_individual(&view, format).and_then(|body| Ok(fs::write(&path, body)?)) {
                Ok(()) => written.push(path),
                Err(e) => warn!("Failed to write report for {}: {e}", result.symbol),
            }
        }
    }

    if kind.summary() {
        let path = out_dir.join(format!("batch_analysis_report_{ts}.{ext}"));
        fs::write(&path, render_summary(report, format)?)?;
        written.push(path);
    }

    info!("Generated {} {format} reports in {}", written.len(), out_dir.display());
    Ok(written)
}
