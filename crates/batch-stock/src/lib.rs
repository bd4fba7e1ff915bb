//! Batch stock analysis
//!
//! Runs a set of analyses (basic, technical, news, chip, comprehensive) over
//! many stock symbols with a bounded worker pool, tracks progress, classifies
//! failures and writes the results to disk. It includes:
//!
//! - Quote and history data from Yahoo Finance, company news from Finnhub
//! - Technical indicators and a volume-at-price cost distribution
//! - Optional LLM commentary through an OpenAI-compatible endpoint
//! - A progress monitor with ETA, error categories and a JSON log
//! - Per-symbol JSON, a summary CSV and a detailed JSON document
//! - Markdown/HTML reports and SMTP delivery
//!
//! # Example
//!
//! ```rust,ignore
//! use batch_stock::{BatchConfig, BatchOrchestrator, builtin_toolset};
//! use batch_utils::Settings;
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> batch_stock::Result<()> {
//!     let settings = Settings::from_env().unwrap_or_default();
//!     let tools = builtin_toolset(&settings, HashMap::new())?;
//!
//!     let config = BatchConfig::builder()
//!         .symbols(["600519", "000001"])
//!         .worker_count(3)
//!         .build()?;
//!
//!     let batch = BatchOrchestrator::new(tools).run(config).await?;
//!     println!("{} succeeded, {} failed", batch.success_count, batch.failed_count);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod persist;
pub mod prompts;
pub mod report;
pub mod tools;

pub use config::{AnalysisType, BatchConfig, UserPosition};
pub use engine::{BatchOrchestrator, BatchResult, Status, SymbolAnalyzer, SymbolResult};
pub use error::{BatchError, Result};
pub use monitor::{ErrorHandler, ProgressMonitor, ProgressObserver, ProgressReporter};
pub use notify::EmailNotifier;
pub use persist::{DetailedReport, ResultDir};
pub use report::{ReportFormat, ReportKind, generate_reports};
pub use tools::{ToolSet, builtin_toolset};
