//! Batch analysis engine
//!
//! - `analyzer`: runs the requested analysis types for one symbol
//! - `orchestrator`: worker pool over all symbols, artifacts at the end
//! - `summary` / `stats`: per-symbol headline figures and batch aggregates

pub mod analyzer;
pub mod orchestrator;
pub mod result;
pub mod stats;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;

pub use analyzer::SymbolAnalyzer;
pub use orchestrator::{BatchOrchestrator, MONITOR_LOG_FILE};
pub use result::{BatchResult, RsiLevel, Status, Summary, SymbolResult, UNKNOWN_NAME};
pub use stats::{PriceRanges, SummaryStats};
pub use summary::derive_summary;
