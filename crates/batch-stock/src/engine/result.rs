//! Batch and per-symbol result types

use crate::config::{AnalysisType, BatchConfig};
use crate::engine::stats::SummaryStats;
use crate::tools::Payload;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Display name used when a symbol cannot be resolved
pub const UNKNOWN_NAME: &str = "未知";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Partial,
    Failed,
}

impl Status {
    /// Status for `errors` failures out of `requested` analysis types
    pub fn from_counts(errors: usize, requested: usize) -> Self {
        if errors == 0 {
            Status::Success
        } else if errors < requested {
            Status::Partial
        } else {
            Status::Failed
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Partial => "partial",
            Status::Failed => "failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RSI bucket by the 30 / 70 thresholds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiLevel {
    Oversold,
    #[default]
    Neutral,
    Overbought,
}

impl RsiLevel {
    pub fn from_rsi(rsi: f64) -> Self {
        if rsi < 30.0 {
            RsiLevel::Oversold
        } else if rsi > 70.0 {
            RsiLevel::Overbought
        } else {
            RsiLevel::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RsiLevel::Oversold => "超卖",
            RsiLevel::Neutral => "中性",
            RsiLevel::Overbought => "超买",
        }
    }
}

/// Headline figures pulled out of the per-type payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub current_price: f64,
    pub change_percent: f64,
    pub industry: String,
    pub technical_trend: String,
    pub rsi_level: RsiLevel,
    pub news_count: u64,
    pub profit_ratio: f64,
    /// Analysis types that produced a usable payload
    pub analysis_count: usize,
    pub has_ai_analysis: bool,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            current_price: 0.0,
            change_percent: 0.0,
            industry: String::new(),
            technical_trend: "unknown".to_string(),
            rsi_level: RsiLevel::Neutral,
            news_count: 0,
            profit_ratio: 0.0,
            analysis_count: 0,
            has_ai_analysis: false,
        }
    }
}

/// Outcome of analyzing one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolResult {
    pub symbol: String,
    pub name: String,
    pub status: Status,
    pub error_message: Option<String>,
    /// Payload per attempted analysis type
    #[serde(default)]
    pub analysis_data: BTreeMap<AnalysisType, Payload>,
    #[serde(default)]
    pub summary: Summary,
    /// Completion time
    pub analysis_time: DateTime<Local>,
    /// Wall-clock seconds spent on this symbol
    #[serde(default)]
    pub duration_secs: f64,
}

impl SymbolResult {
    /// A `failed` result with no analysis data
    pub fn failed(symbol: impl Into<String>, name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            status: Status::Failed,
            error_message: Some(error.into()),
            analysis_data: BTreeMap::new(),
            summary: Summary::default(),
            analysis_time: Local::now(),
            duration_secs: 0.0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Everything one batch run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub config: BatchConfig,
    /// In completion order
    pub results: Vec<SymbolResult>,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    /// Seconds
    pub total_duration: f64,
    pub success_count: usize,
    /// Partial and failed symbols
    pub failed_count: usize,
    pub summary_stats: SummaryStats,
}

impl BatchResult {
    pub fn failed_results(&self) -> impl Iterator<Item = &SymbolResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn successful_results(&self) -> impl Iterator<Item = &SymbolResult> {
        self.results.iter().filter(|r| r.is_success())
    }
}
