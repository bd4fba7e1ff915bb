//! Configuration for batch analysis runs

use crate::error::{BatchError, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Analysis dimension requested for each symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    /// Quote, change and industry
    Basic,
    /// Moving averages, MACD, RSI, Bollinger bands
    Technical,
    /// Company news
    News,
    /// Cost distribution (筹码)
    Chip,
    /// LLM narrative over the other dimensions
    Comprehensive,
}

impl AnalysisType {
    /// Every analysis type, in execution order
    pub const ALL: [AnalysisType; 5] = [
        AnalysisType::Basic,
        AnalysisType::Technical,
        AnalysisType::News,
        AnalysisType::Chip,
        AnalysisType::Comprehensive,
    ];

    /// Stable machine name
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisType::Basic => "basic",
            AnalysisType::Technical => "technical",
            AnalysisType::News => "news",
            AnalysisType::Chip => "chip",
            AnalysisType::Comprehensive => "comprehensive",
        }
    }

    /// Human label used in progress messages and reports
    pub fn label(self) -> &'static str {
        match self {
            AnalysisType::Basic => "基本面分析",
            AnalysisType::Technical => "技术分析",
            AnalysisType::News => "新闻分析",
            AnalysisType::Chip => "筹码分析",
            AnalysisType::Comprehensive => "综合分析",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(AnalysisType::Basic),
            "technical" => Ok(AnalysisType::Technical),
            "news" => Ok(AnalysisType::News),
            "chip" => Ok(AnalysisType::Chip),
            "comprehensive" => Ok(AnalysisType::Comprehensive),
            other => Err(BatchError::Config(format!(
                "Unknown analysis type: {other}. Supported: basic, technical, news, chip, comprehensive"
            ))),
        }
    }
}

/// The user's current position in the stock, fed to the comprehensive analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserPosition {
    #[default]
    Unsure,
    Holding,
    NotHolding,
}

impl UserPosition {
    pub fn label(self) -> &'static str {
        match self {
            UserPosition::Unsure => "不确定",
            UserPosition::Holding => "持有",
            UserPosition::NotHolding => "未持有",
        }
    }
}

impl FromStr for UserPosition {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "unsure" | "不确定" => Ok(UserPosition::Unsure),
            "holding" | "持有" => Ok(UserPosition::Holding),
            "not_holding" | "not-holding" | "未持有" => Ok(UserPosition::NotHolding),
            other => Err(BatchError::Config(format!(
                "Unknown position: {other}. Supported: unsure, holding, not_holding"
            ))),
        }
    }
}

/// Immutable input for one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Symbols to analyze, order only matters for reporting
    pub symbols: Vec<String>,

    /// Requested analysis types
    pub analysis_types: Vec<AnalysisType>,

    /// Read through the data cache
    pub use_cache: bool,

    /// Refetch and overwrite cached entries
    pub force_refresh: bool,

    /// Attach LLM commentary to data payloads
    pub include_ai_analysis: bool,

    /// Worker pool size
    pub worker_count: usize,

    /// Extra attempts allowed for a retryable analysis failure
    pub max_retry: u32,

    /// Free-text opinion passed to the comprehensive analysis
    pub user_opinion: String,

    /// Position passed to the comprehensive analysis
    pub user_position: UserPosition,

    /// Where artifacts are written
    pub output_dir: PathBuf,

    /// Write one JSON file per symbol
    pub save_individual: bool,

    /// Write the summary CSV and detailed JSON
    pub save_summary: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            analysis_types: vec![
                AnalysisType::Basic,
                AnalysisType::Technical,
                AnalysisType::News,
                AnalysisType::Comprehensive,
            ],
            use_cache: true,
            force_refresh: false,
            include_ai_analysis: true,
            worker_count: 3,
            max_retry: 2,
            user_opinion: String::new(),
            user_position: UserPosition::Unsure,
            output_dir: default_output_dir(),
            save_individual: true,
            save_summary: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("batch_analysis_results").join(Local::now().format("%Y%m%d_%H%M%S").to_string())
}

impl BatchConfig {
    /// Create a new configuration builder
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(BatchError::Config(
                "worker_count must be at least 1".to_string(),
            ));
        }

        if self.analysis_types.is_empty() {
            return Err(BatchError::Config(
                "at least one analysis type is required".to_string(),
            ));
        }

        if self.symbols.is_empty() {
            return Err(BatchError::Config("no symbols to analyze".to_string()));
        }

        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if symbol.trim().is_empty() {
                return Err(BatchError::Config("blank symbol in list".to_string()));
            }
            if !seen.insert(symbol.as_str()) {
                return Err(BatchError::Config(format!("duplicate symbol: {symbol}")));
            }
        }

        Ok(())
    }
}

/// Builder for BatchConfig
#[derive(Debug, Default)]
pub struct BatchConfigBuilder {
    symbols: Vec<String>,
    analysis_types: Option<Vec<AnalysisType>>,
    use_cache: Option<bool>,
    force_refresh: Option<bool>,
    include_ai_analysis: Option<bool>,
    worker_count: Option<usize>,
    max_retry: Option<u32>,
    user_opinion: Option<String>,
    user_position: Option<UserPosition>,
    output_dir: Option<PathBuf>,
    save_individual: Option<bool>,
    save_summary: Option<bool>,
}

impl BatchConfigBuilder {
    /// Set the symbols to analyze
    pub fn symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    /// Set the requested analysis types
    pub fn analysis_types(mut self, types: impl Into<Vec<AnalysisType>>) -> Self {
        self.analysis_types = Some(types.into());
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = Some(use_cache);
        self
    }

    pub fn force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = Some(force_refresh);
        self
    }

    pub fn include_ai_analysis(mut self, include: bool) -> Self {
        self.include_ai_analysis = Some(include);
        self
    }

    /// Set the worker pool size
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    /// Set the maximum number of retries per analysis type
    pub fn max_retry(mut self, retries: u32) -> Self {
        self.max_retry = Some(retries);
        self
    }

    pub fn user_opinion(mut self, opinion: impl Into<String>) -> Self {
        self.user_opinion = Some(opinion.into());
        self
    }

    pub fn user_position(mut self, position: UserPosition) -> Self {
        self.user_position = Some(position);
        self
    }

    /// Set the artifact directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn save_individual(mut self, save: bool) -> Self {
        self.save_individual = Some(save);
        self
    }

    pub fn save_summary(mut self, save: bool) -> Self {
        self.save_summary = Some(save);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<BatchConfig> {
        let defaults = BatchConfig::default();

        let config = BatchConfig {
            symbols: self
                .symbols
                .into_iter()
                .map(|s| s.trim().to_string())
                .collect(),
            analysis_types: self.analysis_types.unwrap_or(defaults.analysis_types),
            use_cache: self.use_cache.unwrap_or(defaults.use_cache),
            force_refresh: self.force_refresh.unwrap_or(defaults.force_refresh),
            include_ai_analysis: self
                .include_ai_analysis
                .unwrap_or(defaults.include_ai_analysis),
            worker_count: self.worker_count.unwrap_or(defaults.worker_count),
            max_retry: self.max_retry.unwrap_or(defaults.max_retry),
            user_opinion: self.user_opinion.unwrap_or(defaults.user_opinion),
            user_position: self.user_position.unwrap_or(defaults.user_position),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            save_individual: self.save_individual.unwrap_or(defaults.save_individual),
            save_summary: self.save_summary.unwrap_or(defaults.save_summary),
        };

        config.validate()?;
        Ok(config)
    }
}
