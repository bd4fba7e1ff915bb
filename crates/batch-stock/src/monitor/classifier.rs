//! Error classification and retry advice

use super::ProgressMonitor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const TIMEOUT_KEYWORDS: &[&str] = &["timeout", "timed out"];
const NETWORK_KEYWORDS: &[&str] = &[
    "network",
    "connection",
    "http",
    "dns",
    "socket",
    "refused",
    "unreachable",
];
const DATA_KEYWORDS: &[&str] = &["data", "parse", "format", "empty", "json"];
const AI_KEYWORDS: &[&str] = &["llm", "openai", "model"];

/// Coarse failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Timeout,
    Data,
    Ai,
    Unknown,
}

impl ErrorCategory {
    /// Classify an error message, case-insensitively
    ///
    /// Priority: timeout, network, data, ai, unknown. `ai` only matches as a
    /// whole word.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let contains_any = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        if contains_any(TIMEOUT_KEYWORDS) {
            ErrorCategory::Timeout
        } else if contains_any(NETWORK_KEYWORDS) {
            ErrorCategory::Network
        } else if contains_any(DATA_KEYWORDS) {
            ErrorCategory::Data
        } else if contains_any(AI_KEYWORDS)
            || lower
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|word| word == "ai")
        {
            ErrorCategory::Ai
        } else {
            ErrorCategory::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Data => "data",
            ErrorCategory::Ai => "ai",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Static retry policy for this category
    pub fn advice(self) -> RetryAdvice {
        let (should_retry, retry_delay_secs, max_retries, suggestion) = match self {
            ErrorCategory::Network => (true, 5, 3, "网络连接问题，建议稍后重试"),
            ErrorCategory::Timeout => (true, 3, 2, "请求超时，建议稍后重试"),
            ErrorCategory::Data => (false, 0, 0, "数据格式或内容问题，可能需要检查数据源"),
            ErrorCategory::Ai => (true, 10, 2, "AI服务暂时不可用，建议稍后重试"),
            ErrorCategory::Unknown => (false, 0, 0, "未知错误，请检查日志"),
        };
        RetryAdvice {
            category: self,
            should_retry,
            retry_delay_secs,
            max_retries,
            suggestion: suggestion.to_string(),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry suggestion attached to an error category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryAdvice {
    pub category: ErrorCategory,
    pub should_retry: bool,
    pub retry_delay_secs: u64,
    pub max_retries: u32,
    pub suggestion: String,
}

impl RetryAdvice {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Classifies failures, logs them and records them on the monitor
#[derive(Clone, Default)]
pub struct ErrorHandler {
    monitor: Option<Arc<ProgressMonitor>>,
}

impl ErrorHandler {
    pub fn new(monitor: Option<Arc<ProgressMonitor>>) -> Self {
        Self { monitor }
    }

    /// Classify `error` for `symbol` and return the retry advice
    ///
    /// The monitor's error log gets an attempt entry; its completion counters are left
    /// alone.
    pub fn handle(&self, symbol: &str, error: &str, context: &str) -> RetryAdvice {
        let category = ErrorCategory::classify(error);
        warn!(
            symbol,
            category = category.as_str(),
            context,
            "Analysis error: {error}"
        );

        if let Some(monitor) = &self.monitor {
            let message = if context.is_empty() {
                error.to_string()
            } else {
                format!("[{context}] {error}")
            };
            monitor.record_error(symbol, &message);
        }

        category.advice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_refused_is_network() {
        let category = ErrorCategory::classify("Connection refused (os error 111)");
        assert_eq!(category, ErrorCategory::Network);

        let advice = category.advice();
        assert!(advice.should_retry);
        assert_eq!(advice.retry_delay(), Duration::from_secs(5));
        assert_eq!(advice.max_retries, 3);
    }

    #[test]
    fn test_timeout_is_reachable() {
        assert_eq!(
            ErrorCategory::classify("HTTP request timed out"),
            ErrorCategory::Timeout
        );
        assert_eq!(
            ErrorCategory::classify("operation Timeout after 30s"),
            ErrorCategory::Timeout
        );
        let advice = ErrorCategory::Timeout.advice();
        assert_eq!((advice.retry_delay_secs, advice.max_retries), (3, 2));
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(
            ErrorCategory::classify("failed to parse JSON body"),
            ErrorCategory::Data
        );
        assert_eq!(
            ErrorCategory::classify("network error while fetching data"),
            ErrorCategory::Network
        );
        assert_eq!(
            ErrorCategory::classify("LLM rate limit exceeded"),
            ErrorCategory::Ai
        );
        assert_eq!(
            ErrorCategory::classify("AI analysis error: quota"),
            ErrorCategory::Ai
        );
    }

    #[test]
    fn test_ai_is_whole_word() {
        assert_eq!(
            ErrorCategory::classify("basic failed: symbol delisted"),
            ErrorCategory::Unknown
        );
        assert!(!ErrorCategory::Unknown.advice().should_retry);
    }

    #[test]
    fn test_handler_records_without_counting() {
        let monitor = Arc::new(ProgressMonitor::new(1));
        monitor.start();
        let handler = ErrorHandler::new(Some(monitor.clone()));

        let advice = handler.handle("600519", "connection reset by peer", "task");
        assert_eq!(advice.category, ErrorCategory::Network);

        let summary = monitor.error_summary();
        assert_eq!(summary.total_errors, 0);
        assert_eq!(summary.attempt_errors.get("[task] connection reset by peer"), Some(&1));
        assert_eq!(summary.recent_errors[0].error, "[task] connection reset by peer");
        assert_eq!(monitor.snapshot().processed(), 0);
    }
}
