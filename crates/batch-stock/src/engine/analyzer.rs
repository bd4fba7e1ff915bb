//! Single-symbol analysis
//!
//! Runs every requested analysis type for one symbol. A failing type is
//! recorded and the remaining types still run; the call itself never fails
//! and never panics out.

use crate::config::{AnalysisType, BatchConfig};
use crate::engine::result::{Status, SymbolResult, UNKNOWN_NAME};
use crate::engine::summary::derive_summary;
use crate::monitor::{ErrorHandler, ProgressMonitor};
use crate::tools::{FetchOptions, Payload, Stance, StockIdentity, ToolSet};
use chrono::Local;
use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Best-effort text of a panic payload
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[derive(Clone)]
pub struct SymbolAnalyzer {
    tools: ToolSet,
    monitor: Option<Arc<ProgressMonitor>>,
    errors: ErrorHandler,
}

impl SymbolAnalyzer {
    pub fn new(tools: ToolSet) -> Self {
        Self {
            tools,
            monitor: None,
            errors: ErrorHandler::default(),
        }
    }

    /// Report progress and errors to `monitor`
    pub fn with_monitor(mut self, monitor: Arc<ProgressMonitor>) -> Self {
        self.errors = ErrorHandler::new(Some(monitor.clone()));
        self.monitor = Some(monitor);
        self
    }

    /// Analyze one symbol; failures end up in the returned result
    #[instrument(skip(self, config))]
    pub async fn analyze(&self, symbol: &str, config: &BatchConfig) -> SymbolResult {
        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.run(symbol, config)).catch_unwind().await;

        let mut result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                let message = format!("分析过程中发生未知错误: {}", panic_message(panic.as_ref()));
                error!("{symbol}: {message}");
                if let Some(monitor) = &self.monitor {
                    monitor.record_symbol_complete(symbol, false, Some(&message));
                }
                SymbolResult::failed(symbol, UNKNOWN_NAME, message)
            }
        };
        result.duration_secs = started.elapsed().as_secs_f64();
        result
    }

    async fn run(&self, symbol: &str, config: &BatchConfig) -> SymbolResult {
        if let Some(monitor) = &self.monitor {
            monitor.record_symbol_start(symbol, "");
        }

        let identity = match self.tools.resolver().resolve(symbol).await {
            Ok(Some(identity)) => identity,
            Ok(None) | Err(_) => {
                let message = format!("无法获取股票 {symbol} 的身份信息");
                warn!("{message}");
                if let Some(monitor) = &self.monitor {
                    monitor.record_symbol_complete(symbol, false, Some(&message));
                }
                return SymbolResult::failed(symbol, UNKNOWN_NAME, message);
            }
        };

        info!("Analyzing {} ({})", identity.code, identity.name);
        if let Some(monitor) = &self.monitor {
            monitor.record_symbol_start(symbol, &identity.name);
        }

        let total = config.analysis_types.len();
        let mut analysis_data = BTreeMap::new();
        let mut errors = Vec::new();

        for (i, &kind) in config.analysis_types.iter().enumerate() {
            if let Some(monitor) = &self.monitor {
                let percent = i as f64 / total as f64 * 100.0;
                monitor.record_symbol_progress(symbol, percent, &format!("正在执行{}", kind.label()));
            }

            let payload = self.run_with_retry(kind, &identity, config).await;
            if let Some(error) = payload.error() {
                errors.push(format!("{} failed: {error}", kind.label()));
            }
            analysis_data.insert(kind, payload);
        }

        let status = Status::from_counts(errors.len(), total);
        let error_message = (!errors.is_empty()).then(|| errors.join("; "));
        if let Some(monitor) = &self.monitor {
            monitor.record_symbol_complete(symbol, status != Status::Failed, error_message.as_deref());
        }
        info!("{} ({}) finished: {status}", identity.code, identity.name);

        SymbolResult {
            symbol: symbol.to_string(),
            name: identity.name,
            status,
            error_message,
            summary: derive_summary(&analysis_data),
            analysis_data,
            analysis_time: Local::now(),
            duration_secs: 0.0,
        }
    }

    /// Run one type, retrying while the classifier advises it and the
    /// configured budget allows
    async fn run_with_retry(
        &self,
        kind: AnalysisType,
        identity: &StockIdentity,
        config: &BatchConfig,
    ) -> Payload {
        if let Some(reason) = self.unavailable(kind) {
            return Payload::failed(reason);
        }

        let mut attempt = 0;
        loop {
            let payload = self.run_once(kind, identity, config).await;
            let Some(error) = payload.error() else {
                return payload;
            };

            let advice = self.errors.handle(&identity.code, error, kind.label());
            if !advice.should_retry || attempt >= config.max_retry.min(advice.max_retries) {
                return payload;
            }
            attempt += 1;
            debug!(
                "Retrying {kind} for {} in {}s (attempt {attempt})",
                identity.code, advice.retry_delay_secs
            );
            tokio::time::sleep(advice.retry_delay()).await;
        }
    }

    /// Why `kind` cannot run at all; not subject to retry
    fn unavailable(&self, kind: AnalysisType) -> Option<String> {
        match kind {
            AnalysisType::Comprehensive if self.tools.comprehensive().is_none() => {
                Some("no LLM configured for comprehensive analysis".to_string())
            }
            AnalysisType::Comprehensive => None,
            _ if self.tools.data_tool(kind).is_none() => Some(format!("no tool registered for {kind}")),
            _ => None,
        }
    }

    async fn run_once(&self, kind: AnalysisType, identity: &StockIdentity, config: &BatchConfig) -> Payload {
        let outcome = match kind {
            AnalysisType::Comprehensive => match self.tools.comprehensive() {
                Some(tool) => {
                    let stance = Stance {
                        opinion: config.user_opinion.clone(),
                        position: config.user_position,
                    };
                    tool.analyze(identity, &stance, config.use_cache, config.force_refresh)
                        .await
                }
                None => return Payload::failed("no comprehensive tool registered"),
            },
            _ => match self.tools.data_tool(kind) {
                Some(tool) => {
                    let options = FetchOptions {
                        use_cache: config.use_cache,
                        force_refresh: config.force_refresh,
                        include_ai_analysis: config.include_ai_analysis,
                    };
                    tool.fetch(identity, options).await
                }
                None => return Payload::failed(format!("no tool registered for {kind}")),
            },
        };

        match outcome {
            Ok(value) => Payload::from_value(value),
            Err(e) => Payload::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{
        StubComprehensive, StubResolver, StubTool, basic_payload, technical_payload,
    };
    use crate::monitor::MonitorPhase;

    fn config(types: Vec<AnalysisType>, max_retry: u32) -> BatchConfig {
        BatchConfig::builder()
            .symbols(["600519"])
            .analysis_types(types)
            .max_retry(max_retry)
            .build()
            .unwrap()
    }

    fn toolset(basic: StubTool, technical: StubTool) -> ToolSet {
        ToolSet::new(Arc::new(StubResolver::rejecting(&["999999"])))
            .with_data_tool(AnalysisType::Basic, Arc::new(basic))
            .with_data_tool(AnalysisType::Technical, Arc::new(technical))
    }

    #[tokio::test]
    async fn test_all_types_succeed() {
        let analyzer = SymbolAnalyzer::new(
            toolset(StubTool::ok(basic_payload()), StubTool::ok(technical_payload()))
                .with_comprehensive(Arc::new(StubComprehensive)),
        );
        let config = config(
            vec![AnalysisType::Basic, AnalysisType::Technical, AnalysisType::Comprehensive],
            0,
        );

        let result = analyzer.analyze("600519", &config).await;
        assert_eq!(result.status, Status::Success);
        assert_eq!(result.name, "股票600519");
        assert!(result.error_message.is_none());
        assert_eq!(result.analysis_data.len(), 3);
        assert_eq!(result.summary.analysis_count, 3);
        assert_eq!(result.summary.current_price, 12.5);
        assert!(result.summary.has_ai_analysis);
    }

    #[tokio::test]
    async fn test_one_failing_type_is_partial() {
        let analyzer = SymbolAnalyzer::new(toolset(
            StubTool::ok(basic_payload()).failing_for("600519", "quote parse error"),
            StubTool::ok(technical_payload()),
        ));
        let config = config(vec![AnalysisType::Basic, AnalysisType::Technical], 2);

        let result = analyzer.analyze("600519", &config).await;
        assert_eq!(result.status, Status::Partial);
        assert_eq!(
            result.error_message.as_deref(),
            Some("基本面分析 failed: Provider error: quote parse error")
        );
        assert!(!result.analysis_data[&AnalysisType::Basic].is_ok());
        assert!(result.analysis_data[&AnalysisType::Technical].is_ok());
    }

    #[tokio::test]
    async fn test_all_types_failing_is_failed() {
        let analyzer = SymbolAnalyzer::new(toolset(
            StubTool::ok(basic_payload()).failing_for("600519", "empty data"),
            StubTool::ok(technical_payload())
                .failing_for("600519", "bad format")
                .as_sentinel(),
        ));
        let config = config(vec![AnalysisType::Basic, AnalysisType::Technical], 0);

        let result = analyzer.analyze("600519", &config).await;
        assert_eq!(result.status, Status::Failed);
        let message = result.error_message.unwrap();
        assert!(message.contains("技术分析 failed: bad format"));
        assert_eq!(message.matches("; ").count(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_identity_short_circuits() {
        let basic = Arc::new(StubTool::ok(basic_payload()));
        let tools = ToolSet::new(Arc::new(StubResolver::rejecting(&["999999"])))
            .with_data_tool(AnalysisType::Basic, basic.clone());
        let monitor = Arc::new(ProgressMonitor::new(1));
        monitor.start();
        let analyzer = SymbolAnalyzer::new(tools).with_monitor(monitor.clone());

        let result = analyzer
            .analyze("999999", &config(vec![AnalysisType::Basic], 0))
            .await;
        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.name, UNKNOWN_NAME);
        assert_eq!(
            result.error_message.as_deref(),
            Some("无法获取股票 999999 的身份信息")
        );
        assert!(result.analysis_data.is_empty());
        assert_eq!(basic.calls(), 0);
        assert_eq!(monitor.snapshot().failed_symbols, 1);
    }

    #[tokio::test]
    async fn test_missing_tool_is_a_type_failure() {
        let analyzer = SymbolAnalyzer::new(toolset(
            StubTool::ok(basic_payload()),
            StubTool::ok(technical_payload()),
        ));
        let config = config(vec![AnalysisType::Basic, AnalysisType::Comprehensive], 2);

        let result = analyzer.analyze("600519", &config).await;
        assert_eq!(result.status, Status::Partial);
        assert!(result.error_message.unwrap().starts_with("综合分析 failed"));
    }

    #[tokio::test]
    async fn test_panic_becomes_failed_result() {
        let monitor = Arc::new(ProgressMonitor::new(1));
        monitor.start();
        let analyzer = SymbolAnalyzer::new(toolset(
            StubTool::ok(basic_payload()).panicking_for("600519"),
            StubTool::ok(technical_payload()),
        ))
        .with_monitor(monitor.clone());

        let result = analyzer
            .analyze("600519", &config(vec![AnalysisType::Basic], 0))
            .await;
        assert_eq!(result.status, Status::Failed);
        assert!(result
            .error_message
            .unwrap()
            .starts_with("分析过程中发生未知错误: stub panic for 600519"));
        assert_eq!(monitor.snapshot().failed_symbols, 1);
        assert_eq!(monitor.phase(), MonitorPhase::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_error_is_retried() {
        let basic = Arc::new(StubTool::ok(basic_payload()).flaky(2, "connection reset"));
        let tools = ToolSet::new(Arc::new(StubResolver::default()))
            .with_data_tool(AnalysisType::Basic, basic.clone());
        let analyzer = SymbolAnalyzer::new(tools);

        let result = analyzer
            .analyze("600519", &config(vec![AnalysisType::Basic], 2))
            .await;
        assert_eq!(result.status, Status::Success);
        assert_eq!(basic.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_capped_by_config() {
        let basic = Arc::new(StubTool::ok(basic_payload()).flaky(5, "network down"));
        let tools = ToolSet::new(Arc::new(StubResolver::default()))
            .with_data_tool(AnalysisType::Basic, basic.clone());
        let analyzer = SymbolAnalyzer::new(tools);

        let result = analyzer
            .analyze("600519", &config(vec![AnalysisType::Basic], 1))
            .await;
        assert_eq!(result.status, Status::Failed);
        assert_eq!(basic.calls(), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_once() {
        let basic = Arc::new(StubTool::ok(basic_payload()).flaky(1, "json parse error"));
        let tools = ToolSet::new(Arc::new(StubResolver::default()))
            .with_data_tool(AnalysisType::Basic, basic.clone());
        let analyzer = SymbolAnalyzer::new(tools);

        let result = analyzer
            .analyze("600519", &config(vec![AnalysisType::Basic], 3))
            .await;
        assert_eq!(result.status, Status::Failed);
        assert_eq!(basic.calls(), 1);
    }

    #[tokio::test]
    async fn test_monitor_sees_progress_and_completion() {
        let monitor = Arc::new(ProgressMonitor::new(1));
        monitor.start();
        let analyzer = SymbolAnalyzer::new(toolset(
            StubTool::ok(basic_payload()),
            StubTool::ok(technical_payload()).failing_for("600519", "empty bars"),
        ))
        .with_monitor(monitor.clone());

        let result = analyzer
            .analyze("600519", &config(vec![AnalysisType::Basic, AnalysisType::Technical], 0))
            .await;
        assert_eq!(result.status, Status::Partial);

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.completed_symbols, 1);
        assert_eq!(snapshot.failed_symbols, 0);
        let updates = monitor.progress_updates();
        assert!(updates.iter().any(|u| u.message.contains("技术分析")));
        let errors = monitor.error_summary();
        assert_eq!(errors.total_errors, 0);
        assert_eq!(errors.attempt_errors.values().sum::<usize>(), 1);
    }
}
