//! Batch orchestration
//!
//! Fans the symbols of a [`BatchConfig`] out over a bounded worker pool, gathers
//! results in completion order and writes the run's artifacts.

use crate::config::BatchConfig;
use crate::engine::analyzer::{SymbolAnalyzer, panic_message};
use crate::engine::result::{BatchResult, Status, SymbolResult, UNKNOWN_NAME};
use crate::engine::stats::SummaryStats;
use crate::error::Result;
use crate::monitor::{ErrorHandler, ProgressMonitor, ProgressObserver, ProgressReporter};
use crate::monitor::reporter::DEFAULT_REPORT_INTERVAL;
use crate::persist::persist_batch;
use crate::tools::ToolSet;
use chrono::Local;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// File name of the monitor log inside the output directory
pub const MONITOR_LOG_FILE: &str = "monitor_log.json";

pub struct BatchOrchestrator {
    tools: ToolSet,
    monitoring: bool,
    observer: Option<Arc<dyn ProgressObserver>>,
    report_interval: Duration,
}

impl BatchOrchestrator {
    pub fn new(tools: ToolSet) -> Self {
        Self {
            tools,
            monitoring: true,
            observer: None,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }

    /// Run without the progress monitor, error log and monitor log artifact
    pub fn without_monitoring(mut self) -> Self {
        self.monitoring = false;
        self
    }

    /// Forward every progress update to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    fn build_monitor(&self, total: usize) -> Option<Arc<ProgressMonitor>> {
        if !self.monitoring {
            return None;
        }
        let mut monitor = ProgressMonitor::new(total);
        if let Some(observer) = &self.observer {
            monitor = monitor.with_observer(observer.clone());
        }
        Some(Arc::new(monitor))
    }

    /// Analyze every symbol of `config`
    ///
    /// Only an invalid config or an output directory that cannot be created
    /// fails the run; per-symbol and per-artifact problems end up in the
    /// result and the logs.
    pub async fn run(&self, config: BatchConfig) -> Result<BatchResult> {
        config.validate()?;
        tokio::fs::create_dir_all(&config.output_dir).await?;

        let start_time = Local::now();
        let started = Instant::now();
        info!(
            symbols = config.symbols.len(),
            workers = config.worker_count,
            use_cache = config.use_cache,
            ai = config.include_ai_analysis,
            "Starting batch analysis of {} symbols ({})",
            config.symbols.len(),
            config
                .analysis_types
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let monitor = self.build_monitor(config.symbols.len());
        let handler = ErrorHandler::new(monitor.clone());
        let mut reporter = monitor
            .clone()
            .map(|m| ProgressReporter::with_interval(m, self.report_interval));
        if let Some(monitor) = &monitor {
            monitor.start();
        }

        let mut analyzer = SymbolAnalyzer::new(self.tools.clone());
        if let Some(monitor) = &monitor {
            analyzer = analyzer.with_monitor(monitor.clone());
        }
        let analyzer = Arc::new(analyzer);
        let config = Arc::new(config);
        let permits = Arc::new(Semaphore::new(config.worker_count));

        let mut tasks = JoinSet::new();
        let mut symbols_by_task = HashMap::new();
        for symbol in config.symbols.iter().cloned() {
            let analyzer = Arc::clone(&analyzer);
            let config = Arc::clone(&config);
            let permits = Arc::clone(&permits);
            let task_symbol = symbol.clone();
            let handle = tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                analyzer.analyze(&task_symbol, &config).await
            });
            symbols_by_task.insert(handle.id(), symbol);
        }

        let mut results = Vec::with_capacity(config.symbols.len());
        let mut success_count = 0;
        let mut failed_count = 0;

        while let Some(joined) = tasks.join_next_with_id().await {
            let result = match joined {
                Ok((_, result)) => result,
                Err(e) => {
                    let symbol = symbols_by_task.get(&e.id()).cloned().unwrap_or_default();
                    let detail = if e.is_panic() {
                        panic_message(e.into_panic().as_ref())
                    } else {
                        e.to_string()
                    };
                    task_failure(&symbol, &detail, &handler, monitor.as_deref())
                }
            };

            if result.status == Status::Success {
                success_count += 1;
            } else {
                failed_count += 1;
            }
            results.push(result);

            if let Some(reporter) = reporter.as_mut() {
                reporter.report();
            }
        }

        if let Some(monitor) = &monitor {
            monitor.stop();
            if let Err(e) = monitor.save_log(config.output_dir.join(MONITOR_LOG_FILE)) {
                error!("Failed to save monitor log: {e}");
            }
        }

        let summary_stats = SummaryStats::from_results(&results);
        let batch = BatchResult {
            config: Arc::unwrap_or_clone(config),
            results,
            start_time,
            end_time: Local::now(),
            total_duration: started.elapsed().as_secs_f64(),
            success_count,
            failed_count,
            summary_stats,
        };

        if batch.config.save_individual || batch.config.save_summary {
            persist_batch(&batch);
        }

        info!(
            success = batch.success_count,
            failed = batch.failed_count,
            "Batch analysis finished in {:.2}s, results in {}",
            batch.total_duration,
            batch.config.output_dir.display()
        );
        if batch.failed_count > 0 {
            if let Some(monitor) = &monitor {
                log_common_errors(monitor);
            }
        }
        Ok(batch)
    }
}

/// Synthetic `failed` result for a task that died outside the analyzer
fn task_failure(
    symbol: &str,
    detail: &str,
    handler: &ErrorHandler,
    monitor: Option<&ProgressMonitor>,
) -> SymbolResult {
    error!("{symbol} analysis task aborted: {detail}");
    handler.handle(symbol, detail, "任务执行异常");
    let message = format!("任务执行异常: {detail}");
    if let Some(monitor) = monitor {
        monitor.record_symbol_complete(symbol, false, Some(&message));
    }
    SymbolResult::failed(symbol, UNKNOWN_NAME, message)
}

fn log_common_errors(monitor: &ProgressMonitor) {
    let summary = monitor.error_summary();
    let mut common: Vec<_> = summary.common_errors.into_iter().collect();
    common.sort_by(|a, b| b.1.cmp(&a.1));
    warn!(total_errors = summary.total_errors, "Errors during batch analysis");
    for (message, count) in common.into_iter().take(3) {
        warn!("  {message} ({count}x)");
    }
}
