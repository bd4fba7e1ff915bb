//! Thread-safe progress tracking for a batch run
//!
//! All mutable state sits behind one mutex. Observers are notified after the
//! lock is released, and a failing or panicking observer never reaches the
//! caller.

use crate::error::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Maximum number of progress updates kept for the monitor log
pub const MAX_BUFFERED_UPDATES: usize = 1000;

/// How many errors `error_summary` reports as recent
const RECENT_ERRORS: usize = 10;

/// Monitor lifecycle, one-way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorPhase {
    Idle,
    Running,
    Stopped,
}

/// Kind of a progress update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    MonitorStarted,
    Started,
    Progress,
    Completed,
    Failed,
    MonitorStopped,
}

impl UpdateStatus {
    pub fn label(self) -> &'static str {
        match self {
            UpdateStatus::MonitorStarted => "监控开始",
            UpdateStatus::Started => "开始分析",
            UpdateStatus::Progress => "分析中",
            UpdateStatus::Completed => "分析完成",
            UpdateStatus::Failed => "分析失败",
            UpdateStatus::MonitorStopped => "监控结束",
        }
    }
}

/// One structured progress event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub timestamp: DateTime<Local>,
    pub symbol: String,
    pub symbol_name: String,
    pub status: UpdateStatus,
    pub message: String,
    pub progress_percent: f64,
}

/// Receives every progress update
///
/// Implementations should not fail; when they do, the error (or panic) is
/// logged and otherwise ignored.
pub trait ProgressObserver: Send + Sync {
    fn on_update(&self, update: &ProgressUpdate) -> Result<()>;
}

/// Timing record for one symbol
#[derive(Debug, Clone, Serialize)]
pub struct SymbolTiming {
    pub symbol_name: String,
    pub start_time: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip)]
    started: Option<Instant>,
}

/// What an error log entry stands for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    /// The symbol as a whole failed
    #[default]
    Symbol,
    /// One analysis attempt failed; the symbol may still succeed
    Attempt,
}

/// One entry of the error log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub symbol: String,
    pub error: String,
    pub timestamp: DateTime<Local>,
    #[serde(default)]
    pub scope: ErrorScope,
}

/// Point-in-time copy of the monitor counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub total_symbols: usize,
    pub completed_symbols: usize,
    pub failed_symbols: usize,
    pub current_symbol: String,
    pub start_time: Option<DateTime<Local>>,
    /// Seconds since `start`, frozen once stopped
    pub elapsed_time: f64,
    /// Projected seconds until every symbol is finished
    pub estimated_remaining: f64,
    /// Completed share of finished symbols, in percent
    pub success_rate: f64,
}

impl MonitorSnapshot {
    /// Symbols that finished, successfully or not
    pub fn processed(&self) -> usize {
        self.completed_symbols + self.failed_symbols
    }
}

/// Aggregated view over the error log
///
/// `total_errors`, `error_by_symbol` and `common_errors` count failed symbols
/// only. Attempt-level entries are grouped by message in `attempt_errors`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub total_errors: usize,
    pub error_by_symbol: BTreeMap<String, usize>,
    pub common_errors: BTreeMap<String, usize>,
    #[serde(default)]
    pub attempt_errors: BTreeMap<String, usize>,
    pub recent_errors: Vec<ErrorRecord>,
}

#[derive(Debug, Serialize)]
struct MonitorInfo {
    total_symbols: usize,
    start_time: Option<DateTime<Local>>,
    end_time: DateTime<Local>,
    duration: f64,
}

#[derive(Debug, Serialize)]
struct MonitorLog {
    monitor_info: MonitorInfo,
    final_stats: MonitorSnapshot,
    error_summary: ErrorSummary,
    symbol_times: BTreeMap<String, SymbolTiming>,
    progress_updates: Vec<ProgressUpdate>,
}

#[derive(Debug)]
struct MonitorState {
    phase: MonitorPhase,
    total: usize,
    completed: usize,
    failed: usize,
    current_symbol: String,
    start_time: Option<DateTime<Local>>,
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
    symbol_times: BTreeMap<String, SymbolTiming>,
    finished: HashSet<String>,
    error_log: Vec<ErrorRecord>,
    updates: VecDeque<ProgressUpdate>,
}

impl MonitorState {
    fn new(total: usize) -> Self {
        Self {
            phase: MonitorPhase::Idle,
            total,
            completed: 0,
            failed: 0,
            current_symbol: String::new(),
            start_time: None,
            started_at: None,
            stopped_at: None,
            symbol_times: BTreeMap::new(),
            finished: HashSet::new(),
            error_log: Vec::new(),
            updates: VecDeque::new(),
        }
    }

    fn elapsed_secs(&self) -> f64 {
        match self.started_at {
            Some(started) => self
                .stopped_at
                .unwrap_or_else(Instant::now)
                .duration_since(started)
                .as_secs_f64(),
            None => 0.0,
        }
    }

    fn snapshot(&self) -> MonitorSnapshot {
        let elapsed = self.elapsed_secs();
        let processed = self.completed + self.failed;

        #[allow(clippy::cast_precision_loss)]
        let (estimated_remaining, success_rate) = if processed > 0 {
            let remaining = self.total.saturating_sub(processed);
            (
                elapsed / processed as f64 * remaining as f64,
                self.completed as f64 / processed as f64 * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        MonitorSnapshot {
            total_symbols: self.total,
            completed_symbols: self.completed,
            failed_symbols: self.failed,
            current_symbol: self.current_symbol.clone(),
            start_time: self.start_time,
            elapsed_time: elapsed,
            estimated_remaining,
            success_rate,
        }
    }

    fn error_summary(&self) -> ErrorSummary {
        let mut summary = ErrorSummary {
            recent_errors: self.error_log[self.error_log.len().saturating_sub(RECENT_ERRORS)..]
                .to_vec(),
            ..ErrorSummary::default()
        };
        for record in &self.error_log {
            if record.scope == ErrorScope::Attempt {
                *summary
                    .attempt_errors
                    .entry(record.error.clone())
                    .or_insert(0) += 1;
                continue;
            }
            summary.total_errors += 1;
            *summary
                .error_by_symbol
                .entry(record.symbol.clone())
                .or_insert(0) += 1;
            *summary
                .common_errors
                .entry(record.error.clone())
                .or_insert(0) += 1;
        }
        summary
    }

    fn push_update(
        &mut self,
        symbol: &str,
        status: UpdateStatus,
        message: String,
        progress_percent: f64,
    ) -> ProgressUpdate {
        let update = ProgressUpdate {
            timestamp: Local::now(),
            symbol: symbol.to_string(),
            symbol_name: self
                .symbol_times
                .get(symbol)
                .map(|t| t.symbol_name.clone())
                .unwrap_or_default(),
            status,
            message,
            progress_percent,
        };
        if self.updates.len() == MAX_BUFFERED_UPDATES {
            self.updates.pop_front();
        }
        self.updates.push_back(update.clone());
        update
    }
}

/// Progress monitor shared by every worker of one batch run
pub struct ProgressMonitor {
    state: Mutex<MonitorState>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl ProgressMonitor {
    /// Create an idle monitor for `total` symbols
    pub fn new(total: usize) -> Self {
        Self {
            state: Mutex::new(MonitorState::new(total)),
            observer: None,
        }
    }

    /// Register an observer notified on every state change
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Idle → Running; starts the clock
    pub fn start(&self) {
        let update = {
            let mut state = self.lock();
            if state.phase != MonitorPhase::Idle {
                warn!("Monitor already {:?}, start ignored", state.phase);
                return;
            }
            state.phase = MonitorPhase::Running;
            state.start_time = Some(Local::now());
            state.started_at = Some(Instant::now());
            state.push_update("monitor", UpdateStatus::MonitorStarted, "监控器已启动".to_string(), 0.0)
        };
        self.notify(&update);
    }

    /// Running → Stopped; freezes elapsed time
    pub fn stop(&self) {
        let update = {
            let mut state = self.lock();
            if state.phase == MonitorPhase::Stopped {
                return;
            }
            state.phase = MonitorPhase::Stopped;
            state.stopped_at = Some(Instant::now());
            state.current_symbol.clear();
            state.push_update("monitor", UpdateStatus::MonitorStopped, "监控器已停止".to_string(), 100.0)
        };
        self.notify(&update);
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> MonitorPhase {
        self.lock().phase
    }

    /// A symbol's analysis is about to begin
    pub fn record_symbol_start(&self, symbol: &str, name: &str) {
        let update = {
            let mut state = self.lock();
            if state.phase == MonitorPhase::Stopped {
                return;
            }
            state.current_symbol = symbol.to_string();
            state.symbol_times.insert(
                symbol.to_string(),
                SymbolTiming {
                    symbol_name: name.to_string(),
                    start_time: Local::now(),
                    end_time: None,
                    duration: None,
                    started: Some(Instant::now()),
                },
            );
            state.push_update(
                symbol,
                UpdateStatus::Started,
                format!("开始分析 {symbol} ({name})"),
                0.0,
            )
        };
        self.notify(&update);
    }

    /// Intermediate progress inside one symbol
    pub fn record_symbol_progress(&self, symbol: &str, progress_percent: f64, message: &str) {
        let update = {
            let mut state = self.lock();
            if state.phase == MonitorPhase::Stopped {
                return;
            }
            state.push_update(
                symbol,
                UpdateStatus::Progress,
                message.to_string(),
                progress_percent.clamp(0.0, 100.0),
            )
        };
        self.notify(&update);
    }

    /// A symbol finished; counted at most once per symbol
    pub fn record_symbol_complete(&self, symbol: &str, success: bool, error: Option<&str>) {
        let update = {
            let mut state = self.lock();
            if state.phase == MonitorPhase::Stopped {
                return;
            }
            if state.finished.contains(symbol) {
                debug!("Completion for {symbol} already recorded, ignoring");
                return;
            }
            if state.completed + state.failed >= state.total {
                warn!("Completion for {symbol} exceeds total of {}, ignoring", state.total);
                return;
            }
            state.finished.insert(symbol.to_string());

            if let Some(timing) = state.symbol_times.get_mut(symbol) {
                let end = Local::now();
                timing.end_time = Some(end);
                timing.duration = timing.started.map(|s| s.elapsed().as_secs_f64());
            }

            if success {
                state.completed += 1;
                state.push_update(
                    symbol,
                    UpdateStatus::Completed,
                    format!("{symbol} 分析成功"),
                    100.0,
                )
            } else {
                state.failed += 1;
                let error = error.unwrap_or_default().to_string();
                state.error_log.push(ErrorRecord {
                    symbol: symbol.to_string(),
                    error: error.clone(),
                    timestamp: Local::now(),
                    scope: ErrorScope::Symbol,
                });
                state.push_update(
                    symbol,
                    UpdateStatus::Failed,
                    format!("{symbol} 分析失败: {error}"),
                    100.0,
                )
            }
        };
        self.notify(&update);
    }

    /// Log a failed attempt without touching the counters
    pub fn record_error(&self, symbol: &str, message: &str) {
        let mut state = self.lock();
        state.error_log.push(ErrorRecord {
            symbol: symbol.to_string(),
            error: message.to_string(),
            timestamp: Local::now(),
            scope: ErrorScope::Attempt,
        });
    }

    /// Copy of the counters and timing projections
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.lock().snapshot()
    }

    pub fn error_summary(&self) -> ErrorSummary {
        self.lock().error_summary()
    }

    /// Buffered updates, oldest first
    pub fn progress_updates(&self) -> Vec<ProgressUpdate> {
        self.lock().updates.iter().cloned().collect()
    }

    /// Per-symbol durations in seconds, for symbols with both ends recorded
    pub fn symbol_durations(&self) -> BTreeMap<String, f64> {
        self.lock()
            .symbol_times
            .iter()
            .filter_map(|(symbol, t)| t.duration.map(|d| (symbol.clone(), d)))
            .collect()
    }

    /// Write the monitor log as pretty JSON
    pub fn save_log(&self, path: impl AsRef<Path>) -> Result<()> {
        let log = {
            let state = self.lock();
            MonitorLog {
                monitor_info: MonitorInfo {
                    total_symbols: state.total,
                    start_time: state.start_time,
                    end_time: Local::now(),
                    duration: state.elapsed_secs(),
                },
                final_stats: state.snapshot(),
                error_summary: state.error_summary(),
                symbol_times: state.symbol_times.clone(),
                progress_updates: state.updates.iter().cloned().collect(),
            }
        };

        let path = path.as_ref();
        std::fs::write(path, serde_json::to_vec_pretty(&log)?)?;
        info!("Monitor log saved: {}", path.display());
        Ok(())
    }

    fn notify(&self, update: &ProgressUpdate) {
        debug!(
            symbol = %update.symbol,
            status = update.status.label(),
            progress = update.progress_percent,
            "{}",
            update.message
        );

        let Some(observer) = &self.observer else {
            return;
        };
        match catch_unwind(AssertUnwindSafe(|| observer.on_update(update))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Progress observer failed: {e}"),
            Err(_) => warn!("Progress observer panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BatchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingObserver {
        calls: AtomicUsize,
    }

    impl ProgressObserver for CountingObserver {
        fn on_update(&self, _update: &ProgressUpdate) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingObserver;

    impl ProgressObserver for FailingObserver {
        fn on_update(&self, update: &ProgressUpdate) -> Result<()> {
            if update.status == UpdateStatus::Started {
                panic!("observer blew up");
            }
            Err(BatchError::Other("observer failed".to_string()))
        }
    }

    #[test]
    fn test_lifecycle_is_one_way() {
        let monitor = ProgressMonitor::new(2);
        assert_eq!(monitor.phase(), MonitorPhase::Idle);

        monitor.start();
        assert_eq!(monitor.phase(), MonitorPhase::Running);

        monitor.stop();
        assert_eq!(monitor.phase(), MonitorPhase::Stopped);

        monitor.start();
        assert_eq!(monitor.phase(), MonitorPhase::Stopped);
    }

    #[test]
    fn test_completion_counts() {
        let monitor = ProgressMonitor::new(3);
        monitor.start();

        monitor.record_symbol_start("600519", "贵州茅台");
        monitor.record_symbol_complete("600519", true, None);
        monitor.record_symbol_start("000001", "平安银行");
        monitor.record_symbol_complete("000001", false, Some("basic failed"));

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.completed_symbols, 1);
        assert_eq!(snapshot.failed_symbols, 1);
        assert_eq!(snapshot.current_symbol, "000001");
        assert!((snapshot.success_rate - 50.0).abs() < f64::EPSILON);
        assert!(snapshot.estimated_remaining >= 0.0);

        let durations = monitor.symbol_durations();
        assert!(durations.contains_key("600519"));
        assert!(durations.contains_key("000001"));

        let summary = monitor.error_summary();
        assert_eq!(summary.total_errors, 1);
        assert_eq!(summary.error_by_symbol.get("000001"), Some(&1));
        assert_eq!(summary.common_errors.get("basic failed"), Some(&1));
    }

    #[test]
    fn test_processed_never_exceeds_total() {
        let monitor = ProgressMonitor::new(2);
        monitor.start();

        let mut last = 0;
        for symbol in ["A", "A", "B", "C", "B"] {
            monitor.record_symbol_complete(symbol, true, None);
            let processed = monitor.snapshot().processed();
            assert!(processed <= 2);
            assert!(processed >= last);
            last = processed;
        }
        assert_eq!(last, 2);
    }

    #[test]
    fn test_complete_without_start_omits_duration() {
        let monitor = ProgressMonitor::new(1);
        monitor.start();
        monitor.record_symbol_complete("600519", true, None);

        assert_eq!(monitor.snapshot().completed_symbols, 1);
        assert!(monitor.symbol_durations().is_empty());
    }

    #[test]
    fn test_eta_is_zero_before_first_completion() {
        let monitor = ProgressMonitor::new(5);
        monitor.start();
        monitor.record_symbol_start("600519", "贵州茅台");

        let snapshot = monitor.snapshot();
        assert!(snapshot.estimated_remaining.abs() < f64::EPSILON);
        assert!(snapshot.success_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_error_leaves_counters() {
        let monitor = ProgressMonitor::new(1);
        monitor.start();
        monitor.record_error("600519", "connection reset");

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.processed(), 0);
        let summary = monitor.error_summary();
        assert_eq!(summary.total_errors, 0);
        assert_eq!(summary.attempt_errors.get("connection reset"), Some(&1));
        assert_eq!(summary.recent_errors[0].scope, ErrorScope::Attempt);
    }

    #[test]
    fn test_failed_symbol_counted_once_with_attempt_errors() {
        let monitor = ProgressMonitor::new(1);
        monitor.start();
        monitor.record_symbol_start("600519", "贵州茅台");
        monitor.record_error("600519", "[基本面分析] connection reset");
        monitor.record_error("600519", "[技术分析] connection reset");
        monitor.record_symbol_complete("600519", false, Some("所有分析均失败"));

        let summary = monitor.error_summary();
        assert_eq!(summary.total_errors, 1);
        assert_eq!(summary.error_by_symbol.get("600519"), Some(&1));
        assert_eq!(summary.common_errors.len(), 1);
        assert_eq!(summary.common_errors.get("所有分析均失败"), Some(&1));
        assert_eq!(summary.attempt_errors.values().sum::<usize>(), 2);
        assert_eq!(summary.recent_errors.len(), 3);
    }

    #[test]
    fn test_update_buffer_is_bounded() {
        let monitor = ProgressMonitor::new(1);
        monitor.start();
        for i in 0..(MAX_BUFFERED_UPDATES + 50) {
            monitor.record_symbol_progress("600519", 50.0, &format!("step {i}"));
        }

        let updates = monitor.progress_updates();
        assert_eq!(updates.len(), MAX_BUFFERED_UPDATES);
        assert_eq!(
            updates.last().map(|u| u.message.as_str()),
            Some(format!("step {}", MAX_BUFFERED_UPDATES + 49).as_str())
        );
    }

    #[test]
    fn test_observer_receives_updates() {
        let observer = Arc::new(CountingObserver {
            calls: AtomicUsize::new(0),
        });
        let monitor = ProgressMonitor::new(1).with_observer(observer.clone());

        monitor.start();
        monitor.record_symbol_start("600519", "贵州茅台");
        monitor.record_symbol_progress("600519", 50.0, "技术分析");
        monitor.record_symbol_complete("600519", true, None);
        monitor.stop();

        assert_eq!(observer.calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_observer_failures_are_swallowed() {
        let monitor = ProgressMonitor::new(1).with_observer(Arc::new(FailingObserver));

        monitor.start();
        monitor.record_symbol_start("600519", "贵州茅台");
        monitor.record_symbol_complete("600519", true, None);

        assert_eq!(monitor.snapshot().completed_symbols, 1);
    }

    #[test]
    fn test_save_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor_log.json");

        let monitor = ProgressMonitor::new(1);
        monitor.start();
        monitor.record_symbol_start("600519", "贵州茅台");
        monitor.record_symbol_complete("600519", false, Some("data empty"));
        monitor.stop();
        monitor.save_log(&path).unwrap();

        let log: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(log["monitor_info"]["total_symbols"], 1);
        assert_eq!(log["final_stats"]["failed_symbols"], 1);
        assert_eq!(log["error_summary"]["total_errors"], 1);
        assert!(log["symbol_times"]["600519"]["duration"].is_number());
        assert!(log["progress_updates"].as_array().unwrap().len() >= 4);
    }

    #[test]
    fn test_concurrent_updates() {
        let monitor = Arc::new(ProgressMonitor::new(100));
        monitor.start();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let monitor = Arc::clone(&monitor);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let symbol = format!("{t}-{i}");
                        monitor.record_symbol_start(&symbol, "");
                        monitor.record_symbol_complete(&symbol, i % 5 != 0, Some("boom"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.processed(), 100);
        assert_eq!(snapshot.failed_symbols, 20);
    }
}
