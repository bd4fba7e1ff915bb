//! Rate-limited progress reporting

use super::ProgressMonitor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Default time between two reports
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Periodically logs a monitor snapshot
pub struct ProgressReporter {
    monitor: Arc<ProgressMonitor>,
    interval: Duration,
    last_report: Instant,
}

impl ProgressReporter {
    pub fn new(monitor: Arc<ProgressMonitor>) -> Self {
        Self::with_interval(monitor, DEFAULT_REPORT_INTERVAL)
    }

    pub fn with_interval(monitor: Arc<ProgressMonitor>, interval: Duration) -> Self {
        Self {
            monitor,
            interval,
            last_report: Instant::now(),
        }
    }

    pub fn should_report(&self) -> bool {
        self.last_report.elapsed() >= self.interval
    }

    /// Log a snapshot if the interval has passed; returns whether it did
    pub fn report(&mut self) -> bool {
        if !self.should_report() {
            return false;
        }

        let stats = self.monitor.snapshot();
        info!(
            total = stats.total_symbols,
            completed = stats.completed_symbols,
            failed = stats.failed_symbols,
            current = %stats.current_symbol,
            "Batch progress: success rate {:.1}%, elapsed {:.1}s, remaining ~{:.1}s",
            stats.success_rate,
            stats.elapsed_time,
            stats.estimated_remaining
        );

        let errors = self.monitor.error_summary();
        if let Some(recent) = errors.recent_errors.last() {
            info!(
                total_errors = errors.total_errors,
                "Most recent error: {} - {}", recent.symbol, recent.error
            );
        }

        self.last_report = Instant::now();
        true
    }
}
