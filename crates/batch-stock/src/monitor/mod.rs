//! Progress monitoring, error classification and periodic reporting

pub mod classifier;
pub mod progress;
pub mod reporter;

pub use classifier::{ErrorCategory, ErrorHandler, RetryAdvice};
pub use progress::{
    ErrorRecord, ErrorScope, ErrorSummary, MonitorPhase, MonitorSnapshot, ProgressMonitor, ProgressObserver,
    ProgressUpdate, UpdateStatus,
};
pub use reporter::ProgressReporter;
