//! Shared utilities for stock-batch
//!
//! Logging setup and environment-backed settings used by the analysis crate and
//! the CLI.

pub mod config;
pub mod logging;

pub use config::{LlmSettings, Settings, SettingsError, SmtpSettings, SmtpTls};
pub use logging::{init_tracing, init_tracing_with_default};
