//! Writing and reloading batch artifacts

pub mod artifacts;
pub mod loader;
pub mod sanitize;

pub use artifacts::{
    BatchInfo, DetailedReport, SummaryRow, file_timestamp, persist_batch, safe_file_part,
    save_detailed_json, save_summary_csv, save_symbol_result,
};
pub use loader::ResultDir;
pub use sanitize::sanitize;
