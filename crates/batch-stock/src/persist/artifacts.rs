//! Result artifacts written to the output directory

use crate::config::BatchConfig;
use crate::engine::{BatchResult, SummaryStats, SymbolResult};
use crate::error::Result;
use crate::persist::sanitize;
use crate::tools::Payload;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// File name prefix of the detailed JSON document
pub const DETAILED_PREFIX: &str = "batch_analysis_detailed_";
/// File name prefix of the summary CSV
pub const SUMMARY_PREFIX: &str = "batch_analysis_summary_";

/// Timestamp used in artifact file names
pub fn file_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Replace characters that are not safe in file names
pub fn safe_file_part(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// Run metadata at the head of the detailed document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInfo {
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub total_duration: f64,
    pub success_count: usize,
    pub failed_count: usize,
    pub config: BatchConfig,
}

/// The detailed JSON document: run info, aggregate stats and every result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedReport {
    pub batch_info: BatchInfo,
    pub summary_stats: SummaryStats,
    pub results: Vec<SymbolResult>,
}

impl From<&BatchResult> for DetailedReport {
    fn from(batch: &BatchResult) -> Self {
        Self {
            batch_info: BatchInfo {
                start_time: batch.start_time,
                end_time: batch.end_time,
                total_duration: batch.total_duration,
                success_count: batch.success_count,
                failed_count: batch.failed_count,
                config: batch.config.clone(),
            },
            summary_stats: batch.summary_stats.clone(),
            results: batch.results.clone(),
        }
    }
}

/// One row of the summary CSV
#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryRow {
    pub symbol: String,
    pub name: String,
    pub status: String,
    pub current_price: f64,
    pub change_percent: f64,
    pub industry: String,
    pub technical_trend: String,
    pub rsi_level: String,
    pub news_count: u64,
    pub profit_ratio: f64,
    pub analysis_count: usize,
    pub has_ai_analysis: bool,
    pub error_message: String,
    pub analysis_time: String,
}

impl From<&SymbolResult> for SummaryRow {
    fn from(result: &SymbolResult) -> Self {
        let summary = &result.summary;
        Self {
            symbol: result.symbol.clone(),
            name: result.name.clone(),
            status: result.status.to_string(),
            current_price: summary.current_price,
            change_percent: summary.change_percent,
            industry: summary.industry.clone(),
            technical_trend: summary.technical_trend.clone(),
            rsi_level: summary.rsi_level.label().to_string(),
            news_count: summary.news_count,
            profit_ratio: summary.profit_ratio,
            analysis_count: summary.analysis_count,
            has_ai_analysis: summary.has_ai_analysis,
            error_message: result.error_message.clone().unwrap_or_default(),
            analysis_time: result.analysis_time.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Copy of `result` with tabular shapes inside each payload flattened
///
/// Only field values are rewritten; a payload always stays a field map so the
/// document reads back into the same `Payload` variants.
fn normalized(result: &SymbolResult) -> SymbolResult {
    let mut result = result.clone();
    for payload in result.analysis_data.values_mut() {
        if let Payload::Ok(fields) = payload {
            for value in fields.values_mut() {
                *value = sanitize(value.take());
            }
        }
    }
    result
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// `<code>_<name>_<ts>.json`; `None` when the symbol has no analysis data
pub fn save_symbol_result(result: &SymbolResult, dir: &Path, ts: &str) -> Result<Option<PathBuf>> {
    if result.analysis_data.is_empty() {
        return Ok(None);
    }
    let path = dir.join(format!(
        "{}_{}_{ts}.json",
        safe_file_part(&result.symbol),
        safe_file_part(&result.name)
    ));
    write_json(&path, &normalized(result))?;
    Ok(Some(path))
}

pub fn save_summary_csv(results: &[SymbolResult], dir: &Path, ts: &str) -> Result<PathBuf> {
    let path = dir.join(format!("{SUMMARY_PREFIX}{ts}.csv"));
    let mut writer = csv::Writer::from_path(&path)?;
    for result in results {
        writer.serialize(SummaryRow::from(result))?;
    }
    writer.flush()?;
    Ok(path)
}

pub fn save_detailed_json(report: &DetailedReport, dir: &Path, ts: &str) -> Result<PathBuf> {
    let path = dir.join(format!("{DETAILED_PREFIX}{ts}.json"));
    let report = DetailedReport {
        batch_info: report.batch_info.clone(),
        summary_stats: report.summary_stats.clone(),
        results: report.results.iter().map(normalized).collect(),
    };
    write_json(&path, &report)?;
    Ok(path)
}

/// Write the artifacts the batch config asks for
///
/// Each artifact is independent: a failure is logged and the rest are still
/// written. Returns the paths that were written.
pub fn persist_batch(batch: &BatchResult) -> Vec<PathBuf> {
    let dir = batch.config.output_dir.as_path();
    let ts = file_timestamp(batch.end_time);
    let mut written = Vec::new();

    if batch.config.save_individual {
        for result in &batch.results {
            match save_symbol_result(result, dir, &ts) {
                Ok(Some(path)) => written.push(path),
                Ok(None) => {}
                Err(e) => error!("Failed to save result for {}: {e}", result.symbol),
            }
        }
    }

    if batch.config.save_summary {
        match save_summary_csv(&batch.results, dir, &ts) {
            Ok(path) => written.push(path),
            Err(e) => error!("Failed to save summary CSV: {e}"),
        }
        match save_detailed_json(&DetailedReport::from(batch), dir, &ts) {
            Ok(path) => written.push(path),
            Err(e) => error!("Failed to save detailed report: {e}"),
        }
    }

    info!("Saved {} artifacts to {}", written.len(), dir.display());
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisType;
    use crate::engine::Status;
    use crate::tools::Payload;
    use serde_json::json;
    use tempfile::TempDir;

    fn batch(dir: &Path) -> BatchResult {
        let mut ok = SymbolResult::failed("600519", "贵州茅台", "");
        ok.status = Status::Success;
        ok.error_message = None;
        ok.summary.current_price = 1700.0;
        ok.analysis_data.insert(
            AnalysisType::Basic,
            Payload::from_value(json!({
                "current_price": 1700.0,
                "history": {"columns": ["close"], "data": [[1700.0]]},
            })),
        );
        let failed = SymbolResult::failed("999999", "未知", "无法获取股票 999999 的身份信息");

        let config = BatchConfig::builder()
            .symbols(["600519", "999999"])
            .output_dir(dir)
            .build()
            .unwrap();
        let now = Local::now();
        let results = vec![ok, failed];
        BatchResult {
            summary_stats: SummaryStats::from_results(&results),
            config,
            results,
            start_time: now,
            end_time: now,
            total_duration: 1.5,
            success_count: 1,
            failed_count: 1,
        }
    }

    #[test]
    fn test_safe_file_part() {
        assert_eq!(safe_file_part("A/B C:D"), "A_B_C_D");
        assert_eq!(safe_file_part("贵州茅台"), "贵州茅台");
    }

    #[test]
    fn test_persist_batch_writes_all_artifacts() {
        let temp = TempDir::new().unwrap();
        let batch = batch(temp.path());

        let written = persist_batch(&batch);
        // Only the symbol with analysis data gets its own file
        assert_eq!(written.len(), 3);
        let ts = file_timestamp(batch.end_time);
        let individual = temp.path().join(format!("600519_贵州茅台_{ts}.json"));
        assert!(individual.exists());

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(individual).unwrap()).unwrap();
        assert_eq!(saved["analysis_data"]["basic"]["history"], json!([{"close": 1700.0}]));
    }

    #[test]
    fn test_summary_csv_columns() {
        let temp = TempDir::new().unwrap();
        let batch = batch(temp.path());

        let path = save_summary_csv(&batch.results, temp.path(), "ts").unwrap();
        let mut reader = csv::Reader::from_path(path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "symbol");
        assert_eq!(&headers[13], "analysis_time");

        let rows: Vec<SummaryRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, "success");
        assert_eq!(rows[0].rsi_level, "中性");
        assert_eq!(rows[1].error_message, "无法获取股票 999999 的身份信息");
    }

    #[test]
    fn test_save_flags_respected() {
        let temp = TempDir::new().unwrap();
        let mut batch = batch(temp.path());
        batch.config.save_individual = false;
        batch.config.save_summary = false;

        assert!(persist_batch(&batch).is_empty());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_dir_is_logged_not_raised() {
        let temp = TempDir::new().unwrap();
        let mut batch = batch(temp.path());
        batch.config.output_dir = temp.path().join("missing").join("dir");

        assert!(persist_batch(&batch).is_empty());
    }
}
