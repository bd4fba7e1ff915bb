//! Reload a finished batch from its output directory

use crate::error::{BatchError, Result};
use crate::persist::artifacts::{DETAILED_PREFIX, DetailedReport, SUMMARY_PREFIX};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Artifacts found in a batch output directory
#[derive(Debug, Clone)]
pub struct ResultDir {
    pub dir: PathBuf,
    pub report: DetailedReport,
    pub detailed_path: PathBuf,
    pub summary_csv: Option<PathBuf>,
}

/// Newest file in `dir` named `<prefix>*.<ext>`
///
/// File names carry a sortable timestamp, so the lexicographically largest
/// name is the newest.
fn newest(dir: &Path, prefix: &str, ext: &str) -> Result<Option<PathBuf>> {
    let mut best: Option<PathBuf> = None;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix) && n.ends_with(ext));
        if matches && best.as_ref().is_none_or(|b| path.file_name() > b.file_name()) {
            best = Some(path);
        }
    }
    Ok(best)
}

impl ResultDir {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(BatchError::Config(format!(
                "analysis directory not found: {}",
                dir.display()
            )));
        }

        let detailed_path = newest(dir, DETAILED_PREFIX, ".json")?.ok_or_else(|| {
            BatchError::DataUnavailable {
                symbol: String::new(),
                reason: format!("no detailed results in {}", dir.display()),
            }
        })?;
        debug!("Loading batch results from {}", detailed_path.display());

        let report: DetailedReport = serde_json::from_str(&fs::read_to_string(&detailed_path)?)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            report,
            detailed_path,
            summary_csv: newest(dir, SUMMARY_PREFIX, ".csv")?,
        })
    }
}
