//! Summary derivation from per-type payloads

use crate::config::AnalysisType;
use crate::engine::result::{RsiLevel, Summary};
use crate::tools::Payload;
use serde_json::Value;
use std::collections::BTreeMap;

fn number(payload: &Payload, key: &str) -> f64 {
    payload.get(key).and_then(Value::as_f64).unwrap_or_default()
}

/// Build the headline summary; failed payloads contribute nothing
pub fn derive_summary(data: &BTreeMap<AnalysisType, Payload>) -> Summary {
    let mut summary = Summary::default();

    for (kind, payload) in data {
        if !payload.is_ok() {
            continue;
        }
        summary.analysis_count += 1;
        summary.has_ai_analysis |= payload.has_ai_analysis();

        match kind {
            AnalysisType::Basic => {
                summary.current_price = number(payload, "current_price");
                summary.change_percent = number(payload, "change_percent");
                summary.industry = payload
                    .get("industry")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
            }
            AnalysisType::Technical => {
                let indicators = payload.get("indicators");
                let field = |key: &str| {
                    indicators
                        .and_then(|i| i.get(key))
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string()
                };
                summary.technical_trend = format!("{} | MACD {}", field("ma_trend"), field("macd_trend"));
                let rsi = indicators
                    .and_then(|i| i.get("rsi_14"))
                    .and_then(Value::as_f64)
                    .unwrap_or(50.0);
                summary.rsi_level = RsiLevel::from_rsi(rsi);
            }
            AnalysisType::News => {
                summary.news_count = payload.get("news_count").and_then(Value::as_u64).unwrap_or_default();
            }
            AnalysisType::Chip => {
                summary.profit_ratio = number(payload, "profit_ratio");
            }
            AnalysisType::Comprehensive => summary.has_ai_analysis = true,
        }
    }
    summary
}
