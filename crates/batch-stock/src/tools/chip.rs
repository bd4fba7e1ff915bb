//! Chip (cost) distribution approximated from daily bars
//!
//! Each bar's volume is placed at its typical price `(high + low + close) / 3`.
//! The resulting volume-at-price histogram stands in for the holders' cost
//! distribution.

use crate::api::Quote;
use crate::config::AnalysisType;
use crate::error::{BatchError, Result};
use crate::tools::market::round2;
use crate::tools::{AiAnalyst, DataTool, FetchOptions, MarketData, StockIdentity};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Clone)]
pub struct ChipTool {
    market: MarketData,
    ai: Option<Arc<AiAnalyst>>,
}

impl ChipTool {
    pub fn new(market: MarketData, ai: Option<Arc<AiAnalyst>>) -> Self {
        Self { market, ai }
    }
}

/// Price band holding the central `share` of the volume
fn cost_range(levels: &[(f64, f64)], total: f64, share: f64) -> Value {
    let tail = total * (1.0 - share) / 2.0;
    let mut acc = 0.0;
    let mut low = None;
    let mut high = None;
    for &(price, volume) in levels {
        acc += volume;
        if low.is_none() && acc > tail {
            low = Some(price);
        }
        if high.is_none() && acc >= total - tail {
            high = Some(price);
        }
    }
    let low = low.unwrap_or_default();
    let high = high.unwrap_or(low);
    let concentration = if high + low > 0.0 {
        (high - low) / (high + low) * 100.0
    } else {
        0.0
    };

    json!({
        "low": round2(low),
        "high": round2(high),
        "concentration": round2(concentration),
    })
}

/// Cost distribution payload for a bar series, oldest first
pub fn compute_chip(bars: &[Quote]) -> Result<Value> {
    let symbol = || bars.first().map(|q| q.symbol.clone()).unwrap_or_default();
    let Some(last) = bars.last() else {
        return Err(BatchError::DataUnavailable {
            symbol: symbol(),
            reason: "No bars for chip distribution".to_string(),
        });
    };

    let mut levels: Vec<(f64, f64)> = bars
        .iter()
        .map(|q| ((q.high + q.low + q.close) / 3.0, q.volume as f64))
        .filter(|(_, volume)| *volume > 0.0)
        .collect();
    let total: f64 = levels.iter().map(|(_, v)| v).sum();
    if total <= 0.0 {
        return Err(BatchError::DataUnavailable {
            symbol: symbol(),
            reason: "No traded volume in period".to_string(),
        });
    }
    levels.sort_by(|a, b| a.0.total_cmp(&b.0));

    let close = last.close;
    let profitable: f64 = levels.iter().filter(|(p, _)| *p <= close).map(|(_, v)| v).sum();
    let avg_cost = levels.iter().map(|(p, v)| p * v).sum::<f64>() / total;

    let heaviest = |keep: &dyn Fn(f64) -> bool| {
        levels
            .iter()
            .filter(|(p, _)| keep(*p))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| round2(*p))
    };
    let support_level = heaviest(&|p| p < close);
    let resistance_level = heaviest(&|p| p > close);

    Ok(json!({
        "current_price": round2(close),
        "profit_ratio": round2(profitable / total * 100.0),
        "avg_cost": round2(avg_cost),
        "cost_90": cost_range(&levels, total, 0.9),
        "cost_70": cost_range(&levels, total, 0.7),
        "support_level": support_level,
        "resistance_level": resistance_level,
        "data_points": bars.len(),
    }))
}

#[async_trait]
impl DataTool for ChipTool {
    fn name(&self) -> &str {
        "chip_distribution"
    }

    async fn fetch(&self, identity: &StockIdentity, options: FetchOptions) -> Result<Value> {
        let bars = self
            .market
            .history(identity, "6mo", options.cache_policy())
            .await?;
        let mut payload = compute_chip(&bars)?;

        if options.include_ai_analysis {
            if let Some(ai) = &self.ai {
                ai.attach(AnalysisType::Chip, identity, &mut payload, options.cache_policy())
                    .await;
            }
        }
        Ok(payload)
    }
}
