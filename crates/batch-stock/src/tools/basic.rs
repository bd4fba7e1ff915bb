//! Basic quote information

use crate::api::Quote;
use crate::config::AnalysisType;
use crate::error::{BatchError, Result};
use crate::tools::market::round2;
use crate::tools::{AiAnalyst, DataTool, FetchOptions, MarketData, StockIdentity};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// Latest price, change against the previous close and period range
#[derive(Clone)]
pub struct BasicInfoTool {
    market: MarketData,
    ai: Option<Arc<AiAnalyst>>,
}

impl BasicInfoTool {
    pub fn new(market: MarketData, ai: Option<Arc<AiAnalyst>>) -> Self {
        Self { market, ai }
    }
}

/// Quote summary over a non-empty bar series
pub(crate) fn summarize_quotes(identity: &StockIdentity, bars: &[Quote]) -> Result<Value> {
    let last = bars.last().ok_or_else(|| BatchError::DataUnavailable {
        symbol: identity.code.clone(),
        reason: "No quotes returned".to_string(),
    })?;
    let previous_close = bars
        .len()
        .checked_sub(2)
        .map_or(last.open, |i| bars[i].close);

    let change = last.close - previous_close;
    let change_percent = if previous_close > 0.0 {
        change / previous_close * 100.0
    } else {
        0.0
    };
    let period_high = bars.iter().map(|q| q.high).fold(f64::MIN, f64::max);
    let period_low = bars.iter().map(|q| q.low).fold(f64::MAX, f64::min);

    Ok(json!({
        "symbol": identity.code,
        "name": identity.name,
        "market_symbol": identity.market_symbol,
        "industry": identity.industry(),
        "current_price": round2(last.close),
        "previous_close": round2(previous_close),
        "change": round2(change),
        "change_percent": round2(change_percent),
        "open": round2(last.open),
        "high": round2(last.high),
        "low": round2(last.low),
        "volume": last.volume,
        "period_high": round2(period_high),
        "period_low": round2(period_low),
        "update_time": last.timestamp.to_rfc3339(),
    }))
}

#[async_trait]
impl DataTool for BasicInfoTool {
    fn name(&self) -> &str {
        "basic_info"
    }

    async fn fetch(&self, identity: &StockIdentity, options: FetchOptions) -> Result<Value> {
        let bars = self
            .market
            .history(identity, "1mo", options.cache_policy())
            .await?;
        let mut payload = summarize_quotes(identity, &bars)?;

        if options.include_ai_analysis {
            if let Some(ai) = &self.ai {
                ai.attach(AnalysisType::Basic, identity, &mut payload, options.cache_policy())
                    .await;
            }
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::market::synthetic_bars;

    #[test]
    fn test_summarize_quotes() {
        let identity = StockIdentity::new("600519", "贵州茅台").with_extra("industry", "白酒");
        let bars = synthetic_bars(&[100.0, 110.0, 99.0]);

        let payload = summarize_quotes(&identity, &bars).unwrap();
        assert_eq!(payload["current_price"], 99.0);
        assert_eq!(payload["previous_close"], 110.0);
        assert_eq!(payload["change"], -11.0);
        assert_eq!(payload["change_percent"], -10.0);
        assert_eq!(payload["industry"], "白酒");
        assert_eq!(payload["market_symbol"], "600519.SS");
    }

    #[test]
    fn test_single_bar_uses_open() {
        let identity = StockIdentity::new("000001", "平安银行");
        let bars = synthetic_bars(&[10.0]);

        let payload = summarize_quotes(&identity, &bars).unwrap();
        assert_eq!(payload["previous_close"], 9.9);
        assert_eq!(payload["change_percent"], 1.01);
    }

    #[test]
    fn test_no_bars_is_unavailable() {
        let identity = StockIdentity::new("000001", "平安银行");
        assert!(summarize_quotes(&identity, &[]).is_err());
    }
}
