//! Technical indicators over daily bars

use crate::api::Quote;
use crate::config::AnalysisType;
use crate::error::{BatchError, Result};
use crate::tools::market::round2;
use crate::tools::{AiAnalyst, DataTool, FetchOptions, MarketData, StockIdentity};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use ta::{
    Next,
    indicators::{
        BollingerBands, ExponentialMovingAverage, MovingAverageConvergenceDivergence,
        RelativeStrengthIndex, SimpleMovingAverage,
    },
};

/// Fewest bars that give meaningful MA20 / Bollinger values
pub const MIN_BARS: usize = 20;

const TRADING_DAYS: f64 = 252.0;

/// Moving averages, MACD, RSI, Bollinger bands and risk metrics
#[derive(Clone)]
pub struct TechnicalTool {
    market: MarketData,
    ai: Option<Arc<AiAnalyst>>,
}

impl TechnicalTool {
    pub fn new(market: MarketData, ai: Option<Arc<AiAnalyst>>) -> Self {
        Self { market, ai }
    }
}

fn indicator_error(e: impl std::fmt::Display) -> BatchError {
    BatchError::Indicator(e.to_string())
}

/// Run an indicator over the series and keep the final value
fn last_value<I: Next<f64, Output = f64>>(mut indicator: I, closes: &[f64]) -> f64 {
    closes.iter().fold(0.0, |_, &c| indicator.next(c))
}

fn sma(period: usize, closes: &[f64]) -> Result<Option<f64>> {
    if closes.len() < period {
        return Ok(None);
    }
    let indicator = SimpleMovingAverage::new(period).map_err(indicator_error)?;
    Ok(Some(round2(last_value(indicator, closes))))
}

/// MA alignment: bullish when MA5 > MA10 > MA20, bearish when reversed
pub fn ma_trend(ma5: f64, ma10: f64, ma20: f64) -> &'static str {
    if ma5 > ma10 && ma10 > ma20 {
        "bullish"
    } else if ma5 < ma10 && ma10 < ma20 {
        "bearish"
    } else {
        "sideways"
    }
}

/// Annualised volatility and max drawdown, both in percent
pub fn risk_metrics(closes: &[f64]) -> Value {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();

    let volatility = if returns.len() > 1 {
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt() * TRADING_DAYS.sqrt() * 100.0
    } else {
        0.0
    };

    let mut peak = f64::MIN;
    let mut max_drawdown: f64 = 0.0;
    for &close in closes {
        peak = peak.max(close);
        if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - close) / peak * 100.0);
        }
    }

    json!({
        "annual_volatility": round2(volatility),
        "max_drawdown": round2(max_drawdown),
    })
}

/// Indicator payload for a bar series, oldest first
pub fn compute_indicators(bars: &[Quote]) -> Result<Value> {
    if bars.len() < MIN_BARS {
        return Err(BatchError::DataUnavailable {
            symbol: bars.first().map(|q| q.symbol.clone()).unwrap_or_default(),
            reason: format!("need at least {MIN_BARS} bars, got {}", bars.len()),
        });
    }
    let closes: Vec<f64> = bars.iter().map(|q| q.close).collect();

    let ma5 = sma(5, &closes)?.unwrap_or_default();
    let ma10 = sma(10, &closes)?.unwrap_or_default();
    let ma20 = sma(20, &closes)?.unwrap_or_default();
    let ma60 = sma(60, &closes)?;

    let ema12 = last_value(ExponentialMovingAverage::new(12).map_err(indicator_error)?, &closes);
    let ema26 = last_value(ExponentialMovingAverage::new(26).map_err(indicator_error)?, &closes);
    let rsi_14 = last_value(RelativeStrengthIndex::new(14).map_err(indicator_error)?, &closes);

    let mut macd = MovingAverageConvergenceDivergence::new(12, 26, 9).map_err(indicator_error)?;
    let mut bb = BollingerBands::new(20, 2.0).map_err(indicator_error)?;
    let (mut macd_out, mut bb_out) = (None, None);
    for &close in &closes {
        macd_out = Some(macd.next(close));
        bb_out = Some(bb.next(close));
    }
    let (Some(macd_out), Some(bb_out)) = (macd_out, bb_out) else {
        return Err(indicator_error("empty series"));
    };

    let macd_trend = if macd_out.histogram >= 0.0 { "bullish" } else { "bearish" };
    let latest_close = closes.last().copied().unwrap_or_default();

    Ok(json!({
        "indicators": {
            "ma5": ma5,
            "ma10": ma10,
            "ma20": ma20,
            "ma60": ma60,
            "ema12": round2(ema12),
            "ema26": round2(ema26),
            "macd_dif": round2(macd_out.macd),
            "macd_dea": round2(macd_out.signal),
            "macd_histogram": round2(macd_out.histogram),
            "rsi_14": round2(rsi_14),
            "boll_upper": round2(bb_out.upper),
            "boll_middle": round2(bb_out.average),
            "boll_lower": round2(bb_out.lower),
            "ma_trend": ma_trend(ma5, ma10, ma20),
            "macd_trend": macd_trend,
        },
        "risk_metrics": risk_metrics(&closes),
        "latest_close": round2(latest_close),
        "data_points": closes.len(),
        "start_date": bars.first().map(|q| q.timestamp.date_naive().to_string()),
        "end_date": bars.last().map(|q| q.timestamp.date_naive().to_string()),
    }))
}

#[async_trait]
impl DataTool for TechnicalTool {
    fn name(&self) -> &str {
        "technical_indicator"
    }

    async fn fetch(&self, identity: &StockIdentity, options: FetchOptions) -> Result<Value> {
        let bars = self
            .market
            .history(identity, "6mo", options.cache_policy())
            .await?;
        let mut payload = compute_indicators(&bars)?;

        if options.include_ai_analysis {
            if let Some(ai) = &self.ai {
                ai.attach(AnalysisType::Technical, identity, &mut payload, options.cache_policy())
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
    fn test_ma_trend() {
        assert_eq!(ma_trend(12.0, 11.0, 10.0), "bullish");
        assert_eq!(ma_trend(10.0, 11.0, 12.0), "bearish");
        assert_eq!(ma_trend(11.0, 10.0, 12.0), "sideways");
    }

    #[test]
    fn test_rising_series() {
        let closes: Vec<f64> = (0..80).map(|i| 10.0 + f64::from(i) * 0.5).collect();
        let payload = compute_indicators(&synthetic_bars(&closes)).unwrap();

        let indicators = &payload["indicators"];
        assert_eq!(indicators["ma_trend"], "bullish");
        assert_eq!(indicators["macd_trend"], "bullish");
        assert!(indicators["rsi_14"].as_f64().unwrap() > 70.0);
        assert!(indicators["ma60"].is_number());
        assert_eq!(payload["data_points"], 80);
        assert_eq!(payload["risk_metrics"]["max_drawdown"], 0.0);
    }

    #[test]
    fn test_falling_series() {
        let closes: Vec<f64> = (0..30).map(|i| 50.0 - f64::from(i)).collect();
        let payload = compute_indicators(&synthetic_bars(&closes)).unwrap();

        let indicators = &payload["indicators"];
        assert_eq!(indicators["ma_trend"], "bearish");
        assert!(indicators["rsi_14"].as_f64().unwrap() < 30.0);
        assert!(indicators["ma60"].is_null());
        assert!(payload["risk_metrics"]["max_drawdown"].as_f64().unwrap() > 50.0);
    }

    #[test]
    fn test_too_few_bars() {
        let err = compute_indicators(&synthetic_bars(&[1.0, 2.0, 3.0])).unwrap_err();
        assert!(matches!(err, BatchError::DataUnavailable { .. }));
    }

    #[test]
    fn test_risk_metrics_flat_series() {
        let metrics = risk_metrics(&[10.0; 10]);
        assert_eq!(metrics["annual_volatility"], 0.0);
        assert_eq!(metrics["max_drawdown"], 0.0);
    }
}
