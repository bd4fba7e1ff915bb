//! Cached access to daily bars shared by the data tools

use crate::api::{Quote, YahooFinanceClient};
use crate::cache::{CacheKey, CacheManager, CachePolicy};
use crate::error::{BatchError, Result};
use crate::tools::StockIdentity;
use serde_json::json;

/// Daily bar source with per-range caching
#[derive(Clone, Default)]
pub struct MarketData {
    yahoo: YahooFinanceClient,
    caches: CacheManager,
}

impl MarketData {
    pub fn new(caches: CacheManager) -> Self {
        Self {
            yahoo: YahooFinanceClient::new(),
            caches,
        }
    }

    pub fn caches(&self) -> &CacheManager {
        &self.caches
    }

    /// Daily bars for `range`, oldest first; errors when none come back
    pub async fn history(
        &self,
        identity: &StockIdentity,
        range: &str,
        policy: CachePolicy,
    ) -> Result<Vec<Quote>> {
        let symbol = identity.market_symbol.as_str();
        let key = CacheKey::new(symbol, "history", json!({ "range": range }));

        let value = self
            .caches
            .history
            .fetch_with(key, policy, || async {
                let quotes = self.yahoo.get_historical_range(symbol, range).await?;
                Ok::<_, BatchError>(serde_json::to_value(quotes)?)
            })
            .await?;

        let quotes: Vec<Quote> = serde_json::from_value(value)?;
        if quotes.is_empty() {
            return Err(BatchError::DataUnavailable {
                symbol: identity.code.clone(),
                reason: "No historical data available".to_string(),
            });
        }
        Ok(quotes)
    }
}

/// Round to two decimals for presentation
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
pub(crate) fn synthetic_bars(closes: &[f64]) -> Vec<Quote> {
    use chrono::{Duration, TimeZone, Utc};

    let start = Utc.with_ymd_and_hms(2024, 1, 2, 7, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Quote {
            symbol: "TEST".to_string(),
            timestamp: start + Duration::days(i as i64),
            open: close * 0.99,
            high: close * 1.01,
            low: close * 0.98,
            close,
            volume: 1_000 + (i as u64 % 7) * 100,
            adjclose: close,
        })
        .collect()
}
