//! Yahoo Finance API client

use crate::error::{BatchError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::instrument;
use yahoo_finance_api as yahoo;

/// Yahoo Finance API client
#[derive(Debug, Clone, Default)]
pub struct YahooFinanceClient {}

/// One daily bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adjclose: f64,
}

fn yahoo_error(e: impl std::fmt::Display) -> BatchError {
    BatchError::Provider(format!("Yahoo Finance error: {e}"))
}

impl YahooFinanceClient {
    pub fn new() -> Self {
        Self {}
    }

    fn convert(symbol: &str, q: &yahoo::Quote) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            timestamp: DateTime::from_timestamp(q.timestamp as i64, 0).unwrap_or_else(Utc::now),
            open: q.open,
            high: q.high,
            low: q.low,
            close: q.close,
            volume: q.volume,
            adjclose: q.adjclose,
        }
    }

    /// Get the latest quote for a symbol
    #[instrument(skip(self))]
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let provider = yahoo::YahooConnector::new().map_err(yahoo_error)?;

        let response = provider
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(yahoo_error)?;

        let quote = response.last_quote().map_err(yahoo_error)?;
        Ok(Self::convert(symbol, &quote))
    }

    /// Get daily bars between two instants
    #[instrument(skip(self))]
    pub async fn get_historical_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>> {
        let provider = yahoo::YahooConnector::new().map_err(yahoo_error)?;

        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| yahoo_error(format!("Invalid start timestamp: {e}")))?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| yahoo_error(format!("Invalid end timestamp: {e}")))?;

        let response = provider
            .get_quote_history(symbol, start_odt, end_odt)
            .await
            .map_err(yahoo_error)?;

        let quotes = response.quotes().map_err(yahoo_error)?;
        Ok(quotes.iter().map(|q| Self::convert(symbol, q)).collect())
    }

    /// Get daily bars for a named range ("5d", "1mo", "6mo", "1y", "ytd", ...)
    pub async fn get_historical_range(&self, symbol: &str, range: &str) -> Result<Vec<Quote>> {
        let end = Utc::now();
        let start = match range {
            "5d" => end - Duration::days(5),
            "1mo" => end - Duration::days(30),
            "3mo" => end - Duration::days(90),
            "6mo" => end - Duration::days(180),
            "1y" => end - Duration::days(365),
            "2y" => end - Duration::days(730),
            "ytd" => NaiveDate::from_ymd_opt(end.year(), 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
                .ok_or_else(|| BatchError::Other("Invalid year start".to_string()))?,
            _ => return Err(BatchError::Config(format!("Invalid range: {range}"))),
        };

        self.get_historical_quotes(symbol, start, end).await
    }

    /// Validate if a symbol exists by attempting to fetch its quote
    pub async fn validate_symbol(&self, symbol: &str) -> Result<bool> {
        match self.get_quote(symbol).await {
            Ok(_) => Ok(true),
            Err(BatchError::Provider(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
