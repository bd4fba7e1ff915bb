//! Aggregate statistics over a batch

use crate::engine::result::SymbolResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Price histogram: low < 20 <= medium < 100 <= high
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRanges {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl PriceRanges {
    /// Count one price; non-positive prices are skipped
    pub fn add(&mut self, price: f64) {
        if price <= 0.0 {
            return;
        }
        if price < 20.0 {
            self.low += 1;
        } else if price < 100.0 {
            self.medium += 1;
        } else {
            self.high += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_symbols: usize,
    /// Percent of `success` results
    pub success_rate: f64,
    /// Mean seconds per symbol
    pub avg_analysis_time: f64,
    pub industry_distribution: BTreeMap<String, usize>,
    pub price_ranges: PriceRanges,
    pub trend_distribution: BTreeMap<String, usize>,
    /// Percent of results with AI output
    pub ai_analysis_coverage: f64,
}

impl SummaryStats {
    pub fn from_results(results: &[SymbolResult]) -> Self {
        let mut stats = Self {
            total_symbols: results.len(),
            ..Self::default()
        };
        if results.is_empty() {
            return stats;
        }
        let total = results.len() as f64;

        let successes = results.iter().filter(|r| r.is_success()).count();
        stats.success_rate = successes as f64 / total * 100.0;
        stats.avg_analysis_time = results.iter().map(|r| r.duration_secs).sum::<f64>() / total;

        for result in results {
            let summary = &result.summary;
            if !summary.industry.is_empty() {
                *stats
                    .industry_distribution
                    .entry(summary.industry.clone())
                    .or_default() += 1;
            }
            if summary.technical_trend != "unknown" {
                *stats
                    .trend_distribution
                    .entry(summary.technical_trend.clone())
                    .or_default() += 1;
            }
            stats.price_ranges.add(summary.current_price);
        }

        let with_ai = results.iter().filter(|r| r.summary.has_ai_analysis).count();
        stats.ai_analysis_coverage = with_ai as f64 / total * 100.0;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::result::Status;

    fn result(status: Status, price: f64, industry: &str, has_ai: bool) -> SymbolResult {
        let mut r = SymbolResult::failed("000001", "test", "");
        r.status = status;
        r.summary.current_price = price;
        r.summary.industry = industry.to_string();
        r.summary.has_ai_analysis = has_ai;
        r.duration_secs = 2.0;
        r
    }

    #[test]
    fn test_empty_batch() {
        let stats = SummaryStats::from_results(&[]);
        assert_eq!(stats.total_symbols, 0);
        assert_eq!(stats.ai_analysis_coverage, 0.0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.price_ranges.total(), 0);
    }

    #[test]
    fn test_price_buckets() {
        let mut ranges = PriceRanges::default();
        for price in [-1.0, 0.0, 0.01, 19.99, 20.0, 99.99, 100.0, 1700.0] {
            ranges.add(price);
        }
        assert_eq!(ranges, PriceRanges { low: 2, medium: 2, high: 2 });
    }

    #[test]
    fn test_every_positive_price_lands_in_one_bucket() {
        for price in [0.5, 20.0, 50.0, 100.0, 250.0] {
            let mut ranges = PriceRanges::default();
            ranges.add(price);
            assert_eq!(ranges.total(), 1, "price {price}");
        }
    }

    #[test]
    fn test_aggregate_stats() {
        let mut trending = result(Status::Success, 12.0, "银行", true);
        trending.summary.technical_trend = "bullish | MACD bullish".to_string();
        let results = vec![
            trending,
            result(Status::Partial, 150.0, "白酒", false),
            result(Status::Failed, 0.0, "", false),
            result(Status::Success, 30.0, "银行", true),
        ];

        let stats = SummaryStats::from_results(&results);
        assert_eq!(stats.total_symbols, 4);
        assert_eq!(stats.success_rate, 50.0);
        assert_eq!(stats.avg_analysis_time, 2.0);
        assert_eq!(stats.industry_distribution.get("银行"), Some(&2));
        assert_eq!(stats.industry_distribution.len(), 2);
        assert_eq!(stats.price_ranges, PriceRanges { low: 1, medium: 1, high: 1 });
        assert_eq!(stats.trend_distribution.len(), 1);
        assert_eq!(stats.ai_analysis_coverage, 50.0);
    }
}
