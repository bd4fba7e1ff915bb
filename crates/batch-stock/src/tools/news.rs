//! Company news from Finnhub

use crate::api::{FinnhubClient, FinnhubNewsArticle};
use crate::cache::{CacheKey, CacheManager};
use crate::config::AnalysisType;
use crate::error::{BatchError, Result};
use crate::tools::{AiAnalyst, DataTool, FetchOptions, StockIdentity};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Local};
use serde_json::{Value, json};
use std::sync::Arc;

/// Days of news to look back
pub const NEWS_LOOKBACK_DAYS: i64 = 7;

/// Most articles kept in a payload
pub const MAX_ARTICLES: usize = 20;

#[derive(Clone)]
pub struct NewsTool {
    finnhub: Option<FinnhubClient>,
    caches: CacheManager,
    ai: Option<Arc<AiAnalyst>>,
}

impl NewsTool {
    /// `finnhub` is `None` when no API key is configured; every fetch then fails
    pub fn new(finnhub: Option<FinnhubClient>, caches: CacheManager, ai: Option<Arc<AiAnalyst>>) -> Self {
        Self { finnhub, caches, ai }
    }
}

/// Newest-first payload for a set of articles
pub fn news_payload(mut articles: Vec<FinnhubNewsArticle>) -> Value {
    articles.sort_by(|a, b| b.datetime.cmp(&a.datetime));
    let news_data: Vec<Value> = articles
        .iter()
        .take(MAX_ARTICLES)
        .map(|a| {
            let time = DateTime::from_timestamp(a.datetime, 0)
                .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            json!({
                "title": a.headline,
                "time": time,
                "summary": a.summary,
                "source": a.source,
                "url": a.url,
            })
        })
        .collect();

    json!({
        "news_count": news_data.len(),
        "news_data": news_data,
        "source": "finnhub",
    })
}

#[async_trait]
impl DataTool for NewsTool {
    fn name(&self) -> &str {
        "news"
    }

    async fn fetch(&self, identity: &StockIdentity, options: FetchOptions) -> Result<Value> {
        let finnhub = self
            .finnhub
            .as_ref()
            .ok_or_else(|| BatchError::Provider("FINNHUB_API_KEY not configured".to_string()))?;

        let today = Local::now().date_naive();
        let from = (today - Duration::days(NEWS_LOOKBACK_DAYS)).to_string();
        let to = today.to_string();
        let key = CacheKey::new(
            &identity.market_symbol,
            "news",
            json!({ "from": &from, "to": &to }),
        );

        let mut payload = self
            .caches
            .news
            .fetch_with(key, options.cache_policy(), || async {
                let articles = finnhub
                    .get_company_news(&identity.market_symbol, &from, &to)
                    .await?;
                Ok::<_, BatchError>(news_payload(articles))
            })
            .await?;

        if options.include_ai_analysis {
            if let Some(ai) = &self.ai {
                ai.attach(AnalysisType::News, identity, &mut payload, options.cache_policy())
                    .await;
            }
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(headline: &str, datetime: i64) -> FinnhubNewsArticle {
        FinnhubNewsArticle {
            category: "company".to_string(),
            datetime,
            headline: headline.to_string(),
            id: datetime,
            related: "AAPL".to_string(),
            source: "Reuters".to_string(),
            summary: String::new(),
            url: "https://example.com".to_string(),
        }
    }

    #[test]
    fn test_news_payload_newest_first() {
        let payload = news_payload(vec![
            article("older", 1_700_000_000),
            article("newer", 1_700_100_000),
        ]);
        assert_eq!(payload["news_count"], 2);
        assert_eq!(payload["news_data"][0]["title"], "newer");
        assert_eq!(payload["news_data"][1]["source"], "Reuters");
        assert!(!payload["news_data"][0]["time"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_news_payload_is_capped() {
        let articles = (0..30).map(|i| article("n", 1_700_000_000 + i)).collect();
        let payload = news_payload(articles);
        assert_eq!(payload["news_count"], MAX_ARTICLES);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_provider_error() {
        let tool = NewsTool::new(None, CacheManager::default(), None);
        let identity = StockIdentity::new("AAPL", "Apple");

        let err = tool.fetch(&identity, FetchOptions::default()).await.unwrap_err();
        assert!(err.to_string().contains("FINNHUB_API_KEY"));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_live_news() {
        let key = std::env::var("FINNHUB_API_KEY").unwrap();
        let tool = NewsTool::new(Some(FinnhubClient::new(key, 0)), CacheManager::default(), None);
        let identity = StockIdentity::new("AAPL", "Apple");

        let payload = tool.fetch(&identity, FetchOptions::default()).await.unwrap();
        assert!(payload["news_count"].is_number());
    }
}
