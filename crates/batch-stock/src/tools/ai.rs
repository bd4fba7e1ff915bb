//! LLM commentary attached to data payloads

use crate::cache::{CacheKey, CachePolicy, StockCache};
use crate::config::AnalysisType;
use crate::error::{BatchError, Result};
use crate::prompts;
use crate::tools::StockIdentity;
use batch_llm::LLMProvider;
use chrono::Local;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Asks the LLM for a narrative over a data payload
#[derive(Clone)]
pub struct AiAnalyst {
    provider: Arc<dyn LLMProvider>,
    cache: StockCache,
}

impl AiAnalyst {
    pub fn new(provider: Arc<dyn LLMProvider>, cache: StockCache) -> Self {
        Self { provider, cache }
    }

    pub fn model(&self) -> &str {
        self.provider.default_model()
    }

    /// Send a prepared system/user pair, returning the reply text
    pub async fn ask(&self, system: &str, prompt: &str) -> Result<String> {
        Ok(self.provider.ask(system, prompt).await?)
    }

    /// `{report, model, timestamp}` for one data dimension
    pub async fn analyze(
        &self,
        kind: AnalysisType,
        identity: &StockIdentity,
        data: &Value,
        policy: CachePolicy,
    ) -> Result<Value> {
        let data_text = serde_json::to_string_pretty(data)?;
        let key = CacheKey::new(
            &identity.market_symbol,
            format!("ai_{kind}"),
            json!({ "data": &data_text }),
        );

        self.cache
            .fetch_with(key, policy, || async {
                let prompt = prompts::render(
                    kind.as_str(),
                    prompts::user_template(kind),
                    &json!({
                        "name": &identity.name,
                        "code": &identity.code,
                        "data": &data_text,
                    }),
                )?;
                debug!("Requesting {kind} AI analysis for {}", identity.code);
                let report = self.ask(prompts::system_prompt(kind), &prompt).await?;

                Ok::<_, BatchError>(json!({
                    "report": report,
                    "model": self.model(),
                    "timestamp": Local::now().to_rfc3339(),
                }))
            })
            .await
    }

    /// Set `ai_analysis` on `payload`; an LLM failure becomes `{error}` there
    pub async fn attach(
        &self,
        kind: AnalysisType,
        identity: &StockIdentity,
        payload: &mut Value,
        policy: CachePolicy,
    ) {
        let ai = match self.analyze(kind, identity, payload, policy).await {
            Ok(ai) => ai,
            Err(e) => {
                warn!("{kind} AI analysis for {} failed: {e}", identity.code);
                json!({ "error": e.to_string() })
            }
        };
        if let Value::Object(map) = payload {
            map.insert("ai_analysis".to_string(), ai);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::stub::StubProvider;
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn identity() -> StockIdentity {
        StockIdentity::new("600519", "贵州茅台")
    }

    #[tokio::test]
    async fn test_attach_success() {
        let provider = Arc::new(StubProvider::replying("估值合理"));
        let analyst = AiAnalyst::new(provider.clone(), StockCache::new(Duration::from_secs(60)));
        let mut payload = json!({ "current_price": 1700.0 });

        analyst
            .attach(AnalysisType::Basic, &identity(), &mut payload, CachePolicy::default())
            .await;

        assert_eq!(payload["ai_analysis"]["report"], "估值合理");
        assert_eq!(payload["ai_analysis"]["model"], "stub-model");

        // Same payload again is answered from the cache
        let mut again = json!({ "current_price": 1700.0 });
        analyst
            .attach(AnalysisType::Basic, &identity(), &mut again, CachePolicy::default())
            .await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attach_failure_is_recorded_not_raised() {
        let analyst = AiAnalyst::new(
            Arc::new(StubProvider::failing()),
            StockCache::new(Duration::from_secs(60)),
        );
        let mut payload = json!({ "news_count": 2 });

        analyst
            .attach(AnalysisType::News, &identity(), &mut payload, CachePolicy::default())
            .await;

        let error = payload["ai_analysis"]["error"].as_str().unwrap();
        assert!(error.contains("stub offline"));
        assert_eq!(payload["news_count"], 2);
    }
}
