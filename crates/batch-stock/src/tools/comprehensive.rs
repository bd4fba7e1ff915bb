//! LLM-driven comprehensive analysis

use crate::cache::{CacheKey, CachePolicy, StockCache};
use crate::config::AnalysisType;
use crate::error::{BatchError, Result};
use crate::prompts;
use crate::tools::{AiAnalyst, ComprehensiveTool, DataTool, FetchOptions, Stance, StockIdentity};
use async_trait::async_trait;
use chrono::Local;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Gathers data from its sources and asks the LLM for one combined report
pub struct AiComprehensiveTool {
    analyst: Arc<AiAnalyst>,
    sources: Vec<(AnalysisType, Arc<dyn DataTool>)>,
    cache: StockCache,
}

impl AiComprehensiveTool {
    pub fn new(analyst: Arc<AiAnalyst>, cache: StockCache) -> Self {
        Self {
            analyst,
            sources: Vec::new(),
            cache,
        }
    }

    /// Add a data source whose payload is fed to the prompt
    pub fn with_source(mut self, kind: AnalysisType, tool: Arc<dyn DataTool>) -> Self {
        self.sources.push((kind, tool));
        self
    }

    /// Successful source payloads as prompt sections; failed sources are skipped
    async fn gather(&self, identity: &StockIdentity, policy: CachePolicy) -> Result<Vec<Value>> {
        let options = FetchOptions {
            use_cache: policy.use_cache,
            force_refresh: policy.force_refresh,
            include_ai_analysis: false,
        };

        let mut sections = Vec::new();
        for (kind, tool) in &self.sources {
            match tool.fetch(identity, options).await {
                Ok(data) if data.get("error").is_none() => sections.push(json!({
                    "title": kind.label(),
                    "data": serde_json::to_string_pretty(&data)?,
                })),
                Ok(data) => warn!("{} source for {} returned {}", kind, identity.code, data["error"]),
                Err(e) => warn!("{} source for {} failed: {e}", kind, identity.code),
            }
        }

        if sections.is_empty() {
            return Err(BatchError::DataUnavailable {
                symbol: identity.code.clone(),
                reason: "no data source available for comprehensive analysis".to_string(),
            });
        }
        Ok(sections)
    }
}

#[async_trait]
impl ComprehensiveTool for AiComprehensiveTool {
    #[instrument(skip(self, identity, stance), fields(code = %identity.code))]
    async fn analyze(
        &self,
        identity: &StockIdentity,
        stance: &Stance,
        use_cache: bool,
        force_refresh: bool,
    ) -> Result<Value> {
        let policy = CachePolicy {
            use_cache,
            force_refresh,
        };
        let key = CacheKey::new(
            &identity.market_symbol,
            "comprehensive",
            json!({ "opinion": &stance.opinion, "position": stance.position }),
        );

        self.cache
            .fetch_with(key, policy, || async {
                let started = Instant::now();
                let sections = self.gather(identity, policy).await?;
                let prompt = prompts::render(
                    "comprehensive",
                    prompts::COMPREHENSIVE_USER,
                    &json!({
                        "name": &identity.name,
                        "code": &identity.code,
                        "opinion": &stance.opinion,
                        "position": stance.position.label(),
                        "sections": &sections,
                    }),
                )?;

                let report = self
                    .analyst
                    .ask(prompts::COMPREHENSIVE_SYSTEM, &prompt)
                    .await?;
                let elapsed = started.elapsed().as_secs_f64();
                info!("Comprehensive analysis for {} took {elapsed:.1}s", identity.code);

                Ok::<_, BatchError>(json!({
                    "report": report,
                    "analysis_info": {
                        "data_sources_count": sections.len(),
                        "analysis_time": elapsed,
                        "model": self.analyst.model(),
                    },
                    "timestamp": Local::now().to_rfc3339(),
                }))
            })
            .await
    }
}
