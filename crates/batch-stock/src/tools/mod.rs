//! Data and AI collaborators consumed by the analyzer
//!
//! Each analysis dimension is a [`DataTool`]; the comprehensive analysis is a
//! [`ComprehensiveTool`]. [`builtin_toolset`] wires the Yahoo Finance, Finnhub
//! and OpenAI-compatible implementations together.

pub mod ai;
pub mod basic;
pub mod chip;
pub mod comprehensive;
pub mod identity;
pub mod market;
pub mod news;
pub mod payload;
pub mod technical;
pub mod toolset;

pub use ai::AiAnalyst;
pub use basic::BasicInfoTool;
pub use chip::ChipTool;
pub use comprehensive::AiComprehensiveTool;
pub use identity::{IdentityResolver, StockIdentity, YahooIdentityResolver, to_market_symbol};
pub use market::MarketData;
pub use news::NewsTool;
pub use payload::Payload;
pub use technical::TechnicalTool;
pub use toolset::{ComprehensiveTool, DataTool, FetchOptions, Stance, ToolSet};

use crate::api::FinnhubClient;
use crate::cache::CacheManager;
use crate::config::AnalysisType;
use crate::error::Result;
use batch_llm::LLMProvider;
use batch_llm::providers::{OpenAIConfig, OpenAIProvider};
use batch_utils::{LlmSettings, Settings};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Finnhub requests per minute on the free tier
const FINNHUB_RATE_LIMIT: u32 = 60;

fn openai_provider(llm: &LlmSettings) -> Result<OpenAIProvider> {
    let mut config = OpenAIConfig::new(llm.api_key.clone().unwrap_or_else(|| "not-needed".to_string()));
    if let Some(base) = &llm.api_base {
        config = config.with_api_base(base);
    }
    if let Some(model) = &llm.model {
        config = config.with_model(model);
    }
    Ok(OpenAIProvider::with_config(config)?)
}

/// Tool set backed by the built-in providers
///
/// `names` maps user codes to display names. AI enrichment and the
/// comprehensive analysis are only registered when an LLM is configured.
pub fn builtin_toolset(settings: &Settings, names: HashMap<String, String>) -> Result<ToolSet> {
    let caches = CacheManager::default_config();
    let market = MarketData::new(caches.clone());

    let ai = match &settings.llm {
        Some(llm) => {
            let provider: Arc<dyn LLMProvider> = Arc::new(openai_provider(llm)?);
            info!("AI analysis enabled with model {}", provider.default_model());
            Some(Arc::new(AiAnalyst::new(provider, caches.analysis.clone())))
        }
        None => {
            info!("No LLM configured, AI analysis disabled");
            None
        }
    };
    let finnhub = settings
        .finnhub_api_key
        .as_ref()
        .map(|key| FinnhubClient::new(key.clone(), FINNHUB_RATE_LIMIT));

    let basic: Arc<dyn DataTool> = Arc::new(BasicInfoTool::new(market.clone(), ai.clone()));
    let technical: Arc<dyn DataTool> = Arc::new(TechnicalTool::new(market.clone(), ai.clone()));
    let resolver = YahooIdentityResolver::new().with_names(names);

    let mut tools = ToolSet::new(Arc::new(resolver))
        .with_data_tool(AnalysisType::Basic, basic.clone())
        .with_data_tool(AnalysisType::Technical, technical.clone())
        .with_data_tool(
            AnalysisType::News,
            Arc::new(NewsTool::new(finnhub, caches.clone(), ai.clone())),
        )
        .with_data_tool(
            AnalysisType::Chip,
            Arc::new(ChipTool::new(market, ai.clone())),
        );

    if let Some(analyst) = ai {
        let comprehensive = AiComprehensiveTool::new(analyst, caches.analysis.clone())
            .with_source(AnalysisType::Basic, basic)
            .with_source(AnalysisType::Technical, technical);
        tools = tools.with_comprehensive(Arc::new(comprehensive));
    }
    Ok(tools)
}
