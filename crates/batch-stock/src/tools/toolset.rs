//! Collaborator traits and the registry handed to the analyzer

use crate::cache::CachePolicy;
use crate::config::{AnalysisType, UserPosition};
use crate::error::Result;
use crate::tools::{IdentityResolver, StockIdentity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Flags propagated from the batch config to every data tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    pub use_cache: bool,
    pub force_refresh: bool,
    pub include_ai_analysis: bool,
}

impl FetchOptions {
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            use_cache: self.use_cache,
            force_refresh: self.force_refresh,
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_refresh: false,
            include_ai_analysis: false,
        }
    }
}

/// The user's view on a stock, input to the comprehensive analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stance {
    pub opinion: String,
    pub position: UserPosition,
}

/// Fetches one data dimension (basic, technical, news, chip) for a stock
///
/// The returned value is either a field map or an object carrying an
/// `error` key.
#[async_trait]
pub trait DataTool: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, identity: &StockIdentity, options: FetchOptions) -> Result<Value>;
}

/// Produces the LLM-driven comprehensive analysis
#[async_trait]
pub trait ComprehensiveTool: Send + Sync {
    async fn analyze(
        &self,
        identity: &StockIdentity,
        stance: &Stance,
        use_cache: bool,
        force_refresh: bool,
    ) -> Result<Value>;
}

/// Everything the analyzer calls out to
#[derive(Clone)]
pub struct ToolSet {
    resolver: Arc<dyn IdentityResolver>,
    data_tools: HashMap<AnalysisType, Arc<dyn DataTool>>,
    comprehensive: Option<Arc<dyn ComprehensiveTool>>,
}

impl ToolSet {
    pub fn new(resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            resolver,
            data_tools: HashMap::new(),
            comprehensive: None,
        }
    }

    /// Register the tool for a data dimension
    ///
    /// `AnalysisType::Comprehensive` goes through [`ToolSet::with_comprehensive`];
    /// registering a data tool for it has no effect on the analyzer.
    pub fn with_data_tool(mut self, kind: AnalysisType, tool: Arc<dyn DataTool>) -> Self {
        self.data_tools.insert(kind, tool);
        self
    }

    pub fn with_comprehensive(mut self, tool: Arc<dyn ComprehensiveTool>) -> Self {
        self.comprehensive = Some(tool);
        self
    }

    pub fn resolver(&self) -> &Arc<dyn IdentityResolver> {
        &self.resolver
    }

    pub fn data_tool(&self, kind: AnalysisType) -> Option<&Arc<dyn DataTool>> {
        self.data_tools.get(&kind)
    }

    pub fn comprehensive(&self) -> Option<&Arc<dyn ComprehensiveTool>> {
        self.comprehensive.as_ref()
    }
}
