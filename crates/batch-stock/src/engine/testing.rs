//! Deterministic collaborators for analyzer and orchestrator tests

use crate::error::{BatchError, Result};
use crate::tools::{
    ComprehensiveTool, DataTool, FetchOptions, IdentityResolver, Stance, StockIdentity,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Resolves every code except the listed ones
#[derive(Default)]
pub struct StubResolver {
    pub unknown: HashSet<String>,
}

impl StubResolver {
    pub fn rejecting(codes: &[&str]) -> Self {
        Self {
            unknown: codes.iter().map(ToString::to_string).collect(),
        }
    }
}

#[async_trait]
impl IdentityResolver for StubResolver {
    async fn resolve(&self, code: &str) -> Result<Option<StockIdentity>> {
        if self.unknown.contains(code) {
            return Ok(None);
        }
        Ok(Some(
            StockIdentity::new(code, format!("股票{code}")).with_extra("industry", "银行"),
        ))
    }
}

/// Returns a fixed payload, with per-code failures
pub struct StubTool {
    payload: Value,
    error: String,
    fail_for: HashSet<String>,
    panic_for: HashSet<String>,
    sentinel: bool,
    flaky: AtomicUsize,
    pub calls: AtomicUsize,
}

impl StubTool {
    pub fn ok(payload: Value) -> Self {
        Self {
            payload,
            error: String::new(),
            fail_for: HashSet::new(),
            panic_for: HashSet::new(),
            sentinel: false,
            flaky: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Raise `error` for `code`
    pub fn failing_for(mut self, code: &str, error: &str) -> Self {
        self.fail_for.insert(code.to_string());
        self.error = error.to_string();
        self
    }

    /// Answer `{"error": ..}` instead of raising
    pub fn as_sentinel(mut self) -> Self {
        self.sentinel = true;
        self
    }

    pub fn panicking_for(mut self, code: &str) -> Self {
        self.panic_for.insert(code.to_string());
        self
    }

    /// Fail the first `times` calls with `error`, then succeed
    pub fn flaky(mut self, times: usize, error: &str) -> Self {
        self.flaky = AtomicUsize::new(times);
        self.error = error.to_string();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataTool for StubTool {
    fn name(&self) -> &str {
        "stub"
    }

    async fn fetch(&self, identity: &StockIdentity, _options: FetchOptions) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!self.panic_for.contains(&identity.code), "stub panic for {}", identity.code);

        let flaky = self
            .flaky
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if flaky || self.fail_for.contains(&identity.code) {
            if self.sentinel {
                return Ok(json!({ "error": self.error }));
            }
            return Err(BatchError::Provider(self.error.clone()));
        }
        Ok(self.payload.clone())
    }
}

/// Comprehensive analysis that echoes the stance
pub struct StubComprehensive;

#[async_trait]
impl ComprehensiveTool for StubComprehensive {
    async fn analyze(
        &self,
        identity: &StockIdentity,
        stance: &Stance,
        _use_cache: bool,
        _force_refresh: bool,
    ) -> Result<Value> {
        Ok(json!({
            "report": format!("{} {}", identity.name, stance.position.label()),
            "analysis_info": { "data_sources_count": 2 },
        }))
    }
}

pub fn basic_payload() -> Value {
    json!({ "current_price": 12.5, "change_percent": 1.5, "industry": "银行" })
}

pub fn technical_payload() -> Value {
    json!({
        "indicators": { "ma_trend": "bullish", "macd_trend": "bullish", "rsi_14": 55.0 },
    })
}
