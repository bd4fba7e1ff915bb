//! Symbol identity resolution

use crate::api::YahooFinanceClient;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// A resolved stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockIdentity {
    /// Code as given by the user, e.g. `600519`
    pub code: String,
    /// Display name
    pub name: String,
    /// Ticker understood by the market data provider, e.g. `600519.SS`
    pub market_symbol: String,
    /// Provider-specific extras (industry, exchange, ...)
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl StockIdentity {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            market_symbol: to_market_symbol(&code),
            code,
            name: name.into(),
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Industry from the extras, empty when unknown
    pub fn industry(&self) -> &str {
        self.extra
            .get("industry")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// Resolves a user-supplied code to a [`StockIdentity`]
///
/// `Ok(None)` and `Err` both mean the symbol cannot be analyzed.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, code: &str) -> Result<Option<StockIdentity>>;
}

/// Map a user code to a Yahoo ticker
///
/// Six-digit A-share codes get their exchange suffix (`.SS` Shanghai, `.SZ`
/// Shenzhen, `.BJ` Beijing); anything else is upper-cased and passed through.
pub fn to_market_symbol(code: &str) -> String {
    let code = code.trim();
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        let suffix = match code.as_bytes()[0] {
            b'6' | b'9' => Some("SS"),
            b'0' | b'2' | b'3' => Some("SZ"),
            b'4' | b'8' => Some("BJ"),
            _ => None,
        };
        if let Some(suffix) = suffix {
            return format!("{code}.{suffix}");
        }
    }
    code.to_uppercase()
}

/// Resolver that checks the ticker against Yahoo Finance
///
/// Names and industries come from an optional alias table since the quote
/// endpoint does not carry them.
#[derive(Debug, Clone, Default)]
pub struct YahooIdentityResolver {
    client: YahooFinanceClient,
    names: HashMap<String, String>,
    industries: HashMap<String, String>,
}

impl YahooIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add display names keyed by user code
    pub fn with_names(mut self, names: HashMap<String, String>) -> Self {
        self.names.extend(names);
        self
    }

    /// Add industries keyed by user code
    pub fn with_industries(mut self, industries: HashMap<String, String>) -> Self {
        self.industries.extend(industries);
        self
    }
}

#[async_trait]
impl IdentityResolver for YahooIdentityResolver {
    async fn resolve(&self, code: &str) -> Result<Option<StockIdentity>> {
        let market_symbol = to_market_symbol(code);
        if !self.client.validate_symbol(&market_symbol).await? {
            debug!("{market_symbol} not known to Yahoo Finance");
            return Ok(None);
        }

        let name = self.names.get(code).cloned().unwrap_or_else(|| code.to_string());
        let mut identity = StockIdentity::new(code, name);
        if let Some(industry) = self.industries.get(code) {
            identity = identity.with_extra("industry", industry.clone());
        }
        Ok(Some(identity))
    }
}
