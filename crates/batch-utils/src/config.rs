//! Environment-backed settings
//!
//! Every external service is optional. A missing block means the matching
//! feature (AI analysis, news, email) is unavailable rather than an error.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading settings
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// A variable is present but cannot be parsed
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    /// Email is enabled but a required SMTP variable is missing
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// OpenAI-compatible endpoint settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmSettings {
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

/// Transport security for the SMTP connection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    /// Implicit TLS (usually port 465)
    Tls,
    /// Plain connection upgraded with STARTTLS
    #[default]
    StartTls,
    /// No encryption, local relays only
    None,
}

impl FromStr for SmtpTls {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tls" | "ssl" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            "none" | "plain" => Ok(Self::None),
            other => Err(SettingsError::InvalidValue {
                key: "SMTP_TLS",
                value: other.to_string(),
            }),
        }
    }
}

/// SMTP settings for report delivery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
    pub tls: SmtpTls,
}

/// Process-wide settings read from the environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub llm: Option<LlmSettings>,
    pub finnhub_api_key: Option<String>,
    pub smtp: Option<SmtpSettings>,
}

impl Settings {
    /// Read settings from process environment variables
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm = LlmSettings {
            api_base: get("OPENAI_API_BASE"),
            model: get("OPENAI_MODEL"),
            api_key: get("OPENAI_API_KEY"),
        };
        let llm = (llm.api_base.is_some() || llm.api_key.is_some()).then_some(llm);

        let email_enabled = match get("EMAIL_ENABLED") {
            Some(v) => parse_bool("EMAIL_ENABLED", &v)?,
            None => get("SMTP_HOST").is_some(),
        };

        let smtp = if email_enabled {
            Some(read_smtp(&get)?)
        } else {
            None
        };

        Ok(Self {
            llm,
            finnhub_api_key: get("FINNHUB_API_KEY"),
            smtp,
        })
    }
}

fn read_smtp<G>(get: &G) -> Result<SmtpSettings, SettingsError>
where
    G: Fn(&str) -> Option<String>,
{
    let host = get("SMTP_HOST").ok_or(SettingsError::Missing("SMTP_HOST"))?;
    let port = match get("SMTP_PORT") {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|_| SettingsError::InvalidValue {
                key: "SMTP_PORT",
                value: raw,
            })?,
        None => 587,
    };
    let tls = match get("SMTP_TLS") {
        Some(raw) => raw.parse()?,
        None if port == 465 => SmtpTls::Tls,
        None => SmtpTls::StartTls,
    };
    let username = get("SMTP_USERNAME").unwrap_or_default();
    let from = get("SMTP_FROM")
        .or_else(|| (!username.is_empty()).then(|| username.clone()))
        .ok_or(SettingsError::Missing("SMTP_FROM"))?;
    let to: Vec<String> = get("SMTP_TO")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if to.is_empty() {
        return Err(SettingsError::Missing("SMTP_TO"));
    }

    Ok(SmtpSettings {
        host,
        port,
        username,
        password: get("SMTP_PASSWORD").unwrap_or_default(),
        from,
        to,
        tls,
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, SettingsError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}
