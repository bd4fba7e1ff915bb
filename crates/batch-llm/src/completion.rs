//! Completion request and response types

use crate::Message;
use serde::{Deserialize, Serialize};

/// Output cap for a single analysis narrative
pub const DEFAULT_MAX_TOKENS: usize = 4096;

/// Sampling temperature used for analysis prompts
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// One chat completion call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Single-turn request: a system prompt and one user prompt
    pub fn single_turn(model: impl Into<String>, system: &str, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::user(prompt)],
            system: (!system.is_empty()).then(|| system.to_string()),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: Some(DEFAULT_TEMPERATURE),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub message: Message,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

/// Why generation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    /// Output was cut at `max_tokens`
    MaxTokens,
}

impl StopReason {
    pub fn is_truncated(self) -> bool {
        self == StopReason::MaxTokens
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    #[test]
    fn test_single_turn_request() {
        let request = CompletionRequest::single_turn("qwen-plus", "You are a stock analyst", "分析 600519")
            .with_max_tokens(1024);

        assert_eq!(request.model, "qwen-plus");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, Role::User);
        assert_eq!(request.max_tokens, 1024);
        assert_eq!(request.temperature, Some(DEFAULT_TEMPERATURE));
        assert_eq!(request.system.as_deref(), Some("You are a stock analyst"));
    }

    #[test]
    fn test_empty_system_prompt_is_omitted() {
        let request = CompletionRequest::single_turn("m", "", "hi");
        assert!(request.system.is_none());
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("system"));
    }

    #[test]
    fn test_usage_and_truncation() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
        assert!(StopReason::MaxTokens.is_truncated());
        assert!(!StopReason::EndTurn.is_truncated());
    }
}
