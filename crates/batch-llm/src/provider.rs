//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;
use tracing::warn;

/// Trait for LLM providers
///
/// Implementations of this trait provide access to different LLM services.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g., "openai")
    fn name(&self) -> &str;

    /// Model used when a caller does not pick one
    fn default_model(&self) -> &str;

    /// Single-turn helper: system prompt + user prompt, returns the reply text
    async fn ask(&self, system: &str, prompt: &str) -> Result<String> {
        let request = CompletionRequest::single_turn(self.default_model(), system, prompt);
        let response = self.complete(request).await?;
        if response.stop_reason.is_truncated() {
            warn!(
                "{} reply hit the token limit after {} tokens",
                self.name(),
                response.usage.output_tokens
            );
        }
        response
            .message
            .text()
            .map(str::to_string)
            .ok_or_else(|| crate::LLMError::UnexpectedResponse("Empty completion".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Message, StopReason, TokenUsage};

    struct EchoProvider;

    #[async_trait]
    impl LLMProvider for EchoProvider {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(CompletionResponse {
                message: Message::assistant(last),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn default_model(&self) -> &str {
            "echo-1"
        }
    }

    #[tokio::test]
    async fn test_ask_returns_reply_text() {
        let provider = EchoProvider;
        let reply = provider.ask("system", "ping").await.unwrap();
        assert_eq!(reply, "ping");
    }

    #[tokio::test]
    async fn test_ask_rejects_empty_reply() {
        let provider = EchoProvider;
        let err = provider.ask("system", "").await.unwrap_err();
        assert!(err.to_string().contains("Empty completion"));
    }
}
