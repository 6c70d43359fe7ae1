//! Generative-language model port.

use async_trait::async_trait;

/// Stateless text generation: one prompt in, one reply out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError>;
}

/// Failures reported by the language-model provider.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Provider rate limit exceeded")]
    RateLimited,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider rejected credentials")]
    AuthenticationFailed,

    #[error("Provider error: {0}")]
    Provider(String),
}
