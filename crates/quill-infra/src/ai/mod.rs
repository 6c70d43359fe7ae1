//! Generative-language model implementations.

mod gemini;

pub use gemini::{GeminiChatModel, GeminiConfig};
