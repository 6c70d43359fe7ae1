//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{
    ChatModel, CommentRepository, ImageStore, LikeRepository, PasswordService, PostRepository,
    RateLimiter, TokenService, UserRepository,
};
use quill_infra::{
    Argon2PasswordService, CloudinaryImageStore, GeminiChatModel, JwtTokenService, Repositories,
};

use crate::config::AppConfig;

/// How the session cookie is issued.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Set the `Secure` attribute (production only).
    pub secure: bool,
    pub max_age_secs: i64,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub likes: Arc<dyn LikeRepository>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub images: Arc<dyn ImageStore>,
    pub chat: Arc<dyn ChatModel>,
    /// `None` disables throttling.
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
    pub session: SessionSettings,
}

impl AppState {
    /// Wire the production implementations around an open database.
    pub fn new(config: &AppConfig, repos: Repositories) -> Self {
        let tokens = Arc::new(JwtTokenService::new(config.jwt.clone()));

        let session = SessionSettings {
            secure: config.env.is_production(),
            max_age_secs: tokens.expiration_seconds(),
        };

        tracing::info!(
            secure_cookie = session.secure,
            model = %config.gemini.model,
            "Application state initialized"
        );

        Self {
            users: repos.users,
            posts: repos.posts,
            comments: repos.comments,
            likes: repos.likes,
            tokens,
            passwords: Arc::new(Argon2PasswordService::new()),
            images: Arc::new(CloudinaryImageStore::new(config.cloudinary.clone())),
            chat: Arc::new(GeminiChatModel::new(config.gemini.clone())),
            rate_limiter: rate_limiter(config),
            session,
        }
    }
}

#[cfg(feature = "rate-limit")]
fn rate_limiter(config: &AppConfig) -> Option<Arc<dyn RateLimiter>> {
    use quill_infra::{InMemoryRateLimiter, RateLimitConfig};

    Some(Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
        max_requests: config.rate_limit.max_requests,
        window: config.rate_limit.window,
    })))
}

#[cfg(not(feature = "rate-limit"))]
fn rate_limiter(_config: &AppConfig) -> Option<Arc<dyn RateLimiter>> {
    tracing::info!("Running without rate-limit feature - throttling disabled");
    None
}
