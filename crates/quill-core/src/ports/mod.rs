//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod chat;
mod rate_limit;
mod repository;
mod storage;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use chat::{ChatError, ChatModel};
pub use rate_limit::{RateLimitDecision, RateLimitError, RateLimiter};
pub use repository::{
    BaseRepository, CommentRepository, LikeRepository, PostRepository, UserRepository,
};
pub use storage::{ImageStore, StorageError, StoredImage};
