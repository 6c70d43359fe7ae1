//! # Quill Infrastructure
//!
//! Concrete implementations of the ports defined in `quill-core`:
//! Postgres repositories (SeaORM), Argon2 + JWT credentials, the Cloudinary
//! image store and the Gemini chat model.
//!
//! ## Feature Flags
//!
//! - `rate-limit` (default) - per-client rate limiting via governor

pub mod ai;
pub mod auth;
pub mod database;
pub mod storage;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

pub use ai::{GeminiChatModel, GeminiConfig};
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use database::{DatabaseConfig, DatabaseConnections, Repositories};
pub use storage::{CloudinaryConfig, CloudinaryImageStore};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{InMemoryRateLimiter, RateLimitConfig};
