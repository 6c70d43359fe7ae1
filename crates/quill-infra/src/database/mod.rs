//! Database connection management and Postgres repositories.

mod connections;
pub mod entity;
mod errors;
mod likes;
mod postgres_base;
pub mod postgres_repo;
mod posts;

use std::sync::Arc;

use sea_orm::DbConn;

use quill_core::ports::{CommentRepository, LikeRepository, PostRepository, UserRepository};

pub use connections::{DatabaseConfig, DatabaseConnections};
pub use postgres_base::PostgresBaseRepository;
pub use postgres_repo::{
    PostgresCommentRepository, PostgresLikeRepository, PostgresPostRepository,
    PostgresUserRepository,
};

/// Every repository the API needs, behind their ports.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub likes: Arc<dyn LikeRepository>,
}

impl Repositories {
    /// Postgres-backed repositories sharing one pool.
    pub fn postgres(db: DbConn) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(db.clone())),
            posts: Arc::new(PostgresPostRepository::new(db.clone())),
            comments: Arc::new(PostgresCommentRepository::new(db.clone())),
            likes: Arc::new(PostgresLikeRepository::new(db)),
        }
    }
}
