use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Comment, CommentView, LikeToggle, Post, PostChanges, PostRecord, ProfileChanges, SearchQuery,
    User,
};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID. `RepoError::NotFound` if nothing was deleted.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with account-specific lookups.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their (normalized) email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Find any user, other than `exclude`, holding the given username OR email.
    /// Fields passed as `None` are not considered.
    async fn find_conflicting(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<Option<User>, RepoError>;

    /// Apply a partial profile update. `Ok(None)` if the user does not exist.
    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, RepoError>;
}

/// Post repository. Reads return posts joined with author and counts,
/// newest first.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    async fn list(&self) -> Result<Vec<PostRecord>, RepoError>;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_record(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    /// Apply a partial update. `Ok(None)` if the post does not exist.
    async fn update(&self, id: Uuid, changes: PostChanges)
    -> Result<Option<PostRecord>, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Comments on a post, newest first, with their authors.
    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, RepoError>;
}

/// Like repository.
#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Flip the `(user_id, post_id)` like and return the new state with the
    /// post's like count read after the mutation.
    /// `RepoError::NotFound` if the post does not exist.
    async fn toggle(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeToggle, RepoError>;

    /// Which of `post_ids` the user has liked, in a single query.
    async fn liked_post_ids(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, RepoError>;
}
