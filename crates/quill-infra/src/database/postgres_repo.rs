//! PostgreSQL repository implementations.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use quill_core::domain::{Comment, CommentView, ProfileChanges, User, normalize_email};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, CommentRepository, UserRepository};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::like::Entity as LikeEntity;
use super::entity::post::Entity as PostEntity;
use super::entity::user::{self, Entity as UserEntity};
use super::errors::{map_db_err, mask_email};
use super::postgres_base::PostgresBaseRepository;

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

/// PostgreSQL like repository.
pub type PostgresLikeRepository = PostgresBaseRepository<LikeEntity>;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let email = normalize_email(email);
        tracing::debug!(user_email = %mask_email(&email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_conflicting(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<Option<User>, RepoError> {
        if username.is_none() && email.is_none() {
            return Ok(None);
        }

        let mut any = Condition::any();
        if let Some(username) = username {
            any = any.add(user::Column::Username.eq(username));
        }
        if let Some(email) = email {
            any = any.add(user::Column::Email.eq(normalize_email(email)));
        }

        let mut query = UserEntity::find().filter(any);
        if let Some(id) = exclude {
            query = query.filter(user::Column::Id.ne(id));
        }

        let result = query.one(&self.db).await.map_err(map_db_err)?;
        Ok(result.map(Into::into))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, RepoError> {
        let Some(mut user) = BaseRepository::<User, Uuid>::find_by_id(self, id).await? else {
            return Ok(None);
        };
        if changes.is_empty() {
            return Ok(Some(user));
        }

        user.apply(changes);
        let active_model: user::ActiveModel = user.into();
        let model = active_model.update(&self.db).await.map_err(map_db_err)?;

        tracing::info!(user_id = %id, "Profile updated");
        Ok(Some(model.into()))
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, RepoError> {
        let rows = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .find_also_related(UserEntity)
            .order_by_desc(comment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows
            .into_iter()
            .filter_map(|(comment, author)| match author {
                Some(author) => Some(CommentView {
                    comment: Comment::from(comment),
                    author: author.public(),
                }),
                None => {
                    tracing::warn!(comment_id = %comment.id, "Comment without author skipped");
                    None
                }
            })
            .collect())
    }
}
