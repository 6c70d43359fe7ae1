//! Post reads: author join plus batched like/comment counts.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbConn, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, SelectTwo,
};
use uuid::Uuid;

use quill_core::domain::{Post, PostChanges, PostRecord, SearchQuery};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, PostRepository};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::like::{self, Entity as LikeEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::errors::map_db_err;
use super::postgres_repo::PostgresPostRepository;

/// Posts joined with their authors, newest first.
pub(crate) fn with_author(select: Select<PostEntity>) -> SelectTwo<PostEntity, UserEntity> {
    select
        .find_also_related(UserEntity)
        .order_by_desc(post::Column::CreatedAt)
}

/// OR of: lower(title|content|excerpt|author.username) LIKE pattern, or the
/// raw term is an element of `tags`.
pub(crate) fn search_condition(query: &SearchQuery) -> Condition {
    let pattern = query.like_pattern();
    let lower_like = |column: SimpleExpr| Expr::expr(Func::lower(column)).like(pattern.clone());

    Condition::any()
        .add(lower_like(Expr::col((PostEntity, post::Column::Title)).into()))
        .add(lower_like(Expr::col((PostEntity, post::Column::Content)).into()))
        .add(lower_like(Expr::col((PostEntity, post::Column::Excerpt)).into()))
        .add(Expr::cust_with_values(
            r#"? = ANY("posts"."tags")"#,
            [query.term().to_string()],
        ))
        .add(lower_like(Expr::col((UserEntity, user::Column::Username)).into()))
}

/// `post_id -> COUNT(*)` for rows of `E` referencing any of `ids`.
async fn count_by_post<E, C>(
    db: &DbConn,
    column: C,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, u64>, RepoError>
where
    E: EntityTrait,
    C: ColumnTrait,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, i64)> = E::find()
        .select_only()
        .column(column)
        .column_as(Expr::col(column).count(), "count")
        .filter(column.is_in(ids.iter().copied()))
        .group_by(column)
        .into_tuple()
        .all(db)
        .await
        .map_err(map_db_err)?;

    Ok(rows
        .into_iter()
        .map(|(id, count)| (id, count.max(0) as u64))
        .collect())
}

impl PostgresPostRepository {
    async fn attach_counts(
        &self,
        rows: Vec<(post::Model, Option<user::Model>)>,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let ids: Vec<Uuid> = rows.iter().map(|(post, _)| post.id).collect();
        let likes = count_by_post::<LikeEntity, _>(&self.db, like::Column::PostId, &ids).await?;
        let comments =
            count_by_post::<CommentEntity, _>(&self.db, comment::Column::PostId, &ids).await?;

        Ok(rows
            .into_iter()
            .filter_map(|(post, author)| {
                let Some(author) = author else {
                    tracing::warn!(post_id = %post.id, "Post without author skipped");
                    return None;
                };
                Some(PostRecord {
                    like_count: likes.get(&post.id).copied().unwrap_or(0),
                    comment_count: comments.get(&post.id).copied().unwrap_or(0),
                    post: Post::from(post),
                    author: author.public(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn list(&self) -> Result<Vec<PostRecord>, RepoError> {
        let rows = with_author(PostEntity::find())
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        self.attach_counts(rows).await
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<PostRecord>, RepoError> {
        let rows = with_author(PostEntity::find())
            .filter(search_condition(query))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        tracing::debug!(term = %query.term(), hits = rows.len(), "Post search");
        self.attach_counts(rows).await
    }

    async fn find_record(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row = PostEntity::find_by_id(id)
            .find_also_related(UserEntity)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        match row {
            Some(row) => Ok(self.attach_counts(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<PostRecord>, RepoError> {
        let Some(mut post) = BaseRepository::<Post, Uuid>::find_by_id(self, id).await? else {
            return Ok(None);
        };

        post.apply(changes);
        let active_model: post::ActiveModel = post.into();
        active_model.update(&self.db).await.map_err(map_db_err)?;

        self.find_record(id).await
    }
}
